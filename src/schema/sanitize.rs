use anyhow::{bail, Result};

/// Normalize a user-entered field name into a key: lowercase, whitespace runs
/// become `_`, anything outside `[a-z0-9_]` is stripped. A key that ends up
/// empty, or that collides with one in `taken`, is rejected with a message
/// suitable for direct display.
pub fn sanitize_field_name(raw: &str, taken: &[String]) -> Result<String> {
    let lowered = raw.trim().to_lowercase();

    let mut key = String::with_capacity(lowered.len());
    let mut pending_space = false;
    for ch in lowered.chars() {
        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space {
            key.push('_');
            pending_space = false;
        }
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_' {
            key.push(ch);
        }
    }

    if key.is_empty() {
        bail!("`{}` is not a usable field name", raw.trim());
    }
    if taken.iter().any(|t| t == &key) {
        bail!("field `{}` already exists", key);
    }
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_joins_whitespace() {
        assert_eq!(sanitize_field_name("First Name", &[]).unwrap(), "first_name");
        assert_eq!(sanitize_field_name("  Phone \t Number ", &[]).unwrap(), "phone_number");
    }

    #[test]
    fn strips_everything_outside_the_alphabet() {
        assert_eq!(sanitize_field_name("émail!", &[]).unwrap(), "mail");
        assert_eq!(sanitize_field_name("zip-code (5)", &[]).unwrap(), "zipcode_5");
    }

    #[test]
    fn empty_result_is_rejected() {
        assert!(sanitize_field_name("", &[]).is_err());
        assert!(sanitize_field_name("!!!", &[]).is_err());
    }

    #[test]
    fn duplicate_key_is_rejected() {
        let taken = vec!["city".to_string()];
        let err = sanitize_field_name("  City ", &taken).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }
}
