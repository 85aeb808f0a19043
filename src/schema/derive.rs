use std::collections::HashSet;

use super::Column;
use crate::record::{Record, BOOKKEEPING_KEYS};

/// Union of field keys across all records, in first-seen order, bookkeeping
/// keys excluded. A pure function of the collection: same records in, same
/// columns out.
pub fn derive_columns(records: &[Record]) -> Vec<Column> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut columns = Vec::new();

    for record in records {
        for key in record.fields.keys() {
            // Bookkeeping lives in dedicated struct fields, but imported data
            // can still smuggle these names in; never surface them as columns.
            if BOOKKEEPING_KEYS.contains(&key.as_str()) {
                continue;
            }
            if seen.insert(key.as_str()) {
                columns.push(Column {
                    key: key.clone(),
                    label: humanize(key),
                });
            }
        }
    }

    columns
}

/// Turn a field key into a display label: camel-case boundaries and
/// underscores become spaces, and the first letter is capitalized.
/// `firstName` -> `First Name`, `first_name` -> `First name`.
pub fn humanize(key: &str) -> String {
    let mut label = String::with_capacity(key.len() + 4);
    let mut prev_lower = false;

    for ch in key.chars() {
        if ch == '_' {
            label.push(' ');
            prev_lower = false;
            continue;
        }
        if ch.is_uppercase() && prev_lower {
            label.push(' ');
        }
        prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        label.push(ch);
    }

    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => label,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn record(id: &str, pairs: &[(&str, &str)]) -> Record {
        let fields: IndexMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Record::created(id.to_string(), fields)
    }

    #[test]
    fn columns_in_first_seen_order() {
        let records = vec![
            record("1", &[("name", "Amy"), ("city", "Perth")]),
            record("2", &[("email", "b@x.io"), ("name", "Bob")]),
        ];
        let columns = derive_columns(&records);
        let keys: Vec<&str> = columns.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, ["name", "city", "email"]);
    }

    #[test]
    fn derive_is_idempotent() {
        let records = vec![
            record("1", &[("b", "1"), ("a", "2")]),
            record("2", &[("c", "3")]),
        ];
        assert_eq!(derive_columns(&records), derive_columns(&records));
    }

    #[test]
    fn bookkeeping_keys_never_become_columns() {
        let records = vec![record(
            "1",
            &[("id", "999"), ("createdAt", "x"), ("importedAt", "y"), ("name", "Amy")],
        )];
        let columns = derive_columns(&records);
        let keys: Vec<&str> = columns.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, ["name"]);
    }

    #[test]
    fn empty_collection_has_no_columns() {
        assert!(derive_columns(&[]).is_empty());
    }

    #[test]
    fn humanize_examples() {
        assert_eq!(humanize("firstName"), "First Name");
        assert_eq!(humanize("first_name"), "First name");
        assert_eq!(humanize("name"), "Name");
        assert_eq!(humanize("line2"), "Line2");
        assert_eq!(humanize(""), "");
    }
}
