use std::collections::HashSet;

use anyhow::{bail, Context, Result};
use indexmap::IndexMap;
use serde_json::Value;
use tracing::warn;

use crate::record::{next_record_id, Record, BOOKKEEPING_KEYS};

/// Parse an import payload: a JSON array of flat objects. Each object becomes
/// a record with a fresh id and an `importedAt` timestamp; incoming
/// bookkeeping keys are dropped so ids can never collide with the existing
/// collection. Elements that are not objects, and values that are not
/// scalars, are skipped with a warning (see DESIGN.md for this resolution of
/// the local/remote import asymmetry).
pub fn parse_import(text: &str, existing: &[Record]) -> Result<Vec<Record>> {
    let value: Value = serde_json::from_str(text).context("import is not valid JSON")?;
    let Value::Array(entries) = value else {
        bail!("import must be a JSON array of objects");
    };

    let mut taken: HashSet<String> = existing.iter().map(|r| r.id.clone()).collect();
    let mut imported = Vec::with_capacity(entries.len());

    for (idx, entry) in entries.into_iter().enumerate() {
        let Value::Object(map) = entry else {
            warn!("skipping import entry {}: not an object", idx);
            continue;
        };

        let mut fields: IndexMap<String, String> = IndexMap::with_capacity(map.len());
        for (key, value) in map {
            if BOOKKEEPING_KEYS.contains(&key.as_str()) {
                continue;
            }
            match value {
                Value::String(s) => {
                    fields.insert(key, s);
                }
                Value::Number(n) => {
                    fields.insert(key, n.to_string());
                }
                Value::Bool(b) => {
                    fields.insert(key, b.to_string());
                }
                Value::Null => {
                    fields.insert(key, String::new());
                }
                _ => warn!("skipping `{}` in import entry {}: not a scalar", key, idx),
            }
        }

        let id = next_record_id(&taken);
        taken.insert(id.clone());
        imported.push(Record::imported(id, fields));
    }

    Ok(imported)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_two_records_with_fresh_ids_and_imported_at() {
        let imported = parse_import(r#"[{"x":"1"},{"x":"2"}]"#, &[]).unwrap();
        assert_eq!(imported.len(), 2);
        assert_ne!(imported[0].id, imported[1].id);
        for record in &imported {
            assert!(record.imported_at.is_some());
            assert!(record.created_at.is_none());
        }
        assert_eq!(imported[0].value("x"), "1");
        assert_eq!(imported[1].value("x"), "2");
    }

    #[test]
    fn rejects_non_array_input() {
        assert!(parse_import(r#"{"x":"1"}"#, &[]).is_err());
        assert!(parse_import("not json", &[]).is_err());
    }

    #[test]
    fn skips_non_object_entries() {
        let imported = parse_import(r#"[{"x":"1"}, 42, "loose", {"x":"2"}]"#, &[]).unwrap();
        assert_eq!(imported.len(), 2);
    }

    #[test]
    fn stringifies_scalars_and_drops_nested_values() {
        let imported =
            parse_import(r#"[{"n":7,"ok":true,"gap":null,"deep":{"a":1},"s":"x"}]"#, &[]).unwrap();
        let record = &imported[0];
        assert_eq!(record.value("n"), "7");
        assert_eq!(record.value("ok"), "true");
        assert_eq!(record.value("gap"), "");
        assert_eq!(record.value("s"), "x");
        assert!(!record.fields.contains_key("deep"));
    }

    #[test]
    fn incoming_bookkeeping_keys_are_dropped() {
        let imported = parse_import(r#"[{"id":"1","createdAt":"x","name":"Amy"}]"#, &[]).unwrap();
        let record = &imported[0];
        assert_ne!(record.id, "1");
        assert_eq!(record.value("name"), "Amy");
        assert!(!record.fields.contains_key("createdAt"));
    }

    #[test]
    fn fresh_ids_avoid_the_existing_collection() {
        let existing = parse_import(r#"[{"x":"1"}]"#, &[]).unwrap();
        let imported = parse_import(r#"[{"x":"2"},{"x":"3"}]"#, &existing).unwrap();
        let mut ids: HashSet<&str> = existing.iter().map(|r| r.id.as_str()).collect();
        for record in &imported {
            assert!(ids.insert(&record.id));
        }
    }
}
