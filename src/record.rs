use std::collections::HashSet;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Keys reserved for record bookkeeping. Never shown as columns, never
/// accepted as user fields.
pub const BOOKKEEPING_KEYS: &[&str] = &["id", "createdAt", "updatedAt", "importedAt"];

/// One user-entered row: an ordered mapping of field name to string value,
/// plus bookkeeping. Serializes to a single flat JSON object, which is also
/// the on-disk and on-the-wire document shape.
///
/// The field set is not fixed; different records may carry different fields.
/// Values are always strings. Exactly one of the three timestamps is set,
/// matching the record's lifecycle stage (created / edited / imported).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    pub id: String,
    #[serde(rename = "createdAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "updatedAt", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(rename = "importedAt", skip_serializing_if = "Option::is_none")]
    pub imported_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub fields: IndexMap<String, String>,
}

impl Record {
    /// Fresh record as produced by a form submission.
    pub fn created(id: String, fields: IndexMap<String, String>) -> Self {
        Record {
            id,
            created_at: Some(Utc::now()),
            updated_at: None,
            imported_at: None,
            fields,
        }
    }

    /// Fresh record as produced by an import.
    pub fn imported(id: String, fields: IndexMap<String, String>) -> Self {
        Record {
            id,
            created_at: None,
            updated_at: None,
            imported_at: Some(Utc::now()),
            fields,
        }
    }

    /// Full-field replacement; moves the record to the edited lifecycle stage.
    /// The id never changes.
    pub fn replace_fields(&mut self, fields: IndexMap<String, String>) {
        self.fields = fields;
        self.created_at = None;
        self.imported_at = None;
        self.updated_at = Some(Utc::now());
    }

    /// Field value for `key`; records missing the field read as empty.
    pub fn value(&self, key: &str) -> &str {
        self.fields.get(key).map(String::as_str).unwrap_or("")
    }
}

/// True when a submission carries no usable content: no fields at all, or
/// every value empty/whitespace. Blank submissions are dropped silently.
pub fn is_blank(fields: &IndexMap<String, String>) -> bool {
    fields.values().all(|v| v.trim().is_empty())
}

/// Allocate an id not present in `taken`. Ids are the current timestamp in
/// microseconds, bumped past any collision, so they stay unique and roughly
/// creation-ordered.
pub fn next_record_id(taken: &HashSet<String>) -> String {
    let mut candidate = Utc::now().timestamp_micros();
    loop {
        let id = candidate.to_string();
        if !taken.contains(&id) {
            return id;
        }
        candidate += 1;
    }
}
