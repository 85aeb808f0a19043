use serde::{Deserialize, Serialize};

/// A single derived display column: the raw field key plus a humanized label.
/// Columns are recomputed from the record collection on every mutation and
/// never persisted, so they cannot drift from the records.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Eq, Hash)]
pub struct Column {
    pub key: String,
    pub label: String,
}
