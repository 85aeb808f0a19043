use anyhow::{Context, Result};

use crate::record::Record;

/// Pretty-printed (2-space) JSON array of exactly the records passed in.
pub fn to_json(records: &[Record]) -> Result<String> {
    serde_json::to_string_pretty(records).context("serializing records to JSON")
}
