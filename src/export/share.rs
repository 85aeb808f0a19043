use crate::record::Record;
use crate::schema::Column;

use super::to_csv;

/// `mailto:` URL carrying the current view as a CSV body. Fire-and-open: the
/// caller hands this to the platform and never hears back.
pub fn mailto_url(subject: &str, records: &[Record], columns: &[Column]) -> String {
    let body = to_csv(records, columns);
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("subject", subject)
        .append_pair("body", &body)
        .finish();
    format!("mailto:?{}", query)
}

/// Tab-separated payload that pastes cleanly into a spreadsheet grid. Tabs
/// and newlines inside values would break the grid, so they collapse to
/// spaces.
pub fn clipboard_payload(records: &[Record], columns: &[Column]) -> String {
    let cell = |value: &str| value.replace(['\t', '\n', '\r'], " ");

    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(
        columns
            .iter()
            .map(|c| cell(&c.label))
            .collect::<Vec<_>>()
            .join("\t"),
    );
    for record in records {
        lines.push(
            columns
                .iter()
                .map(|c| cell(record.value(&c.key)))
                .collect::<Vec<_>>()
                .join("\t"),
        );
    }
    lines.join("\n")
}
