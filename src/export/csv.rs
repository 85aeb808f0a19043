use crate::record::Record;
use crate::schema::Column;

/// Quote one CSV cell, doubling embedded double quotes. Every cell is quoted;
/// there is no further comma/newline special-casing.
fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Render the given view as CSV: a header row of quoted column labels, then
/// one row per record with every value quoted. Rows are joined by a single
/// `\n` and there is no trailing newline. Operates on whatever slice the
/// caller passes, typically the filtered/sorted view rather than the full
/// collection.
pub fn to_csv(records: &[Record], columns: &[Column]) -> String {
    let header = columns
        .iter()
        .map(|c| quote(&c.label))
        .collect::<Vec<_>>()
        .join(",");

    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(header);
    for record in records {
        let row = columns
            .iter()
            .map(|c| quote(record.value(&c.key)))
            .collect::<Vec<_>>()
            .join(",");
        lines.push(row);
    }
    lines.join("\n")
}
