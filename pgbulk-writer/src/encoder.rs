//! Row encoding for the PostgreSQL COPY text format
//!
//! One row per line, fields separated by a tab, `\N` for NULL. Text values
//! escape backslash first, then newline, carriage return and tab, so that the
//! backslashes introduced by the later escapes are never escaped again.

use std::borrow::Cow;

use pgbulk_common::{BulkWriteError, ColumnExpression, ColumnValues, Result, Table, Value};

/// Field separator of the text format
pub const FIELD_SEPARATOR: char = '\t';

/// Marker for NULL fields
pub const NULL_MARKER: &str = "\\N";

/// Escape a text value for the COPY text format
pub fn escape_text(value: &str) -> Cow<'_, str> {
    if !value.contains(['\\', '\n', '\r', '\t']) {
        return Cow::Borrowed(value);
    }
    Cow::Owned(
        value
            .replace('\\', "\\\\")
            .replace('\n', "\\n")
            .replace('\r', "\\r")
            .replace('\t', "\\t"),
    )
}

/// Reverse [`escape_text`] for a single field; `None` stands for NULL
pub fn decode_field(field: &str) -> Option<String> {
    if field == NULL_MARKER {
        return None;
    }
    let mut decoded = String::with_capacity(field.len());
    let mut chars = field.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            decoded.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => decoded.push('\n'),
            Some('r') => decoded.push('\r'),
            Some('t') => decoded.push('\t'),
            Some(other) => decoded.push(other),
            None => decoded.push('\\'),
        }
    }
    Some(decoded)
}

fn push_value(line: &mut String, value: &Value) {
    match value {
        Value::Null => line.push_str(NULL_MARKER),
        Value::Text(text) => line.push_str(&escape_text(text)),
        other => line.push_str(&other.to_string()),
    }
}

/// Encode one row of `table`, including the trailing newline
///
/// Database-generated columns are left out completely. Columns without a
/// value are written as NULL.
pub fn encode_row(table: &Table, values: &ColumnValues) -> Result<String> {
    let mut line = String::new();
    for (index, column) in table.bulk_columns().enumerate() {
        if index > 0 {
            line.push(FIELD_SEPARATOR);
        }
        match values.get(&column.name) {
            None => line.push_str(NULL_MARKER),
            Some(ColumnExpression::Primitive(value)) => push_value(&mut line, value),
            Some(ColumnExpression::Plain { sql }) => {
                return Err(BulkWriteError::UnsupportedExpression(format!(
                    "{}.{} = {} cannot be written to a bulk file",
                    table.name(),
                    column.name,
                    sql
                )));
            }
        }
    }
    line.push('\n');
    Ok(line)
}
