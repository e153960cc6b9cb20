//! Reconciliation of the fetched library against the spreadsheet.
//!
//! [`diff`] decides which fetched books are missing from the destination
//! and shapes each one as a row matching the destination's header, which
//! the user may have reordered or extended with columns of their own.
//! Everything here is pure: no I/O, inputs are only borrowed.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::book::{Book, BookField, Library, Row};

/// Books of `source` whose ASIN is absent from `dest`, projected onto
/// `schema`, in source order.
///
/// Matching is exact ASIN equality. An empty schema yields empty rows.
pub fn diff(source: &Library, dest: &Library, schema: &[String]) -> Vec<Row> {
    let columns = resolve_columns(schema);
    source
        .iter()
        .filter(|book| !dest.contains(book.asin()))
        .map(|book| project_resolved(book, &columns))
        .collect()
}

/// Shape one book as a row for `schema`.
///
/// Columns without a matching book field are left blank, and every cell
/// goes through [`escape_leading_zero`].
pub fn project(book: &Book, schema: &[String]) -> Row {
    project_resolved(book, &resolve_columns(schema))
}

/// Prefix values starting with `0` with an apostrophe so spreadsheets keep
/// them as text instead of stripping the leading zeros.
pub fn escape_leading_zero(value: &str) -> String {
    if value.starts_with('0') {
        format!("'{value}")
    } else {
        value.to_string()
    }
}

/// Re-key destination rows by their ASIN column.
///
/// Rows shorter than the schema are treated as having absent trailing
/// cells. Rows with a blank ASIN are ignored. A canonical field with no
/// column in `schema` is warned about once, not once per row.
pub fn library_from_rows(schema: &[String], rows: &[Row]) -> Library {
    let columns = resolve_columns(schema);
    if !rows.is_empty() {
        for field in Book::missing_fields(&columns) {
            warn!(field = field.name(), "Destination header has no column for field");
        }
    }
    rows.iter()
        .filter_map(|row| {
            let record: HashMap<BookField, String> = columns
                .iter()
                .enumerate()
                .filter_map(|(i, field)| {
                    let field = (*field)?;
                    let cell = row.get(i)?;
                    Some((field, unescape_leading_zero(cell).to_string()))
                })
                .collect();
            Book::assemble(&record, |asin, field| {
                if columns.contains(&Some(field)) {
                    debug!(asin, field = field.name(), "Destination row has no cell for field");
                }
            })
        })
        .collect()
}

/// Index of the ASIN column in `schema`, if any.
pub fn key_column(schema: &[String]) -> Option<usize> {
    schema
        .iter()
        .position(|column| BookField::from_column(column) == Some(BookField::Asin))
}

fn resolve_columns(schema: &[String]) -> Vec<Option<BookField>> {
    schema.iter().map(|c| BookField::from_column(c)).collect()
}

fn project_resolved(book: &Book, columns: &[Option<BookField>]) -> Row {
    columns
        .iter()
        .map(|column| match column {
            Some(field) => escape_leading_zero(book.field(*field)),
            None => String::new(),
        })
        .collect()
}

// Sheets normally return the displayed value, but a raw read can still
// carry the apostrophe we wrote.
fn unescape_leading_zero(cell: &str) -> &str {
    match cell.strip_prefix('\'') {
        Some(rest) if rest.starts_with('0') => rest,
        _ => cell,
    }
}
