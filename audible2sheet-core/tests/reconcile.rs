mod common;

use audible2sheet_core::reconcile::{
    diff, escape_leading_zero, key_column, library_from_rows, project,
};
use audible2sheet_core::{Book, Library, UNKNOWN};
use common::capture_warnings;

fn schema(columns: &[&str]) -> Vec<String> {
    columns.iter().map(|c| c.to_string()).collect()
}

fn canonical() -> Vec<String> {
    schema(&["ASIN", "TITLE", "AUTHORS", "DURATION", "PURCHASE_DATE"])
}

fn book(asin: &str, title: &str) -> Book {
    Book::new(asin, title, "Some Author", "10h00m", "20200101")
}

fn library(books: &[(&str, &str)]) -> Library {
    books.iter().map(|(a, t)| book(a, t)).collect()
}

#[test]
fn only_books_missing_from_destination_are_emitted() {
    let source = library(&[("A1", "One"), ("A2", "Two"), ("A3", "Three")]);
    let dest = library(&[("A2", "Two")]);

    let rows = diff(&source, &dest, &canonical());

    assert_eq!(
        rows,
        vec![
            vec!["A1", "One", "Some Author", "10h00m", "20200101"],
            vec!["A3", "Three", "Some Author", "10h00m", "20200101"],
        ]
    );
}

#[test]
fn identical_sets_produce_no_rows() {
    let source = library(&[("A1", "One"), ("A2", "Two")]);
    assert!(diff(&source, &source.clone(), &canonical()).is_empty());
}

#[test]
fn empty_source_produces_no_rows() {
    let dest = library(&[("A1", "One")]);
    assert!(diff(&Library::new(), &dest, &canonical()).is_empty());
}

#[test]
fn diff_is_deterministic() {
    let source = library(&[("A1", "One"), ("A2", "Two"), ("A3", "Three")]);
    let dest = library(&[("A3", "Three")]);
    let first = diff(&source, &dest, &canonical());
    let second = diff(&source, &dest, &canonical());
    assert_eq!(first, second);
}

#[test]
fn adding_one_new_book_adds_one_row_in_source_order() {
    let dest = library(&[("A2", "Two")]);
    let before = diff(&library(&[("A1", "One"), ("A3", "Three")]), &dest, &canonical());
    let after = diff(
        &library(&[("A1", "One"), ("A2", "Two"), ("N1", "New"), ("A3", "Three")]),
        &dest,
        &canonical(),
    );

    assert_eq!(after.len(), before.len() + 1);
    assert_eq!(after[0], before[0]);
    assert_eq!(after[1][0], "N1");
    assert_eq!(after[2], before[1]);
}

#[test]
fn matching_is_exact_on_asin() {
    let source = library(&[("B0001", "One")]);
    let dest = library(&[("b0001", "One"), ("B000", "One")]);
    assert_eq!(diff(&source, &dest, &canonical()).len(), 1);
}

#[test]
fn rows_follow_a_reordered_and_extended_schema() {
    let source = library(&[("A1", "One")]);
    let schema = schema(&["Title", "Rating", "asin", "Notes", "Purchase_Date"]);

    let rows = diff(&source, &Library::new(), &schema);

    assert_eq!(rows, vec![vec!["One", "", "A1", "", "20200101"]]);
}

#[test]
fn empty_schema_projects_empty_rows() {
    let source = library(&[("A1", "One"), ("A2", "Two")]);
    let rows = diff(&source, &Library::new(), &[]);
    assert_eq!(rows, vec![Vec::<String>::new(), Vec::new()]);
}

#[test]
fn leading_zero_cells_are_escaped() {
    assert_eq!(escape_leading_zero("0123"), "'0123");
    assert_eq!(escape_leading_zero("123"), "123");
    assert_eq!(escape_leading_zero(""), "");

    let row = project(
        &Book::new("0553418025", "1984", "George Orwell", "00h45m", "20200101"),
        &canonical(),
    );
    assert_eq!(
        row,
        vec!["'0553418025", "1984", "George Orwell", "'00h45m", "20200101"]
    );
}

#[test]
fn destination_rows_are_rekeyed_by_asin_column() {
    let schema = schema(&["Notes", "TITLE", "ASIN"]);
    let rows = vec![
        vec!["fav".to_string(), "One".to_string(), "A1".to_string()],
        vec!["".to_string(), "Blank".to_string(), " ".to_string()],
        vec!["short".to_string()],
        vec!["".to_string(), "Zero".to_string(), "'0553418025".to_string()],
    ];

    let existing = library_from_rows(&schema, &rows);

    assert_eq!(existing.len(), 2);
    assert_eq!(existing.get("A1").map(|b| b.title()), Some("One"));
    assert!(existing.contains("0553418025"));
}

#[test]
fn a_missing_destination_column_is_reported_once() {
    let schema = schema(&["ASIN", "Title"]);
    let rows = vec![
        vec!["A1".to_string(), "One".to_string()],
        vec!["A2".to_string(), "Two".to_string()],
        vec!["A3".to_string()],
    ];

    let (existing, warnings) = capture_warnings(|| library_from_rows(&schema, &rows));

    assert_eq!(existing.len(), 3);
    assert!(existing.iter().all(|b| b.authors() == UNKNOWN));
    assert_eq!(existing.get("A3").map(|b| b.title()), Some(UNKNOWN));
    assert_eq!(
        warnings.len(),
        3,
        "one warning each for AUTHORS, DURATION and PURCHASE_DATE: {warnings:?}"
    );
}

#[test]
fn key_column_finds_asin_anywhere() {
    assert_eq!(key_column(&schema(&["Title", " ASIN "])), Some(1));
    assert_eq!(key_column(&schema(&["Title", "Authors"])), None);
    assert_eq!(key_column(&[]), None);
}

#[test]
fn diff_leaves_its_inputs_untouched() {
    let source = library(&[("A1", "One"), ("A2", "Two")]);
    let dest = library(&[("A2", "Two")]);
    let schema = canonical();
    let (source_before, dest_before, schema_before) = (source.clone(), dest.clone(), schema.clone());

    let _ = diff(&source, &dest, &schema);

    assert_eq!(source, source_before);
    assert_eq!(dest, dest_before);
    assert_eq!(schema, schema_before);
}
