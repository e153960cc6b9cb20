//! Canonical book record and the ordered, ASIN-keyed collection of them.
//!
//! A [`Book`] is what every other module exchanges: the normalizer builds
//! them from raw library items, the cache store persists them, and the
//! reconciliation engine projects them onto spreadsheet rows. Books are
//! immutable once built.

use std::collections::HashMap;
use std::fmt;

use tracing::warn;

/// Marker stored for a field that was absent or blank in a stored record.
pub const UNKNOWN: &str = "???";

/// One spreadsheet or cache row, cells in column order.
pub type Row = Vec<String>;

/// The canonical field set, in canonical column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookField {
    Asin,
    Title,
    Authors,
    Duration,
    PurchaseDate,
}

impl BookField {
    pub const ALL: [BookField; 5] = [
        BookField::Asin,
        BookField::Title,
        BookField::Authors,
        BookField::Duration,
        BookField::PurchaseDate,
    ];

    /// Column name used in the cache header and expected in the sheet header.
    pub fn name(self) -> &'static str {
        match self {
            BookField::Asin => "ASIN",
            BookField::Title => "TITLE",
            BookField::Authors => "AUTHORS",
            BookField::Duration => "DURATION",
            BookField::PurchaseDate => "PURCHASE_DATE",
        }
    }

    /// Resolve a destination column name to a field.
    ///
    /// Matching ignores surrounding whitespace and ASCII case. The header
    /// printed by earlier versions of the tool (`length_hh:mm`) is accepted
    /// as an alias of `DURATION`.
    pub fn from_column(column: &str) -> Option<BookField> {
        let column = column.trim();
        if column.eq_ignore_ascii_case("length_hh:mm") {
            return Some(BookField::Duration);
        }
        BookField::ALL
            .into_iter()
            .find(|field| field.name().eq_ignore_ascii_case(column))
    }
}

impl fmt::Display for BookField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    asin: String,
    title: String,
    authors: String,
    duration: String,
    purchase_date: String,
}

impl Book {
    pub fn new(
        asin: impl Into<String>,
        title: impl Into<String>,
        authors: impl Into<String>,
        duration: impl Into<String>,
        purchase_date: impl Into<String>,
    ) -> Self {
        Self {
            asin: asin.into(),
            title: title.into(),
            authors: authors.into(),
            duration: duration.into(),
            purchase_date: purchase_date.into(),
        }
    }

    /// Rebuild a book from a stored field map (cache line, sheet row).
    ///
    /// Fields absent from the map become [`UNKNOWN`] and are reported with a
    /// warning. A field that is present but empty keeps its empty value, as
    /// the normalizer legitimately produces empty authors and dates. Returns
    /// `None` only when the ASIN itself is absent or blank, since such a
    /// record cannot be keyed.
    pub fn from_record(record: &HashMap<BookField, String>) -> Option<Book> {
        Self::assemble(record, |asin, field| {
            warn!(asin = %asin, field = field.name(), "Missing field in stored record");
        })
    }

    /// As [`Book::from_record`], handing each absent field to `on_missing`
    /// instead of logging it.
    pub(crate) fn assemble(
        record: &HashMap<BookField, String>,
        mut on_missing: impl FnMut(&str, BookField),
    ) -> Option<Book> {
        let asin = record.get(&BookField::Asin).map(|v| v.trim())?;
        if asin.is_empty() {
            return None;
        }

        let mut value = |field: BookField| -> String {
            match record.get(&field) {
                Some(v) => v.clone(),
                None => {
                    on_missing(asin, field);
                    UNKNOWN.to_string()
                }
            }
        };

        Some(Book {
            asin: asin.to_string(),
            title: value(BookField::Title),
            authors: value(BookField::Authors),
            duration: value(BookField::Duration),
            purchase_date: value(BookField::PurchaseDate),
        })
    }

    /// Canonical fields other than ASIN that `columns` does not provide.
    pub(crate) fn missing_fields(columns: &[Option<BookField>]) -> Vec<BookField> {
        BookField::ALL
            .into_iter()
            .filter(|field| *field != BookField::Asin && !columns.contains(&Some(*field)))
            .collect()
    }

    pub fn asin(&self) -> &str {
        &self.asin
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn authors(&self) -> &str {
        &self.authors
    }

    pub fn duration(&self) -> &str {
        &self.duration
    }

    pub fn purchase_date(&self) -> &str {
        &self.purchase_date
    }

    pub fn field(&self, field: BookField) -> &str {
        match field {
            BookField::Asin => &self.asin,
            BookField::Title => &self.title,
            BookField::Authors => &self.authors,
            BookField::Duration => &self.duration,
            BookField::PurchaseDate => &self.purchase_date,
        }
    }

    /// All fields in canonical order.
    pub fn to_row(&self) -> Row {
        BookField::ALL
            .iter()
            .map(|f| self.field(*f).to_string())
            .collect()
    }
}

/// Books keyed by ASIN, iterated in insertion order.
///
/// Inserting a book whose ASIN is already present replaces the stored
/// record but keeps its original position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Library {
    books: Vec<Book>,
    index: HashMap<String, usize>,
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the replaced book if the ASIN was already present.
    pub fn insert(&mut self, book: Book) -> Option<Book> {
        match self.index.get(book.asin()) {
            Some(&pos) => Some(std::mem::replace(&mut self.books[pos], book)),
            None => {
                self.index.insert(book.asin().to_string(), self.books.len());
                self.books.push(book);
                None
            }
        }
    }

    pub fn get(&self, asin: &str) -> Option<&Book> {
        self.index.get(asin).map(|&pos| &self.books[pos])
    }

    pub fn contains(&self, asin: &str) -> bool {
        self.index.contains_key(asin)
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Book> {
        self.books.iter()
    }
}

impl FromIterator<Book> for Library {
    fn from_iter<I: IntoIterator<Item = Book>>(iter: I) -> Self {
        let mut library = Library::new();
        for book in iter {
            library.insert(book);
        }
        library
    }
}

impl<'a> IntoIterator for &'a Library {
    type Item = &'a Book;
    type IntoIter = std::slice::Iter<'a, Book>;

    fn into_iter(self) -> Self::IntoIter {
        self.books.iter()
    }
}
