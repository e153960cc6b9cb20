//! Local mirrors of the last successful fetch.
//!
//! Two files live under the configured root directory:
//! - the book cache, a `|`-delimited text file with the header
//!   `ASIN|TITLE|AUTHORS|DURATION|PURCHASE_DATE` (external auditing tools
//!   read this, so the header and delimiter are fixed);
//! - the raw cache, one JSON object per line per library item, used to
//!   replay or inspect a library without calling the API.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::book::{Book, BookField, Library};
use crate::error::CacheError;
use crate::raw::RawItem;

pub const DELIMITER: char = '|';

/// The `|`-delimited book cache.
#[derive(Debug, Clone)]
pub struct CacheStore {
    path: PathBuf,
}

impl CacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Header plus one line per book, each terminated by a newline.
    pub fn render<'a>(books: impl IntoIterator<Item = &'a Book>) -> String {
        let header: Vec<&str> = BookField::ALL.iter().map(|f| f.name()).collect();
        let mut text = header.join("|");
        text.push('\n');
        for book in books {
            text.push_str(&book.to_row().join("|"));
            text.push('\n');
        }
        text
    }

    /// Overwrite the cache with `books`, returning the number of bytes written.
    pub fn save<'a>(&self, books: impl IntoIterator<Item = &'a Book>) -> Result<usize, CacheError> {
        ensure_parent_dir(&self.path)?;
        let text = Self::render(books);
        fs::write(&self.path, text.as_bytes()).map_err(|e| CacheError::io(&self.path, e))?;
        info!(path = %self.path.display(), bytes = text.len(), "Saved book cache");
        Ok(text.len())
    }

    /// Read the cache back into a library keyed by ASIN.
    ///
    /// Records with a blank ASIN are skipped silently. Lines whose column
    /// count does not match the header are skipped with a warning. A field
    /// with no header column is read as [`crate::UNKNOWN`] and warned about
    /// once.
    pub fn load(&self) -> Result<Library, CacheError> {
        let file = File::open(&self.path).map_err(|e| CacheError::io(&self.path, e))?;
        let mut lines = BufReader::new(file).lines();

        let header = match lines.next() {
            Some(line) => line.map_err(|e| CacheError::io(&self.path, e))?,
            None => {
                debug!(path = %self.path.display(), "Book cache is empty");
                return Ok(Library::new());
            }
        };
        let columns: Vec<Option<BookField>> = header
            .split(DELIMITER)
            .map(BookField::from_column)
            .collect();
        if !columns.contains(&Some(BookField::Asin)) {
            return Err(CacheError::Header {
                path: self.path.clone(),
                header,
            });
        }

        for field in Book::missing_fields(&columns) {
            warn!(
                path = %self.path.display(),
                field = field.name(),
                "Book cache has no column for field; using the unknown marker"
            );
        }

        let mut library = Library::new();
        for (number, line) in lines.enumerate() {
            let line = line.map_err(|e| CacheError::io(&self.path, e))?;
            if line.is_empty() {
                continue;
            }
            let cells: Vec<&str> = line.split(DELIMITER).collect();
            if cells.len() != columns.len() {
                warn!(
                    path = %self.path.display(),
                    line = number + 2,
                    expected = columns.len(),
                    found = cells.len(),
                    "Skipping malformed book cache line"
                );
                continue;
            }
            let record: HashMap<BookField, String> = columns
                .iter()
                .zip(cells)
                .filter_map(|(field, cell)| field.map(|f| (f, cell.to_string())))
                .collect();
            // Absent columns were reported once above.
            if let Some(book) = Book::assemble(&record, |_, _| {}) {
                library.insert(book);
            }
        }

        info!(path = %self.path.display(), books = library.len(), "Loaded book cache");
        Ok(library)
    }
}

/// The JSON-lines raw item cache.
///
/// Pages of a fetch in progress go to a staging file next to the cache
/// (`<name>.partial`). [`RawCache::commit`] moves it over the cache once the
/// fetch has finished, so [`RawCache::load`] only ever sees a complete run.
#[derive(Debug, Clone)]
pub struct RawCache {
    path: PathBuf,
    staging: PathBuf,
}

impl RawCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut staging = path.clone().into_os_string();
        staging.push(".partial");
        Self {
            path,
            staging: PathBuf::from(staging),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn staging_path(&self) -> &Path {
        &self.staging
    }

    /// Start a fresh staging file, discarding pages of an unfinished run.
    pub fn begin(&self) -> Result<(), CacheError> {
        ensure_parent_dir(&self.staging)?;
        File::create(&self.staging).map_err(|e| CacheError::io(&self.staging, e))?;
        debug!(path = %self.staging.display(), "Started raw cache staging file");
        Ok(())
    }

    pub fn append_page(&self, items: &[RawItem]) -> Result<(), CacheError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.staging)
            .map_err(|e| CacheError::io(&self.staging, e))?;
        let mut buf = String::new();
        for item in items {
            let line = item.to_json_line().map_err(|source| CacheError::Json {
                path: self.staging.clone(),
                line: 0,
                source,
            })?;
            buf.push_str(&line);
            buf.push('\n');
        }
        file.write_all(buf.as_bytes())
            .map_err(|e| CacheError::io(&self.staging, e))?;
        debug!(path = %self.staging.display(), items = items.len(), "Appended page to raw cache staging file");
        Ok(())
    }

    /// Replace the cache with the staged pages of a finished fetch.
    pub fn commit(&self) -> Result<(), CacheError> {
        fs::rename(&self.staging, &self.path).map_err(|e| CacheError::io(&self.staging, e))?;
        info!(path = %self.path.display(), "Committed raw cache");
        Ok(())
    }

    /// Items of the last committed fetch, in file order.
    pub fn load(&self) -> Result<Vec<RawItem>, CacheError> {
        if self.staging.exists() {
            warn!(
                path = %self.staging.display(),
                "Ignoring pages of an unfinished fetch; using the last complete raw cache"
            );
        }
        let file = File::open(&self.path).map_err(|e| CacheError::io(&self.path, e))?;
        let mut items = Vec::new();
        for (number, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| CacheError::io(&self.path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            let item: RawItem = serde_json::from_str(&line).map_err(|source| CacheError::Json {
                path: self.path.clone(),
                line: number + 1,
                source,
            })?;
            items.push(item);
        }
        info!(path = %self.path.display(), items = items.len(), "Loaded raw cache");
        Ok(items)
    }
}

fn ensure_parent_dir(path: &Path) -> Result<(), CacheError> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() && !dir.exists() => {
            fs::create_dir_all(dir).map_err(|e| CacheError::io(dir, e))?;
            debug!(path = %dir.display(), "Created cache directory");
            Ok(())
        }
        _ => Ok(()),
    }
}
