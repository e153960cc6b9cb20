//! # contract: the two external collaborators of the pipeline
//!
//! - [`LibrarySource`]: where raw library items come from, one page at a time.
//! - [`Destination`]: the spreadsheet the books are appended to.
//!
//! Both are async traits so the CLI crate can back them with HTTP clients.
//! They are annotated for `mockall`, and the generated `MockLibrarySource`
//! and `MockDestination` are exported under the `test-export-mocks` feature
//! for downstream tests.

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::book::Row;
use crate::error::{DestinationError, FetchError};
use crate::raw::RawItem;

/// Paged access to a user's library.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait LibrarySource: Send + Sync {
    /// Fetch page `page` (1-based) of at most `page_size` items.
    ///
    /// An empty vector means the library has no more items. A request that
    /// fails must be reported as an error, never as an empty page.
    async fn fetch_page(&self, page: u32, page_size: u32) -> Result<Vec<RawItem>, FetchError>;
}

/// A row store addressed by sheet position, row 0 being the header.
///
/// The pipeline only reads the header and the rows below it and inserts new
/// rows; it never rewrites the header or existing rows.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Destination: Send + Sync {
    /// Column names of the header row, left to right.
    async fn current_schema(&self) -> Result<Vec<String>, DestinationError>;

    /// Every row below the header, top to bottom.
    async fn current_rows(&self) -> Result<Vec<Row>, DestinationError>;

    /// Insert `rows` so the first one lands at 0-based row `at_position`.
    async fn insert_rows(&self, at_position: usize, rows: Vec<Row>) -> Result<(), DestinationError>;
}
