//! High-level pipeline: fetch → normalize → cache → reconcile → append.
//!
//! This module ties the pieces together for one run:
//!   - [`refresh_library`] pulls the live library through a [`LibrarySource`],
//!     mirrors the raw pages, normalizes them and rewrites the book cache
//!   - [`library_from_raw_cache`] rebuilds the same library offline from the raw mirror
//!   - [`synchronise`] appends the books missing from a [`Destination`]
//!
//! # Responsibilities
//! - Strictly sequential: the fetch finishes before reconciliation starts,
//!   and reconciliation finishes before anything is written
//! - Fail-fast: any destination error aborts the run; nothing is recorded
//!   as synced, so the next run recomputes the same rows
//! - Never touches the destination header or existing rows
//!
//! # Navigation
//! - Main entrypoints: [`refresh_library`], [`synchronise`]
//! - Output: [`SynchroniseReport`]

use tracing::{error, info};

use crate::book::Library;
use crate::cache::{CacheStore, RawCache};
use crate::contract::{Destination, LibrarySource};
use crate::error::SyncError;
use crate::fetch::{fetch_library, FetchOptions};
use crate::normalize::{normalize, FilterConfig};
use crate::raw::RawItem;
use crate::reconcile::{diff, key_column, library_from_rows};

/// Outcome of one [`synchronise`] run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynchroniseReport {
    /// Books in the fetched library.
    pub fetched: usize,
    /// Data rows already in the destination before the run.
    pub existing: usize,
    /// Rows appended by this run.
    pub appended: usize,
    /// Sheet row index of the first appended row, if any were appended.
    pub position: Option<usize>,
}

/// Normalize raw items into a library, applying `filters`.
pub fn build_library(items: &[RawItem], filters: &FilterConfig) -> Library {
    let library: Library = items.iter().filter_map(|item| normalize(item, filters)).collect();
    info!(
        items = items.len(),
        books = library.len(),
        "Normalized library items"
    );
    library
}

/// Fetch the live library, refresh both caches and return the books.
pub async fn refresh_library<S>(
    source: &S,
    options: &FetchOptions,
    filters: &FilterConfig,
    raw_cache: &RawCache,
    book_cache: &CacheStore,
) -> Result<Library, SyncError>
where
    S: LibrarySource + ?Sized,
{
    info!("[SYNC] Fetching library from source");
    let items = fetch_library(source, options, Some(raw_cache)).await?;
    let library = build_library(&items, filters);
    book_cache.save(&library)?;
    Ok(library)
}

/// Rebuild the library from the raw cache without calling the source.
pub fn library_from_raw_cache(
    raw_cache: &RawCache,
    filters: &FilterConfig,
) -> Result<Library, SyncError> {
    info!(path = %raw_cache.path().display(), "[SYNC] Using cached raw library");
    let items = raw_cache.load()?;
    Ok(build_library(&items, filters))
}

/// Append the books of `library` that `destination` does not have yet.
pub async fn synchronise<D>(library: &Library, destination: &D) -> Result<SynchroniseReport, SyncError>
where
    D: Destination + ?Sized,
{
    info!(books = library.len(), "[SYNC] Reading destination");
    let (schema, rows) =
        futures::try_join!(destination.current_schema(), destination.current_rows()).map_err(
            |e| {
                error!(error = %e, "[SYNC][ERROR] Failed to read destination");
                e
            },
        )?;

    if key_column(&schema).is_none() {
        error!(?schema, "[SYNC][ERROR] Destination header has no ASIN column");
        return Err(SyncError::MissingKeyColumn { schema });
    }

    let existing = library_from_rows(&schema, &rows);
    let new_rows = diff(library, &existing, &schema);
    info!(
        fetched = library.len(),
        existing_rows = rows.len(),
        existing_books = existing.len(),
        new = new_rows.len(),
        "[SYNC] Reconciled library against destination"
    );

    if new_rows.is_empty() {
        info!("[SYNC] Destination already up to date");
        return Ok(SynchroniseReport {
            fetched: library.len(),
            existing: rows.len(),
            appended: 0,
            position: None,
        });
    }

    // Row 0 is the header, so the first free row is just past the data.
    let position = rows.len() + 1;
    let appended = new_rows.len();
    if let Err(e) = destination.insert_rows(position, new_rows).await {
        error!(error = %e, position, rows = appended, "[SYNC][ERROR] Failed to append rows");
        return Err(e.into());
    }
    info!(position, rows = appended, "[SYNC] Appended new books");

    Ok(SynchroniseReport {
        fetched: library.len(),
        existing: rows.len(),
        appended,
        position: Some(position),
    })
}
