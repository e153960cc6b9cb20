#![doc = "audible2sheet-core: core logic library for audible2sheet."]

//! This crate holds the book record model, the local caches, the
//! reconciliation engine and the synchronise pipeline. Network clients for
//! the library API and the spreadsheet live in the `audible2sheet` crate and
//! plug in through the traits in [`contract`].

pub mod book;
pub mod cache;
pub mod config;
pub mod contract;
pub mod error;
pub mod fetch;
pub mod inspect;
pub mod normalize;
pub mod raw;
pub mod reconcile;
pub mod synchronise;

pub use book::{Book, BookField, Library, Row, UNKNOWN};
pub use error::{CacheError, DestinationError, FetchError, SyncError};
pub use raw::{Contributor, RawItem};
