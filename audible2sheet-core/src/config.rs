use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::cache::{CacheStore, RawCache};
use crate::fetch::FetchOptions;
use crate::normalize::FilterConfig;

pub const BOOK_CACHE_FILE: &str = "library.txt";
pub const RAW_CACHE_FILE: &str = "library_raw.jsonl";

/// Everything the core pipeline needs for a run, passed in explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the book cache and the raw cache.
    pub root_dir: PathBuf,
    #[serde(default)]
    pub fetch: FetchOptions,
    #[serde(default)]
    pub filters: FilterConfig,
}

impl Config {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            fetch: FetchOptions::default(),
            filters: FilterConfig::default(),
        }
    }

    pub fn book_cache(&self) -> CacheStore {
        CacheStore::new(self.root_dir.join(BOOK_CACHE_FILE))
    }

    pub fn raw_cache(&self) -> RawCache {
        RawCache::new(self.root_dir.join(RAW_CACHE_FILE))
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn trace_loaded(&self) {
        info!(
            root_dir = %self.root_dir.display(),
            page_size = self.fetch.page_size,
            max_pages = self.fetch.max_pages,
            omitted_content_types = self.filters.omit_content_types.len(),
            omitted_asins = self.filters.omit_asins.len(),
            min_duration_minutes = self.filters.min_duration_minutes,
            "Loaded Config"
        );
        debug!(?self, "Config loaded (full debug)");
    }
}
