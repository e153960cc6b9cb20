use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::cache::RawCache;
use crate::contract::LibrarySource;
use crate::error::FetchError;
use crate::raw::RawItem;

/// Paging parameters for a library fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchOptions {
    pub page_size: u32,
    /// Upper bound on requested pages; the source gives no total count.
    pub max_pages: u32,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            page_size: 50,
            max_pages: 1000,
        }
    }
}

/// Pull every page from `source` until one comes back empty.
///
/// Each non-empty page is staged into `raw_cache` as soon as it arrives and
/// the cache is committed once the fetch ends. A failed request aborts the
/// whole fetch and leaves the previously committed cache in place: a partial
/// library must not be mistaken for the end of the library.
pub async fn fetch_library<S>(
    source: &S,
    options: &FetchOptions,
    raw_cache: Option<&RawCache>,
) -> Result<Vec<RawItem>, FetchError>
where
    S: LibrarySource + ?Sized,
{
    if let Some(cache) = raw_cache {
        cache.begin()?;
    }

    let mut items = Vec::new();
    for page in 1..=options.max_pages {
        info!(page, page_size = options.page_size, "Requesting library page");
        let batch = match source.fetch_page(page, options.page_size).await {
            Ok(batch) => batch,
            Err(e) => {
                error!(page, error = %e, "Library page request failed");
                return Err(e);
            }
        };
        if batch.is_empty() {
            info!(page, total = items.len(), "Reached end of library");
            if let Some(cache) = raw_cache {
                cache.commit()?;
            }
            return Ok(items);
        }
        if let Some(cache) = raw_cache {
            cache.append_page(&batch)?;
        }
        items.extend(batch);
    }

    warn!(
        max_pages = options.max_pages,
        total = items.len(),
        "Stopped at page limit before an empty page; library may be truncated"
    );
    if let Some(cache) = raw_cache {
        cache.commit()?;
    }
    Ok(items)
}
