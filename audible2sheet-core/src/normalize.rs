//! Turns raw library items into canonical [`Book`] records.
//!
//! Filtering (content type, explicit ASIN list, minimum runtime) and all
//! field derivation live here; nothing downstream reads a [`RawItem`]
//! except the diagnostic dumps in `inspect`.

use std::collections::HashSet;
use std::fmt::Display;

use chrono::{DateTime, FixedOffset, Local, TimeZone};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::book::{Book, UNKNOWN};
use crate::raw::{Contributor, RawItem};

/// Author string used when the source gives no author list at all.
pub const UNKNOWN_AUTHOR: &str = "UNKNOWN AUTHOR";

const FRACTIONAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f%#z";
const WHOLE_SECONDS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%#z";

/// Which items are left out of the book list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub omit_content_types: HashSet<String>,
    pub omit_asins: HashSet<String>,
    /// Items are kept when their runtime is at least this many minutes.
    pub min_duration_minutes: i64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            omit_content_types: ["Speech", "Newspaper / Magazine"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            omit_asins: HashSet::new(),
            min_duration_minutes: 1,
        }
    }
}

/// Normalize one item using the process-local timezone for dates.
pub fn normalize(item: &RawItem, filters: &FilterConfig) -> Option<Book> {
    normalize_in(item, filters, &Local)
}

/// Normalize one item, converting the purchase timestamp into `tz`.
pub fn normalize_in<Tz>(item: &RawItem, filters: &FilterConfig, tz: &Tz) -> Option<Book>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let asin = match item.asin().map(str::trim) {
        Some(asin) if !asin.is_empty() => asin,
        _ => {
            warn!(title = ?item.title(), "Library item without ASIN skipped");
            return None;
        }
    };

    if let Some(content_type) = item.content_type() {
        if filters.omit_content_types.contains(content_type) {
            debug!(asin, content_type, "Omitting item by content type");
            return None;
        }
    }
    if filters.omit_asins.contains(asin) {
        debug!(asin, "Omitting item by explicit ASIN");
        return None;
    }
    let minutes = item.runtime_length_min().unwrap_or(0).max(0);
    if minutes < filters.min_duration_minutes {
        debug!(
            asin,
            minutes,
            threshold = filters.min_duration_minutes,
            "Omitting item below minimum duration"
        );
        return None;
    }

    let title = match item.title() {
        Some(title) => match item.subtitle() {
            Some(subtitle) if !subtitle.is_empty() => format!("{title}: {subtitle}"),
            _ => title.to_string(),
        },
        None => {
            warn!(asin, "Library item without title");
            UNKNOWN.to_string()
        }
    };
    let authors = clean_authors(item.authors().as_deref());
    let duration = format_duration(minutes as u64);
    let purchase_date = convert_utc_to_ccyymmdd_in(item.purchase_date(), tz);

    Some(Book::new(asin, title, authors, duration, purchase_date))
}

/// Keep only true authors, dropping translators, forewords and the like.
///
/// Contributors tagged `Name (translator)` or `Name - foreword` are removed;
/// survivors are joined with `", "`. An empty or missing list yields
/// [`UNKNOWN_AUTHOR`]; a list of only tagged contributors yields `""`.
pub fn clean_authors(contributors: Option<&[Contributor]>) -> String {
    match contributors {
        Some(list) if !list.is_empty() => list
            .iter()
            .map(|c| c.name.as_str())
            .filter(|name| !name.contains(" (") && !name.contains(" - "))
            .collect::<Vec<_>>()
            .join(", "),
        _ => UNKNOWN_AUTHOR.to_string(),
    }
}

/// `123` minutes becomes `02h03m`.
pub fn format_duration(minutes: u64) -> String {
    format!("{:02}h{:02}m", minutes / 60, minutes % 60)
}

/// Convert a UTC timestamp such as `2019-06-30T23:58:29.551Z` into the
/// local calendar date `CCYYMMDD`.
pub fn convert_utc_to_ccyymmdd(utc_time: Option<&str>) -> String {
    convert_utc_to_ccyymmdd_in(utc_time, &Local)
}

pub fn convert_utc_to_ccyymmdd_in<Tz>(utc_time: Option<&str>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let input = utc_time.unwrap_or("");
    let parsed = DateTime::<FixedOffset>::parse_from_str(input, FRACTIONAL_FORMAT)
        .or_else(|_| DateTime::<FixedOffset>::parse_from_str(input, WHOLE_SECONDS_FORMAT));

    match parsed {
        Ok(datetime) => datetime.with_timezone(tz).format("%Y%m%d").to_string(),
        Err(_) => {
            warn!("Unknown date format for: {input}");
            // Best effort: assume the string starts with CCYY-MM-DD.
            let slice = |from: usize, to: usize| input.get(from..to).unwrap_or("");
            [slice(0, 4), slice(5, 7), slice(8, 10)].concat()
        }
    }
}
