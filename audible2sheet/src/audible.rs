//! # Audible library client
//!
//! Implements [`LibrarySource`] against the Audible marketplace API.
//!
//! Connecting is a separate step from configuring: [`AudibleConfig`] only
//! names a locale and a session file, and [`AudibleConfig::connect`] turns it
//! into an [`AudibleClient`] once the persisted session has been checked.
//! The login flow that produces the session file is not handled here.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use audible2sheet_core::contract::LibrarySource;
use audible2sheet_core::{FetchError, RawItem};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info};

pub const DEFAULT_LOCALE: &str = "us";

/// Response groups requested for every library page.
pub const RESPONSE_GROUPS: &str =
    "product_desc,contributors,product_attrs,product_extended_attrs,series,category_ladders";

/// Marketplace top-level domain for a locale code.
pub fn marketplace_tld(locale: &str) -> Option<&'static str> {
    let tld = match locale.trim().to_ascii_lowercase().as_str() {
        "us" => "com",
        "uk" => "co.uk",
        "de" => "de",
        "fr" => "fr",
        "ca" => "ca",
        "au" => "com.au",
        "in" => "in",
        "it" => "it",
        "jp" => "co.jp",
        "es" => "es",
        _ => return None,
    };
    Some(tld)
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("unknown audible locale {0:?}")]
    UnknownLocale(String),

    #[error("could not read session file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("session file {path} is malformed: {message}")]
    Malformed { path: PathBuf, message: String },

    #[error("session in {path} expired at {expired_at}; log in again to refresh it")]
    Expired {
        path: PathBuf,
        expired_at: DateTime<Utc>,
    },

    #[error("could not build HTTP client: {0}")]
    Client(String),
}

/// Where to find the library and the credentials to read it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AudibleConfig {
    pub locale: String,
    pub session_file: PathBuf,
}

/// The parts of a persisted session this client needs.
#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    pub access_token: String,
    /// Expiry as epoch seconds; `None` means the token does not expire.
    #[serde(default)]
    pub expires: Option<f64>,
}

impl Session {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires
            .and_then(|secs| DateTime::from_timestamp(secs.trunc() as i64, 0))
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at() {
            None => true,
            Some(expires_at) => now < expires_at,
        }
    }
}

/// Parse and check a session document read from `path`.
pub fn parse_session(text: &str, path: &Path, now: DateTime<Utc>) -> Result<Session, AuthError> {
    let session: Session = serde_json::from_str(text).map_err(|e| AuthError::Malformed {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    if session.access_token.trim().is_empty() {
        return Err(AuthError::Malformed {
            path: path.to_path_buf(),
            message: "access_token is empty".to_string(),
        });
    }
    if !session.is_valid_at(now) {
        return Err(AuthError::Expired {
            path: path.to_path_buf(),
            expired_at: session.expires_at().unwrap_or(now),
        });
    }
    Ok(session)
}

impl AudibleConfig {
    pub fn connect(&self) -> Result<AudibleClient, AuthError> {
        self.connect_at(Utc::now())
    }

    /// As [`AudibleConfig::connect`], checking expiry against `now`.
    pub fn connect_at(&self, now: DateTime<Utc>) -> Result<AudibleClient, AuthError> {
        let tld = marketplace_tld(&self.locale)
            .ok_or_else(|| AuthError::UnknownLocale(self.locale.clone()))?;
        info!(path = %self.session_file.display(), locale = %self.locale, "Reading audible session");
        let text = std::fs::read_to_string(&self.session_file).map_err(|source| {
            error!(error = %source, path = %self.session_file.display(), "Failed to read session file");
            AuthError::Read {
                path: self.session_file.clone(),
                source,
            }
        })?;
        let session = parse_session(&text, &self.session_file, now).map_err(|e| {
            error!(error = %e, "Audible session rejected");
            e
        })?;
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| AuthError::Client(e.to_string()))?;
        info!(expires_at = ?session.expires_at(), "Audible session accepted");
        Ok(AudibleClient {
            http,
            base_url: format!("https://api.audible.{tld}"),
            access_token: session.access_token,
        })
    }
}

/// An authenticated handle on one marketplace.
pub struct AudibleClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl AudibleClient {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

pub fn library_url(base_url: &str, page: u32, page_size: u32) -> String {
    format!(
        "{base_url}/1.0/library?num_results={page_size}&page={page}&response_groups={RESPONSE_GROUPS}"
    )
}

/// Extract the items of one library response body.
///
/// A body without an `items` array is a decode error; an empty array is the
/// end of the library.
pub fn parse_library_page(page: u32, body: &str) -> Result<Vec<RawItem>, FetchError> {
    let decode = |message: String| FetchError::Decode { page, message };
    let value: Value = serde_json::from_str(body).map_err(|e| decode(e.to_string()))?;
    let items = match value.get("items") {
        Some(Value::Array(items)) => items,
        _ => return Err(decode("response has no `items` array".to_string())),
    };
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            RawItem::from_value(item.clone())
                .ok_or_else(|| decode(format!("item {i} is not a JSON object")))
        })
        .collect()
}

#[async_trait]
impl LibrarySource for AudibleClient {
    async fn fetch_page(&self, page: u32, page_size: u32) -> Result<Vec<RawItem>, FetchError> {
        let url = library_url(&self.base_url, page, page_size);
        debug!(%url, "GET library page");
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .header("client-id", "0")
            .send()
            .await
            .map_err(|e| FetchError::Request {
                page,
                message: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| FetchError::Request {
            page,
            message: e.to_string(),
        })?;
        if !status.is_success() {
            return Err(FetchError::Status {
                page,
                status: status.as_u16(),
                body,
            });
        }
        let items = parse_library_page(page, &body)?;
        info!(page, items = items.len(), "Fetched library page");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn locales_map_to_marketplaces() {
        assert_eq!(marketplace_tld("us"), Some("com"));
        assert_eq!(marketplace_tld("UK"), Some("co.uk"));
        assert_eq!(marketplace_tld("jp"), Some("co.jp"));
        assert_eq!(marketplace_tld("au"), Some("com.au"));
        assert_eq!(marketplace_tld("xx"), None);
    }

    #[test]
    fn library_url_carries_paging_and_groups() {
        let url = library_url("https://api.audible.com", 3, 50);
        assert!(url.starts_with("https://api.audible.com/1.0/library?"));
        assert!(url.contains("num_results=50"));
        assert!(url.contains("page=3"));
        assert!(url.ends_with("category_ladders"));
    }

    #[test]
    fn session_without_expiry_is_valid() {
        let now = Utc::now();
        let session =
            parse_session(r#"{"access_token": "tok", "expires": null}"#, Path::new("s"), now)
                .unwrap();
        assert_eq!(session.access_token, "tok");
    }

    #[test]
    fn expired_session_is_rejected() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let before = now.timestamp() - 60;
        let text = format!(r#"{{"access_token": "tok", "expires": {before}.5}}"#);
        let err = parse_session(&text, Path::new("s"), now).unwrap_err();
        assert!(matches!(err, AuthError::Expired { .. }), "got {err:?}");

        let later = format!(r#"{{"access_token": "tok", "expires": {}}}"#, now.timestamp() + 60);
        assert!(parse_session(&later, Path::new("s"), now).is_ok());
    }

    #[test]
    fn malformed_sessions_are_rejected() {
        let now = Utc::now();
        for text in ["not json", r#"{"expires": null}"#, r#"{"access_token": " "}"#] {
            let err = parse_session(text, Path::new("s"), now).unwrap_err();
            assert!(matches!(err, AuthError::Malformed { .. }), "{text}: {err:?}");
        }
    }

    #[test]
    fn connect_builds_a_client_for_the_marketplace() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"access_token": "tok", "expires": null}}"#).unwrap();
        let config = AudibleConfig {
            locale: "de".into(),
            session_file: file.path().to_path_buf(),
        };
        let client = config.connect().unwrap();
        assert_eq!(client.base_url(), "https://api.audible.de");
    }

    #[test]
    fn connect_fails_without_a_session_file() {
        let config = AudibleConfig {
            locale: "us".into(),
            session_file: PathBuf::from("/definitely/not/here.json"),
        };
        assert!(matches!(config.connect(), Err(AuthError::Read { .. })));
    }

    #[test]
    fn library_pages_are_decoded() {
        let items = parse_library_page(
            1,
            r#"{"items": [{"asin": "A"}, {"asin": "B"}], "response_groups": ["always-returned"]}"#,
        )
        .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].asin(), Some("B"));

        assert!(parse_library_page(2, r#"{"items": []}"#).unwrap().is_empty());
        assert!(matches!(
            parse_library_page(3, r#"{"message": "oops"}"#),
            Err(FetchError::Decode { page: 3, .. })
        ));
        assert!(matches!(
            parse_library_page(4, r#"{"items": [1]}"#),
            Err(FetchError::Decode { page: 4, .. })
        ));
    }
}
