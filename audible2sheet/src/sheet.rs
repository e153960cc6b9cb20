//! # Google Sheets destination
//!
//! [`SheetClient`] implements [`Destination`] on top of the Sheets v4 REST API
//! with a bearer token. The header row is read but never written; new rows are
//! inserted as whole sheet rows and then filled with `USER_ENTERED` values so a
//! leading `'` keeps a cell as text.
//!
//! Request and response shaping lives in free functions so it can be tested
//! without a network.

use async_trait::async_trait;
use audible2sheet_core::contract::Destination;
use audible2sheet_core::{DestinationError, Row};
use reqwest::Url;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

pub const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Which sheet the books go to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SheetConfig {
    pub spreadsheet_id: String,
    /// Tab name, used in A1 ranges.
    pub sheet_name: String,
    /// Numeric tab id, used by structural requests.
    #[serde(default)]
    pub sheet_id: i64,
}

pub struct SheetClient {
    http: reqwest::Client,
    config: SheetConfig,
    token: String,
    base_url: String,
}

impl SheetClient {
    pub fn new(config: SheetConfig, token: impl Into<String>) -> Result<Self, DestinationError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| DestinationError::Request(e.to_string()))?;
        info!(
            spreadsheet_id = %config.spreadsheet_id,
            sheet = %config.sheet_name,
            "Initialized SheetClient"
        );
        Ok(Self {
            http,
            config,
            token: token.into(),
            base_url: SHEETS_API.to_string(),
        })
    }

    fn url(&self, tail: &[&str]) -> Result<Url, DestinationError> {
        spreadsheet_url(&self.base_url, &self.config.spreadsheet_id, tail)
    }

    async fn get_values(&self, range: &str) -> Result<Vec<Row>, DestinationError> {
        let url = self.url(&["values", range])?;
        debug!(%url, "GET sheet values");
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| DestinationError::Request(e.to_string()))?;
        let body = checked_body(response).await?;
        parse_value_range(&body)
    }

    async fn batch_update(&self, request: &Value) -> Result<(), DestinationError> {
        let url = spreadsheet_url(
            &self.base_url,
            &format!("{}:batchUpdate", self.config.spreadsheet_id),
            &[],
        )?;
        debug!(%url, "POST batchUpdate");
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .json(request)
            .send()
            .await
            .map_err(|e| DestinationError::Request(e.to_string()))?;
        checked_body(response).await.map(|_| ())
    }

    async fn put_values(&self, range: &str, rows: &[Row]) -> Result<(), DestinationError> {
        let mut url = self.url(&["values", range])?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED");
        debug!(%url, %range, "PUT values");
        let response = self
            .http
            .put(url)
            .bearer_auth(&self.token)
            .json(&json!({ "range": range, "majorDimension": "ROWS", "values": rows }))
            .send()
            .await
            .map_err(|e| DestinationError::Request(e.to_string()))?;
        checked_body(response).await.map(|_| ())
    }
}

async fn checked_body(response: reqwest::Response) -> Result<String, DestinationError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| DestinationError::Request(e.to_string()))?;
    if status.is_success() {
        Ok(body)
    } else {
        Err(DestinationError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

/// `<base>/<spreadsheet_id>/<tail...>` with each segment percent-encoded.
pub fn spreadsheet_url(
    base_url: &str,
    spreadsheet_id: &str,
    tail: &[&str],
) -> Result<Url, DestinationError> {
    let mut url = Url::parse(base_url).map_err(|e| DestinationError::Request(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| DestinationError::Request(format!("{base_url} cannot be a base URL")))?
        .push(spreadsheet_id)
        .extend(tail);
    Ok(url)
}

/// Sheet name quoted for use in an A1 range.
pub fn quoted_sheet(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}

/// Column letters for a 1-based column number (`1 → A`, `27 → AA`).
pub fn column_letter(mut column: usize) -> String {
    let mut letters = Vec::new();
    while column > 0 {
        let rem = (column - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        column = (column - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// A1 range covering `count` rows of `width` columns starting at 0-based row `at`.
pub fn rows_range(sheet_name: &str, at: usize, count: usize, width: usize) -> String {
    format!(
        "{}!A{}:{}{}",
        quoted_sheet(sheet_name),
        at + 1,
        column_letter(width.max(1)),
        at + count
    )
}

/// The `batchUpdate` body inserting `count` empty rows at 0-based row `at`.
pub fn insert_rows_request(sheet_id: i64, at: usize, count: usize) -> Value {
    json!({
        "requests": [{
            "insertDimension": {
                "range": {
                    "sheetId": sheet_id,
                    "dimension": "ROWS",
                    "startIndex": at,
                    "endIndex": at + count,
                },
                "inheritFromBefore": at > 0,
            }
        }]
    })
}

/// The `batchUpdate` body deleting the rows [`insert_rows_request`] added.
pub fn delete_rows_request(sheet_id: i64, at: usize, count: usize) -> Value {
    json!({
        "requests": [{
            "deleteDimension": {
                "range": {
                    "sheetId": sheet_id,
                    "dimension": "ROWS",
                    "startIndex": at,
                    "endIndex": at + count,
                },
            }
        }]
    })
}

/// The `values` of a ValueRange body; a range with no data has no `values` key.
pub fn parse_value_range(body: &str) -> Result<Vec<Row>, DestinationError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| DestinationError::Decode(e.to_string()))?;
    let rows = match value.get("values") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(rows)) => rows,
        Some(other) => {
            return Err(DestinationError::Decode(format!(
                "`values` is not an array: {other}"
            )))
        }
    };
    rows.iter()
        .map(|row| match row {
            Value::Array(cells) => Ok(cells.iter().map(cell_text).collect()),
            other => Err(DestinationError::Decode(format!("row is not an array: {other}"))),
        })
        .collect()
}

fn cell_text(cell: &Value) -> String {
    match cell {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[async_trait]
impl Destination for SheetClient {
    async fn current_schema(&self) -> Result<Vec<String>, DestinationError> {
        let range = format!("{}!1:1", quoted_sheet(&self.config.sheet_name));
        let mut rows = self.get_values(&range).await?;
        let header = if rows.is_empty() {
            Vec::new()
        } else {
            rows.swap_remove(0)
        };
        info!(columns = header.len(), "Read sheet header");
        Ok(header)
    }

    async fn current_rows(&self) -> Result<Vec<Row>, DestinationError> {
        let rows = self
            .get_values(&quoted_sheet(&self.config.sheet_name))
            .await?;
        let data: Vec<Row> = rows.into_iter().skip(1).collect();
        info!(rows = data.len(), "Read sheet rows");
        Ok(data)
    }

    async fn insert_rows(&self, at_position: usize, rows: Vec<Row>) -> Result<(), DestinationError> {
        if rows.is_empty() {
            return Ok(());
        }
        let count = rows.len();
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);

        self.batch_update(&insert_rows_request(self.config.sheet_id, at_position, count))
            .await?;

        let range = rows_range(&self.config.sheet_name, at_position, count, width);
        if let Err(e) = self.put_values(&range, &rows).await {
            // Blank rows must not stay behind in the sheet.
            let rollback = delete_rows_request(self.config.sheet_id, at_position, count);
            if let Err(rollback_err) = self.batch_update(&rollback).await {
                warn!(
                    at_position,
                    count,
                    error = %rollback_err,
                    "Failed to remove inserted rows; the sheet holds blank rows"
                );
            }
            return Err(e);
        }

        info!(at_position, count, "Inserted rows into sheet");
        Ok(())
    }
}
