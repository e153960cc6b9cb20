//! Typed view over one library item as returned by the remote API.
//!
//! The source hands back loosely shaped JSON objects. [`RawItem`] keeps the
//! object verbatim (so it can be replayed from the raw cache) and exposes
//! named optional accessors for the handful of fields the pipeline reads.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One entry of an item's `authors` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributor {
    pub name: String,
    #[serde(default)]
    pub asin: Option<String>,
}

impl Contributor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            asin: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawItem(Map<String, Value>);

impl RawItem {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Wraps a JSON value; anything other than an object yields `None`.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// Raw access to any field; JSON `null` counts as absent.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.0.get(name).filter(|v| !v.is_null())
    }

    /// Every key present on the item, including null-valued ones.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    fn str_field(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(Value::as_str)
    }

    pub fn asin(&self) -> Option<&str> {
        self.str_field("asin")
    }

    pub fn title(&self) -> Option<&str> {
        self.str_field("title")
    }

    pub fn subtitle(&self) -> Option<&str> {
        self.str_field("subtitle")
    }

    pub fn content_type(&self) -> Option<&str> {
        self.str_field("content_type")
    }

    pub fn purchase_date(&self) -> Option<&str> {
        self.str_field("purchase_date")
    }

    /// Runtime in minutes. Accepts numeric strings as some marketplaces
    /// send them that way.
    pub fn runtime_length_min(&self) -> Option<i64> {
        match self.field("runtime_length_min")? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// The `authors` list. Entries without a string `name` are dropped.
    pub fn authors(&self) -> Option<Vec<Contributor>> {
        let list = self.field("authors")?.as_array()?;
        Some(
            list.iter()
                .filter_map(|entry| {
                    let name = entry.get("name")?.as_str()?;
                    let asin = entry
                        .get("asin")
                        .and_then(Value::as_str)
                        .map(str::to_string);
                    Some(Contributor {
                        name: name.to_string(),
                        asin,
                    })
                })
                .collect(),
        )
    }

    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.0)
    }
}
