//! Diagnostic views over raw library items.
//!
//! Used to find out which fields the API returns and what they contain
//! before deciding what to export. Every function returns the lines to
//! print; printing is left to the caller.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

use crate::raw::RawItem;

/// Each item as one JSON line.
pub fn raw_lines(items: &[RawItem]) -> Result<Vec<String>, serde_json::Error> {
    items.iter().map(RawItem::to_json_line).collect()
}

/// `name (count)` for every field name, counting items where it is non-null.
pub fn field_names(items: &[RawItem]) -> Vec<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for item in items {
        for name in item.field_names() {
            let entry = counts.entry(name).or_insert(0);
            if item.field(name).is_some() {
                *entry += 1;
            }
        }
    }
    counts
        .into_iter()
        .map(|(name, count)| format!("{name} ({count})"))
        .collect()
}

/// `value (count)` for each distinct rendered value of `field`, most
/// frequent first.
pub fn field_values(items: &[RawItem], field: &str) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for value in items.iter().filter_map(|item| item.field(field)) {
        let rendered = render_value(value);
        if !rendered.is_empty() {
            *counts.entry(rendered).or_insert(0) += 1;
        }
    }
    let mut counts: Vec<(String, usize)> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
        .into_iter()
        .map(|(value, count)| format!("{value} ({count})"))
        .collect()
}

/// A `|`-joined table of the chosen fields, header first.
///
/// With `asin` set only the matching item is listed.
pub fn select_fields(items: &[RawItem], fields: &[String], asin: Option<&str>) -> Vec<String> {
    let mut lines = vec![fields.join("|")];
    lines.extend(
        items
            .iter()
            .filter(|item| asin.map_or(true, |wanted| item.asin() == Some(wanted)))
            .map(|item| {
                fields
                    .iter()
                    .map(|f| item.field(f).map(render_value).unwrap_or_default())
                    .collect::<Vec<_>>()
                    .join("|")
            }),
    );
    lines
}

/// Flatten a JSON value into a single display string.
///
/// Contributor-like objects show their `name`, series-like objects their
/// `title`, and category ladders their rungs joined with `" / "`.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(_) | Value::Number(_) => value.to_string(),
        Value::Array(values) => values
            .iter()
            .map(render_value)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(map) => {
            if let Some(Value::Array(rungs)) = map.get("ladder") {
                return rungs
                    .iter()
                    .map(render_value)
                    .collect::<Vec<_>>()
                    .join(" / ");
            }
            ["name", "title"]
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_str))
                .map(str::to_string)
                .unwrap_or_else(|| value.to_string())
        }
    }
}
