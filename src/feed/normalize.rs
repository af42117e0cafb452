//! Item normalization for newswire.
//!
//! Pure functions turning one raw parsed feed entry into a canonical
//! [`NewFeedItem`]. Nothing here touches the network or the database.

use chrono::{DateTime, Utc};
use feed_rs::model::Entry;
use serde_json::Value;

use crate::error::NewswireError;
use crate::feed::types::NewFeedItem;
use crate::Result;

/// The shapes sources use to encode an item's category list.
///
/// Sources disagree on the wire shape: some send a plain string array,
/// some a single string that is itself a JSON-encoded array, some an
/// array of structured objects carrying the label in a nested field.
/// Classifying first keeps the conversion exhaustive per variant instead
/// of a chain of runtime type checks.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCategories {
    /// An array whose elements are all plain strings.
    StringArray(Vec<String>),
    /// A single string, possibly JSON-encoding an array.
    JsonEncodedString(String),
    /// An array with at least one non-string element.
    ObjectArray(Vec<Value>),
}

/// Classify a raw category value into one of the known encodings.
///
/// Returns `None` for shapes that carry no categories (null, objects,
/// numbers); an empty array classifies as an empty `StringArray`.
pub fn classify_categories(raw: &Value) -> Option<RawCategories> {
    match raw {
        Value::String(s) => Some(RawCategories::JsonEncodedString(s.clone())),
        Value::Array(items) => {
            if items.iter().all(|v| v.is_string()) {
                Some(RawCategories::StringArray(
                    items
                        .iter()
                        .filter_map(|v| v.as_str().map(str::to_string))
                        .collect(),
                ))
            } else {
                Some(RawCategories::ObjectArray(items.clone()))
            }
        }
        _ => None,
    }
}

/// Normalize a raw category value to a plain list of labels.
///
/// Output is always a list; an absent or unusable value yields an empty one.
pub fn normalize_categories(raw: &Value) -> Vec<String> {
    match classify_categories(raw) {
        None => Vec::new(),
        Some(RawCategories::StringArray(labels)) => labels,
        Some(RawCategories::JsonEncodedString(s)) => from_encoded_string(&s),
        Some(RawCategories::ObjectArray(items)) => from_mixed_array(&items),
    }
}

/// Convert the JSON-encoded-string variant.
///
/// If the string parses to a JSON array, that array is used; otherwise
/// the original string becomes a single-element list.
fn from_encoded_string(s: &str) -> Vec<String> {
    match serde_json::from_str::<Value>(s) {
        Ok(Value::Array(items)) => from_mixed_array(&items),
        _ => vec![s.to_string()],
    }
}

/// Convert an array whose elements may be strings or structured objects.
///
/// Objects contribute their `label` field, falling back to a string
/// serialization of the whole element.
fn from_mixed_array(items: &[Value]) -> Vec<String> {
    items
        .iter()
        .map(|v| match v {
            Value::String(s) => s.clone(),
            Value::Object(map) => match map.get("label").and_then(Value::as_str) {
                Some(label) => label.to_string(),
                None => v.to_string(),
            },
            other => other.to_string(),
        })
        .collect()
}

/// Derive the stable external identifier for an entry.
///
/// The source-provided guid wins when present and non-empty; otherwise
/// the item's link. Stable across repeated fetches of the same document.
pub fn derive_external_id(guid: &str, link: &str) -> String {
    if guid.trim().is_empty() {
        link.to_string()
    } else {
        guid.to_string()
    }
}

/// Build the raw category value for a parsed entry.
///
/// A lone unlabeled category is passed through as a bare string so that
/// sources which stuff a JSON-encoded array into a single category text
/// still decode; everything else becomes an array of strings or
/// labeled objects.
fn categories_value(entry: &Entry) -> Value {
    if entry.categories.len() == 1 && entry.categories[0].label.is_none() {
        return Value::String(entry.categories[0].term.clone());
    }
    Value::Array(
        entry
            .categories
            .iter()
            .map(|c| match &c.label {
                Some(label) => serde_json::json!({ "label": label, "term": c.term }),
                None => Value::String(c.term.clone()),
            })
            .collect(),
    )
}

/// Normalize one parsed entry into a canonical item.
///
/// `now` supplies the publication fallback for entries without a date.
/// Errors mark the entry malformed; callers skip it and keep the batch.
pub fn normalize_entry(source: &str, entry: &Entry, now: DateTime<Utc>) -> Result<NewFeedItem> {
    let link = entry
        .links
        .first()
        .map(|l| l.href.clone())
        .filter(|href| !href.trim().is_empty())
        .ok_or_else(|| NewswireError::Validation(format!("entry {:?} has no link", entry.id)))?;

    let title = entry
        .title
        .as_ref()
        .map(|t| t.content.clone())
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| NewswireError::Validation(format!("entry {:?} has no title", entry.id)))?;

    let external_id = derive_external_id(&entry.id, &link);
    let published_at = entry.published.or(entry.updated).unwrap_or(now);

    let mut item = NewFeedItem::new(source, external_id, title, link, published_at);

    let summary = entry
        .summary
        .as_ref()
        .map(|t| t.content.clone())
        .or_else(|| entry.content.as_ref().and_then(|c| c.body.clone()));
    if let Some(text) = summary {
        item = item.with_summary(strip_html(&text));
    }

    if let Some(author) = entry
        .authors
        .first()
        .map(|a| a.name.clone())
        .filter(|name| !name.trim().is_empty())
    {
        item = item.with_author(author);
    }

    Ok(item.with_categories(normalize_categories(&categories_value(entry))))
}

/// Strip HTML tags from text.
pub fn strip_html(html: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut in_tag = false;
    let mut in_entity = false;
    let mut entity = String::new();

    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            '&' if !in_tag => {
                in_entity = true;
                entity.clear();
            }
            ';' if in_entity => {
                in_entity = false;
                // Decode common HTML entities
                match entity.as_str() {
                    "amp" => result.push('&'),
                    "lt" => result.push('<'),
                    "gt" => result.push('>'),
                    "quot" => result.push('"'),
                    "apos" => result.push('\''),
                    "nbsp" => result.push(' '),
                    _ if entity.starts_with('#') => {
                        if let Some(code) = parse_numeric_entity(&entity) {
                            if let Some(c) = char::from_u32(code) {
                                result.push(c);
                            }
                        }
                    }
                    _ => {
                        // Unknown entity, keep as-is
                        result.push('&');
                        result.push_str(&entity);
                        result.push(';');
                    }
                }
            }
            _ if in_entity => {
                entity.push(ch);
            }
            _ if !in_tag => {
                result.push(ch);
            }
            _ => {}
        }
    }

    let result: String = result.split_whitespace().collect::<Vec<&str>>().join(" ");

    result.trim().to_string()
}

/// Parse a numeric HTML entity (e.g., "#123" or "#x7B").
fn parse_numeric_entity(entity: &str) -> Option<u32> {
    if entity.starts_with("#x") || entity.starts_with("#X") {
        u32::from_str_radix(&entity[2..], 16).ok()
    } else if entity.starts_with('#') {
        entity[1..].parse().ok()
    } else {
        None
    }
}
