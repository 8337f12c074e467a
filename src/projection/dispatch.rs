// ============================================================================
// src/projection/dispatch.rs - Renderer / editor dispatch
// ============================================================================
//
// Descriptors name their display and edit strategy with closed tags. Both
// strategies are exhaustive matches, so adding a tag is a compile error at
// every call site instead of a silently missing map entry.
//
// ============================================================================

use super::descriptor::{ColumnDescriptor, FieldDescriptor};
use crate::core::value::parse_temporal;
use crate::core::{GridError, ResolverKey, Result};
use crate::schema::link::{LinkValue, link_id, populate_title};
use serde::Serialize;
use serde_json::{Number, Value as JsonValue};

/// Largest integer an `f64` holds exactly (2^53)
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RendererTag {
    Text,
    Number,
    Date,
    Boolean,
    Enum,
    Status,
    Reference,
    Array,
    Actions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EditorTag {
    Text,
    Numeric,
    Date,
    Boolean,
    Enum,
    Reference,
    ReferenceMulti,
}

/// Synchronous id -> title lookup used while rendering.
///
/// Implementations must never block on I/O; a miss simply returns `None`.
pub trait TitleLookup {
    fn lookup_title(&self, key: &ResolverKey, id: &str) -> Option<String>;

    /// Title of `id`, or `id` itself when unresolved
    fn title_of(&self, key: &ResolverKey, id: &str) -> String {
        self.lookup_title(key, id).unwrap_or_else(|| id.to_string())
    }
}

/// Lookup that resolves nothing; every reference renders its raw id
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLookup;

impl TitleLookup for NoLookup {
    fn lookup_title(&self, _key: &ResolverKey, _id: &str) -> Option<String> {
        None
    }
}

/// Display text of one cell
pub fn render_cell(
    column: &ColumnDescriptor,
    value: Option<&JsonValue>,
    lookup: &dyn TitleLookup,
) -> String {
    let value = match value {
        None | Some(JsonValue::Null) => return String::new(),
        Some(value) => value,
    };

    match column.renderer_tag {
        RendererTag::Text | RendererTag::Enum | RendererTag::Status | RendererTag::Number => {
            plain_text(value)
        }
        RendererTag::Date => render_date(value),
        RendererTag::Boolean => match value.as_bool() {
            Some(true) => "Yes".to_string(),
            Some(false) => "No".to_string(),
            None => plain_text(value),
        },
        RendererTag::Reference => render_reference(column.resolver_key.as_ref(), value, lookup),
        RendererTag::Array => match value {
            JsonValue::Array(items) => items
                .iter()
                .map(|item| render_reference(column.resolver_key.as_ref(), item, lookup))
                .collect::<Vec<_>>()
                .join(", "),
            other => render_reference(column.resolver_key.as_ref(), other, lookup),
        },
        RendererTag::Actions => String::new(),
    }
}

fn plain_text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn render_date(value: &JsonValue) -> String {
    let Some(raw) = value.as_str() else {
        return plain_text(value);
    };

    match parse_temporal(raw) {
        Some(ts) if raw.contains('T') => ts.format("%Y-%m-%d %H:%M").to_string(),
        Some(ts) => ts.format("%Y-%m-%d").to_string(),
        None => raw.to_string(),
    }
}

fn render_reference(
    key: Option<&ResolverKey>,
    value: &JsonValue,
    lookup: &dyn TitleLookup,
) -> String {
    if let Some(title) = value.get("title").and_then(JsonValue::as_str) {
        return title.to_string();
    }

    let id = match value {
        JsonValue::String(id) => id.as_str(),
        other => match link_id(other) {
            Some(id) => id,
            None => return plain_text(other),
        },
    };

    // A link knows its own collection; bare ids fall back to the column's
    let own_key = LinkValue::from_json(value)
        .ok()
        .and_then(|link| link.resolver_key());

    match own_key.as_ref().or(key) {
        Some(key) => lookup.title_of(key, id),
        None => id.to_string(),
    }
}

/// Raw editor input
#[derive(Debug, Clone, PartialEq)]
pub enum EditInput {
    Text(String),
    Number(f64),
    Flag(bool),
    /// Chosen entity ids, in pick order
    Selection(Vec<String>),
    Clear,
}

/// Validate editor input and produce the value to write back.
///
/// Reference edits rebuild links from the field's resolver key. Picking the
/// id a link already holds returns the original link unchanged, except that
/// a missing `title` is filled in when the lookup knows it.
pub fn apply_edit(
    field: &FieldDescriptor,
    original: Option<&JsonValue>,
    input: EditInput,
    lookup: &dyn TitleLookup,
) -> Result<JsonValue> {
    let key = field.key();

    let Some(editor) = field.column.editor_tag else {
        return Err(GridError::invalid_edit(key, "field is not editable"));
    };

    if input == EditInput::Clear {
        if field.required {
            return Err(GridError::invalid_edit(key, "value is required"));
        }
        return Ok(match editor {
            EditorTag::ReferenceMulti => JsonValue::Array(Vec::new()),
            _ => JsonValue::Null,
        });
    }

    match editor {
        EditorTag::Text => edit_text(field, input),
        EditorTag::Numeric => edit_number(field, input),
        EditorTag::Date => {
            let raw = expect_text(key, input)?;
            let raw = raw.trim();
            if parse_temporal(raw).is_none() {
                return Err(GridError::invalid_edit(key, format!("'{}' is not a date", raw)));
            }
            Ok(JsonValue::String(raw.to_string()))
        }
        EditorTag::Boolean => match input {
            EditInput::Flag(flag) => Ok(JsonValue::Bool(flag)),
            EditInput::Text(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(JsonValue::Bool(true)),
                "false" | "no" | "0" => Ok(JsonValue::Bool(false)),
                other => Err(GridError::invalid_edit(key, format!("'{}' is not a boolean", other))),
            },
            _ => Err(GridError::invalid_edit(key, "expected a boolean")),
        },
        EditorTag::Enum => {
            let raw = expect_text(key, input)?;
            if !field.constraints.options.is_empty() && !field.constraints.options.contains(&raw) {
                return Err(GridError::invalid_edit(
                    key,
                    format!("'{}' is not one of {:?}", raw, field.constraints.options),
                ));
            }
            Ok(JsonValue::String(raw))
        }
        EditorTag::Reference => {
            let resolver_key = reference_key(field)?;
            let ids = expect_selection(key, input)?;
            let [id] = ids.as_slice() else {
                return Err(GridError::invalid_edit(key, "exactly one entity must be chosen"));
            };
            Ok(link_for(&resolver_key, id, original, lookup))
        }
        EditorTag::ReferenceMulti => {
            let resolver_key = reference_key(field)?;
            let ids = expect_selection(key, input)?;
            let existing: Vec<&JsonValue> = match original {
                Some(JsonValue::Array(items)) => items.iter().collect(),
                _ => Vec::new(),
            };

            let mut links = Vec::with_capacity(ids.len());
            for id in &ids {
                let previous = existing
                    .iter()
                    .copied()
                    .find(|item| link_id(item) == Some(id.as_str()));
                links.push(link_for(&resolver_key, id, previous, lookup));
            }
            Ok(JsonValue::Array(links))
        }
    }
}

fn edit_text(field: &FieldDescriptor, input: EditInput) -> Result<JsonValue> {
    let raw = expect_text(field.key(), input)?;
    if let Some(max) = field.constraints.max_length {
        if raw.chars().count() as u64 > max {
            return Err(GridError::invalid_edit(
                field.key(),
                format!("longer than {} characters", max),
            ));
        }
    }
    Ok(JsonValue::String(raw))
}

fn edit_number(field: &FieldDescriptor, input: EditInput) -> Result<JsonValue> {
    let key = field.key();
    let number = match input {
        EditInput::Number(n) => n,
        EditInput::Text(raw) => raw
            .trim()
            .replace(',', ".")
            .parse::<f64>()
            .map_err(|_| GridError::invalid_edit(key, format!("'{}' is not a number", raw)))?,
        _ => return Err(GridError::invalid_edit(key, "expected a number")),
    };

    if !number.is_finite() {
        return Err(GridError::invalid_edit(key, "number must be finite"));
    }
    if let Some(min) = field.constraints.minimum {
        if number < min {
            return Err(GridError::invalid_edit(key, format!("must be >= {}", min)));
        }
    }
    if let Some(max) = field.constraints.maximum {
        if number > max {
            return Err(GridError::invalid_edit(key, format!("must be <= {}", max)));
        }
    }

    if field.constraints.step == Some(1.0) {
        if number.fract() != 0.0 {
            return Err(GridError::invalid_edit(key, "must be a whole number"));
        }
        if number.abs() > MAX_EXACT_INTEGER {
            return Err(GridError::invalid_edit(
                key,
                format!("must be within +/-{}", MAX_EXACT_INTEGER as i64),
            ));
        }
        return Ok(JsonValue::Number(Number::from(number as i64)));
    }

    Number::from_f64(number)
        .map(JsonValue::Number)
        .ok_or_else(|| GridError::invalid_edit(key, "number must be finite"))
}

fn expect_text(key: &str, input: EditInput) -> Result<String> {
    match input {
        EditInput::Text(raw) => Ok(raw),
        _ => Err(GridError::invalid_edit(key, "expected text")),
    }
}

fn expect_selection(key: &str, input: EditInput) -> Result<Vec<String>> {
    match input {
        EditInput::Selection(ids) => Ok(ids),
        EditInput::Text(id) => Ok(vec![id]),
        _ => Err(GridError::invalid_edit(key, "expected a selection")),
    }
}

fn reference_key(field: &FieldDescriptor) -> Result<ResolverKey> {
    field
        .column
        .resolver_key
        .clone()
        .ok_or_else(|| GridError::invalid_edit(field.key(), "reference field has no resolver key"))
}

fn link_for(
    key: &ResolverKey,
    id: &str,
    previous: Option<&JsonValue>,
    lookup: &dyn TitleLookup,
) -> JsonValue {
    let title = lookup.lookup_title(key, id);

    if let Some(previous) = previous.filter(|raw| link_id(raw) == Some(id)) {
        return match title {
            Some(title) => populate_title(previous, &title),
            None => previous.clone(),
        };
    }

    let link = LinkValue::new(key, id);
    match title {
        Some(title) => link.with_title(title).to_json(),
        None => link.to_json(),
    }
}
