//! Link values and the link shape they are declared with
//!
//! A link is the wire form of a reference:
//! `{ domain: "reference" | "lists", entity: "item", catalog, id, title? }`.
//! Links carrying a `title` render without a resolver round trip.

use crate::core::{CollectionKind, GridError, ResolverKey, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue, json};

pub const LINK_ENTITY: &str = "item";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkValue {
    pub domain: String,
    pub entity: String,
    pub catalog: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl LinkValue {
    /// Build a link into the collection named by `key`
    pub fn new(key: &ResolverKey, id: impl Into<String>) -> Self {
        Self {
            domain: key.kind.domain().to_string(),
            entity: LINK_ENTITY.to_string(),
            catalog: key.catalog.clone(),
            id: id.into(),
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn from_json(value: &JsonValue) -> Result<Self> {
        serde_json::from_value(value.clone())
            .map_err(|err| GridError::Serialization(format!("Invalid link value: {}", err)))
    }

    pub fn to_json(&self) -> JsonValue {
        let mut link = json!({
            "domain": self.domain,
            "entity": self.entity,
            "catalog": self.catalog,
            "id": self.id,
        });
        if let Some(title) = &self.title {
            link["title"] = JsonValue::String(title.clone());
        }
        link
    }

    pub fn kind(&self) -> Option<CollectionKind> {
        CollectionKind::from_domain(&self.domain)
    }

    pub fn resolver_key(&self) -> Option<ResolverKey> {
        self.kind()
            .map(|kind| ResolverKey::new(self.catalog.clone(), kind))
    }

    pub fn is_display_ready(&self) -> bool {
        self.title.is_some()
    }
}

/// Add `title` to a raw link object when it is missing.
///
/// Every other key is left exactly as received, in its original position,
/// so re-emitting an untouched link only ever differs by the new title.
pub fn populate_title(raw: &JsonValue, title: &str) -> JsonValue {
    match raw {
        JsonValue::Object(obj) if !obj.contains_key("title") => {
            let mut out = obj.clone();
            out.insert("title".to_string(), JsonValue::String(title.to_string()));
            JsonValue::Object(out)
        }
        other => other.clone(),
    }
}

/// Id of a raw link object, if it has one
pub fn link_id(raw: &JsonValue) -> Option<&str> {
    raw.as_object()
        .and_then(|obj| obj.get("id"))
        .and_then(JsonValue::as_str)
}

/// Match a property schema against the link shape.
///
/// The shape is an object schema whose `domain` sub-property pins
/// `reference` or `lists` and whose `catalog` sub-property pins a collection
/// name. Literals may be pinned through `const`, `enum` or `default`.
pub fn match_link_shape(schema: &JsonValue) -> Option<ResolverKey> {
    let obj = schema.as_object()?;

    if obj.contains_key("type") && primary_type(obj) != Some("object") {
        return None;
    }

    let properties = obj.get("properties")?.as_object()?;

    let kind = properties
        .get("domain")
        .and_then(pinned_literal)
        .and_then(CollectionKind::from_domain)?;

    let catalog = properties.get("catalog").and_then(pinned_literal)?;
    if catalog.is_empty() {
        return None;
    }

    if let Some(entity) = properties.get("entity").and_then(pinned_literal) {
        if entity != LINK_ENTITY {
            return None;
        }
    }

    Some(ResolverKey::new(catalog, kind))
}

/// `type` as a string, or the first non-null entry of a type array
pub fn primary_type(schema: &Map<String, JsonValue>) -> Option<&str> {
    match schema.get("type")? {
        JsonValue::String(ty) => Some(ty),
        JsonValue::Array(types) => types
            .iter()
            .filter_map(JsonValue::as_str)
            .find(|ty| *ty != "null"),
        _ => None,
    }
}

fn pinned_literal(schema: &JsonValue) -> Option<&str> {
    let obj: &Map<String, JsonValue> = schema.as_object()?;

    if let Some(value) = obj.get("const").and_then(JsonValue::as_str) {
        return Some(value);
    }

    if let Some(first) = obj
        .get("enum")
        .and_then(JsonValue::as_array)
        .and_then(|values| values.first())
        .and_then(JsonValue::as_str)
    {
        return Some(first);
    }

    obj.get("default").and_then(JsonValue::as_str)
}
