// ============================================================================
// src/projection/classifier.rs - Property classification
// ============================================================================
//
// Decides what each schema property is, first match wins:
//
//   1. x-table-hidden                          -> Hidden
//   2. marker-prefixed, link-shaped object     -> ReferenceSingle
//   3. marker-prefixed array of link shapes    -> ReferenceArray
//   4. other object                            -> Unsupported(Object)
//   5. other array                             -> Unsupported(Array)
//   6. boolean                                 -> Boolean
//   7. number / integer                        -> Numeric
//   8. string with enum                        -> Enumerated
//   9. string with date / date-time format     -> Temporal
//  10. string                                  -> Text
//
// Anything else is Unsupported and never reaches the descriptor generator.
//
// ============================================================================

use crate::core::{CollectionKind, ResolverKey};
use crate::schema::{Diagnostic, DiagnosticKind, NormalizedSchema, match_link_shape, primary_type};
use log::warn;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TemporalFormat {
    Date,
    DateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnsupportedReason {
    /// Nested object that is not a reference
    Object,
    /// Array whose items are not link shapes
    Array,
    /// Property schema is not an object
    Malformed,
    /// Missing or unrecognised `type`
    UnknownType(String),
}

/// Projection class of a single property
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "class", rename_all = "snake_case")]
pub enum PropertyClass {
    Hidden,
    ReferenceSingle {
        target: ResolverKey,
    },
    ReferenceArray {
        target: ResolverKey,
    },
    Boolean,
    Numeric {
        minimum: Option<f64>,
        maximum: Option<f64>,
        integer: bool,
    },
    Enumerated {
        values: Vec<String>,
    },
    Temporal {
        format: TemporalFormat,
    },
    Text {
        max_length: Option<u64>,
    },
    Unsupported {
        reason: UnsupportedReason,
    },
}

impl PropertyClass {
    /// Whether the property yields a descriptor
    pub fn is_projectable(&self) -> bool {
        !matches!(self, Self::Hidden | Self::Unsupported { .. })
    }

    pub fn resolver_key(&self) -> Option<&ResolverKey> {
        match self {
            Self::ReferenceSingle { target } | Self::ReferenceArray { target } => Some(target),
            _ => None,
        }
    }

    pub fn collection_kind(&self) -> Option<CollectionKind> {
        self.resolver_key().map(|key| key.kind)
    }
}

/// Form placement from the `x-layout` hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldLayout {
    #[default]
    Main,
    Sidebar,
}

/// `x-table-*` and `x-layout` presentation hints
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyHints {
    pub title: Option<String>,
    pub width: Option<u32>,
    pub sortable: Option<bool>,
    pub filterable: Option<bool>,
    pub editable: Option<bool>,
    pub readonly: bool,
    pub hidden: bool,
    pub renderer: Option<String>,
    pub layout: FieldLayout,
}

impl PropertyHints {
    fn from_schema(obj: &Map<String, JsonValue>) -> Self {
        let flag = |key: &str| obj.get(key).and_then(JsonValue::as_bool);

        Self {
            title: obj
                .get("title")
                .and_then(JsonValue::as_str)
                .map(str::to_string),
            width: obj
                .get("x-table-width")
                .and_then(JsonValue::as_u64)
                .map(|w| w.min(u32::MAX as u64) as u32),
            sortable: flag("x-table-sortable"),
            filterable: flag("x-table-filterable"),
            editable: flag("x-table-editable"),
            readonly: flag("x-table-readonly").unwrap_or(false),
            hidden: flag("x-table-hidden").unwrap_or(false),
            renderer: obj
                .get("x-table-renderer")
                .and_then(JsonValue::as_str)
                .map(str::to_string),
            layout: match obj.get("x-layout").and_then(JsonValue::as_str) {
                Some("sidebar") => FieldLayout::Sidebar,
                _ => FieldLayout::Main,
            },
        }
    }
}

/// A property with its class, required-ness and hints attached
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedProperty {
    pub name: String,
    pub class: PropertyClass,
    pub required: bool,
    pub hints: PropertyHints,
}

/// Every property of one schema, classified once
#[derive(Debug, Clone, Default)]
pub struct Classification {
    pub properties: Vec<ClassifiedProperty>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Classification {
    /// Properties that yield descriptors, in declaration order
    pub fn projectable(&self) -> impl Iterator<Item = &ClassifiedProperty> {
        self.properties.iter().filter(|p| p.class.is_projectable())
    }
}

/// Classifies properties against a reference marker.
///
/// The marker is a schema-authoring contract: a key starting with it is only
/// treated as a reference when its schema also carries a link shape.
#[derive(Debug, Clone)]
pub struct PropertyClassifier {
    marker: String,
}

impl PropertyClassifier {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    fn is_marked(&self, name: &str) -> bool {
        name.starts_with(&self.marker)
    }

    pub fn classify(
        &self,
        name: &str,
        property: &JsonValue,
        required: &BTreeSet<String>,
    ) -> ClassifiedProperty {
        let is_required = required.contains(name);

        let Some(obj) = property.as_object() else {
            return ClassifiedProperty {
                name: name.to_string(),
                class: PropertyClass::Unsupported {
                    reason: UnsupportedReason::Malformed,
                },
                required: is_required,
                hints: PropertyHints::default(),
            };
        };

        let hints = PropertyHints::from_schema(obj);
        let class = self.classify_object(name, obj, &hints);

        ClassifiedProperty {
            name: name.to_string(),
            class,
            required: is_required,
            hints,
        }
    }

    fn classify_object(
        &self,
        name: &str,
        obj: &Map<String, JsonValue>,
        hints: &PropertyHints,
    ) -> PropertyClass {
        if hints.hidden {
            return PropertyClass::Hidden;
        }

        let ty = primary_type(obj);
        let marked = self.is_marked(name);

        if marked {
            let property = JsonValue::Object(obj.clone());
            if ty != Some("array") {
                if let Some(target) = match_link_shape(&property) {
                    return PropertyClass::ReferenceSingle { target };
                }
            }
            if ty == Some("array") {
                if let Some(target) = obj.get("items").and_then(match_link_shape) {
                    return PropertyClass::ReferenceArray { target };
                }
            }
        }

        match ty {
            Some("object") => PropertyClass::Unsupported {
                reason: UnsupportedReason::Object,
            },
            Some("array") => PropertyClass::Unsupported {
                reason: UnsupportedReason::Array,
            },
            Some("boolean") => PropertyClass::Boolean,
            Some("number") | Some("integer") => PropertyClass::Numeric {
                minimum: obj.get("minimum").and_then(JsonValue::as_f64),
                maximum: obj.get("maximum").and_then(JsonValue::as_f64),
                integer: ty == Some("integer"),
            },
            Some("string") => classify_string(obj),
            Some(other) => PropertyClass::Unsupported {
                reason: UnsupportedReason::UnknownType(other.to_string()),
            },
            None => PropertyClass::Unsupported {
                reason: UnsupportedReason::UnknownType(String::new()),
            },
        }
    }

    /// Classify every property of a normalized schema.
    ///
    /// Unsupported properties are reported once each and logged.
    pub fn classify_schema(&self, schema: &NormalizedSchema) -> Classification {
        let required = schema.required();
        let mut classification = Classification::default();

        for (name, property) in schema.properties() {
            let classified = self.classify(name, property, &required);

            if let PropertyClass::Unsupported { reason } = &classified.class {
                let diagnostic = Diagnostic::new(
                    format!("/properties/{}", name),
                    DiagnosticKind::Unsupported,
                    format!("property '{}' skipped: {}", name, describe(reason)),
                );
                warn!("schema projection: {}", diagnostic);
                classification.diagnostics.push(diagnostic);
            }

            classification.properties.push(classified);
        }

        classification
    }
}

impl Default for PropertyClassifier {
    fn default() -> Self {
        Self::new(crate::core::config::DEFAULT_REFERENCE_MARKER)
    }
}

fn classify_string(obj: &Map<String, JsonValue>) -> PropertyClass {
    if let Some(values) = obj.get("enum").and_then(JsonValue::as_array) {
        return PropertyClass::Enumerated {
            values: values
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
        };
    }

    match obj.get("format").and_then(JsonValue::as_str) {
        Some("date") => PropertyClass::Temporal {
            format: TemporalFormat::Date,
        },
        Some("date-time") => PropertyClass::Temporal {
            format: TemporalFormat::DateTime,
        },
        _ => PropertyClass::Text {
            max_length: obj.get("maxLength").and_then(JsonValue::as_u64),
        },
    }
}

fn describe(reason: &UnsupportedReason) -> String {
    match reason {
        UnsupportedReason::Object => "nested object is not a reference".to_string(),
        UnsupportedReason::Array => "array items are not link shapes".to_string(),
        UnsupportedReason::Malformed => "property schema is not an object".to_string(),
        UnsupportedReason::UnknownType(ty) if ty.is_empty() => "missing type".to_string(),
        UnsupportedReason::UnknownType(ty) => format!("unknown type '{}'", ty),
    }
}
