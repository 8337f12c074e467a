// ============================================================================
// src/schema/normalizer.rs - allOf composition
// ============================================================================
//
// Folds a base document and its `allOf` fragments into one effective schema.
//
// Rules:
// - Fragments merge in declaration order, each normalized first
// - Objects merge key by key; `required` lists are unioned
// - A later leaf replaces an earlier one (reported as an override)
// - Differing `type`s or object/non-object clashes keep the first value
//   (reported as structural conflicts)
// - `$schema` is dropped, `$id` is kept
//
// The pass never fails: every problem becomes a Diagnostic.
//
// ============================================================================

use super::diagnostics::{Diagnostic, DiagnosticKind};
use crate::core::MergePolicy;
use log::{debug, warn};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeSet;

const ALL_OF: &str = "allOf";
const SCHEMA_ID: &str = "$schema";

/// A schema with its composition folded away
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSchema {
    document: Map<String, JsonValue>,
    diagnostics: Vec<Diagnostic>,
}

impl NormalizedSchema {
    pub fn document(&self) -> &Map<String, JsonValue> {
        &self.document
    }

    pub fn to_value(&self) -> JsonValue {
        JsonValue::Object(self.document.clone())
    }

    pub fn into_value(self) -> JsonValue {
        JsonValue::Object(self.document)
    }

    /// Properties in declaration order
    pub fn properties(&self) -> impl Iterator<Item = (&String, &JsonValue)> {
        self.document
            .get("properties")
            .and_then(JsonValue::as_object)
            .into_iter()
            .flat_map(|props| props.iter())
    }

    pub fn property(&self, name: &str) -> Option<&JsonValue> {
        self.document
            .get("properties")
            .and_then(JsonValue::as_object)
            .and_then(|props| props.get(name))
    }

    pub fn required(&self) -> BTreeSet<String> {
        required_set(&self.document)
    }

    pub fn id(&self) -> Option<&str> {
        self.document.get("$id").and_then(JsonValue::as_str)
    }

    /// Conflicts and overrides reported while merging
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn has_structural_conflicts(&self) -> bool {
        self.diagnostics.iter().any(|d| d.kind.is_structural())
    }
}

/// Normalizes schemas under a fixed merge policy
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaNormalizer {
    policy: MergePolicy,
}

impl SchemaNormalizer {
    pub fn new(policy: MergePolicy) -> Self {
        Self { policy }
    }

    pub fn normalize(&self, schema: &JsonValue) -> NormalizedSchema {
        let mut diagnostics = Vec::new();

        let document = match schema.as_object() {
            Some(obj) => self.normalize_node(obj, "", &mut diagnostics),
            None => {
                let diag = Diagnostic::new(
                    "",
                    DiagnosticKind::ShapeMismatch,
                    "schema root is not an object",
                );
                warn!("schema normalization: {}", diag);
                diagnostics.push(diag);
                Map::new()
            }
        };

        NormalizedSchema {
            document,
            diagnostics,
        }
    }

    fn normalize_node(
        &self,
        node: &Map<String, JsonValue>,
        path: &str,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Map<String, JsonValue> {
        let mut base = node.clone();
        base.remove(SCHEMA_ID);
        let fragments = base.remove(ALL_OF);

        self.normalize_children(&mut base, path, diagnostics);

        let Some(fragments) = fragments else {
            return base;
        };

        let fragments = match fragments {
            JsonValue::Array(items) => items,
            _ => {
                push(
                    diagnostics,
                    Diagnostic::new(
                        format!("{}/{}", path, ALL_OF),
                        DiagnosticKind::ShapeMismatch,
                        "allOf is not an array; ignored",
                    ),
                );
                return base;
            }
        };

        let conflicts_before = structural_count(diagnostics);
        let mut merged = base.clone();

        for (index, fragment) in fragments.iter().enumerate() {
            let fragment_path = format!("{}/{}/{}", path, ALL_OF, index);
            match fragment.as_object() {
                Some(obj) => {
                    let normalized = self.normalize_node(obj, &fragment_path, diagnostics);
                    merge_into(&mut merged, normalized, path, diagnostics);
                }
                None => push(
                    diagnostics,
                    Diagnostic::new(
                        fragment_path,
                        DiagnosticKind::ShapeMismatch,
                        "allOf member is not an object; skipped",
                    ),
                ),
            }
        }

        if self.policy == MergePolicy::OriginalOnConflict
            && structural_count(diagnostics) > conflicts_before
        {
            warn!(
                "schema normalization: conflicts under '{}', returning base document",
                if path.is_empty() { "/" } else { path }
            );
            return base;
        }

        merged
    }

    /// Fold composition nested inside property and item schemas
    fn normalize_children(
        &self,
        node: &mut Map<String, JsonValue>,
        path: &str,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        if let Some(JsonValue::Object(props)) = node.get_mut("properties") {
            for (name, prop) in props.iter_mut() {
                if let JsonValue::Object(obj) = prop {
                    let child_path = format!("{}/properties/{}", path, name);
                    *obj = self.normalize_node(obj, &child_path, diagnostics);
                }
            }
        }

        if let Some(JsonValue::Object(items)) = node.get_mut("items") {
            let child_path = format!("{}/items", path);
            *items = self.normalize_node(items, &child_path, diagnostics);
        }
    }
}

/// Normalize with the default best-effort policy
pub fn normalize(schema: &JsonValue) -> NormalizedSchema {
    SchemaNormalizer::default().normalize(schema)
}

fn merge_into(
    target: &mut Map<String, JsonValue>,
    source: Map<String, JsonValue>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for (key, incoming) in source {
        let child_path = format!("{}/{}", path, key);

        let Some(existing) = target.get_mut(&key) else {
            target.insert(key, incoming);
            continue;
        };

        if key == "required" {
            if let (JsonValue::Array(current), JsonValue::Array(extra)) = (&mut *existing, &incoming)
            {
                for name in extra {
                    if !current.contains(name) {
                        current.push(name.clone());
                    }
                }
                continue;
            }
        }

        match (existing, incoming) {
            (JsonValue::Object(current), JsonValue::Object(extra)) => {
                let current_type = current.get("type");
                let extra_type = extra.get("type");
                if let (Some(a), Some(b)) = (current_type, extra_type) {
                    if a != b {
                        push(
                            diagnostics,
                            Diagnostic::new(
                                child_path,
                                DiagnosticKind::TypeMismatch,
                                format!("declared as {} and {}; keeping {}", a, b, a),
                            ),
                        );
                        continue;
                    }
                }
                merge_into(current, extra, &child_path, diagnostics);
            }
            (current, extra) if current.is_object() || extra.is_object() => {
                push(
                    diagnostics,
                    Diagnostic::new(
                        child_path,
                        DiagnosticKind::ShapeMismatch,
                        format!("object and non-object values collide; keeping {}", short(current)),
                    ),
                );
            }
            (current, extra) => {
                if *current == extra {
                    continue;
                }
                if key == "type" {
                    push(
                        diagnostics,
                        Diagnostic::new(
                            child_path,
                            DiagnosticKind::TypeMismatch,
                            format!("declared as {} and {}; keeping {}", current, extra, current),
                        ),
                    );
                    continue;
                }
                push(
                    diagnostics,
                    Diagnostic::new(
                        child_path,
                        DiagnosticKind::LeafOverride,
                        format!("{} replaced by {}", current, extra),
                    ),
                );
                *current = extra;
            }
        }
    }
}

fn push(diagnostics: &mut Vec<Diagnostic>, diagnostic: Diagnostic) {
    if diagnostic.kind.is_structural() {
        warn!("schema merge conflict: {}", diagnostic);
    } else {
        debug!("schema merge: {}", diagnostic);
    }
    diagnostics.push(diagnostic);
}

fn structural_count(diagnostics: &[Diagnostic]) -> usize {
    diagnostics.iter().filter(|d| d.kind.is_structural()).count()
}

fn short(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Object(_) => "object",
        JsonValue::Array(_) => "array",
        JsonValue::String(_) => "string",
        JsonValue::Number(_) => "number",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Null => "null",
    }
}

fn required_set(node: &Map<String, JsonValue>) -> BTreeSet<String> {
    node.get("required")
        .and_then(JsonValue::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(|s| s.to_string()))
                .collect()
        })
        .unwrap_or_default()
}
