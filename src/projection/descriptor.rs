//! Column and field descriptors
//!
//! Turns classified properties into the ordered descriptor lists that
//! rendering code consumes. Hidden and unsupported properties never produce
//! a descriptor.

use super::classifier::{ClassifiedProperty, FieldLayout, PropertyClass, TemporalFormat};
use super::dispatch::{EditorTag, RendererTag};
use crate::core::{ResolverKey, WidthDefaults};
use serde::Serialize;

/// Key of the trailing actions column
pub const ACTIONS_KEY: &str = "actions";

/// The property that is never editable
pub const ID_KEY: &str = "id";

/// How one property renders as a table column
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDescriptor {
    pub key: String,
    pub title: String,
    pub width: u32,
    pub sortable: bool,
    pub filterable: bool,
    pub editable: bool,
    pub renderer_tag: RendererTag,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editor_tag: Option<EditorTag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolver_key: Option<ResolverKey>,
}

impl ColumnDescriptor {
    /// Filters on this column compare whole values instead of substrings
    pub fn exact_match(&self) -> bool {
        matches!(
            self.renderer_tag,
            RendererTag::Enum | RendererTag::Status | RendererTag::Boolean
        )
    }

    pub fn is_actions(&self) -> bool {
        self.renderer_tag == RendererTag::Actions
    }
}

/// Editor validation data carried by form fields
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldConstraints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    /// `Some(1.0)` for integer inputs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temporal_format: Option<TemporalFormat>,
}

/// How one property renders in a form
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    #[serde(flatten)]
    pub column: ColumnDescriptor,
    pub required: bool,
    pub layout: FieldLayout,
    /// Reference arrays pick several entities
    pub multiple: bool,
    pub constraints: FieldConstraints,
}

impl FieldDescriptor {
    pub fn key(&self) -> &str {
        &self.column.key
    }
}

/// Row operations the caller can offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ActionCapabilities {
    pub view: bool,
    pub edit: bool,
    pub delete: bool,
}

impl ActionCapabilities {
    pub fn all() -> Self {
        Self {
            view: true,
            edit: true,
            delete: true,
        }
    }

    pub fn any(&self) -> bool {
        self.view || self.edit || self.delete
    }
}

/// Builds descriptors with a fixed set of width defaults
#[derive(Debug, Clone, Default)]
pub struct DescriptorGenerator {
    widths: WidthDefaults,
}

impl DescriptorGenerator {
    pub fn new(widths: WidthDefaults) -> Self {
        Self { widths }
    }

    /// Table columns in declaration order, plus a trailing actions column
    /// when any capability is offered
    pub fn generate_columns<'a, I>(
        &self,
        properties: I,
        editable_default: bool,
        actions: Option<ActionCapabilities>,
    ) -> Vec<ColumnDescriptor>
    where
        I: IntoIterator<Item = &'a ClassifiedProperty>,
    {
        let mut columns: Vec<ColumnDescriptor> = properties
            .into_iter()
            .filter_map(|property| self.column(property, editable_default))
            .collect();

        if let Some(actions) = actions.filter(ActionCapabilities::any) {
            columns.push(self.actions_column(actions));
        }

        columns
    }

    /// Form fields in declaration order
    pub fn generate_fields<'a, I>(&self, properties: I, editable_default: bool) -> Vec<FieldDescriptor>
    where
        I: IntoIterator<Item = &'a ClassifiedProperty>,
    {
        properties
            .into_iter()
            .filter_map(|property| {
                let column = self.column(property, editable_default)?;
                Some(FieldDescriptor {
                    column,
                    required: property.required,
                    layout: property.hints.layout,
                    multiple: matches!(property.class, PropertyClass::ReferenceArray { .. }),
                    constraints: constraints(&property.class),
                })
            })
            .collect()
    }

    fn column(&self, property: &ClassifiedProperty, editable_default: bool) -> Option<ColumnDescriptor> {
        let (renderer_tag, editor, default_width) = match &property.class {
            PropertyClass::Hidden | PropertyClass::Unsupported { .. } => return None,
            PropertyClass::ReferenceSingle { .. } => {
                (RendererTag::Reference, EditorTag::Reference, self.widths.reference)
            }
            PropertyClass::ReferenceArray { .. } => {
                (RendererTag::Array, EditorTag::ReferenceMulti, self.widths.reference_array)
            }
            PropertyClass::Boolean => (RendererTag::Boolean, EditorTag::Boolean, self.widths.boolean),
            PropertyClass::Numeric { .. } => {
                (RendererTag::Number, EditorTag::Numeric, self.widths.numeric)
            }
            PropertyClass::Enumerated { .. } => {
                let renderer = if is_status(property) {
                    RendererTag::Status
                } else {
                    RendererTag::Enum
                };
                (renderer, EditorTag::Enum, self.widths.enumerated)
            }
            PropertyClass::Temporal { .. } => (RendererTag::Date, EditorTag::Date, self.widths.temporal),
            PropertyClass::Text { max_length } => {
                let width = match max_length {
                    Some(len) if *len < 50 => self.widths.short_text,
                    _ => self.widths.text,
                };
                (RendererTag::Text, EditorTag::Text, width)
            }
        };

        let hints = &property.hints;
        let is_array = matches!(property.class, PropertyClass::ReferenceArray { .. });

        let editable = editable_default
            && !hints.readonly
            && hints.editable != Some(false)
            && property.name != ID_KEY;

        Some(ColumnDescriptor {
            key: property.name.clone(),
            title: hints.title.clone().unwrap_or_else(|| property.name.clone()),
            width: hints.width.unwrap_or(default_width),
            sortable: !is_array && hints.sortable.unwrap_or(true),
            filterable: !is_array && hints.filterable.unwrap_or(true),
            editable,
            renderer_tag,
            editor_tag: editable.then_some(editor),
            resolver_key: property.class.resolver_key().cloned(),
        })
    }

    fn actions_column(&self, actions: ActionCapabilities) -> ColumnDescriptor {
        let mut verbs = Vec::new();
        if actions.view {
            verbs.push("view");
        }
        if actions.edit {
            verbs.push("edit");
        }
        if actions.delete {
            verbs.push("delete");
        }

        ColumnDescriptor {
            key: ACTIONS_KEY.to_string(),
            title: verbs.join("/"),
            width: self.widths.actions,
            sortable: false,
            filterable: false,
            editable: false,
            renderer_tag: RendererTag::Actions,
            editor_tag: None,
            resolver_key: None,
        }
    }
}

fn is_status(property: &ClassifiedProperty) -> bool {
    match property.hints.renderer.as_deref() {
        Some(renderer) => renderer == "status",
        None => property.name == "status",
    }
}

fn constraints(class: &PropertyClass) -> FieldConstraints {
    match class {
        PropertyClass::Numeric {
            minimum,
            maximum,
            integer,
        } => FieldConstraints {
            minimum: *minimum,
            maximum: *maximum,
            step: integer.then_some(1.0),
            ..Default::default()
        },
        PropertyClass::Enumerated { values } => FieldConstraints {
            options: values.clone(),
            ..Default::default()
        },
        PropertyClass::Text { max_length } => FieldConstraints {
            max_length: *max_length,
            ..Default::default()
        },
        PropertyClass::Temporal { format } => FieldConstraints {
            temporal_format: Some(*format),
            ..Default::default()
        },
        _ => FieldConstraints::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CollectionKind;
    use crate::projection::classifier::PropertyHints;

    fn property(name: &str, class: PropertyClass) -> ClassifiedProperty {
        ClassifiedProperty {
            name: name.to_string(),
            class,
            required: false,
            hints: PropertyHints::default(),
        }
    }

    fn text(max_length: Option<u64>) -> PropertyClass {
        PropertyClass::Text { max_length }
    }

    #[test]
    fn test_default_widths() {
        let generator = DescriptorGenerator::default();
        let props = vec![
            property("flag", PropertyClass::Boolean),
            property(
                "qty",
                PropertyClass::Numeric {
                    minimum: None,
                    maximum: None,
                    integer: true,
                },
            ),
            property("code", text(Some(10))),
            property("notes", text(None)),
            property(
                "loadedAt",
                PropertyClass::Temporal {
                    format: TemporalFormat::DateTime,
                },
            ),
        ];
        let widths: Vec<u32> = generator
            .generate_columns(&props, false, None)
            .iter()
            .map(|c| c.width)
            .collect();

        assert_eq!(widths, vec![80, 120, 150, 200, 160]);
    }

    #[test]
    fn test_hints_override_defaults() {
        let mut notes = property("notes", text(None));
        notes.hints = PropertyHints {
            title: Some("Notes".into()),
            width: Some(320),
            sortable: Some(false),
            filterable: Some(false),
            ..Default::default()
        };

        let column = &DescriptorGenerator::default().generate_columns([&notes], true, None)[0];
        assert_eq!(column.title, "Notes");
        assert_eq!(column.width, 320);
        assert!(!column.sortable);
        assert!(!column.filterable);
        assert!(column.editable);
        assert_eq!(column.editor_tag, Some(EditorTag::Text));
    }

    #[test]
    fn test_editability_rules() {
        let mut readonly = property("createdBy", text(None));
        readonly.hints.readonly = true;
        let id = property("id", text(None));
        let plain = property("comment", text(None));

        let columns = DescriptorGenerator::default().generate_columns([&readonly, &id, &plain], true, None);
        assert!(!columns[0].editable && columns[0].editor_tag.is_none());
        assert!(!columns[1].editable && columns[1].editor_tag.is_none());
        assert!(columns[2].editable && columns[2].editor_tag.is_some());

        let locked = DescriptorGenerator::default().generate_columns([&plain], false, None);
        assert!(!locked[0].editable);
        assert!(locked[0].editor_tag.is_none());
    }

    #[test]
    fn test_reference_descriptors() {
        let key = ResolverKey::new("counter-party", CollectionKind::Catalog);
        let single = property("_carrier", PropertyClass::ReferenceSingle { target: key.clone() });
        let many = property("_candidates", PropertyClass::ReferenceArray { target: key.clone() });

        let columns = DescriptorGenerator::default().generate_columns([&single, &many], true, None);

        assert_eq!(columns[0].resolver_key, Some(key.clone()));
        assert!(columns[0].sortable && columns[0].filterable);
        assert_eq!(columns[0].renderer_tag, RendererTag::Reference);
        assert_eq!(columns[1].resolver_key, Some(key));
        assert!(!columns[1].sortable && !columns[1].filterable);
        assert_eq!(columns[1].editor_tag, Some(EditorTag::ReferenceMulti));
    }

    #[test]
    fn test_reference_array_ignores_sort_hints() {
        let mut many = property(
            "_candidates",
            PropertyClass::ReferenceArray {
                target: ResolverKey::new("c", CollectionKind::List),
            },
        );
        many.hints.sortable = Some(true);
        many.hints.filterable = Some(true);

        let column = &DescriptorGenerator::default().generate_columns([&many], false, None)[0];
        assert!(!column.sortable && !column.filterable);
    }

    #[test]
    fn test_hidden_and_unsupported_are_skipped() {
        let props = vec![
            property("secret", PropertyClass::Hidden),
            property(
                "address",
                PropertyClass::Unsupported {
                    reason: crate::projection::classifier::UnsupportedReason::Object,
                },
            ),
        ];
        assert!(DescriptorGenerator::default().generate_columns(&props, true, None).is_empty());
        assert!(DescriptorGenerator::default().generate_fields(&props, true).is_empty());
    }

    #[test]
    fn test_actions_column() {
        let generator = DescriptorGenerator::default();
        let props = vec![property("name", text(None))];

        let none = generator.generate_columns(&props, true, Some(ActionCapabilities::default()));
        assert_eq!(none.len(), 1);

        let with_actions = generator.generate_columns(
            &props,
            true,
            Some(ActionCapabilities {
                view: true,
                edit: false,
                delete: true,
            }),
        );
        let actions = with_actions.last().unwrap();
        assert_eq!(actions.key, ACTIONS_KEY);
        assert_eq!(actions.title, "view/delete");
        assert!(!actions.sortable && !actions.filterable && !actions.editable);
        assert!(actions.resolver_key.is_none());
        assert_eq!(actions.width, 120);
    }

    #[test]
    fn test_status_renderer() {
        let values = vec!["draft".to_string(), "published".to_string()];
        let status = property("status", PropertyClass::Enumerated { values: values.clone() });
        let mut stage = property("stage", PropertyClass::Enumerated { values: values.clone() });
        stage.hints.renderer = Some("status".into());
        let kind = property("kind", PropertyClass::Enumerated { values });

        let columns = DescriptorGenerator::default().generate_columns([&status, &stage, &kind], false, None);
        assert_eq!(columns[0].renderer_tag, RendererTag::Status);
        assert_eq!(columns[1].renderer_tag, RendererTag::Status);
        assert_eq!(columns[2].renderer_tag, RendererTag::Enum);
        assert!(columns.iter().all(ColumnDescriptor::exact_match));
    }

    #[test]
    fn test_field_descriptors_carry_constraints() {
        let mut qty = property(
            "qty",
            PropertyClass::Numeric {
                minimum: Some(1.0),
                maximum: None,
                integer: true,
            },
        );
        qty.required = true;
        qty.hints.layout = FieldLayout::Sidebar;

        let fields = DescriptorGenerator::default().generate_fields([&qty], true);
        let field = &fields[0];
        assert!(field.required);
        assert_eq!(field.layout, FieldLayout::Sidebar);
        assert!(!field.multiple);
        assert_eq!(field.constraints.minimum, Some(1.0));
        assert_eq!(field.constraints.step, Some(1.0));
        assert_eq!(field.key(), "qty");
    }

    #[test]
    fn test_serialized_shape() {
        let column = &DescriptorGenerator::default()
            .generate_columns([&property("flag", PropertyClass::Boolean)], true, None)[0];
        let json = serde_json::to_value(column).unwrap();

        assert_eq!(json["rendererTag"], "boolean");
        assert_eq!(json["editorTag"], "boolean");
        assert!(json.get("resolverKey").is_none());
    }
}
