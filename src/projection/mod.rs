//! Schema to view-model projection
//!
//! - `classifier.rs` - decides the projection class of every property
//! - `descriptor.rs` - builds column and field descriptors from classes
//! - `dispatch.rs` - renderer/editor tags and their strategies

pub mod classifier;
pub mod descriptor;
pub mod dispatch;

pub use classifier::{
    Classification, ClassifiedProperty, FieldLayout, PropertyClass, PropertyClassifier,
    PropertyHints, TemporalFormat, UnsupportedReason,
};
pub use descriptor::{
    ActionCapabilities, ColumnDescriptor, DescriptorGenerator, FieldConstraints, FieldDescriptor,
};
pub use dispatch::{EditInput, EditorTag, NoLookup, RendererTag, TitleLookup, apply_edit, render_cell};
