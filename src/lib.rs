// ============================================================================
// schemagrid Library
// ============================================================================
//
// Schema in, table out:
//
//   raw schema -> schema (allOf folded) -> projection (classes, descriptors)
//   descriptors + rows -> table (sort, filter, select, page)
//   references -> resolver (cached, coalesced titles)
//
// ============================================================================

pub mod core;
pub mod facade;
pub mod projection;
pub mod resolver;
pub mod schema;
pub mod table;

// Re-export main types for convenience
pub use core::{CollectionKind, EngineConfig, Entity, GridError, MergePolicy, ResolverKey, Result};
pub use facade::{Projection, ProjectionEngine};
pub use projection::{
    ActionCapabilities, ColumnDescriptor, EditInput, EditorTag, FieldDescriptor, RendererTag,
    TitleLookup, apply_edit, render_cell,
};
pub use resolver::{OptionsFetcher, ReferenceCache, ReferenceResolver, StaticOptions};
pub use schema::{LinkValue, NormalizedSchema, normalize};
pub use table::{FilterClause, RowKey, SelectionCriteria, SortKey, TableController, TableRow};
