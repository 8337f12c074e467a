//! Schema documents: composition, links and diagnostics
//!
//! - `normalizer.rs` - folds `allOf` fragments into one effective schema
//! - `link.rs` - link wire values and link-shape detection
//! - `diagnostics.rs` - recovered conflicts and unsupported shapes

mod diagnostics;
pub mod link;
mod normalizer;

pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use link::{LinkValue, match_link_shape, populate_title, primary_type};
pub use normalizer::{NormalizedSchema, SchemaNormalizer, normalize};
