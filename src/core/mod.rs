pub mod config;
pub mod error;
pub mod types;
pub mod value;

pub use config::{EngineConfig, MergePolicy, WidthDefaults};
pub use error::{GridError, Result};
pub use types::{CollectionKind, Entity, ResolverKey};
pub use value::CellValue;
