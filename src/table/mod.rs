//! Table state
//!
//! - `row.rs` - row keys, synthetic ids, write payloads
//! - `sort.rs` - stable multi-key comparator
//! - `filter.rs` - AND-combined clauses
//! - `controller.rs` - apply / select / paginate

mod controller;
mod filter;
mod row;
mod sort;

pub use controller::{Page, SelectionCriteria, TableController};
pub use filter::{FilterClause, FilterMode};
pub use row::{RowKey, TableRow, materialize};
pub use sort::{SortDirection, SortKey};
