use super::filter::{FilterClause, FilterMode, ResolvedClause, matches_all};
use super::row::{RowKey, TableRow, materialize};
use super::sort::{ResolvedSortKey, SortKey, sort_rows};
use crate::projection::{ColumnDescriptor, RendererTag};
use log::debug;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::BTreeSet;

/// Which rows a selection covers
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SelectionCriteria {
    #[default]
    None,
    All,
    Keys(BTreeSet<RowKey>),
}

impl SelectionCriteria {
    pub fn keys<I: IntoIterator<Item = RowKey>>(keys: I) -> Self {
        Self::Keys(keys.into_iter().collect())
    }

    fn covers(&self, key: &RowKey) -> bool {
        match self {
            Self::None => false,
            Self::All => true,
            Self::Keys(keys) => keys.contains(key),
        }
    }
}

/// One page of rows. `page` is 1-based.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    #[serde(skip)]
    pub rows: Vec<TableRow>,
    pub page: usize,
    pub page_size: usize,
    pub total_rows: usize,
    pub page_count: usize,
}

/// Sorts, filters, selects and pages rows against a set of column descriptors.
///
/// Every operation is a pure function of its inputs. Sort keys and filter
/// clauses naming a column that is absent, not sortable, or not filterable
/// are dropped.
#[derive(Debug, Clone)]
pub struct TableController {
    columns: Vec<ColumnDescriptor>,
}

impl TableController {
    pub fn new(columns: Vec<ColumnDescriptor>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    fn column(&self, key: &str) -> Option<&ColumnDescriptor> {
        self.columns
            .iter()
            .find(|column| column.key == key && !column.is_actions())
    }

    fn resolve_sort<'a>(&self, sort: &'a [SortKey]) -> Vec<ResolvedSortKey<'a>> {
        sort.iter()
            .filter_map(|key| match self.column(&key.field) {
                Some(column) if column.sortable => Some(ResolvedSortKey {
                    key,
                    temporal: column.renderer_tag == RendererTag::Date,
                }),
                _ => {
                    debug!("Ignoring sort on '{}': column is not sortable", key.field);
                    None
                }
            })
            .collect()
    }

    fn resolve_filter<'a>(&self, filter: &'a [FilterClause]) -> Vec<ResolvedClause<'a>> {
        filter
            .iter()
            .filter(|clause| clause.is_active())
            .filter_map(|clause| match self.column(&clause.field) {
                Some(column) if column.filterable => Some(ResolvedClause {
                    clause,
                    mode: if column.exact_match() {
                        FilterMode::Exact
                    } else {
                        FilterMode::Contains
                    },
                }),
                _ => {
                    debug!("Ignoring filter on '{}': column is not filterable", clause.field);
                    None
                }
            })
            .collect()
    }

    /// Key the input rows, keep those passing every filter clause, and sort.
    ///
    /// Row keys come from input positions, so a row keeps its synthetic key
    /// however it is filtered or sorted.
    pub fn apply(&self, rows: &[JsonValue], sort: &[SortKey], filter: &[FilterClause]) -> Vec<TableRow> {
        let clauses = self.resolve_filter(filter);
        let keys = self.resolve_sort(sort);

        let mut visible: Vec<TableRow> = materialize(rows)
            .into_iter()
            .filter(|row| matches_all(row, &clauses))
            .collect();
        sort_rows(&mut visible, &keys);
        visible
    }

    /// Selected rows in their current order
    pub fn select(&self, rows: &[TableRow], criteria: &SelectionCriteria) -> Vec<TableRow> {
        rows.iter()
            .filter(|row| criteria.covers(row.key()))
            .cloned()
            .collect()
    }

    /// Slice out page `page` (1-based). A zero page size puts every row on
    /// one page; a page past the end is empty.
    pub fn paginate(&self, rows: &[TableRow], page: usize, page_size: usize) -> Page {
        let total_rows = rows.len();
        let page = page.max(1);
        let page_size = if page_size == 0 { total_rows.max(1) } else { page_size };
        let page_count = total_rows.div_ceil(page_size);

        let start = (page - 1).saturating_mul(page_size).min(total_rows);
        let end = start.saturating_add(page_size).min(total_rows);

        Page {
            rows: rows[start..end].to_vec(),
            page,
            page_size,
            total_rows,
            page_count,
        }
    }
}
