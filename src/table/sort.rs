// ============================================================================
// src/table/sort.rs - Row sorting
// ============================================================================
//
// - Multi-key: later keys only break ties of earlier ones
// - Stable: rows equal on every key keep their input order
// - Missing values are "least known", not "least valued": null and absent
//   cells go last in both directions
//
// ============================================================================

use super::row::TableRow;
use crate::core::CellValue;
use serde::Deserialize;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// One sort key
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SortKey {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// A sort key with the column facts the comparison needs
#[derive(Debug, Clone)]
pub(crate) struct ResolvedSortKey<'a> {
    pub key: &'a SortKey,
    pub temporal: bool,
}

/// Compares rows key by key
pub(crate) struct RowComparator<'a> {
    keys: &'a [ResolvedSortKey<'a>],
}

impl<'a> RowComparator<'a> {
    pub fn new(keys: &'a [ResolvedSortKey<'a>]) -> Self {
        Self { keys }
    }

    pub fn compare(&self, a: &TableRow, b: &TableRow) -> Ordering {
        for key in self.keys {
            let ordering = compare_by_key(a, b, key);
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

fn compare_by_key(a: &TableRow, b: &TableRow, key: &ResolvedSortKey<'_>) -> Ordering {
    let left = CellValue::from_json(a.get(&key.key.field), key.temporal);
    let right = CellValue::from_json(b.get(&key.key.field), key.temporal);

    match (left.is_null(), right.is_null()) {
        (true, true) => Ordering::Equal,
        // Direction does not apply to missing values
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let ordering = left.compare(&right);
            match key.key.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        }
    }
}

/// Stable in-place sort
pub(crate) fn sort_rows(rows: &mut [TableRow], keys: &[ResolvedSortKey<'_>]) {
    if rows.is_empty() || keys.is_empty() {
        return;
    }

    let comparator = RowComparator::new(keys);
    rows.sort_by(|a, b| comparator.compare(a, b));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::row::materialize;
    use serde_json::json;

    fn xs(rows: &[TableRow]) -> Vec<serde_json::Value> {
        rows.iter()
            .map(|row| row.get("x").cloned().unwrap_or(json!(null)))
            .collect()
    }

    fn resolved(key: &SortKey) -> Vec<ResolvedSortKey<'_>> {
        vec![ResolvedSortKey {
            key,
            temporal: false,
        }]
    }

    #[test]
    fn test_nulls_last_in_both_directions() {
        let mut rows = materialize(&[json!({"x": null}), json!({"x": 1}), json!({"x": 3}), json!({})]);

        sort_rows(&mut rows, &resolved(&SortKey::asc("x")));
        assert_eq!(xs(&rows), vec![json!(1), json!(3), json!(null), json!(null)]);

        sort_rows(&mut rows, &resolved(&SortKey::desc("x")));
        assert_eq!(xs(&rows), vec![json!(3), json!(1), json!(null), json!(null)]);
    }

    #[test]
    fn test_stable_for_equal_keys() {
        let mut rows = materialize(&[
            json!({"id": "a", "x": null}),
            json!({"id": "b", "x": 1}),
            json!({"id": "c", "x": null}),
        ]);
        sort_rows(&mut rows, &resolved(&SortKey::asc("x")));

        let ids: Vec<String> = rows.iter().map(|row| row.key().to_string()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_multi_key() {
        let mut rows = materialize(&[
            json!({"city": "Oslo", "x": 2}),
            json!({"city": "Bergen", "x": 2}),
            json!({"city": "Alta", "x": 1}),
        ]);
        let primary = SortKey::desc("x");
        let secondary = SortKey::asc("city");
        let keys = vec![
            ResolvedSortKey {
                key: &primary,
                temporal: false,
            },
            ResolvedSortKey {
                key: &secondary,
                temporal: false,
            },
        ];
        sort_rows(&mut rows, &keys);

        let cities: Vec<&str> = rows.iter().map(|r| r.get("city").unwrap().as_str().unwrap()).collect();
        assert_eq!(cities, vec!["Bergen", "Oslo", "Alta"]);
    }

    #[test]
    fn test_temporal_key_orders_by_time() {
        let mut rows = materialize(&[
            json!({"x": "2024-02-01T00:00:00+03:00"}),
            json!({"x": "2024-01-31T23:00:00Z"}),
        ]);
        let key = SortKey::asc("x");
        sort_rows(
            &mut rows,
            &[ResolvedSortKey {
                key: &key,
                temporal: true,
            }],
        );
        assert_eq!(rows[0].key().to_string(), "row-1");
    }
}
