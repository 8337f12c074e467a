use super::row::TableRow;
use serde::Deserialize;
use serde_json::Value as JsonValue;

/// How a clause compares its value with a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    /// Case-insensitive substring
    Contains,
    /// Whole-value equality, for enumerated and boolean columns
    Exact,
}

/// One filter clause; all clauses of a filter must hold
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FilterClause {
    pub field: String,
    pub value: String,
}

impl FilterClause {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// An empty value filters nothing
    pub fn is_active(&self) -> bool {
        !self.value.trim().is_empty()
    }
}

pub(crate) struct ResolvedClause<'a> {
    pub clause: &'a FilterClause,
    pub mode: FilterMode,
}

pub(crate) fn matches_all(row: &TableRow, clauses: &[ResolvedClause<'_>]) -> bool {
    clauses
        .iter()
        .all(|resolved| matches_clause(row.get(&resolved.clause.field), resolved))
}

fn matches_clause(cell: Option<&JsonValue>, resolved: &ResolvedClause<'_>) -> bool {
    let needle = resolved.clause.value.trim();
    let texts = cell_texts(cell);
    if texts.is_empty() {
        return false;
    }

    match resolved.mode {
        FilterMode::Exact => texts.iter().any(|text| text.eq_ignore_ascii_case(needle)),
        FilterMode::Contains => {
            let needle = needle.to_lowercase();
            texts.iter().any(|text| text.to_lowercase().contains(&needle))
        }
    }
}

/// Searchable text of a cell. Links offer both their title and their id.
fn cell_texts(cell: Option<&JsonValue>) -> Vec<String> {
    match cell {
        None | Some(JsonValue::Null) => Vec::new(),
        Some(JsonValue::String(s)) => vec![s.clone()],
        Some(JsonValue::Bool(b)) => vec![b.to_string()],
        Some(JsonValue::Number(n)) => vec![n.to_string()],
        Some(JsonValue::Array(items)) => items.iter().flat_map(|item| cell_texts(Some(item))).collect(),
        Some(JsonValue::Object(obj)) => ["title", "id"]
            .iter()
            .filter_map(|field| obj.get(*field).and_then(JsonValue::as_str))
            .map(str::to_string)
            .collect(),
    }
}
