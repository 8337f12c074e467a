use serde_json::Value as JsonValue;
use std::fmt;

pub const ID_FIELD: &str = "id";

/// Identity of a row within one render pass.
///
/// Rows without an `id` get a positional key. Synthetic keys are only good
/// for selection and keying; [`RowKey::persistent_id`] hides them from every
/// write path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RowKey {
    Persistent(String),
    Synthetic(usize),
}

impl RowKey {
    pub fn for_row(row: &JsonValue, index: usize) -> Self {
        match row.get(ID_FIELD) {
            Some(JsonValue::String(id)) if !id.is_empty() => Self::Persistent(id.clone()),
            Some(JsonValue::Number(id)) => Self::Persistent(id.to_string()),
            _ => Self::Synthetic(index),
        }
    }

    /// The id to send back to a write path; `None` for synthetic keys
    pub fn persistent_id(&self) -> Option<&str> {
        match self {
            Self::Persistent(id) => Some(id),
            Self::Synthetic(_) => None,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self, Self::Synthetic(_))
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Persistent(id) => write!(f, "{}", id),
            Self::Synthetic(index) => write!(f, "row-{}", index),
        }
    }
}

/// A row paired with its key. The row data is never modified.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    key: RowKey,
    data: JsonValue,
}

impl TableRow {
    pub fn new(data: JsonValue, index: usize) -> Self {
        Self {
            key: RowKey::for_row(&data, index),
            data,
        }
    }

    pub fn key(&self) -> &RowKey {
        &self.key
    }

    pub fn data(&self) -> &JsonValue {
        &self.data
    }

    pub fn get(&self, field: &str) -> Option<&JsonValue> {
        self.data.get(field)
    }

    /// The row as received; a synthetic key is never part of it
    pub fn into_payload(self) -> JsonValue {
        self.data
    }
}

/// Key every row by its input position
pub fn materialize(rows: &[JsonValue]) -> Vec<TableRow> {
    rows.iter()
        .enumerate()
        .map(|(index, row)| TableRow::new(row.clone(), index))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_keys() {
        let rows = materialize(&[json!({"id": "a"}), json!({"name": "x"}), json!({"id": 7}), json!({"id": ""})]);

        assert_eq!(rows[0].key(), &RowKey::Persistent("a".into()));
        assert_eq!(rows[1].key().to_string(), "row-1");
        assert_eq!(rows[2].key().persistent_id(), Some("7"));
        assert!(rows[3].key().is_synthetic());
    }

    #[test]
    fn test_payload_never_carries_synthetic_id() {
        let row = TableRow::new(json!({"name": "x"}), 4);
        assert_eq!(row.key().persistent_id(), None);
        assert_eq!(row.into_payload(), json!({"name": "x"}));
    }
}
