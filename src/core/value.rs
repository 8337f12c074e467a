use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value as JsonValue;
use std::cmp::Ordering;

/// A row cell lifted out of JSON into something with a total order
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Boolean(bool),
    Number(f64),
    Temporal(NaiveDateTime),
    Text(String),
}

impl CellValue {
    /// Lift a JSON cell.
    ///
    /// Strings are parsed as dates only when `temporal` is set, so a text
    /// column holding "2024-01-01" still sorts as text. Link objects sort by
    /// their title, or their id when untitled.
    pub fn from_json(value: Option<&JsonValue>, temporal: bool) -> Self {
        match value {
            None | Some(JsonValue::Null) => Self::Null,
            Some(JsonValue::Bool(b)) => Self::Boolean(*b),
            Some(JsonValue::Number(n)) => n.as_f64().map(Self::Number).unwrap_or(Self::Null),
            Some(JsonValue::String(s)) => {
                if temporal {
                    if let Some(ts) = parse_temporal(s) {
                        return Self::Temporal(ts);
                    }
                }
                Self::Text(s.clone())
            }
            Some(JsonValue::Object(obj)) => match link_label(obj) {
                Some(label) => Self::Text(label.to_string()),
                None => Self::Null,
            },
            Some(JsonValue::Array(items)) => {
                if items.is_empty() {
                    return Self::Null;
                }
                let labels: Vec<&str> = items
                    .iter()
                    .filter_map(|item| item.as_object().and_then(link_label))
                    .collect();
                Self::Text(labels.join(", "))
            }
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    fn type_rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Boolean(_) => 1,
            Self::Number(_) => 2,
            Self::Temporal(_) => 3,
            Self::Text(_) => 4,
        }
    }

    /// Total order over non-null cells.
    ///
    /// Nulls compare equal to each other and greater than everything else;
    /// callers that need "nulls last regardless of direction" must handle
    /// them before reversing.
    pub fn compare(&self, other: &CellValue) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Null, _) => Ordering::Greater,
            (_, Self::Null) => Ordering::Less,

            (Self::Boolean(a), Self::Boolean(b)) => a.cmp(b),
            (Self::Number(a), Self::Number(b)) => match (a.is_nan(), b.is_nan()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            },
            (Self::Temporal(a), Self::Temporal(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a
                .to_lowercase()
                .cmp(&b.to_lowercase())
                .then_with(|| a.cmp(b)),

            // Mixed types group by kind
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }
}

/// Parse `date` and `date-time` formatted strings
pub fn parse_temporal(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(ts) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(ts.naive_utc());
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(ts);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

fn link_label(obj: &serde_json::Map<String, JsonValue>) -> Option<&str> {
    obj.get("title")
        .and_then(JsonValue::as_str)
        .or_else(|| obj.get("id").and_then(JsonValue::as_str))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_sorts_after_values() {
        let null = CellValue::from_json(None, false);
        let one = CellValue::from_json(Some(&json!(1)), false);
        assert_eq!(null.compare(&one), Ordering::Greater);
        assert_eq!(one.compare(&null), Ordering::Less);
    }

    #[test]
    fn test_text_compare_is_case_insensitive_first() {
        let a = CellValue::Text("apple".into());
        let b = CellValue::Text("Banana".into());
        assert_eq!(a.compare(&b), Ordering::Less);
    }

    #[test]
    fn test_temporal_only_when_requested() {
        let raw = json!("2024-03-01");
        assert!(matches!(CellValue::from_json(Some(&raw), true), CellValue::Temporal(_)));
        assert!(matches!(CellValue::from_json(Some(&raw), false), CellValue::Text(_)));
    }

    #[test]
    fn test_link_cells_use_title_or_id() {
        let titled = json!({"domain": "reference", "catalog": "c", "id": "1", "title": "Acme"});
        let bare = json!({"domain": "reference", "catalog": "c", "id": "2"});
        assert_eq!(CellValue::from_json(Some(&titled), false), CellValue::Text("Acme".into()));
        assert_eq!(CellValue::from_json(Some(&bare), false), CellValue::Text("2".into()));
    }

    #[test]
    fn test_parse_temporal_formats() {
        assert!(parse_temporal("2024-03-01T10:00:00Z").is_some());
        assert!(parse_temporal("2024-03-01T10:00:00").is_some());
        assert!(parse_temporal("2024-03-01").is_some());
        assert!(parse_temporal("yesterday").is_none());
    }
}
