use serde::{Deserialize, Serialize};
use std::fmt;

/// Which external collection a reference points into.
///
/// The link wire shape spells these as `domain: "reference"` (catalogs with
/// structured entries) and `domain: "lists"` (plain id/title lists).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    Catalog,
    List,
}

impl CollectionKind {
    /// Map a link `domain` literal to a collection kind
    pub fn from_domain(domain: &str) -> Option<Self> {
        match domain {
            "reference" => Some(Self::Catalog),
            "lists" => Some(Self::List),
            _ => None,
        }
    }

    /// The `domain` literal used on the wire
    pub fn domain(&self) -> &'static str {
        match self {
            Self::Catalog => "reference",
            Self::List => "lists",
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Catalog => write!(f, "CATALOG"),
            Self::List => write!(f, "LIST"),
        }
    }
}

/// Cache and lookup key of a referenced collection
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolverKey {
    pub catalog: String,
    pub kind: CollectionKind,
}

impl ResolverKey {
    pub fn new(catalog: impl Into<String>, kind: CollectionKind) -> Self {
        Self {
            catalog: catalog.into(),
            kind,
        }
    }
}

impl fmt::Display for ResolverKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.catalog)
    }
}

/// One option of a referenced collection.
///
/// Entities are owned by the collection service; the engine never mutates them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Entity {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: Some(title.into()),
        }
    }

    pub fn untitled(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
        }
    }

    /// Human label, falling back to the id
    pub fn label(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_kind_domains() {
        assert_eq!(CollectionKind::from_domain("reference"), Some(CollectionKind::Catalog));
        assert_eq!(CollectionKind::from_domain("lists"), Some(CollectionKind::List));
        assert_eq!(CollectionKind::from_domain("item"), None);
        assert_eq!(CollectionKind::List.domain(), "lists");
    }

    #[test]
    fn test_entity_label_falls_back_to_id() {
        assert_eq!(Entity::new("7", "Truck").label(), "Truck");
        assert_eq!(Entity::untitled("7").label(), "7");
    }
}
