use serde::Deserialize;
use std::time::Duration;

/// Reserved prefix marking reference-valued property keys.
///
/// Schema authors must only use this prefix for properties that carry a link
/// shape. A prefixed property without one is projected as whatever its `type`
/// says, or dropped as unsupported when it is an object.
pub const DEFAULT_REFERENCE_MARKER: &str = "_";

/// Freshness window of a resolved collection
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

pub const DEFAULT_CACHE_CAPACITY: usize = 256;

/// How the normalizer reacts to structural conflicts between `allOf` fragments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Keep the first value for a conflicting node and keep merging
    #[default]
    BestEffort,
    /// Return the base document untouched by fragments once any structural
    /// conflict is reported
    OriginalOnConflict,
}

/// Default column widths, used when a property has no `x-table-width` hint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WidthDefaults {
    pub boolean: u32,
    pub numeric: u32,
    pub short_text: u32,
    pub text: u32,
    pub enumerated: u32,
    pub temporal: u32,
    pub reference: u32,
    pub reference_array: u32,
    pub actions: u32,
}

impl Default for WidthDefaults {
    fn default() -> Self {
        Self {
            boolean: 80,
            numeric: 120,
            short_text: 150,
            text: 200,
            enumerated: 140,
            temporal: 160,
            reference: 180,
            reference_array: 200,
            actions: 120,
        }
    }
}

/// Projection engine configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Prefix identifying reference properties
    pub reference_marker: String,

    /// Cache freshness window
    #[serde(with = "duration_secs")]
    pub cache_ttl: Duration,

    /// Maximum number of cached collections
    pub cache_capacity: usize,

    /// Whether generated descriptors are editable unless hinted read-only
    pub editable_default: bool,

    pub merge_policy: MergePolicy,

    pub widths: WidthDefaults,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reference_marker: DEFAULT_REFERENCE_MARKER.to_string(),
            cache_ttl: DEFAULT_CACHE_TTL,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            editable_default: false,
            merge_policy: MergePolicy::default(),
            widths: WidthDefaults::default(),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the reference marker
    pub fn reference_marker(mut self, marker: &str) -> Self {
        self.reference_marker = marker.to_string();
        self
    }

    /// Set the cache time-to-live
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Set the maximum number of cached collections
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn editable_default(mut self, editable: bool) -> Self {
        self.editable_default = editable;
        self
    }

    pub fn merge_policy(mut self, policy: MergePolicy) -> Self {
        self.merge_policy = policy;
        self
    }

    pub fn widths(mut self, widths: WidthDefaults) -> Self {
        self.widths = widths;
        self
    }

    /// Parse a configuration document; missing keys take their defaults
    ///
    /// ```
    /// # use schemagrid::EngineConfig;
    /// let config = EngineConfig::from_json_str(r#"{"cache_ttl": 60}"#).unwrap();
    /// assert_eq!(config.cache_ttl.as_secs(), 60);
    /// ```
    pub fn from_json_str(json: &str) -> Result<Self, String> {
        let config: Self = serde_json::from_str(json).map_err(|err| err.to_string())?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.reference_marker.is_empty() {
            return Err("reference_marker cannot be empty".to_string());
        }

        if self.cache_capacity == 0 {
            return Err("cache_capacity must be > 0".to_string());
        }

        if self.cache_ttl.is_zero() {
            return Err("cache_ttl must be > 0".to_string());
        }

        Ok(())
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
