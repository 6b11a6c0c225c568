//! Partition naming and typing policy
//!
//! A [`Config`] decides:
//! - alias names: `<prefix>_<id>_index` (write) and `<prefix>_<id>_search` (read)
//! - the dotted document field holding the partition id (the *selector*)
//! - the engine type declared for that field
//!
//! # Examples
//!
//! ```rust
//! use scalastic::{Config, PartitionId};
//!
//! let config = Config::new();
//! let id = PartitionId::from(7u32);
//! assert_eq!(config.index_endpoint(&id), "scalastic_7_index");
//! assert_eq!(config.search_endpoint(&id), "scalastic_7_search");
//! assert_eq!(config.partition_id("scalastic_7_search"), Some(id));
//! assert_eq!(config.partition_id("alias123"), None);
//! ```

pub mod io;

use regex::Regex;
use serde_json::{json, Map, Value};
use std::path::Path;
use std::sync::LazyLock;

use crate::domain::models::PARTITION_ID_PATTERN;
use crate::domain::{PartitionId, SelectorType};
use crate::error::{PartitionError, Result};
use crate::selector::PartitionSelector;

pub use io::ConfigFileV1;

/// Default alias name prefix
pub const DEFAULT_PARTITION_PREFIX: &str = "scalastic";

/// Default selector field
pub const DEFAULT_PARTITION_SELECTOR: &str = "scalastic_partition_id";

/// Partition configuration
///
/// Built once by the caller and shared by the fleet and every partition
/// handle.
#[derive(Debug, Clone)]
pub struct Config {
    partition_prefix: String,
    partition_selector: String,
    partition_selector_type: SelectorType,
    /// Compiled from the prefix, rebuilt whenever the prefix changes
    partition_regex: Regex,
}

static DEFAULT_PARTITION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    partition_regex(DEFAULT_PARTITION_PREFIX).expect("default partition pattern is valid")
});

impl Default for Config {
    fn default() -> Self {
        Self {
            partition_prefix: DEFAULT_PARTITION_PREFIX.to_string(),
            partition_selector: DEFAULT_PARTITION_SELECTOR.to_string(),
            partition_selector_type: SelectorType::default(),
            partition_regex: DEFAULT_PARTITION_REGEX.clone(),
        }
    }
}

impl PartialEq for Config {
    fn eq(&self, other: &Self) -> bool {
        self.partition_prefix == other.partition_prefix
            && self.partition_selector == other.partition_selector
            && self.partition_selector_type == other.partition_selector_type
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a YAML file
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Load from YAML text
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let file: ConfigFileV1 = serde_yaml::from_str(yaml)?;
        file.into_config()
    }

    /// Export as YAML (schema v1)
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&ConfigFileV1::from(self))?)
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Accessors
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    pub fn partition_prefix(&self) -> &str {
        &self.partition_prefix
    }

    pub fn partition_selector(&self) -> &str {
        &self.partition_selector
    }

    pub fn partition_selector_type(&self) -> SelectorType {
        self.partition_selector_type
    }

    pub fn set_partition_prefix(&mut self, prefix: impl Into<String>) -> Result<()> {
        let prefix = prefix.into();
        check_prefix(&prefix)?;
        self.partition_regex = partition_regex(&prefix)?;
        self.partition_prefix = prefix;
        Ok(())
    }

    pub fn set_partition_selector(&mut self, selector: impl Into<String>) -> Result<()> {
        let selector = selector.into();
        check_selector(&selector)?;
        self.partition_selector = selector;
        Ok(())
    }

    pub fn set_partition_selector_type(&mut self, selector_type: SelectorType) {
        self.partition_selector_type = selector_type;
    }

    pub fn with_partition_prefix(mut self, prefix: impl Into<String>) -> Result<Self> {
        self.set_partition_prefix(prefix)?;
        Ok(self)
    }

    pub fn with_partition_selector(mut self, selector: impl Into<String>) -> Result<Self> {
        self.set_partition_selector(selector)?;
        Ok(self)
    }

    pub fn with_partition_selector_type(mut self, selector_type: SelectorType) -> Self {
        self.set_partition_selector_type(selector_type);
        self
    }

    /// Re-check the invariants enforced by the setters
    pub fn validate(&self) -> Result<()> {
        check_prefix(&self.partition_prefix)?;
        check_selector(&self.partition_selector)
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Naming
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Write alias of a partition
    pub fn index_endpoint(&self, id: &PartitionId) -> String {
        format!("{}_{}_index", self.partition_prefix, id)
    }

    /// Read alias of a partition
    pub fn search_endpoint(&self, id: &PartitionId) -> String {
        format!("{}_{}_search", self.partition_prefix, id)
    }

    /// Decode an alias name produced by `index_endpoint`/`search_endpoint`
    pub fn partition_id(&self, alias: &str) -> Option<PartitionId> {
        let captures = self.partition_regex.captures(alias)?;
        PartitionId::new(captures.get(1)?.as_str()).ok()
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Selector
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Value stored in the selector field for `id`
    pub fn selector_value(&self, id: &PartitionId) -> Value {
        id.to_value(self.partition_selector_type)
    }

    pub fn selector(&self, id: &PartitionId) -> PartitionSelector {
        PartitionSelector::new(&self.partition_selector, self.selector_value(id))
    }

    /// Put-mapping body declaring the selector field
    ///
    /// `a.b.id` with type `long` becomes
    /// `{properties: {a: {type: object, properties: {b: {type: object,
    /// properties: {id: {type: long}}}}}}}`.
    pub fn selector_mapping(&self) -> Value {
        let mut segments = self.partition_selector.rsplit('.');
        let leaf = segments.next().unwrap_or_default();

        let mut properties = Map::new();
        properties.insert(
            leaf.to_string(),
            json!({"type": self.partition_selector_type.as_str()}),
        );

        for segment in segments {
            let mut enclosing = Map::new();
            enclosing.insert(
                segment.to_string(),
                json!({"type": "object", "properties": properties}),
            );
            properties = enclosing;
        }

        json!({ "properties": properties })
    }
}

fn check_prefix(prefix: &str) -> Result<()> {
    if prefix.is_empty() {
        return Err(PartitionError::config("partition_prefix cannot be empty"));
    }
    Ok(())
}

fn check_selector(selector: &str) -> Result<()> {
    if selector.is_empty() {
        return Err(PartitionError::config("partition_selector cannot be empty"));
    }
    if selector.split('.').any(str::is_empty) {
        return Err(PartitionError::config(format!(
            "partition_selector '{}' has an empty path segment",
            selector
        )));
    }
    Ok(())
}

fn partition_regex(prefix: &str) -> Result<Regex> {
    let pattern = format!(
        "^{}_({})_(index|search)$",
        regex::escape(prefix),
        PARTITION_ID_PATTERN
    );
    Regex::new(&pattern).map_err(|err| {
        PartitionError::config(format!("partition_prefix '{}': {}", prefix, err))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn id(value: &str) -> PartitionId {
        PartitionId::new(value).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = Config::new();
        assert_eq!(config.partition_prefix(), "scalastic");
        assert_eq!(config.partition_selector(), "scalastic_partition_id");
        assert_eq!(config.partition_selector_type(), SelectorType::Long);
    }

    #[test]
    fn test_endpoints() {
        let config = Config::new();
        assert_eq!(config.index_endpoint(&id("7")), "scalastic_7_index");
        assert_eq!(config.search_endpoint(&id("7")), "scalastic_7_search");
    }

    #[test]
    fn test_partition_id_decode() {
        let config = Config::new();
        assert_eq!(config.partition_id("scalastic_3_search"), Some(id("3")));
        assert_eq!(config.partition_id("scalastic_3_index"), Some(id("3")));
        assert_eq!(
            config.partition_id("scalastic_tenant_a_index"),
            Some(id("tenant_a"))
        );
    }

    #[test]
    fn test_partition_id_rejects_other_names() {
        let config = Config::new();
        let rejected = [
            "scalastic_5_",
            "scalastic_5",
            "alias",
            "alias123",
            "123",
            "xscalastic_5_index",
            "scalastic_5_index2",
        ];
        for alias in rejected {
            assert_eq!(config.partition_id(alias), None, "{}", alias);
        }
    }

    #[test]
    fn test_custom_prefix_is_escaped() {
        let config = Config::new().with_partition_prefix("my.app").unwrap();
        assert_eq!(config.partition_id("my.app_1_index"), Some(id("1")));
        assert_eq!(config.partition_id("myxapp_1_index"), None);
        assert_eq!(config.partition_id("scalastic_1_index"), None);
    }

    #[test]
    fn test_setters_reject_empty() {
        let mut config = Config::new();
        assert!(config.set_partition_prefix("").is_err());
        assert!(config.set_partition_selector("").is_err());
        assert!(config.set_partition_selector("a..b").is_err());
        assert_eq!(config, Config::new());
    }

    #[test]
    fn test_selector_mapping_flat() {
        let config = Config::new();
        assert_eq!(
            config.selector_mapping(),
            json!({"properties": {"scalastic_partition_id": {"type": "long"}}})
        );
    }

    #[test]
    fn test_selector_mapping_nested() {
        let config = Config::new()
            .with_partition_selector("parent.child.partition_id")
            .unwrap()
            .with_partition_selector_type(SelectorType::String);

        assert_eq!(
            config.selector_mapping(),
            json!({"properties": {
                "parent": {"type": "object", "properties": {
                    "child": {"type": "object", "properties": {
                        "partition_id": {"type": "string"}
                    }}
                }}
            }})
        );
    }

    #[test]
    fn test_decode_ignores_non_word_ids() {
        let config = Config::new();
        assert_eq!(config.partition_id("scalastic_tenant-a_index"), None);
        assert_eq!(config.partition_id("scalastic_-1_search"), None);
        assert_eq!(config.partition_id("scalastic_a.b_index"), None);
        assert_eq!(config.partition_id("scalastic_a_b_index"), Some(id("a_b")));
    }

    #[test]
    fn test_prefix_with_pattern_metacharacters() {
        let config = Config::new().with_partition_prefix("t+(x)").unwrap();
        assert_eq!(config.partition_id("t+(x)_9_index"), Some(id("9")));
        assert_eq!(config.partition_id("tt(x)_9_index"), None);
    }

    #[test]
    fn test_selector_value_follows_type() {
        let config = Config::new();
        assert_eq!(config.selector_value(&id("5")), json!(5));

        let config = config.with_partition_selector_type(SelectorType::String);
        assert_eq!(config.selector_value(&id("5")), json!("5"));
    }

    proptest! {
        #[test]
        fn prop_endpoint_names_decode_back(raw in "\\PC{1,24}") {
            let config = Config::new();
            // Either the id is refused up front or it survives the alias name
            if let Ok(id) = PartitionId::new(raw) {
                prop_assert_eq!(config.partition_id(&config.index_endpoint(&id)), Some(id.clone()));
                prop_assert_eq!(config.partition_id(&config.search_endpoint(&id)), Some(id));
            }
        }

        #[test]
        fn prop_decode_round_trip_with_custom_prefix(prefix in "[a-z][a-z.-]{0,8}", n in 0u64..1_000_000) {
            let config = Config::new().with_partition_prefix(prefix).unwrap();
            let id = PartitionId::from(n);
            prop_assert_eq!(config.partition_id(&config.index_endpoint(&id)), Some(id));
        }
    }
}
