//! Configuration I/O (YAML loading)
//!
//! Defines the YAML schema. Omitted fields keep their defaults.

use serde::{Deserialize, Serialize};

use super::Config;
use crate::domain::SelectorType;
use crate::error::{PartitionError, Result};

/// Supported schema versions
pub const SUPPORTED_VERSIONS: &[u32] = &[1];

/// YAML Schema v1
///
/// ```yaml
/// version: 1
/// partition_prefix: tenants
/// partition_selector: meta.tenant_id
/// partition_selector_type: integer
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileV1 {
    /// Schema version (always 1 for v1)
    #[serde(default)]
    pub version: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_prefix: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_selector: Option<String>,

    /// Parsed with [`SelectorType::from_str`](std::str::FromStr) so bad
    /// values surface as configuration errors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_selector_type: Option<String>,
}

impl ConfigFileV1 {
    pub fn into_config(self) -> Result<Config> {
        match self.version {
            None => {
                return Err(PartitionError::config(
                    "Missing 'version' field in configuration file. Add 'version: 1' to the top of your YAML file.",
                ))
            }
            Some(v) if !SUPPORTED_VERSIONS.contains(&v) => {
                return Err(PartitionError::config(format!(
                    "Unsupported configuration version {}. Supported versions: 1",
                    v
                )))
            }
            Some(_) => {}
        }

        let mut config = Config::new();
        if let Some(prefix) = self.partition_prefix {
            config.set_partition_prefix(prefix)?;
        }
        if let Some(selector) = self.partition_selector {
            config.set_partition_selector(selector)?;
        }
        if let Some(selector_type) = self.partition_selector_type {
            config.set_partition_selector_type(selector_type.parse::<SelectorType>()?);
        }
        Ok(config)
    }
}

impl From<&Config> for ConfigFileV1 {
    fn from(config: &Config) -> Self {
        Self {
            version: Some(1),
            partition_prefix: Some(config.partition_prefix().to_string()),
            partition_selector: Some(config.partition_selector().to_string()),
            partition_selector_type: Some(config.partition_selector_type().as_str().to_string()),
        }
    }
}
