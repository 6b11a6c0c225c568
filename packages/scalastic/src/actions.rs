//! Alias action fragments
//!
//! Builds the `add` steps of alias transactions for a partition's two
//! aliases.

use serde_json::json;

use crate::config::Config;
use crate::domain::{AliasAction, AliasSpec, PartitionId};
use crate::error::{PartitionError, Result};

/// Builds add-alias actions from a [`Config`]
#[derive(Debug, Clone, Copy)]
pub struct AliasActionBuilder<'a> {
    config: &'a Config,
}

impl<'a> AliasActionBuilder<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Search alias on `index`, filtered to documents of `id`
    pub fn new_search_alias(
        &self,
        index: &str,
        id: &PartitionId,
        routing: Option<&str>,
    ) -> Result<AliasAction> {
        require_index(index)?;
        let filter = json!({
            "term": { self.config.partition_selector(): self.config.selector_value(id) }
        });
        Ok(AliasAction::Add(AliasSpec {
            index: index.to_string(),
            alias: self.config.search_endpoint(id),
            filter: Some(filter),
            routing: routing.map(str::to_string),
        }))
    }

    /// Index alias on `index`
    pub fn new_index_alias(
        &self,
        index: &str,
        id: &PartitionId,
        routing: Option<&str>,
    ) -> Result<AliasAction> {
        require_index(index)?;
        Ok(AliasAction::Add(AliasSpec {
            index: index.to_string(),
            alias: self.config.index_endpoint(id),
            filter: None,
            routing: routing.map(str::to_string),
        }))
    }
}

fn require_index(index: &str) -> Result<()> {
    if index.is_empty() {
        return Err(PartitionError::missing_argument("index"));
    }
    Ok(())
}
