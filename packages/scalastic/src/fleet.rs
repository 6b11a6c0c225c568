//! Partition lifecycle
//!
//! [`PartitionFleet`] creates, deletes and enumerates partitions. It owns no
//! state of its own: every listing re-reads the engine's alias catalogue.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::actions::AliasActionBuilder;
use crate::config::Config;
use crate::domain::{AliasAction, IntoPartitionId, PartitionId, SearchEngine};
use crate::error::{PartitionError, Result};
use crate::partition::Partition;

/// Document types the selector mapping is declared on
pub const MAPPING_TYPES: [&str; 2] = ["_default_", "scalastic"];

/// Entry point bound to one engine and one [`Config`]
///
/// # Examples
///
/// ```rust
/// use scalastic::{Config, InMemoryEngine, PartitionFleet};
/// use std::sync::Arc;
///
/// let engine = Arc::new(InMemoryEngine::new());
/// let fleet = PartitionFleet::new(engine, Config::new());
/// let partition = fleet.lookup(7).unwrap();
/// assert_eq!(partition.index_endpoint(), "scalastic_7_index");
/// ```
#[derive(Clone)]
pub struct PartitionFleet {
    engine: Arc<dyn SearchEngine>,
    config: Arc<Config>,
}

impl PartitionFleet {
    pub fn new(engine: Arc<dyn SearchEngine>, config: impl Into<Arc<Config>>) -> Self {
        Self {
            engine,
            config: config.into(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn engine(&self) -> &Arc<dyn SearchEngine> {
        &self.engine
    }

    /// Create a partition on `index` with both aliases in one transaction
    pub async fn create(
        &self,
        index: &str,
        id: impl IntoPartitionId,
        routing: Option<&str>,
    ) -> Result<Partition> {
        let id = id.into_partition_id()?;
        let builder = AliasActionBuilder::new(&self.config);
        let actions = [
            builder.new_search_alias(index, &id, routing)?,
            builder.new_index_alias(index, &id, routing)?,
        ];

        debug!(partition = %id, actions = ?actions, "Creating");
        self.engine.update_aliases(&actions).await?;
        info!(partition = %id, index, "Created partition");
        self.lookup(id)
    }

    /// Remove every alias that decodes to `id`
    ///
    /// Deleting an unknown partition is a no-op.
    pub async fn delete(&self, id: impl IntoPartitionId) -> Result<()> {
        let id = id.into_partition_id()?;
        let catalogue = self.engine.get_aliases(None).await?;

        let actions: Vec<AliasAction> = catalogue
            .pairs()
            .filter(|(_, alias)| self.config.partition_id(alias).as_ref() == Some(&id))
            .map(|(index, alias)| AliasAction::remove(index, alias))
            .collect();

        if actions.is_empty() {
            warn!(partition = %id, "No aliases found, nothing to delete");
            return Ok(());
        }

        debug!(partition = %id, actions = ?actions, "Deleting");
        self.engine.update_aliases(&actions).await?;
        info!(partition = %id, aliases = actions.len(), "Deleted partition");
        Ok(())
    }

    /// Handle for `id`, no engine call is made
    pub fn lookup(&self, id: impl IntoPartitionId) -> Result<Partition> {
        Partition::new(Arc::clone(&self.engine), Arc::clone(&self.config), id)
    }

    /// Distinct partition ids found in the alias catalogue, in catalogue order
    pub async fn ids(&self) -> Result<Vec<PartitionId>> {
        let catalogue = self.engine.get_aliases(None).await?;
        let mut seen = HashSet::new();
        Ok(catalogue
            .pairs()
            .filter_map(|(_, alias)| self.config.partition_id(alias))
            .filter(|id| seen.insert(id.clone()))
            .collect())
    }

    /// One handle per partition currently in the catalogue
    pub async fn list(&self) -> Result<Vec<Partition>> {
        self.ids()
            .await?
            .into_iter()
            .map(|id| self.lookup(id))
            .collect()
    }

    /// Declare the selector field mapping on `index`
    pub async fn prepare_index(&self, index: &str) -> Result<()> {
        if index.is_empty() {
            return Err(PartitionError::missing_argument("index"));
        }
        let mapping = self.config.selector_mapping();
        for doc_type in MAPPING_TYPES {
            self.engine
                .put_mapping(index, doc_type, mapping.clone())
                .await?;
        }
        info!(index, selector = self.config.partition_selector(), "Prepared index");
        Ok(())
    }
}

impl std::fmt::Debug for PartitionFleet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartitionFleet")
            .field("config", &self.config)
            .finish()
    }
}
