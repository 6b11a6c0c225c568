//! Partition handle
//!
//! A [`Partition`] is a stateless view of one partition: reads go through
//! its search alias, writes through its index alias, and the alias
//! operations move those aliases between physical indices.
//!
//! Placement states, as seen in the alias catalogue:
//!
//! ```text
//!   Unbound  --fleet.create-->  Active  --index_to(None)-->  ReadOnly
//!                                 ^                             |
//!                                 +------index_to(Some(..))-----+
//! ```
//!
//! `extend_to` adds a read destination in any state; `PartitionFleet::delete`
//! returns a partition to Unbound.

use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::actions::AliasActionBuilder;
use crate::bulk::BulkRewriter;
use crate::config::Config;
use crate::domain::{
    AliasAction, AliasCatalogue, BulkEntry, BulkMeta, BulkRequest, DeleteByQueryOptions,
    DocumentRequest, Endpoint, Endpoints, IndexTarget, IntoPartitionId, MultiGetRequest,
    MultiSearchRequest, PartitionId, SearchEngine, SearchRequest,
};
use crate::error::{PartitionError, Result};
use crate::scroller::Scroller;
use crate::selector::PartitionSelector;

/// Handle on one partition
#[derive(Clone)]
pub struct Partition {
    id: PartitionId,
    config: Arc<Config>,
    engine: Arc<dyn SearchEngine>,
    selector: PartitionSelector,
}

impl Partition {
    /// Create a handle, no engine call is made
    pub fn new(
        engine: Arc<dyn SearchEngine>,
        config: Arc<Config>,
        id: impl IntoPartitionId,
    ) -> Result<Self> {
        let id = id.into_partition_id()?;
        let selector = config.selector(&id);
        Ok(Self {
            id,
            config,
            engine,
            selector,
        })
    }

    pub fn id(&self) -> &PartitionId {
        &self.id
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Write alias name
    pub fn index_endpoint(&self) -> String {
        self.config.index_endpoint(&self.id)
    }

    /// Read alias name
    pub fn search_endpoint(&self) -> String {
        self.config.search_endpoint(&self.id)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Forwarding
    // ═══════════════════════════════════════════════════════════════════════

    pub async fn search(&self, mut request: SearchRequest) -> Result<Value> {
        request.index = Some(self.search_endpoint());
        debug!(partition = %self.id, "search");
        self.engine.search(request).await
    }

    pub async fn msearch(&self, mut request: MultiSearchRequest) -> Result<Value> {
        request.index = Some(self.search_endpoint());
        debug!(partition = %self.id, queries = request.body.len(), "msearch");
        self.engine.msearch(request).await
    }

    pub async fn get(&self, mut request: DocumentRequest) -> Result<Value> {
        request.index = Some(self.search_endpoint());
        debug!(partition = %self.id, id = ?request.id, "get");
        self.engine.get(request).await
    }

    pub async fn mget(&self, mut request: MultiGetRequest) -> Result<Value> {
        request.index = Some(self.search_endpoint());
        debug!(partition = %self.id, "mget");
        self.engine.mget(request).await
    }

    /// Index a document, stamping the partition selector on its body
    pub async fn index(&self, request: DocumentRequest) -> Result<Value> {
        let request = self.prepare_write(request)?;
        debug!(partition = %self.id, id = ?request.id, "index");
        self.engine.index(request).await
    }

    /// Like [`Partition::index`], but the engine rejects existing ids
    pub async fn create(&self, request: DocumentRequest) -> Result<Value> {
        let request = self.prepare_write(request)?;
        debug!(partition = %self.id, id = ?request.id, "create");
        self.engine.create(request).await
    }

    /// Delete through the search alias
    ///
    /// Reaches documents in any index the partition reads from, not only the
    /// current write index.
    pub async fn delete(&self, mut request: DocumentRequest) -> Result<Value> {
        request.index = Some(self.search_endpoint());
        debug!(partition = %self.id, id = ?request.id, "delete");
        self.engine.delete(request).await
    }

    pub async fn bulk(&self, mut request: BulkRequest) -> Result<Value> {
        if request.body.is_empty() {
            return Err(PartitionError::missing_argument("body"));
        }
        let index_endpoint = self.index_endpoint();
        let body = std::mem::take(&mut request.body);
        request.body = BulkRewriter::new(&index_endpoint, &self.selector).rewrite(body)?;
        request.index = Some(index_endpoint);
        debug!(partition = %self.id, entries = request.body.len(), "bulk");
        self.engine.bulk(request).await
    }

    /// Delete every matching document, one bulk request per page
    ///
    /// Returns the number of delete actions sent. Pages deleted before a
    /// failure stay deleted.
    pub async fn delete_by_query(&self, options: DeleteByQueryOptions) -> Result<usize> {
        let DeleteByQueryOptions {
            doc_type,
            body,
            size,
            scroll,
        } = options;
        if size == 0 {
            return Err(PartitionError::invalid_argument("size must be greater than zero!"));
        }

        let mut request = SearchRequest::new().size(size).source(false);
        request.doc_type = doc_type;
        request.body = body;

        let mut scroller = self.scroll(request);
        scroller.set_scroll(scroll)?;
        let mut cursor = scroller.cursor();

        let mut deleted = 0;
        loop {
            let (hits, done) = cursor.next_page().await?;
            if !hits.is_empty() {
                let ops = hits
                    .into_iter()
                    .map(delete_op)
                    .collect::<Result<Vec<_>>>()?;
                deleted += ops.len();
                debug!(partition = %self.id, page = ops.len(), "Deleting page");
                self.engine.bulk(BulkRequest::new(ops)).await?;
            }
            if done {
                break;
            }
        }

        info!(partition = %self.id, deleted, "Deleted by query");
        Ok(deleted)
    }

    /// Scroller over this partition's search alias
    pub fn scroll(&self, mut request: SearchRequest) -> Scroller {
        request.index = Some(self.search_endpoint());
        Scroller::new(Arc::clone(&self.engine), request)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Alias routing
    // ═══════════════════════════════════════════════════════════════════════

    /// Make `index` the write destination and add it to the read set
    ///
    /// The index alias is removed from every index currently holding it in
    /// the same alias transaction.
    pub async fn extend_to(&self, index: &str, routing: Option<&str>) -> Result<()> {
        if index.is_empty() {
            return Err(PartitionError::missing_argument("index"));
        }

        let index_alias = self.index_endpoint();
        let current = self
            .engine
            .get_aliases(Some(std::slice::from_ref(&index_alias)))
            .await?;

        let mut actions: Vec<AliasAction> = current
            .indices_with(&index_alias)
            .into_iter()
            .map(|(stale, _)| AliasAction::remove(stale, index_alias.as_str()))
            .collect();

        let builder = AliasActionBuilder::new(&self.config);
        actions.push(builder.new_index_alias(index, &self.id, routing)?);
        actions.push(builder.new_search_alias(index, &self.id, routing)?);

        debug!(partition = %self.id, actions = ?actions, "Extending");
        self.engine.update_aliases(&actions).await?;
        info!(partition = %self.id, index, "Extended partition");
        Ok(())
    }

    /// Repoint the write destination
    ///
    /// `None` drops the index alias and leaves the partition read-only. No
    /// request is sent when there is nothing to change.
    pub async fn index_to(&self, target: Option<IndexTarget>) -> Result<()> {
        let endpoints = self.endpoints().await?;

        let mut actions = Vec::new();
        if let Some(write) = &endpoints.write {
            actions.push(AliasAction::remove(write.index.as_str(), self.index_endpoint()));
        }
        if let Some(target) = &target {
            actions.push(AliasActionBuilder::new(&self.config).new_index_alias(
                &target.index,
                &self.id,
                target.routing.as_deref(),
            )?);
        }

        if actions.is_empty() {
            warn!(partition = %self.id, "No write alias to repoint");
            return Ok(());
        }

        debug!(partition = %self.id, actions = ?actions, "Repointing");
        self.engine.update_aliases(&actions).await?;
        match target {
            Some(target) => info!(partition = %self.id, index = %target.index, "Repointed writes"),
            None => info!(partition = %self.id, "Partition is now read-only"),
        }
        Ok(())
    }

    /// Alias catalogue restricted to this partition's two aliases
    pub async fn aliases(&self) -> Result<AliasCatalogue> {
        let names = [self.search_endpoint(), self.index_endpoint()];
        self.engine.get_aliases(Some(&names[..])).await
    }

    /// Resolve the physical indices behind both aliases
    pub async fn endpoints(&self) -> Result<Endpoints> {
        let catalogue = self.aliases().await?;
        let (search_alias, index_alias) = (self.search_endpoint(), self.index_endpoint());

        let write = catalogue
            .indices_with(&index_alias)
            .into_iter()
            .next()
            .map(|(index, meta)| Endpoint::new(index, meta.index_routing.clone()));
        let read = catalogue
            .indices_with(&search_alias)
            .into_iter()
            .map(|(index, meta)| Endpoint::new(index, meta.search_routing.clone()))
            .collect();

        Ok(Endpoints { write, read })
    }

    pub async fn is_readonly(&self) -> Result<bool> {
        Ok(self.endpoints().await?.is_readonly())
    }

    /// True when either alias resolves to at least one index
    pub async fn exists(&self) -> Result<bool> {
        let catalogue = self.aliases().await?;
        let (search_alias, index_alias) = (self.search_endpoint(), self.index_endpoint());
        let found = catalogue
            .pairs()
            .any(|(_, alias)| alias == search_alias || alias == index_alias);
        Ok(found)
    }

    fn prepare_write(&self, mut request: DocumentRequest) -> Result<DocumentRequest> {
        let body = request.body.get_or_insert_with(|| json!({}));
        self.selector.apply_to(body)?;
        request.index = Some(self.index_endpoint());
        Ok(request)
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ES partition {}", self.id)
    }
}

impl fmt::Debug for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Partition")
            .field("id", &self.id)
            .field("config", &self.config)
            .finish()
    }
}

impl PartialEq for Partition {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.config == other.config
    }
}

#[derive(Debug, Deserialize)]
struct HitRef {
    #[serde(rename = "_index")]
    index: String,
    #[serde(rename = "_type", default)]
    doc_type: Option<String>,
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_routing", default)]
    routing: Option<String>,
}

/// Delete action naming the hit's physical location
fn delete_op(hit: Value) -> Result<BulkEntry> {
    let hit: HitRef = serde_json::from_value(hit)?;
    let mut meta = BulkMeta::new().index(hit.index).id(hit.id);
    meta.doc_type = hit.doc_type;
    meta.routing = hit.routing;
    Ok(BulkEntry::delete(meta))
}
