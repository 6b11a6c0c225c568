//! Search Engine Port (Trait Interface)
//!
//! Port/Adapter pattern for the engine connection:
//! - Production: an HTTP client adapter owned by the host application
//! - Testing: [`crate::infrastructure::InMemoryEngine`]
//!
//! Adapters report every failure as [`crate::ErrorKind::Engine`]; the
//! partition layer forwards those errors unchanged.

use async_trait::async_trait;
use serde_json::Value;

use super::models::{
    AliasAction, AliasCatalogue, BulkRequest, DocumentRequest, MultiGetRequest,
    MultiSearchRequest, SearchRequest,
};
use crate::Result;

/// Search Engine Port (Primary Interface)
///
/// Engine results are returned as raw JSON; only the alias catalogue is
/// typed because the routing state machine reads it.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Reads
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    async fn search(&self, request: SearchRequest) -> Result<Value>;

    async fn msearch(&self, request: MultiSearchRequest) -> Result<Value>;

    async fn get(&self, request: DocumentRequest) -> Result<Value>;

    async fn mget(&self, request: MultiGetRequest) -> Result<Value>;

    /// Advance a scroll cursor
    ///
    /// Returns the next page; its `_scroll_id` is the token for the page after.
    async fn scroll(&self, scroll_id: &str, scroll: &str) -> Result<Value>;

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Writes
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    async fn index(&self, request: DocumentRequest) -> Result<Value>;

    /// Like `index`, but fails when the document id already exists
    async fn create(&self, request: DocumentRequest) -> Result<Value>;

    async fn delete(&self, request: DocumentRequest) -> Result<Value>;

    async fn bulk(&self, request: BulkRequest) -> Result<Value>;

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Index administration
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Alias catalogue, optionally restricted to alias names
    ///
    /// Names are exact or end with a `*` wildcard. Physical indices without a
    /// matching alias may be returned with an empty alias map.
    async fn get_aliases(&self, names: Option<&[String]>) -> Result<AliasCatalogue>;

    /// Apply all actions as one atomic batch
    async fn update_aliases(&self, actions: &[AliasAction]) -> Result<()>;

    /// Declare a field mapping on `index` under the given document type
    async fn put_mapping(&self, index: &str, doc_type: &str, mapping: Value) -> Result<()>;
}
