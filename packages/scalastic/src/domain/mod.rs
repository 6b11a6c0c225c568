//! Domain layer
//!
//! Port/Adapter pattern for engine abstraction

pub mod models;
pub mod ports;

pub use models::{
    AliasAction, AliasCatalogue, AliasMetadata, AliasRef, AliasSpec, BulkAction, BulkEntry,
    BulkMeta, BulkOp, BulkRequest, DeleteByQueryOptions, DocumentRequest, Endpoint, Endpoints,
    IndexAliases, IndexTarget, IntoPartitionId, MultiGetRequest, MultiSearchRequest, PartitionId,
    SearchRequest, SearchType, SelectorType,
};
pub use ports::SearchEngine;
