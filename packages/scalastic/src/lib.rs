//! scalastic - partitions over search engine aliases
//!
//! A *partition* is a named subset of documents addressed through two
//! aliases: a search alias (reads, fanned out over every index that ever held
//! the partition, filtered by the partition id) and an index alias (writes,
//! exactly one physical index). This crate keeps both aliases consistent as
//! partitions are created, extended, repointed and deleted, and stamps the
//! partition id on every written document.
//!
//! ## Layout
//!
//! - [`config`]: alias naming and the selector field
//! - [`selector`], [`actions`], [`bulk`]: pure request rewriting
//! - [`scroller`]: scan/scroll cursor
//! - [`partition`], [`fleet`]: engine-facing operations
//! - [`domain`]: value types and the [`SearchEngine`] port
//! - [`infrastructure`]: [`InMemoryEngine`] for tests
//!
//! ## Usage
//!
//! ```rust,ignore
//! use scalastic::{Config, DocumentRequest, PartitionFleet};
//!
//! let fleet = PartitionFleet::new(engine, Config::from_yaml("scalastic.yaml")?);
//! fleet.prepare_index("main").await?;
//!
//! // 1. Create partition 1 on `main`
//! let partition = fleet.create("main", 1, None).await?;
//!
//! // 2. Writes are stamped with `scalastic_partition_id: 1`
//! partition
//!     .index(DocumentRequest::new().doc_type("doc").id(1).body(json!({"subject": "x"})))
//!     .await?;
//!
//! // 3. Move writes to a new index, keep reading from both
//! partition.extend_to("main_v2", None).await?;
//! ```

pub mod actions;
pub mod bulk;
pub mod config;
pub mod domain;
pub mod error;
pub mod fleet;
pub mod infrastructure;
pub mod partition;
pub mod scroller;
pub mod selector;

pub use error::{ErrorKind, PartitionError, Result};

pub use actions::AliasActionBuilder;
pub use bulk::BulkRewriter;
pub use config::{Config, ConfigFileV1};
pub use fleet::PartitionFleet;
pub use partition::Partition;
pub use scroller::{ScrollCursor, Scroller};
pub use selector::PartitionSelector;

// Domain re-exports
pub use domain::{
    AliasAction, AliasCatalogue, BulkEntry, BulkMeta, BulkOp, BulkRequest, DeleteByQueryOptions,
    DocumentRequest, Endpoint, Endpoints, IndexTarget, IntoPartitionId, MultiGetRequest,
    MultiSearchRequest, PartitionId, SearchEngine, SearchRequest, SearchType, SelectorType,
};

pub use infrastructure::InMemoryEngine;
