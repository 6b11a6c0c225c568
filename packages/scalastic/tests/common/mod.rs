//! Common test utilities for scalastic
//!
//! Fixtures shared by the integration suites.

#![allow(dead_code)]

use scalastic::{Config, DocumentRequest, InMemoryEngine, Partition, PartitionFleet};
use serde_json::{json, Value};
use std::sync::{Arc, Once};

static TRACING: Once = Once::new();

/// Install a test subscriber once; filter with `RUST_LOG`
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Engine with the given physical indices and a fleet on the default config
pub fn fleet_with(indices: &[&str]) -> (Arc<InMemoryEngine>, PartitionFleet) {
    fleet_with_config(indices, Config::new())
}

pub fn fleet_with_config(indices: &[&str], config: Config) -> (Arc<InMemoryEngine>, PartitionFleet) {
    init_tracing();
    let engine = Arc::new(InMemoryEngine::new());
    for index in indices {
        engine.create_index(index);
    }
    let fleet = PartitionFleet::new(engine.clone(), config);
    (engine, fleet)
}

/// Index `subject` documents with ids `ids` into `partition`
pub async fn index_docs(partition: &Partition, ids: impl IntoIterator<Item = u32>) {
    for id in ids {
        partition
            .index(
                DocumentRequest::new()
                    .doc_type("test")
                    .id(id)
                    .body(json!({"subject": format!("Test {}", id)})),
            )
            .await
            .unwrap();
    }
}

/// `_id`s of the hits in a search response
pub fn hit_ids(response: &Value) -> Vec<String> {
    response["hits"]["hits"]
        .as_array()
        .map(|hits| {
            hits.iter()
                .filter_map(|hit| hit["_id"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
