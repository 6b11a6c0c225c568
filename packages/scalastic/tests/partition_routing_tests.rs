//! Partition routing integration tests
//!
//! Alias state machine end to end against the in-memory engine:
//! 1. Unbound -> Active -> ReadOnly transitions
//! 2. Read fan-out after extend
//! 3. Fleet create/delete/list
//! 4. Isolation between partitions sharing an index

mod common;

use common::{fleet_with, fleet_with_config, hit_ids, index_docs};
use pretty_assertions::assert_eq;
use scalastic::{
    AliasCatalogue, Config, DocumentRequest, Endpoint, Endpoints, ErrorKind, IndexTarget,
    SearchEngine, SearchRequest, SelectorType,
};
use serde_json::json;

// ═══════════════════════════════════════════════════════════════════════════
// State machine
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_unbound_partition() {
    let (_engine, fleet) = fleet_with(&["endpoints_1"]);
    let partition = fleet.lookup(1).unwrap();

    assert!(!partition.exists().await.unwrap());
    assert!(partition.is_readonly().await.unwrap());
    assert_eq!(partition.endpoints().await.unwrap(), Endpoints::default());
}

#[tokio::test]
async fn test_repoint_write_destination() {
    let (_engine, fleet) = fleet_with(&["endpoints_1", "endpoints_2"]);
    let partition = fleet.lookup(1).unwrap();

    partition
        .index_to(Some(IndexTarget::new("endpoints_1")))
        .await
        .unwrap();
    assert!(partition.exists().await.unwrap());
    assert!(!partition.is_readonly().await.unwrap());
    assert_eq!(
        partition.endpoints().await.unwrap().write,
        Some(Endpoint::new("endpoints_1", None))
    );

    partition
        .index_to(Some(IndexTarget::new("endpoints_2").routing("123")))
        .await
        .unwrap();
    assert_eq!(
        partition.endpoints().await.unwrap().write,
        Some(Endpoint::new("endpoints_2", Some("123".to_string())))
    );

    partition.index_to(None).await.unwrap();
    assert!(!partition.exists().await.unwrap());
    assert!(partition.is_readonly().await.unwrap());
}

#[tokio::test]
async fn test_extend_enlarges_read_set() {
    let (_engine, fleet) = fleet_with(&["endpoints_1", "endpoints_2"]);
    let partition = fleet.lookup(1).unwrap();

    partition.extend_to("endpoints_1", None).await.unwrap();
    assert_eq!(
        partition.endpoints().await.unwrap().read,
        vec![Endpoint::new("endpoints_1", None)]
    );

    partition.extend_to("endpoints_2", Some("22")).await.unwrap();
    let endpoints = partition.endpoints().await.unwrap();
    assert_eq!(
        endpoints.read,
        vec![
            Endpoint::new("endpoints_1", None),
            Endpoint::new("endpoints_2", Some("22".to_string())),
        ]
    );
    assert_eq!(
        endpoints.write,
        Some(Endpoint::new("endpoints_2", Some("22".to_string())))
    );
}

#[tokio::test]
async fn test_index_to_none_keeps_search_alias() {
    let (engine, fleet) = fleet_with(&["destinations_1", "destinations_2"]);
    let partition = fleet.create("destinations_1", 2, None).await.unwrap();
    assert!(partition.exists().await.unwrap());

    partition.index_to(None).await.unwrap();

    let aliases = partition.aliases().await.unwrap();
    assert_eq!(
        serde_json::to_value(&aliases).unwrap(),
        json!({"destinations_1": {"aliases": {
            "scalastic_2_search": {"filter": {"term": {"scalastic_partition_id": 2}}}
        }}})
    );
    assert!(partition.exists().await.unwrap());
    assert!(partition.is_readonly().await.unwrap());

    // Read-only partitions reject writes at the engine
    let err = partition
        .index(DocumentRequest::new().doc_type("test").id(1))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Engine);
    assert_eq!(engine.document_count("destinations_1"), 0);
}

#[tokio::test]
async fn test_extend_moves_index_alias() {
    let (engine, fleet) = fleet_with(&["destinations_1", "destinations_2"]);
    let partition = fleet.create("destinations_1", 1, None).await.unwrap();
    partition.extend_to("destinations_2", None).await.unwrap();

    let catalogue = engine
        .get_aliases(Some(&["scalastic_1_*".to_string()]))
        .await
        .unwrap();
    assert_eq!(
        serde_json::to_value(&catalogue).unwrap(),
        json!({
            "destinations_1": {"aliases": {
                "scalastic_1_search": {"filter": {"term": {"scalastic_partition_id": 1}}}
            }},
            "destinations_2": {"aliases": {
                "scalastic_1_index": {},
                "scalastic_1_search": {"filter": {"term": {"scalastic_partition_id": 1}}}
            }}
        })
    );
}

#[tokio::test]
async fn test_reads_span_all_indices_after_extend() {
    let (engine, fleet) = fleet_with(&["extend_1", "extend_2"]);
    let partition = fleet.create("extend_1", 1, None).await.unwrap();
    index_docs(&partition, [1, 2]).await;

    partition.extend_to("extend_2", None).await.unwrap();
    index_docs(&partition, [3]).await;

    assert_eq!(engine.document_count("extend_1"), 2);
    assert_eq!(engine.document_count("extend_2"), 1);

    let response = partition
        .search(SearchRequest::new().body(json!({"query": {"match_all": {}}})))
        .await
        .unwrap();
    assert_eq!(response["hits"]["total"], json!(3));

    // Deletes reach documents outside the current write index
    let response = partition
        .delete(DocumentRequest::new().doc_type("test").id(1))
        .await
        .unwrap();
    assert_eq!(response["found"], json!(true));
    assert_eq!(engine.document_count("extend_1"), 1);
}

// ═══════════════════════════════════════════════════════════════════════════
// Fleet
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_fleet_delete_leaves_other_partitions() {
    let (engine, fleet) = fleet_with(&["index1", "index2"]);
    fleet.create("index1", 1, None).await.unwrap();
    fleet.create("index1", 2, None).await.unwrap();
    fleet.lookup(1).unwrap().extend_to("index2", None).await.unwrap();
    fleet.lookup(2).unwrap().extend_to("index2", None).await.unwrap();
    engine.clear_calls();

    fleet.delete(2).await.unwrap();

    let updates = engine.recorded_alias_updates();
    assert_eq!(updates.len(), 1);
    let removed: Vec<(String, String)> = updates[0]
        .iter()
        .map(|action| (action.index().to_string(), action.alias().to_string()))
        .collect();
    assert_eq!(
        removed,
        vec![
            ("index1".to_string(), "scalastic_2_search".to_string()),
            ("index2".to_string(), "scalastic_2_index".to_string()),
            ("index2".to_string(), "scalastic_2_search".to_string()),
        ]
    );

    assert!(!fleet.lookup(2).unwrap().exists().await.unwrap());
    let survivor = fleet.lookup(1).unwrap();
    assert!(survivor.exists().await.unwrap());
    assert_eq!(survivor.endpoints().await.unwrap().read.len(), 2);
}

#[tokio::test]
async fn test_fleet_list_is_recomputed() {
    let (_engine, fleet) = fleet_with(&["list_partitions"]);
    assert!(fleet.list().await.unwrap().is_empty());

    for id in 1..=3 {
        fleet.create("list_partitions", id, None).await.unwrap();
    }
    let listed: Vec<String> = fleet
        .list()
        .await
        .unwrap()
        .iter()
        .map(|partition| partition.id().to_string())
        .collect();
    assert_eq!(listed, vec!["1", "2", "3"]);

    fleet.delete(2).await.unwrap();
    let ids: Vec<String> = fleet.ids().await.unwrap().iter().map(ToString::to_string).collect();
    assert_eq!(ids, vec!["1", "3"]);
}

#[tokio::test]
async fn test_fleet_rejects_ids_that_cannot_decode() {
    let (engine, fleet) = fleet_with(&["index1"]);

    let err = fleet.create("index1", -1, None).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidArgument);
    for id in ["tenant-a", "a.b"] {
        let err = fleet.create("index1", id, None).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
    }
    assert_eq!(fleet.delete(-5i64).await.unwrap_err().kind, ErrorKind::InvalidArgument);

    assert!(engine.recorded_alias_updates().is_empty());
    assert!(fleet.ids().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_word_ids_survive_the_alias_round_trip() {
    let (_engine, fleet) = fleet_with(&["index1"]);
    fleet.create("index1", "tenant_a", None).await.unwrap();
    fleet.create("index1", 0, None).await.unwrap();

    let ids: Vec<String> = fleet.ids().await.unwrap().iter().map(ToString::to_string).collect();
    assert_eq!(ids, vec!["0", "tenant_a"]);

    fleet.delete("tenant_a").await.unwrap();
    assert!(!fleet.lookup("tenant_a").unwrap().exists().await.unwrap());
}

#[tokio::test]
async fn test_create_on_missing_index_is_engine_error() {
    let (_engine, fleet) = fleet_with(&[]);
    let err = fleet.create("missing", 1, None).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Engine);
    assert!(!fleet.lookup(1).unwrap().exists().await.unwrap());
}

// ═══════════════════════════════════════════════════════════════════════════
// Isolation
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_partitions_sharing_an_index_are_isolated() {
    let (_engine, fleet) = fleet_with(&["partition_operations"]);
    fleet.prepare_index("partition_operations").await.unwrap();
    let partition1 = fleet.create("partition_operations", 1, None).await.unwrap();
    let partition2 = fleet.create("partition_operations", 2, None).await.unwrap();

    index_docs(&partition1, [1, 2]).await;

    let empty = partition2
        .search(SearchRequest::new().size(0).body(json!({"query": {"match_all": {}}})))
        .await
        .unwrap();
    assert_eq!(empty["hits"]["total"], json!(0));

    let response = partition1
        .search(SearchRequest::new().doc_type("test"))
        .await
        .unwrap();
    assert_eq!(hit_ids(&response), vec!["1", "2"]);
    assert_eq!(
        response["hits"]["hits"][0]["_source"]["scalastic_partition_id"],
        json!(1)
    );

    partition1
        .delete(DocumentRequest::new().doc_type("test").id(1))
        .await
        .unwrap();
    let response = partition1.search(SearchRequest::new()).await.unwrap();
    assert_eq!(response["hits"]["total"], json!(1));
}

#[tokio::test]
async fn test_string_selector_with_custom_prefix() {
    let config = Config::new()
        .with_partition_prefix("tenants")
        .unwrap()
        .with_partition_selector("meta.tenant")
        .unwrap()
        .with_partition_selector_type(SelectorType::String);
    let (engine, fleet) = fleet_with_config(&["main"], config);
    fleet.prepare_index("main").await.unwrap();

    let acme = fleet.create("main", "acme", None).await.unwrap();
    assert_eq!(acme.index_endpoint(), "tenants_acme_index");
    index_docs(&acme, [1]).await;

    assert_eq!(
        engine.document("main", "1"),
        Some(json!({"subject": "Test 1", "meta": {"tenant": "acme"}}))
    );
    assert_eq!(
        engine.mapping("main", "scalastic"),
        Some(json!({"properties": {
            "meta": {"type": "object", "properties": {"tenant": {"type": "string"}}}
        }}))
    );

    let other = fleet.create("main", "globex", None).await.unwrap();
    let response = other.search(SearchRequest::new()).await.unwrap();
    assert_eq!(response["hits"]["total"], json!(0));

    let ids: Vec<String> = fleet.ids().await.unwrap().iter().map(ToString::to_string).collect();
    assert_eq!(ids, vec!["acme", "globex"]);
}

#[tokio::test]
async fn test_create_existing_document_surfaces_engine_error() {
    let (_engine, fleet) = fleet_with(&["document_create"]);
    let partition = fleet.create("document_create", 1, None).await.unwrap();

    let request = DocumentRequest::new()
        .doc_type("test")
        .id(1)
        .body(json!({"subject": "s"}));
    partition.create(request.clone()).await.unwrap();

    let err = partition.create(request).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Engine);
    assert!(err.message.contains("already exists"));
}

#[tokio::test]
async fn test_aliases_of_unknown_partition_are_empty() {
    let (_engine, fleet) = fleet_with(&["index1"]);
    fleet.create("index1", 1, None).await.unwrap();
    let aliases = fleet.lookup(10).unwrap().aliases().await.unwrap();
    assert_eq!(aliases, AliasCatalogue::new());
}
