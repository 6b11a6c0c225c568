//! In-Memory Search Engine (for testing)
//!
//! BTreeMap-backed implementation of [`SearchEngine`] with alias
//! resolution, alias filters, scan/scroll paging and atomic alias updates.
//! Every port call is recorded so tests can assert on the exact requests a
//! partition sends.
//!
//! Queries support `match_all`, `term`, `terms`, `match`, `ids`, `bool`
//! (`must`/`filter`/`must_not`/`should`) and `filtered`; anything else
//! matches nothing.
//!
//! NOT for production use.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::domain::{
    AliasAction, AliasCatalogue, AliasMetadata, BulkAction, BulkEntry, BulkOp, BulkRequest,
    DocumentRequest, MultiGetRequest, MultiSearchRequest, SearchEngine, SearchRequest, SearchType,
};
use crate::error::{PartitionError, Result};

/// Page size when a search request sets none
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Document type used when a request names none
pub const DEFAULT_DOC_TYPE: &str = "doc";

/// One recorded port call
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Search(SearchRequest),
    MultiSearch(MultiSearchRequest),
    Get(DocumentRequest),
    MultiGet(MultiGetRequest),
    Scroll { scroll_id: String, scroll: String },
    Index(DocumentRequest),
    Create(DocumentRequest),
    Delete(DocumentRequest),
    Bulk(BulkRequest),
    GetAliases(Option<Vec<String>>),
    UpdateAliases(Vec<AliasAction>),
    PutMapping {
        index: String,
        doc_type: String,
        mapping: Value,
    },
}

#[derive(Debug, Clone)]
struct StoredDoc {
    doc_type: String,
    source: Value,
    version: u64,
    routing: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct IndexState {
    aliases: BTreeMap<String, AliasMetadata>,
    mappings: BTreeMap<String, Value>,
    docs: BTreeMap<String, StoredDoc>,
}

#[derive(Debug)]
struct ScrollState {
    hits: Vec<Value>,
    offset: usize,
    size: usize,
}

#[derive(Debug, Default)]
struct EngineState {
    indices: BTreeMap<String, IndexState>,
    scrolls: HashMap<String, ScrollState>,
    next_scroll: u64,
    next_id: u64,
}

#[derive(Clone, Default)]
pub struct InMemoryEngine {
    state: Arc<RwLock<EngineState>>,
    calls: Arc<Mutex<Vec<EngineCall>>>,
}

impl InMemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Test setup (not recorded)
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Create a physical index; existing indices are left alone
    pub fn create_index(&self, name: &str) {
        self.state
            .write()
            .indices
            .entry(name.to_string())
            .or_default();
    }

    /// Attach an unfiltered alias to a physical index
    pub fn add_alias(&self, index: &str, alias: &str) -> Result<()> {
        let action = AliasAction::Add(crate::domain::AliasSpec {
            index: index.to_string(),
            alias: alias.to_string(),
            filter: None,
            routing: None,
        });
        self.state.write().update_aliases(std::slice::from_ref(&action))
    }

    /// Store a document directly, creating the index when missing
    pub fn put_document(&self, index: &str, doc_type: &str, id: &str, source: Value) -> Result<()> {
        let mut state = self.state.write();
        if state.write_target(index).is_err() {
            state.indices.entry(index.to_string()).or_default();
        }
        state.put(index, doc_type, Some(id.to_string()), source, false, None)?;
        Ok(())
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Inspection
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Source of a document in a physical index
    pub fn document(&self, index: &str, id: &str) -> Option<Value> {
        self.state
            .read()
            .indices
            .get(index)
            .and_then(|state| state.docs.get(id))
            .map(|doc| doc.source.clone())
    }

    pub fn document_count(&self, index: &str) -> usize {
        self.state
            .read()
            .indices
            .get(index)
            .map_or(0, |state| state.docs.len())
    }

    pub fn mapping(&self, index: &str, doc_type: &str) -> Option<Value> {
        self.state
            .read()
            .indices
            .get(index)
            .and_then(|state| state.mappings.get(doc_type))
            .cloned()
    }

    /// Number of open scroll contexts
    pub fn open_scrolls(&self) -> usize {
        self.state.read().scrolls.len()
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    pub fn recorded_searches(&self) -> Vec<SearchRequest> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                EngineCall::Search(request) => Some(request.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn recorded_scroll_windows(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                EngineCall::Scroll { scroll, .. } => Some(scroll.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn recorded_bulks(&self) -> Vec<BulkRequest> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                EngineCall::Bulk(request) => Some(request.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn recorded_alias_updates(&self) -> Vec<Vec<AliasAction>> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                EngineCall::UpdateAliases(actions) => Some(actions.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: EngineCall) {
        self.calls.lock().push(call);
    }
}

impl std::fmt::Debug for InMemoryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("InMemoryEngine")
            .field("indices", &state.indices.keys().collect::<Vec<_>>())
            .field("calls", &self.calls.lock().len())
            .finish()
    }
}

#[async_trait]
impl SearchEngine for InMemoryEngine {
    async fn search(&self, request: SearchRequest) -> Result<Value> {
        self.record(EngineCall::Search(request.clone()));
        self.state.write().search(&request)
    }

    async fn msearch(&self, request: MultiSearchRequest) -> Result<Value> {
        self.record(EngineCall::MultiSearch(request.clone()));
        self.state.write().msearch(&request)
    }

    async fn get(&self, request: DocumentRequest) -> Result<Value> {
        self.record(EngineCall::Get(request.clone()));
        let state = self.state.read();
        let index = require_index(request.index.as_deref())?;
        let id = require_id(request.id.as_deref())?;
        state.lookup(index, request.doc_type.as_deref(), id)
    }

    async fn mget(&self, request: MultiGetRequest) -> Result<Value> {
        self.record(EngineCall::MultiGet(request.clone()));
        self.state.read().mget(&request)
    }

    async fn scroll(&self, scroll_id: &str, scroll: &str) -> Result<Value> {
        self.record(EngineCall::Scroll {
            scroll_id: scroll_id.to_string(),
            scroll: scroll.to_string(),
        });
        self.state.write().scroll(scroll_id)
    }

    async fn index(&self, request: DocumentRequest) -> Result<Value> {
        self.record(EngineCall::Index(request.clone()));
        self.state.write().put_request(request, false)
    }

    async fn create(&self, request: DocumentRequest) -> Result<Value> {
        self.record(EngineCall::Create(request.clone()));
        self.state.write().put_request(request, true)
    }

    async fn delete(&self, request: DocumentRequest) -> Result<Value> {
        self.record(EngineCall::Delete(request.clone()));
        let mut state = self.state.write();
        let index = require_index(request.index.as_deref())?;
        let id = require_id(request.id.as_deref())?;
        state.delete(index, id, request.routing.as_deref())
    }

    async fn bulk(&self, request: BulkRequest) -> Result<Value> {
        self.record(EngineCall::Bulk(request.clone()));
        self.state.write().bulk(&request)
    }

    async fn get_aliases(&self, names: Option<&[String]>) -> Result<AliasCatalogue> {
        self.record(EngineCall::GetAliases(names.map(<[String]>::to_vec)));
        Ok(self.state.read().get_aliases(names))
    }

    async fn update_aliases(&self, actions: &[AliasAction]) -> Result<()> {
        self.record(EngineCall::UpdateAliases(actions.to_vec()));
        self.state.write().update_aliases(actions)
    }

    async fn put_mapping(&self, index: &str, doc_type: &str, mapping: Value) -> Result<()> {
        self.record(EngineCall::PutMapping {
            index: index.to_string(),
            doc_type: doc_type.to_string(),
            mapping: mapping.clone(),
        });
        let mut state = self.state.write();
        for (target, _) in state.read_targets(index)? {
            if let Some(target) = state.indices.get_mut(&target) {
                target.mappings.insert(doc_type.to_string(), mapping.clone());
            }
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Engine state
// ═══════════════════════════════════════════════════════════════════════════

impl EngineState {
    /// Physical indices behind `name`, with the alias filter to apply
    fn read_targets(&self, name: &str) -> Result<Vec<(String, Option<Value>)>> {
        if self.indices.contains_key(name) {
            return Ok(vec![(name.to_string(), None)]);
        }
        let targets: Vec<_> = self
            .indices
            .iter()
            .filter_map(|(index, state)| {
                state
                    .aliases
                    .get(name)
                    .map(|meta| (index.clone(), meta.filter.clone()))
            })
            .collect();
        if targets.is_empty() {
            return Err(index_missing(name));
        }
        Ok(targets)
    }

    /// The single physical index writes to `name` land in, with the
    /// alias index routing
    fn write_target(&self, name: &str) -> Result<(String, Option<String>)> {
        if self.indices.contains_key(name) {
            return Ok((name.to_string(), None));
        }
        let mut targets = self.indices.iter().filter_map(|(index, state)| {
            state
                .aliases
                .get(name)
                .map(|meta| (index.clone(), meta.index_routing.clone()))
        });
        match (targets.next(), targets.next()) {
            (Some(target), None) => Ok(target),
            (Some(_), Some(_)) => Err(PartitionError::engine(format!(
                "illegal_argument_exception: Alias [{}] has more than one indices associated with it",
                name
            ))),
            (None, _) => Err(index_missing(name)),
        }
    }

    /// Search routing of `alias` on `index`
    fn alias_routing(&self, index: &str, alias: &str) -> Option<String> {
        self.indices.get(index)?.aliases.get(alias)?.search_routing.clone()
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Search
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    fn matching_hits(&self, request: &SearchRequest) -> Result<Vec<Value>> {
        let name = require_index(request.index.as_deref())?;
        let query = request.body.as_ref().and_then(|body| body.get("query"));
        let with_source = request.source != Some(false);

        let mut hits = Vec::new();
        for (index, filter) in self.read_targets(name)? {
            let Some(state) = self.indices.get(&index) else {
                continue;
            };
            for (id, doc) in &state.docs {
                if request
                    .doc_type
                    .as_deref()
                    .map_or(false, |doc_type| doc_type != doc.doc_type)
                {
                    continue;
                }
                let visible = filter
                    .as_ref()
                    .map_or(true, |filter| matches(filter, id, &doc.source));
                if visible && query.map_or(true, |query| matches(query, id, &doc.source)) {
                    hits.push(hit(&index, id, doc, with_source));
                }
            }
        }
        Ok(hits)
    }

    fn search(&mut self, request: &SearchRequest) -> Result<Value> {
        let hits = self.matching_hits(request)?;
        let total = hits.len();
        let size = request.size.unwrap_or(DEFAULT_PAGE_SIZE);

        let mut response = json!({"took": 0, "timed_out": false});
        let page = match &request.scroll {
            Some(_) => {
                let offset = match request.search_type {
                    Some(SearchType::Scan) => 0,
                    _ => size.min(total),
                };
                let page = hits[..offset].to_vec();
                self.next_scroll += 1;
                let scroll_id = format!("scroll-{}", self.next_scroll);
                self.scrolls.insert(
                    scroll_id.clone(),
                    ScrollState { hits, offset, size },
                );
                response["_scroll_id"] = json!(scroll_id);
                page
            }
            None => hits.into_iter().take(size).collect(),
        };
        response["hits"] = json!({"total": total, "max_score": 1.0, "hits": page});
        Ok(response)
    }

    fn msearch(&mut self, request: &MultiSearchRequest) -> Result<Value> {
        let mut responses = Vec::new();
        let mut entries = request.body.iter();

        while let Some(entry) = entries.next() {
            // `{search: body, index?, type?}` or a header line followed by a body line
            let (header, body) = match entry.get("search") {
                Some(body) => (entry, body.clone()),
                None => (entry, entries.next().cloned().unwrap_or_else(|| json!({}))),
            };

            let mut search = SearchRequest::new();
            search.index = header
                .get("index")
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| request.index.clone());
            search.doc_type = header
                .get("type")
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| request.doc_type.clone());
            search.size = body
                .get("size")
                .and_then(Value::as_u64)
                .map(|size| size as usize);
            search.body = Some(body);

            responses.push(
                self.search(&search)
                    .unwrap_or_else(|err| json!({"error": err.message})),
            );
        }

        Ok(json!({ "responses": responses }))
    }

    fn scroll(&mut self, scroll_id: &str) -> Result<Value> {
        let state = self.scrolls.get_mut(scroll_id).ok_or_else(|| {
            PartitionError::engine(format!(
                "search_context_missing_exception: No search context found for id [{}]",
                scroll_id
            ))
        })?;

        let end = (state.offset + state.size).min(state.hits.len());
        let page = state.hits[state.offset..end].to_vec();
        state.offset = end;
        let total = state.hits.len();

        if page.is_empty() {
            self.scrolls.remove(scroll_id);
        }
        Ok(json!({
            "_scroll_id": scroll_id,
            "took": 0,
            "timed_out": false,
            "hits": {"total": total, "hits": page}
        }))
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Documents
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    fn lookup(&self, name: &str, doc_type: Option<&str>, id: &str) -> Result<Value> {
        for (index, _) in self.read_targets(name)? {
            let found = self
                .indices
                .get(&index)
                .and_then(|state| state.docs.get(id))
                .filter(|doc| doc_type.map_or(true, |doc_type| doc_type == doc.doc_type));
            if let Some(doc) = found {
                return Ok(json!({
                    "_index": index,
                    "_type": doc.doc_type,
                    "_id": id,
                    "_version": doc.version,
                    "found": true,
                    "_source": doc.source
                }));
            }
        }
        Ok(json!({
            "_index": name,
            "_type": doc_type.unwrap_or(DEFAULT_DOC_TYPE),
            "_id": id,
            "found": false
        }))
    }

    fn mget(&self, request: &MultiGetRequest) -> Result<Value> {
        let default_index = request.index.as_deref();
        let default_type = request.doc_type.as_deref();
        let mut docs = Vec::new();

        if let Some(ids) = request.body.get("ids").and_then(Value::as_array) {
            let index = require_index(default_index)?;
            for id in ids {
                let id = scalar_string(id).ok_or_else(|| invalid_id(id))?;
                docs.push(self.lookup(index, default_type, &id)?);
            }
        } else if let Some(specs) = request.body.get("docs").and_then(Value::as_array) {
            for spec in specs {
                let index = spec
                    .get("_index")
                    .and_then(Value::as_str)
                    .or(default_index);
                let doc_type = spec.get("_type").and_then(Value::as_str).or(default_type);
                let id = spec
                    .get("_id")
                    .and_then(scalar_string)
                    .ok_or_else(|| invalid_id(spec))?;
                docs.push(self.lookup(require_index(index)?, doc_type, &id)?);
            }
        } else {
            return Err(PartitionError::engine(
                "action_request_validation_exception: no documents to get",
            ));
        }

        Ok(json!({ "docs": docs }))
    }

    fn put_request(&mut self, request: DocumentRequest, create: bool) -> Result<Value> {
        let index = require_index(request.index.as_deref())?.to_string();
        let doc_type = request
            .doc_type
            .unwrap_or_else(|| DEFAULT_DOC_TYPE.to_string());
        let source = request.body.unwrap_or_else(|| json!({}));
        self.put(&index, &doc_type, request.id, source, create, request.routing)
    }

    fn put(
        &mut self,
        name: &str,
        doc_type: &str,
        id: Option<String>,
        source: Value,
        create: bool,
        routing: Option<String>,
    ) -> Result<Value> {
        let (index, alias_routing) = self.write_target(name)?;
        let routing = routing.or(alias_routing);
        let id = match id {
            Some(id) => id,
            None => {
                self.next_id += 1;
                format!("auto-{}", self.next_id)
            }
        };
        let state = self
            .indices
            .get_mut(&index)
            .ok_or_else(|| index_missing(&index))?;

        let version = match state.docs.get(&id) {
            Some(_) if create => {
                return Err(PartitionError::engine(format!(
                    "document_already_exists_exception: [{}][{}]: document already exists",
                    doc_type, id
                )))
            }
            Some(existing) => existing.version + 1,
            None => 1,
        };
        state.docs.insert(
            id.clone(),
            StoredDoc {
                doc_type: doc_type.to_string(),
                source,
                version,
                routing,
            },
        );

        Ok(json!({
            "_index": index,
            "_type": doc_type,
            "_id": id,
            "_version": version,
            "created": version == 1
        }))
    }

    /// Partial `doc` update of an existing document, no upserts
    fn update(&mut self, name: &str, doc_type: &str, id: Option<&str>, payload: Value) -> Result<Value> {
        let id = require_id(id)?;
        let (index, _) = self.write_target(name)?;
        let state = self
            .indices
            .get_mut(&index)
            .ok_or_else(|| index_missing(&index))?;
        let Some(doc) = state.docs.get_mut(id) else {
            return Err(PartitionError::engine(format!(
                "document_missing_exception: [{}][{}]: document missing",
                doc_type, id
            )));
        };
        if let Some(partial) = payload.get("doc").cloned() {
            merge(&mut doc.source, partial);
        }
        doc.version += 1;
        Ok(json!({
            "_index": index,
            "_type": doc.doc_type,
            "_id": id,
            "_version": doc.version
        }))
    }

    /// Routed documents are only found with their own routing value
    fn delete(&mut self, name: &str, id: &str, routing: Option<&str>) -> Result<Value> {
        for (index, _) in self.read_targets(name)? {
            let routing = routing
                .map(str::to_string)
                .or_else(|| self.alias_routing(&index, name));
            let Some(state) = self.indices.get_mut(&index) else {
                continue;
            };
            if state.docs.get(id).map_or(true, |doc| doc.routing != routing) {
                continue;
            }
            if let Some(doc) = state.docs.remove(id) {
                return Ok(json!({
                    "_index": index,
                    "_type": doc.doc_type,
                    "_id": id,
                    "_version": doc.version + 1,
                    "found": true
                }));
            }
        }
        Ok(json!({"_index": name, "_id": id, "found": false}))
    }

    fn bulk(&mut self, request: &BulkRequest) -> Result<Value> {
        let mut items = Vec::new();
        let mut entries = request.body.iter();

        while let Some(entry) = entries.next() {
            let action = match entry {
                BulkEntry::Action(action) => action,
                BulkEntry::Payload(body) => {
                    return Err(PartitionError::engine(format!(
                        "parse_exception: Malformed action/metadata line, expected an action but found {}",
                        body
                    )))
                }
            };
            let payload = match (action.op, &action.meta.data) {
                (BulkOp::Delete, _) => None,
                (_, Some(data)) => Some(data.clone()),
                (op, None) => match entries.next() {
                    Some(BulkEntry::Payload(body)) => Some(body.clone()),
                    _ => {
                        return Err(PartitionError::engine(format!(
                            "parse_exception: Missing document source for [{}]",
                            op.as_str()
                        )))
                    }
                },
            };
            items.push(self.bulk_item(request, action, payload));
        }

        let errors = items.iter().any(|item| {
            item.as_object()
                .and_then(|item| item.values().next())
                .map_or(false, |result| result.get("error").is_some())
        });
        Ok(json!({"took": 0, "errors": errors, "items": items}))
    }

    fn bulk_item(&mut self, request: &BulkRequest, action: &BulkAction, payload: Option<Value>) -> Value {
        let meta = &action.meta;
        let index = meta
            .index
            .as_deref()
            .or(request.index.as_deref())
            .unwrap_or_default();
        let doc_type = meta
            .doc_type
            .as_deref()
            .or(request.doc_type.as_deref())
            .unwrap_or(DEFAULT_DOC_TYPE);
        let source = payload.unwrap_or_else(|| json!({}));

        let outcome = match action.op {
            BulkOp::Index => self
                .put(index, doc_type, meta.id.clone(), source, false, meta.routing.clone())
                .map(|result| with_status(result, None)),
            BulkOp::Create => self
                .put(index, doc_type, meta.id.clone(), source, true, meta.routing.clone())
                .map(|result| with_status(result, Some(201))),
            BulkOp::Update => self
                .update(index, doc_type, meta.id.as_deref(), source)
                .map(|result| with_status(result, Some(200))),
            BulkOp::Delete => self.write_target(index).and_then(|(target, alias_routing)| {
                let routing = meta.routing.as_deref().or(alias_routing.as_deref());
                self.delete(&target, require_id(meta.id.as_deref())?, routing)
            })
                .map(|result| {
                    let status = if result["found"] == json!(true) { 200 } else { 404 };
                    with_status(result, Some(status))
                }),
        };

        let result = outcome.unwrap_or_else(|err| {
            let status = if err.message.contains("already_exists") { 409 } else { 400 };
            json!({
                "_index": index,
                "_type": doc_type,
                "_id": meta.id,
                "status": status,
                "error": err.message
            })
        });

        let mut item = Map::new();
        item.insert(action.op.as_str().to_string(), result);
        Value::Object(item)
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Aliases
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    fn get_aliases(&self, names: Option<&[String]>) -> AliasCatalogue {
        let mut catalogue = AliasCatalogue::new();
        for (index, state) in &self.indices {
            if names.is_none() {
                catalogue.insert_index(index);
            }
            for (alias, meta) in &state.aliases {
                let wanted = names.map_or(true, |names| {
                    names.iter().any(|pattern| alias_matches(pattern, alias))
                });
                if wanted {
                    catalogue.insert(index, alias, meta.clone());
                }
            }
        }
        catalogue
    }

    /// Validate and apply every action, or none of them
    fn update_aliases(&mut self, actions: &[AliasAction]) -> Result<()> {
        let mut staged: BTreeMap<String, BTreeMap<String, AliasMetadata>> = self
            .indices
            .iter()
            .map(|(index, state)| (index.clone(), state.aliases.clone()))
            .collect();

        for action in actions {
            let aliases = staged
                .get_mut(action.index())
                .ok_or_else(|| index_missing(action.index()))?;
            match action {
                AliasAction::Add(spec) => {
                    if self.indices.contains_key(&spec.alias) {
                        return Err(PartitionError::engine(format!(
                            "invalid_alias_name_exception: an index exists with the same name as the alias [{}]",
                            spec.alias
                        )));
                    }
                    aliases.insert(
                        spec.alias.clone(),
                        AliasMetadata {
                            filter: spec.filter.clone(),
                            index_routing: spec.routing.clone(),
                            search_routing: spec.routing.clone(),
                        },
                    );
                }
                AliasAction::Remove(alias) => {
                    if aliases.remove(&alias.alias).is_none() {
                        return Err(PartitionError::engine(format!(
                            "aliases_missing_exception: aliases [{}] missing on [{}]",
                            alias.alias, alias.index
                        )));
                    }
                }
            }
        }

        for (index, aliases) in staged {
            if let Some(state) = self.indices.get_mut(&index) {
                state.aliases = aliases;
            }
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════════════════════

fn index_missing(name: &str) -> PartitionError {
    PartitionError::engine(format!("index_not_found_exception: no such index [{}]", name))
}

fn invalid_id(value: &Value) -> PartitionError {
    PartitionError::engine(format!(
        "action_request_validation_exception: invalid document id in {}",
        value
    ))
}

fn require_index(index: Option<&str>) -> Result<&str> {
    index
        .filter(|index| !index.is_empty())
        .ok_or_else(|| PartitionError::engine("action_request_validation_exception: index is missing"))
}

fn require_id(id: Option<&str>) -> Result<&str> {
    id.filter(|id| !id.is_empty())
        .ok_or_else(|| PartitionError::engine("action_request_validation_exception: id is missing"))
}

fn alias_matches(pattern: &str, alias: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => alias.starts_with(prefix),
        None => pattern == alias,
    }
}

fn hit(index: &str, id: &str, doc: &StoredDoc, with_source: bool) -> Value {
    let mut hit = json!({
        "_index": index,
        "_type": doc.doc_type,
        "_id": id,
        "_score": 1.0
    });
    if let Some(routing) = &doc.routing {
        hit["_routing"] = json!(routing);
    }
    if with_source {
        hit["_source"] = doc.source.clone();
    }
    hit
}

fn with_status(mut result: Value, status: Option<u16>) -> Value {
    let status = status.unwrap_or(if result["created"] == json!(true) { 201 } else { 200 });
    result["status"] = json!(status);
    result
}

fn merge(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                merge(target.entry(key).or_insert(Value::Null), value);
            }
        }
        (target, patch) => *target = patch,
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn same_scalar(actual: &Value, expected: &Value) -> bool {
    actual == expected
        || matches!((scalar_string(actual), scalar_string(expected)), (Some(a), Some(b)) if a == b)
}

fn field<'a>(source: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(source, |node, segment| node.get(segment))
}

fn field_matches(id: &str, source: &Value, name: &str, test: impl Fn(&Value) -> bool) -> bool {
    if name == "_id" {
        return test(&Value::String(id.to_string()));
    }
    match field(source, name) {
        Some(Value::Array(values)) => values.iter().any(|value| test(value)),
        Some(value) => test(value),
        None => false,
    }
}

fn clauses(value: Option<&Value>) -> Vec<&Value> {
    match value {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(other) => vec![other],
        None => Vec::new(),
    }
}

fn matches(query: &Value, id: &str, source: &Value) -> bool {
    let Some((kind, clause)) = query.as_object().and_then(|query| query.iter().next()) else {
        return true;
    };

    match kind.as_str() {
        "match_all" => true,
        "term" => clause.as_object().map_or(false, |terms| {
            terms.iter().all(|(name, expected)| {
                let expected = expected.get("value").unwrap_or(expected);
                field_matches(id, source, name, |actual| same_scalar(actual, expected))
            })
        }),
        "terms" => clause.as_object().map_or(false, |terms| {
            terms.iter().all(|(name, expected)| {
                let expected = clauses(Some(expected));
                field_matches(id, source, name, |actual| {
                    expected.iter().any(|value| same_scalar(actual, value))
                })
            })
        }),
        "match" => clause.as_object().map_or(false, |fields| {
            fields.iter().all(|(name, expected)| {
                let expected = expected.get("query").unwrap_or(expected);
                field_matches(id, source, name, |actual| match (actual, expected) {
                    (Value::String(actual), Value::String(expected)) => {
                        actual.to_lowercase().contains(&expected.to_lowercase())
                    }
                    (actual, expected) => same_scalar(actual, expected),
                })
            })
        }),
        "ids" => clauses(clause.get("values"))
            .into_iter()
            .any(|value| scalar_string(value).as_deref() == Some(id)),
        "bool" => {
            let all = |key: &str| {
                clauses(clause.get(key))
                    .into_iter()
                    .all(|query| matches(query, id, source))
            };
            let should = clauses(clause.get("should"));
            all("must")
                && all("filter")
                && !clauses(clause.get("must_not"))
                    .into_iter()
                    .any(|query| matches(query, id, source))
                && (should.is_empty() || should.into_iter().any(|query| matches(query, id, source)))
        }
        "filtered" => ["query", "filter"].into_iter().all(|key| {
            clause
                .get(key)
                .map_or(true, |query| matches(query, id, source))
        }),
        _ => false,
    }
}
