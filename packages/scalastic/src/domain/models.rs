//! Domain models
//!
//! Value types shared by the partition layer and the engine port.
//! Everything here is plain data: no engine calls, no alias naming policy
//! (see [`crate::config::Config`] for that).

use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::error::{PartitionError, Result};

// ═══════════════════════════════════════════════════════════════════════════
// Partition identity
// ═══════════════════════════════════════════════════════════════════════════

/// Partition identifier
///
/// Ids are kept as strings of word characters (`\w+`), the only shape that
/// decodes back out of an alias name. Integer ids are accepted at the
/// boundary and converted back to numbers only when stamped on documents
/// (see [`PartitionId::to_value`]).
///
/// # Examples
///
/// ```rust
/// use scalastic::domain::{PartitionId, SelectorType};
///
/// let id = PartitionId::from(7u64);
/// assert_eq!(id.as_str(), "7");
/// assert_eq!(id.to_value(SelectorType::Long), serde_json::json!(7));
/// assert_eq!(id.to_value(SelectorType::String), serde_json::json!("7"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PartitionId(String);

/// Id shape shared with the alias decode pattern
pub(crate) const PARTITION_ID_PATTERN: &str = r"\w+";

static PARTITION_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^{}$", PARTITION_ID_PATTERN)).expect("partition id pattern is valid")
});

impl PartitionId {
    /// Create a partition id, rejecting empty values and anything outside `\w+`
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(PartitionError::invalid_argument("id is empty!"));
        }
        if !PARTITION_ID_RE.is_match(&id) {
            return Err(PartitionError::invalid_argument(format!(
                "id '{}' must contain only word characters",
                id
            )));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// JSON value stamped on documents and used in the isolation filter
    ///
    /// Numeric selector types get a number when the id parses as one, so the
    /// term filter matches the mapped field type.
    pub fn to_value(&self, selector_type: SelectorType) -> Value {
        match selector_type {
            SelectorType::String => Value::String(self.0.clone()),
            SelectorType::Long | SelectorType::Integer => self
                .0
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or_else(|_| Value::String(self.0.clone())),
        }
    }
}

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PartitionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PartitionId {
    type Error = PartitionError;

    fn try_from(id: String) -> Result<Self> {
        Self::new(id)
    }
}

impl From<PartitionId> for String {
    fn from(id: PartitionId) -> Self {
        id.0
    }
}

macro_rules! partition_id_from_unsigned {
    ($($t:ty),*) => {
        $(
            impl From<$t> for PartitionId {
                fn from(id: $t) -> Self {
                    Self(id.to_string())
                }
            }
        )*
    };
}

partition_id_from_unsigned!(u8, u16, u32, u64, usize);

/// Conversion into a validated [`PartitionId`]
///
/// Lets callers pass `7`, `"7"`, a `String` or an existing id wherever an id
/// is expected.
pub trait IntoPartitionId {
    fn into_partition_id(self) -> Result<PartitionId>;
}

impl IntoPartitionId for PartitionId {
    fn into_partition_id(self) -> Result<PartitionId> {
        Ok(self)
    }
}

impl IntoPartitionId for &PartitionId {
    fn into_partition_id(self) -> Result<PartitionId> {
        Ok(self.clone())
    }
}

impl IntoPartitionId for &str {
    fn into_partition_id(self) -> Result<PartitionId> {
        PartitionId::new(self)
    }
}

impl IntoPartitionId for String {
    fn into_partition_id(self) -> Result<PartitionId> {
        PartitionId::new(self)
    }
}

macro_rules! into_partition_id_unsigned {
    ($($t:ty),*) => {
        $(
            impl IntoPartitionId for $t {
                fn into_partition_id(self) -> Result<PartitionId> {
                    Ok(PartitionId::from(self))
                }
            }
        )*
    };
}

into_partition_id_unsigned!(u8, u16, u32, u64, usize);

// Unsuffixed literals infer as i32, so signed ids stay accepted here.
// A minus sign never decodes back out of an alias name.
macro_rules! into_partition_id_signed {
    ($($t:ty),*) => {
        $(
            impl IntoPartitionId for $t {
                fn into_partition_id(self) -> Result<PartitionId> {
                    if self < 0 {
                        return Err(PartitionError::invalid_argument(format!(
                            "id {} is negative",
                            self
                        )));
                    }
                    PartitionId::new(self.to_string())
                }
            }
        )*
    };
}

into_partition_id_signed!(i32, i64);

/// Engine field type declared for the selector field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectorType {
    String,
    #[default]
    Long,
    Integer,
}

impl SelectorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectorType::String => "string",
            SelectorType::Long => "long",
            SelectorType::Integer => "integer",
        }
    }
}

impl FromStr for SelectorType {
    type Err = PartitionError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "string" => Ok(SelectorType::String),
            "long" => Ok(SelectorType::Long),
            "integer" => Ok(SelectorType::Integer),
            other => Err(PartitionError::config(format!(
                "Unsupported partition_selector_type '{}'. Valid types: string, long, integer",
                other
            ))),
        }
    }
}

impl fmt::Display for SelectorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Endpoints
// ═══════════════════════════════════════════════════════════════════════════

/// Physical index (and optional routing) backing an alias
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub index: String,
    pub routing: Option<String>,
}

impl Endpoint {
    pub fn new(index: impl Into<String>, routing: Option<String>) -> Self {
        Self {
            index: index.into(),
            routing,
        }
    }
}

/// Resolved placement of a partition
///
/// `write` is the target of the index alias (at most one), `read` lists the
/// targets of the search alias in catalogue order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    pub write: Option<Endpoint>,
    pub read: Vec<Endpoint>,
}

impl Endpoints {
    pub fn is_readonly(&self) -> bool {
        self.write.is_none()
    }

    pub fn is_unbound(&self) -> bool {
        self.write.is_none() && self.read.is_empty()
    }
}

/// Destination for a new index alias (write target)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexTarget {
    pub index: String,
    pub routing: Option<String>,
}

impl IndexTarget {
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            routing: None,
        }
    }

    pub fn routing(mut self, routing: impl Into<String>) -> Self {
        self.routing = Some(routing.into());
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Alias catalogue
// ═══════════════════════════════════════════════════════════════════════════

/// Metadata the engine keeps for one alias on one physical index
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AliasMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "opt_string_or_number"
    )]
    pub index_routing: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "opt_string_or_number"
    )]
    pub search_routing: Option<String>,
}

/// Aliases attached to one physical index
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexAliases {
    #[serde(default)]
    pub aliases: BTreeMap<String, AliasMetadata>,
}

/// Alias catalogue snapshot, `physical index -> aliases`
///
/// Same JSON shape as the engine's get-aliases response:
/// `{"index1": {"aliases": {"scalastic_1_index": {}}}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AliasCatalogue(BTreeMap<String, IndexAliases>);

impl AliasCatalogue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        index: impl Into<String>,
        alias: impl Into<String>,
        metadata: AliasMetadata,
    ) {
        self.0
            .entry(index.into())
            .or_default()
            .aliases
            .insert(alias.into(), metadata);
    }

    /// Register a physical index without aliases
    pub fn insert_index(&mut self, index: impl Into<String>) {
        self.0.entry(index.into()).or_default();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &IndexAliases)> {
        self.0.iter().map(|(index, aliases)| (index.as_str(), aliases))
    }

    /// Every `(physical index, alias name)` pair in catalogue order
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter().flat_map(|(index, data)| {
            data.aliases.keys().map(move |alias| (index, alias.as_str()))
        })
    }

    /// Physical indices carrying `alias`, with its metadata
    pub fn indices_with(&self, alias: &str) -> Vec<(&str, &AliasMetadata)> {
        self.iter()
            .filter_map(|(index, data)| data.aliases.get(alias).map(|meta| (index, meta)))
            .collect()
    }

    /// True when at least one physical index carries at least one alias
    pub fn has_aliases(&self) -> bool {
        self.0.values().any(|data| !data.aliases.is_empty())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One add/remove step of an alias transaction
///
/// Serializes in the engine's wire shape: `{"add": {...}}` /
/// `{"remove": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AliasAction {
    Add(AliasSpec),
    Remove(AliasRef),
}

impl AliasAction {
    pub fn remove(index: impl Into<String>, alias: impl Into<String>) -> Self {
        AliasAction::Remove(AliasRef {
            index: index.into(),
            alias: alias.into(),
        })
    }

    pub fn index(&self) -> &str {
        match self {
            AliasAction::Add(spec) => &spec.index,
            AliasAction::Remove(r) => &r.index,
        }
    }

    pub fn alias(&self) -> &str {
        match self {
            AliasAction::Add(spec) => &spec.alias,
            AliasAction::Remove(r) => &r.alias,
        }
    }
}

/// Alias to add on a physical index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AliasSpec {
    pub index: String,
    pub alias: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing: Option<String>,
}

/// Alias to remove from a physical index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasRef {
    pub index: String,
    pub alias: String,
}

// ═══════════════════════════════════════════════════════════════════════════
// Bulk stream
// ═══════════════════════════════════════════════════════════════════════════

/// Bulk action verb
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkOp {
    Create,
    Index,
    Update,
    Delete,
}

impl BulkOp {
    pub const ALL: [BulkOp; 4] = [BulkOp::Create, BulkOp::Index, BulkOp::Update, BulkOp::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            BulkOp::Create => "create",
            BulkOp::Index => "index",
            BulkOp::Update => "update",
            BulkOp::Delete => "delete",
        }
    }

    /// Whether documents written by this verb carry the selector field
    ///
    /// Updates are partial and must not overwrite the partition field.
    pub fn stamps_payload(&self) -> bool {
        matches!(self, BulkOp::Create | BulkOp::Index)
    }

    fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == key)
    }
}

/// Metadata of a bulk action entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkMeta {
    #[serde(rename = "_index", default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    #[serde(rename = "_type", default, skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,
    #[serde(
        rename = "_id",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "opt_string_or_number"
    )]
    pub id: Option<String>,
    #[serde(rename = "_routing", default, skip_serializing_if = "Option::is_none")]
    pub routing: Option<String>,
    /// Inline payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Anything else (`_version`, `_retry_on_conflict`, ...) passes through
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BulkMeta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn doc_type(mut self, doc_type: impl Into<String>) -> Self {
        self.doc_type = Some(doc_type.into());
        self
    }

    pub fn id(mut self, id: impl ToString) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn routing(mut self, routing: impl Into<String>) -> Self {
        self.routing = Some(routing.into());
        self
    }

    pub fn data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Bulk action entry: a verb plus its metadata
#[derive(Debug, Clone, PartialEq)]
pub struct BulkAction {
    pub op: BulkOp,
    pub meta: BulkMeta,
}

/// One entry of a bulk stream
///
/// A `Payload` belongs to the closest preceding `Action` without inline data.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkEntry {
    Action(BulkAction),
    Payload(Value),
}

impl BulkEntry {
    pub fn action(op: BulkOp, meta: BulkMeta) -> Self {
        BulkEntry::Action(BulkAction { op, meta })
    }

    pub fn create(meta: BulkMeta) -> Self {
        Self::action(BulkOp::Create, meta)
    }

    pub fn index(meta: BulkMeta) -> Self {
        Self::action(BulkOp::Index, meta)
    }

    pub fn update(meta: BulkMeta) -> Self {
        Self::action(BulkOp::Update, meta)
    }

    pub fn delete(meta: BulkMeta) -> Self {
        Self::action(BulkOp::Delete, meta)
    }

    pub fn payload(body: Value) -> Self {
        BulkEntry::Payload(body)
    }

    pub fn op(&self) -> Option<BulkOp> {
        match self {
            BulkEntry::Action(action) => Some(action.op),
            BulkEntry::Payload(_) => None,
        }
    }

    /// Parse an entry from its wire JSON
    ///
    /// An object with a single `create`/`index`/`update`/`delete` key whose
    /// value is an object is an action; anything else is a payload.
    pub fn from_value(value: Value) -> Result<Self> {
        let op = match &value {
            Value::Object(map) if map.len() == 1 => map
                .iter()
                .next()
                .filter(|(_, meta)| meta.is_object())
                .and_then(|(key, _)| BulkOp::from_key(key)),
            _ => None,
        };

        match (op, value) {
            (Some(op), Value::Object(map)) => {
                let meta = map.into_iter().next().map(|(_, meta)| meta).unwrap_or_default();
                Ok(Self::action(op, serde_json::from_value(meta)?))
            }
            (_, value) => Ok(BulkEntry::Payload(value)),
        }
    }

    /// Wire JSON of this entry
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

impl Serialize for BulkEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            BulkEntry::Action(action) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(action.op.as_str(), &action.meta)?;
                map.end()
            }
            BulkEntry::Payload(body) => body.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for BulkEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        BulkEntry::from_value(value).map_err(de::Error::custom)
    }
}

fn opt_string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Request options
// ═══════════════════════════════════════════════════════════════════════════

/// Search execution mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    QueryThenFetch,
    DfsQueryThenFetch,
    Count,
    /// Cursor-only initial page, hits are fetched with scroll
    Scan,
}

/// Search request
///
/// `index` is overwritten by partition handles with the search endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchRequest {
    pub index: Option<String>,
    pub doc_type: Option<String>,
    /// Query DSL body; `None` matches everything
    pub body: Option<Value>,
    pub search_type: Option<SearchType>,
    /// Scroll window (e.g. `"1m"`), enables a cursor
    pub scroll: Option<String>,
    /// Page size
    pub size: Option<usize>,
    /// `Some(false)` disables `_source` in hits
    pub source: Option<bool>,
    pub routing: Option<String>,
}

impl SearchRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn doc_type(mut self, doc_type: impl Into<String>) -> Self {
        self.doc_type = Some(doc_type.into());
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn search_type(mut self, search_type: SearchType) -> Self {
        self.search_type = Some(search_type);
        self
    }

    pub fn scroll(mut self, scroll: impl Into<String>) -> Self {
        self.scroll = Some(scroll.into());
        self
    }

    pub fn size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }

    pub fn source(mut self, source: bool) -> Self {
        self.source = Some(source);
        self
    }
}

/// Multi-search request: one query body per entry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultiSearchRequest {
    pub index: Option<String>,
    pub doc_type: Option<String>,
    pub body: Vec<Value>,
}

impl MultiSearchRequest {
    pub fn new(body: Vec<Value>) -> Self {
        Self {
            body,
            ..Self::default()
        }
    }
}

/// Single-document request (get, index, create, delete)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentRequest {
    pub index: Option<String>,
    pub doc_type: Option<String>,
    pub id: Option<String>,
    pub body: Option<Value>,
    pub routing: Option<String>,
    pub refresh: Option<bool>,
}

impl DocumentRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn doc_type(mut self, doc_type: impl Into<String>) -> Self {
        self.doc_type = Some(doc_type.into());
        self
    }

    pub fn id(mut self, id: impl ToString) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn routing(mut self, routing: impl Into<String>) -> Self {
        self.routing = Some(routing.into());
        self
    }

    pub fn refresh(mut self, refresh: bool) -> Self {
        self.refresh = Some(refresh);
        self
    }
}

/// Multi-get request, body is `{"ids": [...]}` or `{"docs": [...]}`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultiGetRequest {
    pub index: Option<String>,
    pub doc_type: Option<String>,
    pub body: Value,
}

impl MultiGetRequest {
    pub fn new(body: Value) -> Self {
        Self {
            body,
            ..Self::default()
        }
    }

    pub fn doc_type(mut self, doc_type: impl Into<String>) -> Self {
        self.doc_type = Some(doc_type.into());
        self
    }
}

/// Bulk request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkRequest {
    /// Default index for actions without `_index`
    pub index: Option<String>,
    pub doc_type: Option<String>,
    pub body: Vec<BulkEntry>,
    pub refresh: Option<bool>,
}

impl BulkRequest {
    pub fn new(body: Vec<BulkEntry>) -> Self {
        Self {
            body,
            ..Self::default()
        }
    }

    pub fn refresh(mut self, refresh: bool) -> Self {
        self.refresh = Some(refresh);
        self
    }
}

/// Options for paged deletion
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteByQueryOptions {
    pub doc_type: Option<String>,
    /// Query DSL body; `None` deletes every document of the partition
    pub body: Option<Value>,
    /// Hits per page, must be non-zero. Default: 100
    pub size: usize,
    /// Scroll window, must be non-empty. Default: `"1m"`
    pub scroll: String,
}

impl Default for DeleteByQueryOptions {
    fn default() -> Self {
        Self {
            doc_type: None,
            body: None,
            size: 100,
            scroll: "1m".to_string(),
        }
    }
}

impl DeleteByQueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    pub fn scroll(mut self, scroll: impl Into<String>) -> Self {
        self.scroll = scroll.into();
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════
