//! Typed view over the session metadata bag
//!
//! Storage keeps metadata as an open JSON object so collectors and future
//! features can attach extra keys. The engine itself only touches the keys
//! listed in [`RECOGNIZED_KEYS`] and always goes through the accessors below.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const KEY_DIFF_IDS: &str = "diff_ids";
pub const KEY_BROWSER_EVENT_IDS: &str = "browser_event_ids";
pub const KEY_SKILL_KEYS: &str = "skill_keys";
pub const KEY_TOP_DOMAINS: &str = "top_domains";
pub const KEY_RAG_REFS: &str = "rag_refs";
pub const KEY_TAGS: &str = "tags";
pub const KEY_METADATA_VERSION: &str = "metadata_version";

/// Current version of the recognized key set.
pub const METADATA_VERSION: u64 = 1;

pub const RECOGNIZED_KEYS: [&str; 6] =
    [KEY_DIFF_IDS, KEY_BROWSER_EVENT_IDS, KEY_SKILL_KEYS, KEY_TOP_DOMAINS, KEY_RAG_REFS, KEY_TAGS];

/// Reference to a retrieved memory snippet that informed a summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagRef {
    #[serde(rename = "type")]
    pub ref_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub similarity: f64,
}

/// Session metadata bag with typed accessors for the recognized keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionMetadata(Map<String, Value>);

impl SessionMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a raw JSON value; anything other than an object yields an empty
    /// bag.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Raw access for keys outside the recognized set.
    pub fn get_raw(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert_raw(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn version(&self) -> u64 {
        self.0.get(KEY_METADATA_VERSION).and_then(Value::as_u64).unwrap_or(0)
    }

    pub fn diff_ids(&self) -> Vec<i64> {
        self.ids(KEY_DIFF_IDS)
    }

    pub fn set_diff_ids(&mut self, ids: &[i64]) {
        self.put(KEY_DIFF_IDS, ids);
    }

    pub fn browser_event_ids(&self) -> Vec<i64> {
        self.ids(KEY_BROWSER_EVENT_IDS)
    }

    pub fn set_browser_event_ids(&mut self, ids: &[i64]) {
        self.put(KEY_BROWSER_EVENT_IDS, ids);
    }

    pub fn skill_keys(&self) -> Vec<String> {
        self.strings(KEY_SKILL_KEYS)
    }

    pub fn set_skill_keys(&mut self, keys: &[String]) {
        self.put(KEY_SKILL_KEYS, keys);
    }

    /// The skill index counts as present even when empty: an enriched
    /// session with no skills must not be picked up again.
    pub fn has_skill_index(&self) -> bool {
        self.0.contains_key(KEY_SKILL_KEYS)
    }

    pub fn top_domains(&self) -> Vec<String> {
        self.strings(KEY_TOP_DOMAINS)
    }

    pub fn set_top_domains(&mut self, domains: &[String]) {
        self.put(KEY_TOP_DOMAINS, domains);
    }

    pub fn tags(&self) -> Vec<String> {
        self.strings(KEY_TAGS)
    }

    pub fn set_tags(&mut self, tags: &[String]) {
        self.put(KEY_TAGS, tags);
    }

    pub fn rag_refs(&self) -> Vec<RagRef> {
        self.0
            .get(KEY_RAG_REFS)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
            .unwrap_or_default()
    }

    pub fn set_rag_refs(&mut self, refs: &[RagRef]) {
        self.put(KEY_RAG_REFS, refs);
    }

    fn ids(&self, key: &str) -> Vec<i64> {
        match self.0.get(key) {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_i64).collect(),
            _ => Vec::new(),
        }
    }

    fn strings(&self, key: &str) -> Vec<String> {
        match self.0.get(key) {
            Some(Value::Array(items)) => {
                items.iter().filter_map(Value::as_str).map(str::to_owned).collect()
            }
            _ => Vec::new(),
        }
    }

    fn put<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) {
        // Plain vectors of ids/strings/refs always serialize.
        let encoded = serde_json::to_value(value).unwrap_or(Value::Null);
        self.0.insert(key.to_owned(), encoded);
        self.0.insert(KEY_METADATA_VERSION.to_owned(), Value::from(METADATA_VERSION));
    }
}
