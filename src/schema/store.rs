//! Loading and caching of the theme schema document
//!
//! The store is constructed explicitly by the composition root and handed to
//! whoever needs the schema. The first `load()` fetches the document; every
//! later call returns the cached `Arc<RawSchema>`. Overlapping first loads share
//! one fetch, and the fetch runs on its own task so a caller that gives up
//! waiting does not cancel it for the others.

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

use super::error::SchemaLoadError;
use super::node::json_type_name;

// ============================================================================
// Raw Schema
// ============================================================================

/// The unprocessed schema document
#[derive(Debug, Clone, PartialEq)]
pub struct RawSchema {
    root: Value,
}

impl RawSchema {
    pub fn from_value(root: Value) -> Result<Self, SchemaLoadError> {
        match root {
            Value::Object(_) => Ok(Self { root }),
            other => Err(SchemaLoadError::NotAnObject(json_type_name(&other))),
        }
    }

    pub fn from_json(text: &str) -> Result<Self, SchemaLoadError> {
        let root: Value = serde_json::from_str(text)?;
        Self::from_value(root)
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Top-level `properties`
    pub fn properties(&self) -> Option<&Map<String, Value>> {
        self.root.get("properties").and_then(Value::as_object)
    }

    /// Top-level `definitions`
    pub fn definitions(&self) -> Option<&Map<String, Value>> {
        self.root.get("definitions").and_then(Value::as_object)
    }

    /// Look up `definitions[name]`. A missing definition is a normal outcome.
    pub fn definition(&self, name: &str) -> Option<&Value> {
        self.definitions().and_then(|defs| defs.get(name))
    }

    /// Top-level `required` property names
    pub fn required(&self) -> Vec<&str> {
        self.root
            .get("required")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// Visual types declared under `properties.visualStyles.properties`
    pub fn visual_types(&self) -> Vec<&str> {
        self.properties()
            .and_then(|props| props.get("visualStyles"))
            .and_then(|vs| vs.get("properties"))
            .and_then(Value::as_object)
            .map(|visuals| visuals.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

// ============================================================================
// Schema Sources
// ============================================================================

/// Where the schema document comes from
#[async_trait]
pub trait SchemaSource: Send + Sync {
    /// Human-readable location, used in logs and errors
    fn location(&self) -> String;

    /// Fetch the raw document text
    async fn fetch(&self) -> Result<String, SchemaLoadError>;
}

/// Schema document on the local filesystem
pub struct FileSchemaSource {
    path: PathBuf,
}

impl FileSchemaSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl SchemaSource for FileSchemaSource {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch(&self) -> Result<String, SchemaLoadError> {
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => SchemaLoadError::NotFound(self.location()),
                _ => SchemaLoadError::Io {
                    location: self.location(),
                    message: e.to_string(),
                },
            })
    }
}

/// Schema document served over HTTP(S)
pub struct HttpSchemaSource {
    url: String,
    client: reqwest::Client,
}

impl HttpSchemaSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl SchemaSource for HttpSchemaSource {
    fn location(&self) -> String {
        self.url.clone()
    }

    async fn fetch(&self) -> Result<String, SchemaLoadError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| SchemaLoadError::Http {
                location: self.url.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(SchemaLoadError::NotFound(self.url.clone()));
        }
        if !status.is_success() {
            return Err(SchemaLoadError::Http {
                location: self.url.clone(),
                message: format!("unexpected status {}", status),
            });
        }

        response.text().await.map_err(|e| SchemaLoadError::Http {
            location: self.url.clone(),
            message: e.to_string(),
        })
    }
}

/// Schema document held in memory
pub struct StaticSchemaSource {
    text: String,
}

impl StaticSchemaSource {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn from_value(value: &Value) -> Self {
        Self::new(value.to_string())
    }
}

#[async_trait]
impl SchemaSource for StaticSchemaSource {
    fn location(&self) -> String {
        "<in-memory>".to_string()
    }

    async fn fetch(&self) -> Result<String, SchemaLoadError> {
        Ok(self.text.clone())
    }
}

/// Pick a source for a configured location: `http://` and `https://` URLs are
/// fetched over the network, anything else is read from disk.
pub fn source_for(location: &str) -> Arc<dyn SchemaSource> {
    if location.starts_with("http://") || location.starts_with("https://") {
        Arc::new(HttpSchemaSource::new(location))
    } else {
        Arc::new(FileSchemaSource::new(location))
    }
}

// ============================================================================
// Schema Store
// ============================================================================

type LoadFuture = Shared<BoxFuture<'static, Result<Arc<RawSchema>, SchemaLoadError>>>;

enum CacheState {
    Empty,
    Loading { fetch_id: u64, fetch: LoadFuture },
    Ready(Arc<RawSchema>),
}

struct Cache {
    /// Id handed to the next fetch; never reused
    next_fetch_id: u64,
    state: CacheState,
}

/// Cached, single authoritative source of the raw schema
pub struct SchemaStore {
    source: Arc<dyn SchemaSource>,
    cache: Mutex<Cache>,
}

impl SchemaStore {
    pub fn new(source: Arc<dyn SchemaSource>) -> Self {
        Self {
            source,
            cache: Mutex::new(Cache {
                next_fetch_id: 0,
                state: CacheState::Empty,
            }),
        }
    }

    /// Build a store for a file path or URL
    pub fn from_location(location: &str) -> Self {
        Self::new(source_for(location))
    }

    pub fn location(&self) -> String {
        self.source.location()
    }

    fn lock(&self) -> MutexGuard<'_, Cache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load the schema, fetching it only if nothing is cached yet.
    ///
    /// Failures are not memoized: the store goes back to empty and the error is
    /// returned to every caller that shared the failed fetch.
    pub async fn load(&self) -> Result<Arc<RawSchema>, SchemaLoadError> {
        let (fetch_id, fetch) = {
            let mut cache = self.lock();
            match &cache.state {
                CacheState::Ready(schema) => return Ok(schema.clone()),
                CacheState::Loading { fetch_id, fetch } => (*fetch_id, fetch.clone()),
                CacheState::Empty => {
                    let fetch_id = cache.next_fetch_id;
                    cache.next_fetch_id += 1;
                    let fetch = Self::spawn_fetch(self.source.clone());
                    cache.state = CacheState::Loading {
                        fetch_id,
                        fetch: fetch.clone(),
                    };
                    (fetch_id, fetch)
                }
            }
        };

        let result = fetch.await;

        // Only the fetch that is still in flight may settle the cache. A
        // clear_cache() or a retry started after a failure makes this one stale.
        let mut cache = self.lock();
        if matches!(cache.state, CacheState::Loading { fetch_id: current, .. } if current == fetch_id) {
            cache.state = match &result {
                Ok(schema) => CacheState::Ready(schema.clone()),
                Err(_) => CacheState::Empty,
            };
        }
        result
    }

    /// Load the schema before any resolver is built. Same contract as `load()`.
    pub async fn initialize(&self) -> Result<Arc<RawSchema>, SchemaLoadError> {
        self.load().await
    }

    fn spawn_fetch(source: Arc<dyn SchemaSource>) -> LoadFuture {
        let handle = tokio::spawn(async move {
            let location = source.location();
            info!("Loading theme schema from {}", location);
            let text = source.fetch().await?;
            let schema = RawSchema::from_json(&text)?;
            info!(
                "Loaded theme schema from {} ({} definitions, {} visual types)",
                location,
                schema.definitions().map(|d| d.len()).unwrap_or(0),
                schema.visual_types().len()
            );
            Ok::<_, SchemaLoadError>(Arc::new(schema))
        });

        async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => Err(SchemaLoadError::Interrupted(e.to_string())),
            }
        }
        .boxed()
        .shared()
    }

    /// The cached schema, if a load has completed
    pub fn cached(&self) -> Option<Arc<RawSchema>> {
        match &self.lock().state {
            CacheState::Ready(schema) => Some(schema.clone()),
            _ => None,
        }
    }

    /// `definitions[name]` from the cached schema
    pub fn get_definition(&self, name: &str) -> Option<Value> {
        let schema = self.cached()?;
        let definition = schema.definition(name).cloned();
        if definition.is_none() {
            debug!("Schema definition '{}' not found", name);
        }
        definition
    }

    /// Drop all cached state. The next `load()` fetches again.
    pub fn clear_cache(&self) {
        self.lock().state = CacheState::Empty;
        debug!("Theme schema cache cleared");
    }

    /// Clear the cache and load again (development hot reload)
    pub async fn reload(&self) -> Result<Arc<RawSchema>, SchemaLoadError> {
        self.clear_cache();
        let result = self.load().await;
        if let Err(e) = &result {
            warn!("Theme schema reload failed: {}", e);
        }
        result
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "type": "object",
            "required": ["name"],
            "properties": {
                "name": { "type": "string" },
                "visualStyles": {
                    "type": "object",
                    "properties": {
                        "columnChart": { "type": "object" },
                        "card": { "type": "object" }
                    }
                }
            },
            "definitions": {
                "fill": { "type": "object" }
            }
        })
    }

    #[test]
    fn test_raw_schema_accessors() {
        let schema = RawSchema::from_value(sample()).unwrap();
        assert_eq!(schema.required(), vec!["name"]);
        assert!(schema.definition("fill").is_some());
        assert!(schema.definition("gradient").is_none());

        let mut visuals = schema.visual_types();
        visuals.sort();
        assert_eq!(visuals, vec!["card", "columnChart"]);
    }

    #[test]
    fn test_raw_schema_rejects_non_object() {
        let err = RawSchema::from_json("[1, 2]").unwrap_err();
        assert!(matches!(err, SchemaLoadError::NotAnObject("array")));

        let err = RawSchema::from_json("{ not json").unwrap_err();
        assert!(matches!(err, SchemaLoadError::InvalidJson(_)));
    }

    #[tokio::test]
    async fn test_load_is_memoized() {
        let store = SchemaStore::new(Arc::new(StaticSchemaSource::from_value(&sample())));
        assert!(store.cached().is_none());

        let first = store.load().await.unwrap();
        let second = store.load().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(store.cached().is_some());
        assert!(store.get_definition("fill").is_some());
        assert!(store.get_definition("missing").is_none());
    }

    #[tokio::test]
    async fn test_clear_cache_is_idempotent() {
        let store = SchemaStore::new(Arc::new(StaticSchemaSource::from_value(&sample())));
        store.clear_cache();
        store.clear_cache();

        let first = store.load().await.unwrap();
        store.clear_cache();
        assert!(store.cached().is_none());
        assert!(store.get_definition("fill").is_none());

        let second = store.load().await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(*first, *second);
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let store = SchemaStore::from_location("/definitely/not/here/schema.json");
        let err = store.load().await.unwrap_err();
        assert!(matches!(err, SchemaLoadError::NotFound(_)));
        assert!(store.cached().is_none());
    }

    #[tokio::test]
    async fn test_invalid_json_fails_load() {
        let store = SchemaStore::new(Arc::new(StaticSchemaSource::new("{\"type\": ")));
        let err = store.load().await.unwrap_err();
        assert!(matches!(err, SchemaLoadError::InvalidJson(_)));
    }

    #[test]
    fn test_source_for_location() {
        assert_eq!(
            source_for("https://example.com/schema.json").location(),
            "https://example.com/schema.json"
        );
        assert_eq!(source_for("schema.json").location(), "schema.json");
    }
}
