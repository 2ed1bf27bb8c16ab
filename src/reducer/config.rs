//! Reducer configuration

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use super::metadata::deep_merge;
use crate::error::StreamError;
use crate::types::DataPart;

/// Callback receiving every `data` chunk, transient ones included.
pub type DataHandler = Arc<dyn Fn(&DataPart) + Send + Sync>;

/// Coalesces repeated data chunks of one `dataType` into a single part.
pub trait DataPartReducer: Send + Sync {
    /// New data of the existing part after `incoming` arrived.
    fn reduce(&self, current: &Value, incoming: &Value) -> Value;
}

/// Keeps only the latest payload (status lines, progress).
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplaceLatest;

impl DataPartReducer for ReplaceLatest {
    fn reduce(&self, _current: &Value, incoming: &Value) -> Value {
        incoming.clone()
    }
}

/// Deep-merges object payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeObjects;

impl DataPartReducer for MergeObjects {
    fn reduce(&self, current: &Value, incoming: &Value) -> Value {
        deep_merge(current.clone(), incoming)
    }
}

/// Collects payloads into an array.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppendItems;

impl DataPartReducer for AppendItems {
    fn reduce(&self, current: &Value, incoming: &Value) -> Value {
        let mut items = match current {
            Value::Array(items) => items.clone(),
            other => vec![other.clone()],
        };
        items.push(incoming.clone());
        Value::Array(items)
    }
}

/// JSON schema that merged message metadata must satisfy.
#[derive(Clone)]
pub struct MetadataSchema {
    schema: Arc<Value>,
    validator: Arc<jsonschema::Validator>,
}

impl std::fmt::Debug for MetadataSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataSchema")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl MetadataSchema {
    /// Compile a schema. Fails with `StreamError::Configuration` when the
    /// schema itself is invalid.
    pub fn new(schema: Value) -> Result<Self, StreamError> {
        let validator = jsonschema::validator_for(&schema)
            .map_err(|e| StreamError::Configuration(format!("invalid metadata schema: {e}")))?;
        Ok(Self {
            schema: Arc::new(schema),
            validator: Arc::new(validator),
        })
    }

    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// All validation failures joined into one message.
    pub fn validate(&self, instance: &Value) -> Result<(), String> {
        let errors: Vec<String> = self
            .validator
            .iter_errors(instance)
            .map(|e| e.to_string())
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.join("; "))
        }
    }
}

/// Reducer configuration.
///
/// Limits guard against runaway streams: once a limit is hit the offending
/// chunk is dropped (or truncated) and an anomaly is recorded.
#[derive(Clone, Default)]
pub struct ReducerConfig {
    /// Maximum number of parts in one message
    pub max_parts: Option<usize>,
    /// Maximum accumulated bytes across text and reasoning spans
    pub max_text_bytes: Option<usize>,
    pub metadata_schema: Option<MetadataSchema>,
    /// Data reducers keyed by `dataType`
    pub data_reducers: HashMap<String, Arc<dyn DataPartReducer>>,
    pub on_data: Option<DataHandler>,
}

impl std::fmt::Debug for ReducerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut reducers: Vec<&String> = self.data_reducers.keys().collect();
        reducers.sort();
        f.debug_struct("ReducerConfig")
            .field("max_parts", &self.max_parts)
            .field("max_text_bytes", &self.max_text_bytes)
            .field("metadata_schema", &self.metadata_schema)
            .field("data_reducers", &reducers)
            .field("has_on_data", &self.on_data.is_some())
            .finish()
    }
}

impl ReducerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_parts(mut self, max_parts: usize) -> Self {
        self.max_parts = Some(max_parts);
        self
    }

    pub fn with_max_text_bytes(mut self, max_text_bytes: usize) -> Self {
        self.max_text_bytes = Some(max_text_bytes);
        self
    }

    pub fn with_metadata_schema(mut self, schema: MetadataSchema) -> Self {
        self.metadata_schema = Some(schema);
        self
    }

    pub fn with_data_reducer<R>(mut self, data_type: impl Into<String>, reducer: R) -> Self
    where
        R: DataPartReducer + 'static,
    {
        self.data_reducers.insert(data_type.into(), Arc::new(reducer));
        self
    }

    pub fn with_on_data<F>(mut self, handler: F) -> Self
    where
        F: Fn(&DataPart) + Send + Sync + 'static,
    {
        self.on_data = Some(Arc::new(handler));
        self
    }
}
