//! Paginated collections of hydrated models.
//!
//! # Design
//! A collection is built either from a raw list of items (meta starts empty)
//! or from a whole `Response` shaped `{data: [...], meta: {...}}`. Every item
//! is hydrated into a `Model` up front, in order, so a bad model name or a
//! malformed source fails at construction rather than during iteration.
//!
//! `total()` is memoized by writing the fallback item count back into
//! `meta.pagination.total`. `has_more_pages()` compares
//! `current_page < total_pages` strictly; both default to 0.

use std::fmt;
use std::ops::{Index, IndexMut};
use std::sync::Arc;

use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::error::ApiError;
use crate::model::{Model, ModelDefinition, ModelRegistry};
use crate::path::{get_path, set_path};
use crate::response::Response;

const TOTAL: &str = "pagination.total";
const CURRENT_PAGE: &str = "pagination.current_page";
const TOTAL_PAGES: &str = "pagination.total_pages";

/// What a collection can be built from.
#[derive(Debug, Clone)]
pub enum CollectionSource {
    Items(Vec<Value>),
    Response(Response),
    /// Anything else; building from it fails with `MalformedInput`.
    Other(Value),
}

impl From<Vec<Value>> for CollectionSource {
    fn from(items: Vec<Value>) -> Self {
        CollectionSource::Items(items)
    }
}

impl From<Response> for CollectionSource {
    fn from(response: Response) -> Self {
        CollectionSource::Response(response)
    }
}

impl From<Value> for CollectionSource {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(items) => CollectionSource::Items(items),
            other => CollectionSource::Other(other),
        }
    }
}

#[derive(Clone)]
pub struct Collection {
    definition: Arc<ModelDefinition>,
    items: Vec<Model>,
    meta: Map<String, Value>,
    response: Option<Response>,
}

impl Collection {
    pub fn new(
        source: impl Into<CollectionSource>,
        definition: Arc<ModelDefinition>,
    ) -> Result<Self, ApiError> {
        let (raw, meta, response) = match source.into() {
            CollectionSource::Items(items) => (items, Map::new(), None),
            CollectionSource::Response(response) => {
                let items = match response.get("data") {
                    Some(Value::Array(items)) => items.clone(),
                    other => {
                        let shown = other.map_or_else(|| "null".to_string(), Value::to_string);
                        return Err(ApiError::MalformedInput(shown));
                    }
                };
                let meta = response
                    .get("meta")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default();
                (items, meta, Some(response))
            }
            CollectionSource::Other(value) => return Err(ApiError::MalformedInput(value.to_string())),
        };

        let items: Vec<Model> = raw
            .into_iter()
            .map(|item| Model::hydrate(definition.clone(), item))
            .collect();
        debug!(model = definition.name(), items = items.len(), "hydrated collection");

        Ok(Self {
            definition,
            items,
            meta,
            response,
        })
    }

    /// Resolve `model` in `registry`, then build the collection.
    pub fn for_model(
        source: impl Into<CollectionSource>,
        registry: &ModelRegistry,
        model: &str,
    ) -> Result<Self, ApiError> {
        let definition = registry.resolve(model)?;
        Self::new(source, definition)
    }

    pub fn definition(&self) -> &Arc<ModelDefinition> {
        &self.definition
    }

    /// The response this collection was built from, if any.
    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    /// Total number of items in the data source. Falls back to the number
    /// of loaded items and records it in the meta data.
    ///
    /// A non-numeric total sent by the server is left untouched; the item
    /// count is returned without being recorded.
    pub fn total(&mut self) -> u64 {
        let total = self.items.len() as u64;
        match self.get_meta(TOTAL) {
            Some(value) if !value.is_null() => match as_number(value) {
                Some(reported) => reported.max(0.0) as u64,
                None => {
                    debug!(total = %value, "ignoring non-numeric pagination total");
                    total
                }
            },
            _ => {
                self.set_meta(TOTAL, json!(total));
                total
            }
        }
    }

    pub fn has_more_pages(&self) -> bool {
        let current = self.get_meta(CURRENT_PAGE).and_then(as_number).unwrap_or(0.0);
        let last = self.get_meta(TOTAL_PAGES).and_then(as_number).unwrap_or(0.0);
        current < last
    }

    pub fn get_meta(&self, key: &str) -> Option<&Value> {
        get_path(&self.meta, key)
    }

    pub fn get_meta_or(&self, key: &str, default: Value) -> Value {
        self.get_meta(key).cloned().unwrap_or(default)
    }

    pub fn set_meta(&mut self, key: &str, value: Value) {
        set_path(&mut self.meta, key, value);
    }

    /// A top-level meta key, without dot traversal.
    pub fn meta_value(&self, key: &str) -> Option<&Value> {
        self.meta.get(key)
    }

    pub fn meta(&self) -> &Map<String, Value> {
        &self.meta
    }

    pub fn all(&self) -> &[Model] {
        &self.items
    }

    pub fn into_items(self) -> Vec<Model> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, index: usize) -> bool {
        index < self.items.len()
    }

    pub fn get(&self, index: usize) -> Option<&Model> {
        self.items.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Model> {
        self.items.get_mut(index)
    }

    /// Replace the item at `index`, returning the previous one. An index past
    /// the end appends instead.
    pub fn set(&mut self, index: usize, model: Model) -> Option<Model> {
        match self.items.get_mut(index) {
            Some(slot) => Some(std::mem::replace(slot, model)),
            None => {
                self.items.push(model);
                None
            }
        }
    }

    pub fn push(&mut self, model: Model) {
        self.items.push(model);
    }

    /// Remove the item at `index`; later items shift down.
    pub fn remove(&mut self, index: usize) -> Option<Model> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Model> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Model> {
        self.items.iter_mut()
    }

    /// `{data: [...], meta: {...}}` with each item projected by `to_array`.
    pub fn to_array(&self) -> Value {
        let data: Vec<Value> = self
            .items
            .iter()
            .map(|model| Value::Object(model.to_array()))
            .collect();
        json!({ "data": data, "meta": self.meta })
    }

    pub fn to_json(&self) -> String {
        self.to_array().to_string()
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl Index<usize> for Collection {
    type Output = Model;

    fn index(&self, index: usize) -> &Model {
        &self.items[index]
    }
}

impl IndexMut<usize> for Collection {
    fn index_mut(&mut self, index: usize) -> &mut Model {
        &mut self.items[index]
    }
}

impl IntoIterator for Collection {
    type Item = Model;
    type IntoIter = std::vec::IntoIter<Model>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Model;
    type IntoIter = std::slice::Iter<'a, Model>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<'a> IntoIterator for &'a mut Collection {
    type Item = &'a mut Model;
    type IntoIter = std::slice::IterMut<'a, Model>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter_mut()
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("model", &self.definition.name())
            .field("items", &self.items)
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_json())
    }
}

impl Serialize for Collection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_array().serialize(serializer)
    }
}
