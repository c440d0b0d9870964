//! Attribute-bearing models and the definitions that shape them.
//!
//! # Design
//! A `Model` is an ordered list of attributes plus a shared
//! `ModelDefinition`. The definition is the per-type lookup table: which
//! fields hold media, which hold dates, and which fields route reads or
//! writes through a mutator. Mutators are resolved on every access, never at
//! construction, so a model always reflects its definition.
//!
//! Serialization (`to_array`, `to_json`, `Serialize`) projects the stored
//! attributes as they are. Get-mutators are not applied there.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::media::Media;
use crate::response::Response;

/// Format dates are rendered with when a model is serialized.
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Name given to models built without an explicit definition.
pub const PLAIN_MODEL: &str = "Model";

/// A stored attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    Value(Value),
    Media(Media),
    Date(DateTime<Utc>),
}

impl Attribute {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Attribute::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_media(&self) -> Option<&Media> {
        match self {
            Attribute::Media(media) => Some(media),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<&DateTime<Utc>> {
        match self {
            Attribute::Date(date) => Some(date),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_value().and_then(Value::as_str)
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_value().and_then(Value::as_i64)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_value().and_then(Value::as_bool)
    }

    /// JSON projection: media as its variant map, dates as `DATE_FORMAT`.
    pub fn to_value(&self) -> Value {
        match self {
            Attribute::Value(value) => value.clone(),
            Attribute::Media(media) => media.to_value(),
            Attribute::Date(date) => Value::String(date.format(DATE_FORMAT).to_string()),
        }
    }
}

impl From<Value> for Attribute {
    fn from(value: Value) -> Self {
        Attribute::Value(value)
    }
}

impl From<Media> for Attribute {
    fn from(media: Media) -> Self {
        Attribute::Media(media)
    }
}

impl From<DateTime<Utc>> for Attribute {
    fn from(date: DateTime<Utc>) -> Self {
        Attribute::Date(date)
    }
}

/// Read hook: receives the stored value (if any) and returns what callers see.
pub type GetMutator = Arc<dyn Fn(&Model, Option<&Attribute>) -> Option<Attribute> + Send + Sync>;

/// Write hook: owns all handling of the incoming value, including whether
/// and where it is stored.
pub type SetMutator = Arc<dyn Fn(&mut Model, Value) + Send + Sync>;

/// Per-type field table for models.
///
/// ```
/// use apiclient_core::{Attribute, ModelDefinition};
/// use serde_json::Value;
///
/// let article = ModelDefinition::new("Article")
///     .media("cover")
///     .date("published_at")
///     .getter("title", |_, raw| {
///         raw.and_then(Attribute::as_str)
///             .map(|s| Attribute::Value(Value::String(s.to_uppercase())))
///     })
///     .build();
/// assert!(article.is_media("cover"));
/// ```
#[derive(Clone)]
pub struct ModelDefinition {
    name: String,
    media: Vec<String>,
    dates: Vec<String>,
    timestamps: bool,
    getters: HashMap<String, GetMutator>,
    setters: HashMap<String, SetMutator>,
}

impl ModelDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            media: Vec::new(),
            dates: Vec::new(),
            timestamps: false,
            getters: HashMap::new(),
            setters: HashMap::new(),
        }
    }

    /// Declare a field whose values are wrapped in `Media`.
    pub fn media(mut self, field: impl Into<String>) -> Self {
        self.media.push(field.into());
        self
    }

    /// Declare a field whose values are parsed into dates.
    pub fn date(mut self, field: impl Into<String>) -> Self {
        self.dates.push(field.into());
        self
    }

    /// Treat `created_at` and `updated_at` as date fields.
    pub fn timestamps(mut self) -> Self {
        self.timestamps = true;
        self
    }

    pub fn getter<F>(mut self, field: impl Into<String>, mutator: F) -> Self
    where
        F: Fn(&Model, Option<&Attribute>) -> Option<Attribute> + Send + Sync + 'static,
    {
        self.getters.insert(field.into(), Arc::new(mutator));
        self
    }

    pub fn setter<F>(mut self, field: impl Into<String>, mutator: F) -> Self
    where
        F: Fn(&mut Model, Value) + Send + Sync + 'static,
    {
        self.setters.insert(field.into(), Arc::new(mutator));
        self
    }

    pub fn build(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_media(&self, field: &str) -> bool {
        self.media.iter().any(|f| f == field)
    }

    pub fn is_date(&self, field: &str) -> bool {
        self.dates.iter().any(|f| f == field)
            || (self.timestamps && matches!(field, "created_at" | "updated_at"))
    }

    pub fn has_get_mutator(&self, field: &str) -> bool {
        self.getters.contains_key(field)
    }

    pub fn has_set_mutator(&self, field: &str) -> bool {
        self.setters.contains_key(field)
    }
}

impl fmt::Debug for ModelDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut getters: Vec<&String> = self.getters.keys().collect();
        let mut setters: Vec<&String> = self.setters.keys().collect();
        getters.sort();
        setters.sort();
        f.debug_struct("ModelDefinition")
            .field("name", &self.name)
            .field("media", &self.media)
            .field("dates", &self.dates)
            .field("timestamps", &self.timestamps)
            .field("getters", &getters)
            .field("setters", &setters)
            .finish()
    }
}

/// Model definitions by name, populated at startup.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    definitions: HashMap<String, Arc<ModelDefinition>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition under its own name, replacing any previous one.
    pub fn register(&mut self, definition: Arc<ModelDefinition>) -> &mut Self {
        self.definitions.insert(definition.name().to_string(), definition);
        self
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<ModelDefinition>, ApiError> {
        self.definitions
            .get(name)
            .cloned()
            .ok_or_else(|| ApiError::InvalidModel(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }
}

#[derive(Clone)]
pub struct Model {
    definition: Arc<ModelDefinition>,
    attributes: Vec<(String, Attribute)>,
}

impl Model {
    pub fn new(definition: Arc<ModelDefinition>) -> Self {
        Self {
            definition,
            attributes: Vec::new(),
        }
    }

    /// Build a model from a raw item. Only JSON objects contribute
    /// attributes; any other value yields an empty model.
    pub fn hydrate(definition: Arc<ModelDefinition>, raw: Value) -> Self {
        let mut model = Self::new(definition);
        if let Value::Object(attributes) = raw {
            model.fill(attributes);
        }
        model
    }

    /// Build a model from the `data` key of a response.
    pub fn from_response(definition: Arc<ModelDefinition>, response: &Response) -> Self {
        let data = response.get("data").cloned().unwrap_or(Value::Null);
        Self::hydrate(definition, data)
    }

    pub fn definition(&self) -> &Arc<ModelDefinition> {
        &self.definition
    }

    pub fn fill(&mut self, attributes: Map<String, Value>) {
        for (key, value) in attributes {
            self.set_attribute(&key, value);
        }
    }

    /// Assign `value` to `key`, routing through the set-mutator, media and
    /// date rules of the definition.
    pub fn set_attribute(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        let value = value.into();

        if let Some(mutator) = self.definition.setters.get(key).cloned() {
            mutator(self, value);
            return self;
        }

        let attribute = if self.definition.is_media(key) {
            Attribute::Media(Media::new(value))
        } else if self.definition.is_date(key) && is_truthy(&value) {
            match parse_date(&value) {
                Some(date) => Attribute::Date(date),
                None => Attribute::Value(value),
            }
        } else {
            Attribute::Value(value)
        };
        self.set_raw_attribute(key, attribute)
    }

    /// Read `key`, passing the stored value through the get-mutator if one
    /// is defined.
    pub fn get_attribute(&self, key: &str) -> Option<Attribute> {
        let raw = self.raw_attribute(key);
        match self.definition.getters.get(key) {
            Some(mutator) => mutator(self, raw),
            None => raw.cloned(),
        }
    }

    /// The stored value of `key`, bypassing mutators.
    pub fn raw_attribute(&self, key: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, attribute)| attribute)
    }

    /// Store `attribute` under `key` as is. Set-mutators use this to write
    /// without re-entering themselves.
    pub fn set_raw_attribute(&mut self, key: &str, attribute: impl Into<Attribute>) -> &mut Self {
        let attribute = attribute.into();
        match self.attributes.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = attribute,
            None => self.attributes.push((key.to_string(), attribute)),
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<Attribute> {
        self.get_attribute(key)
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        self.set_attribute(key, value)
    }

    /// Whether `key` is stored, regardless of its value.
    pub fn has(&self, key: &str) -> bool {
        self.raw_attribute(key).is_some()
    }

    pub fn media(&self, key: &str) -> Option<Media> {
        match self.get_attribute(key) {
            Some(Attribute::Media(media)) => Some(media),
            _ => None,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn to_array(&self) -> Map<String, Value> {
        self.attributes
            .iter()
            .map(|(k, attribute)| (k.clone(), attribute.to_value()))
            .collect()
    }

    pub fn to_json(&self) -> String {
        Value::Object(self.to_array()).to_string()
    }
}

impl From<Map<String, Value>> for Model {
    fn from(attributes: Map<String, Value>) -> Self {
        let mut model = Model::new(ModelDefinition::new(PLAIN_MODEL).build());
        model.fill(attributes);
        model
    }
}

impl PartialEq for Model {
    fn eq(&self, other: &Self) -> bool {
        self.definition.name == other.definition.name && self.attributes == other.attributes
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("definition", &self.definition.name)
            .field("attributes", &self.attributes)
            .finish()
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_json())
    }
}

impl Serialize for Model {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_array().serialize(serializer)
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty() && s != "0",
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

/// Parse a date attribute. Numbers (and numeric strings) are UNIX seconds;
/// strings may be `YYYY-MM-DD`, `HH:MM:SS` (today, UTC),
/// `YYYY-MM-DDTHH:MM:SSZ` or RFC 3339.
pub fn parse_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => from_timestamp(n.as_f64()?),
        Value::String(s) => parse_date_str(s.trim()),
        _ => None,
    }
}

fn parse_date_str(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(seconds) = s.parse::<f64>() {
        return from_timestamp(seconds);
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    if let Ok(time) = NaiveTime::parse_from_str(s, "%H:%M:%S") {
        return Some(Utc::now().date_naive().and_time(time).and_utc());
    }
    if let Ok(datetime) = NaiveDateTime::parse_from_str(s, DATE_FORMAT) {
        return Some(datetime.and_utc());
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn from_timestamp(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1e9).round() as u32;
    DateTime::from_timestamp(whole as i64, nanos.min(999_999_999))
}
