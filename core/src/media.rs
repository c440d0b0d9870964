//! URL variants for file-like attributes.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// Variant name used when none is requested.
pub const DEFAULT_VARIANT: &str = "original";

/// A named set of URLs for one uploaded file, e.g. `original` and
/// `thumbnail`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Media {
    variants: Map<String, Value>,
}

impl Media {
    /// Wrap a raw attribute value. Anything other than a JSON object yields
    /// an empty media set.
    pub fn new(value: Value) -> Self {
        match value {
            Value::Object(variants) => Self { variants },
            _ => Self::default(),
        }
    }

    pub fn has_media(&self) -> bool {
        !self.variants.is_empty()
    }

    /// URL of the `original` variant, or `""` when absent.
    pub fn url(&self) -> &str {
        self.url_or(DEFAULT_VARIANT, "")
    }

    /// URL of `variant`, or `default` when the variant is missing or not a
    /// string.
    pub fn url_or<'a>(&'a self, variant: &str, default: &'a str) -> &'a str {
        self.variants
            .get(variant)
            .and_then(Value::as_str)
            .unwrap_or(default)
    }

    pub fn variants(&self) -> impl Iterator<Item = &str> {
        self.variants.keys().map(String::as_str)
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.variants.clone())
    }
}

impl Serialize for Media {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.variants.serialize(serializer)
    }
}
