//! Per-resource façades and the registry that names them.
//!
//! # Design
//! An endpoint wraps the shared `Request` and turns responses into models
//! and collections for one API resource. Endpoints are registered under a
//! logical name at startup; names are normalized to StudlyCase so
//! `user_profiles`, `user-profiles` and `UserProfiles` resolve alike.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::collection::Collection;
use crate::error::ApiError;
use crate::model::{Model, ModelDefinition};
use crate::request::Request;

pub trait Endpoint: Send + Sync + 'static {
    fn new(request: Arc<Request>) -> Self
    where
        Self: Sized;

    fn request(&self) -> &Request;

    /// GET `path` and hydrate the response's `data` into one model.
    fn fetch_model<P: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &P,
        definition: &Arc<ModelDefinition>,
    ) -> Result<Model, ApiError>
    where
        Self: Sized,
    {
        let response = self.request().get(path, query)?;
        Ok(Model::from_response(definition.clone(), &response))
    }

    /// GET `path` and hydrate `{data, meta}` into a collection.
    fn fetch_collection<P: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &P,
        definition: &Arc<ModelDefinition>,
    ) -> Result<Collection, ApiError>
    where
        Self: Sized,
    {
        let response = self.request().get(path, query)?;
        Collection::new(response, definition.clone())
    }
}

pub(crate) type SharedEndpoint = Arc<dyn Any + Send + Sync>;
type Factory = Arc<dyn Fn(Arc<Request>) -> SharedEndpoint + Send + Sync>;

/// Endpoint constructors by normalized name.
#[derive(Clone, Default)]
pub struct EndpointRegistry {
    factories: HashMap<String, Factory>,
}

impl EndpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<E: Endpoint>(&mut self, name: &str) -> &mut Self {
        let factory: Factory = Arc::new(|request| Arc::new(E::new(request)) as SharedEndpoint);
        self.factories.insert(studly(name), factory);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(&studly(name))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Build the endpoint registered under the already normalized `key`.
    pub(crate) fn construct(&self, key: &str, request: Arc<Request>) -> Option<SharedEndpoint> {
        self.factories.get(key).map(|factory| factory(request))
    }
}

impl fmt::Debug for EndpointRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("EndpointRegistry").field("names", &names).finish()
    }
}

/// `user_profiles` / `user-profiles` / `user profiles` → `UserProfiles`.
pub fn studly(name: &str) -> String {
    name.split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}
