//! Entry point tying configuration, the request pipeline and endpoints
//! together.
//!
//! # Design
//! `Client` owns one `Request` (shared with every endpoint it hands out) and
//! a registry of endpoint constructors. Endpoints are built lazily on first
//! use and cached for the client's lifetime. The cache sits behind a mutex so
//! a client shared between threads constructs each endpoint exactly once.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::config::ClientConfig;
use crate::endpoint::{studly, Endpoint, EndpointRegistry, SharedEndpoint};
use crate::error::ApiError;
use crate::executor::{Executor, UreqExecutor};
use crate::request::Request;

/// Header carrying the client secret.
pub const SECRET_HEADER: &str = "X-Client-Secret";

pub struct Client {
    request: Arc<Request>,
    endpoints: EndpointRegistry,
    cache: Mutex<HashMap<String, SharedEndpoint>>,
}

impl Client {
    /// Build a client that talks to `config.domain()` through a ureq agent.
    pub fn new(config: ClientConfig, endpoints: EndpointRegistry) -> Result<Self, ApiError> {
        let executor = Arc::new(UreqExecutor::from_config(&config));
        Self::with_executor(&config, executor, endpoints)
    }

    pub fn with_executor(
        config: &ClientConfig,
        executor: Arc<dyn Executor>,
        endpoints: EndpointRegistry,
    ) -> Result<Self, ApiError> {
        config.validate()?;

        let mut request = Request::new(config.domain(), executor);
        if let Some(secret) = config.secret() {
            request.set_header(SECRET_HEADER, secret);
        }

        Ok(Self {
            request: Arc::new(request),
            endpoints,
            cache: Mutex::new(HashMap::new()),
        })
    }

    pub fn request(&self) -> &Arc<Request> {
        &self.request
    }

    /// The endpoint registered as `name`, constructed on first access.
    ///
    /// Fails with `InvalidEndpoint` when nothing is registered under `name`
    /// or when it was registered as a type other than `E`.
    pub fn endpoint<E: Endpoint>(&self, name: &str) -> Result<Arc<E>, ApiError> {
        let key = studly(name);
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);

        let shared = match cache.get(&key) {
            Some(shared) => shared.clone(),
            None => {
                let shared = self
                    .endpoints
                    .construct(&key, self.request.clone())
                    .ok_or_else(|| ApiError::InvalidEndpoint(name.to_string()))?;
                debug!(endpoint = %key, "constructed endpoint");
                cache.insert(key, shared.clone());
                shared
            }
        };

        shared
            .downcast::<E>()
            .map_err(|_| ApiError::InvalidEndpoint(name.to_string()))
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("request", &self.request)
            .field("endpoints", &self.endpoints)
            .finish_non_exhaustive()
    }
}
