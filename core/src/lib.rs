//! Base layer for typed clients against JSON REST APIs.
//!
//! # Overview
//! Issues HTTP requests through a pluggable executor, turns responses into
//! attribute-bearing models, and groups models into paginated collections.
//!
//! # Design
//! - `Request` owns the host, persistent headers and a shared `Executor`;
//!   every call is one blocking round trip that either returns a decoded
//!   `Response` or fails with an `ApiError`.
//! - `Response` keeps undecodable bodies as raw text instead of failing;
//!   malformed bodies surface as absent keys.
//! - `Model` stores attributes in insertion order. Per-type behavior (media
//!   fields, date fields, get/set mutators) lives in an explicit
//!   `ModelDefinition` table rather than in method names.
//! - `Collection` hydrates `{data, meta}` responses eagerly and derives
//!   pagination state from `meta`.
//! - `Client` and `Endpoint` are thin glue: named endpoint constructors,
//!   built lazily and cached.

pub mod client;
pub mod collection;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod executor;
pub mod http;
pub mod media;
pub mod model;
pub mod path;
pub mod request;
pub mod response;
pub mod testing;
pub mod upload;

pub use client::Client;
pub use collection::{Collection, CollectionSource};
pub use config::ClientConfig;
pub use endpoint::{Endpoint, EndpointRegistry};
pub use error::{ApiError, Result};
pub use executor::{Executor, UreqExecutor};
pub use http::{HeaderSet, HttpMethod, HttpRequest, HttpResponse, TransportError};
pub use media::Media;
pub use model::{Attribute, Model, ModelDefinition, ModelRegistry};
pub use request::Request;
pub use response::{Response, ResponseBody};
pub use upload::Upload;
