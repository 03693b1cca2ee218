//! HTTP JSON API.
//!
//! Routes are nested under `/api/`. Every request passes through the
//! audit middleware, which tags it with a request id and records it in
//! the core access log.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{start_api_server, ApiServer};
pub use types::ApiContext;
