//! HTTP API.
//!
//! Exposes exam extraction and share links as JSON endpoints under
//! `/api/`. `api_router()` returns a `Router` that can be mounted on
//! any axum server; `start_server_on()` runs it in the background.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use router::api_router;
pub use server::{start_server_on, ApiServer};
pub use types::ApiContext;
