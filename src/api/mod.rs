//! Inbound HTTP API.
//!
//! Thin axum layer over `DocumentProcessor`. Each handler validates its
//! JSON body, runs the blocking pipeline on a dedicated worker and maps
//! `PipelineError` onto a structured JSON error.
//!
//! `api_router()` returns a composable `Router`; `server` owns the
//! listener lifecycle.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{serve, start_server_on, ApiServer};
pub use types::ApiContext;
