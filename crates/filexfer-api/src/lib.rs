//! # filexfer-api
//!
//! HTTP API layer for filexfer built on Axum.
//!
//! Provides the file endpoints, the single-shot upload/download pair, a
//! health probe, optional static asset serving, middleware (CORS, request
//! logging), extractors, DTOs, and error mapping.

pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;
