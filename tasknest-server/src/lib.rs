//! # Tasknest Server
//!
//! REST API over the tasknest core: CRUD and filtered listing for tasks and
//! users, with optimistic concurrency carried through conditional-request
//! headers.
//!
//! The server is built on Axum and uses:
//! - PostgreSQL for persistent storage
//! - version tokens (base64 in `If-Match`) to serialize concurrent writes
//! - a correlation id on every response for cross-process tracing

pub mod config;
pub mod dto;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;
