//! Tasknest core: the concurrency and eventing heart of the task tracker.
//!
//! The crate is split the same way the runtime is:
//!
//! - [`domain`]: tasks, users, status/priority vocabulary, version tokens
//! - [`database`]: repository ports plus Postgres and in-memory adapters
//! - [`service`]: domain rules layered over the repositories
//! - [`broker`]: RabbitMQ topology, durable publisher, manual-ack consumer
//! - [`scanner`]: the periodic claim-and-publish worker loop
//! - [`client`]: readiness polling and in-flight request deduplication for
//!   API consumers
//!
//! Two invariants thread through everything: every task mutation is gated on
//! a per-row version token, and the due-scan claim flips `due_notified_at`
//! from NULL to a concrete instant in a single atomic statement so no two
//! scanner instances ever claim the same row.

pub mod broker;
pub mod client;
pub mod config;
pub mod database;
pub mod domain;
pub mod error;
pub mod events;
pub mod query;
pub mod scanner;
pub mod service;

pub use error::{CoreError, Result};
