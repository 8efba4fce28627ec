//! Basket read models for the query side.
//!
//! This crate keeps one denormalized document per basket in sync with the
//! event store:
//! - [`BasketProjection`], the read model built from a hydrated basket
//! - [`ReadModelStore`] for persisting projections (in memory or PostgreSQL)
//! - [`ChangeNotifier`] for observing stream changes with bounded retry
//! - [`ProjectionWorker`] for rebuilding a projection from full history

pub mod error;
pub mod notifier;
pub mod postgres;
pub mod projection;
pub mod read_model;
pub mod worker;

pub use error::{NotifierError, ProjectionError, Result};
pub use notifier::{ChangeNotifier, NotificationHandler, RetryPolicy, Subscription};
pub use postgres::PostgresReadModelStore;
pub use projection::{BasketProjection, ProjectionItem};
pub use read_model::{InMemoryReadModelStore, ReadModelStore};
pub use worker::ProjectionWorker;
