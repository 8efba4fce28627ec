//! HTTP route handlers.

pub mod baskets;
pub mod health;
pub mod metrics;
