//! Axum middleware stack.

pub mod audit;
pub mod cors;
pub mod logging;
