//! Custom Axum extractors.

pub mod client;
pub mod principal;

pub use client::ClientInfo;
pub use principal::CurrentPrincipal;
