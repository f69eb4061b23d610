//! # heritage-core
//!
//! Core crate for Heritage Admin. Contains the configuration schemas and
//! the unified error system shared by every other crate.
//!
//! This crate has **no** internal dependencies on other Heritage crates.

pub mod config;
pub mod error;
pub mod result;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
