//! Request and response DTOs.

pub mod request;
pub mod response;

pub use request::AuditQuery;
pub use response::ApiResponse;
