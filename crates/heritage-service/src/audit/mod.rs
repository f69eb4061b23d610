//! Audit recording.

pub mod interceptor;
pub mod recorder;

pub use interceptor::ResponseInterceptor;
pub use recorder::AuditRecorder;
