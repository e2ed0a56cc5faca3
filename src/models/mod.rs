//! Data models for the request and response a script operates on.
//!
//! These are the plain Rust models. The sandbox wraps them in shared
//! handles before exposing them to scripts as `req` and `res`.

pub mod body;
pub mod query;
pub mod request;
pub mod response;

pub use body::BodyOptions;
pub use request::{ExecutionMode, ExecutionPlatform, HttpRequest, RequestSnapshot};
pub use response::{HttpResponse, ResponseSnapshot};
