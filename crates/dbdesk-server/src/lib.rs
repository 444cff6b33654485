//! HTTP API for dbdesk
//!
//! Stateless MongoDB proxy routes, the AI proxy and plan execution, served
//! with axum. Driver results are normalized before they are returned and AI
//! payloads are redacted before they leave.

pub mod ai;
pub mod error;
pub mod executor;
pub mod handlers;
pub mod ops;
pub mod pool;
pub mod request;
pub mod server;

pub use ai::{AiProxy, SseDecoder};
pub use error::{ApiError, ApiResult};
pub use pool::ClientPool;
pub use server::{AppState, DbdeskServer, router};
