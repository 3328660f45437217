//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → security (CORS, authorizer gate)
//!     → request.rs (request ID, decode target URL)
//!     → upstream (fetch, validate)
//!     → response.rs (stream body back)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{decode_target, MakeRequestUuid, TargetUrl, X_REQUEST_ID};
pub use server::{HttpServer, ServerError};
