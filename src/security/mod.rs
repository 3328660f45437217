//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → cors.rs (preflight, Access-Control-* response headers)
//!     → access_control.rs (authorizer gate: proceed or 401)
//!     → Pass to handler
//! ```
//!
//! # Design Decisions
//! - Fail closed: shared-secret mode without a secret never authorizes
//! - Authorization runs before any upstream I/O
//! - Policy is a trait object chosen once at startup

pub mod access_control;
pub mod cors;

pub use access_control::{Authorizer, OpenAccess, SharedSecret};
