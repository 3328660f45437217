//! Upstream subsystem.
//!
//! # Data Flow
//! ```text
//! decoded target URL
//!     → fetcher.rs (GET with browser User-Agent, redirects followed)
//!     → validator.rs (2xx status, allow-listed Content-Type)
//!     → http::response (stream body to client)
//! ```
//!
//! # Design Decisions
//! - No retries; one fetch per request
//! - Body is never buffered; validation reads headers only
//! - Every fetch has a connect and a total deadline

pub mod fetcher;
pub mod validator;

pub use fetcher::{UpstreamFetcher, UpstreamResponse};
pub use validator::ResponseValidator;
