//! Axum integration for the pageflow pipeline.
//!
//! Handlers stay ignorant of enrichment: they return a [`PageResponse`] and
//! the [`PageLayer`] turns it into HTML after the handler completes.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │          Axum / tower (this crate)      │  ← extensions, status, headers
//! │  - PageLayer (non-blocking)             │  ← CSRF token, deadline
//! │  - BlockingPages (thread-per-request)   │  ← error mapping
//! ├─────────────────────────────────────────┤
//! │          pageflow-core                  │
//! │  - ConfigurerChain                      │  ← no HTTP types
//! │  - Renderer                             │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use axum::{routing::get, Router};
//! use pageflow_core::prelude::*;
//! use pageflow_web::{page_layer, PageResponse};
//!
//! async fn home() -> PageResponse {
//!     PageResponse::new(StandardPage::new("index", "home"))
//! }
//!
//! let interceptor = ResultInterceptor::new(chain, Renderer::new(templates));
//! let app = Router::new()
//!     .route("/", get(home))
//!     .layer(page_layer(interceptor));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod blocking;
pub mod context;
pub mod error;
pub mod middleware;
pub mod response;

// Re-export key types for convenience
pub use blocking::BlockingPages;
pub use context::{request_context, ErrorMessage, RequestDeadline};
pub use error::AppError;
pub use middleware::{page_layer, PageLayer, PageMiddleware};
pub use response::{PageResponse, PendingPage};
