//! Demo site for the pageflow pipeline.
//!
//! Three pages share one layout with navigation tabs:
//! - `/`: a one-field form that echoes accepted values and shows validation errors
//! - `/login`: a sign-in form
//! - anything else: the error page with status 404
//!
//! `/health` answers JSON and passes through the page layer untouched.

pub mod config;
pub mod pages;
pub mod routes;
pub mod templates;

pub use config::{Config, ConfigError};
pub use routes::{build_interceptor, build_router, metrics_router};
