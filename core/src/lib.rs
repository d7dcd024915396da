//! # Pageflow Core
//!
//! Page model enrichment and rendering interception.
//!
//! Handlers that want HTML return a [`Page`](page::Page). Before any bytes
//! are written the [`ResultInterceptor`](interceptor::ResultInterceptor) runs
//! an ordered chain of configurers over it (anti-forgery token, field
//! validation state, active navigation, error message) and then hands the
//! enriched page to the [`Renderer`](render::Renderer).
//!
//! ## Data Flow
//!
//! ```text
//! handler ──▶ Page ──▶ ResultInterceptor ──▶ ConfigurerChain ──▶ Renderer ──▶ bytes
//!                                              │         │
//!                                  NavigationResolver  FieldView::build
//! ```
//!
//! ## Execution Modes
//!
//! - **Blocking**: [`ResultInterceptor::intercept`](interceptor::ResultInterceptor::intercept)
//!   runs detection, enrichment and rendering on the calling thread
//! - **Async**: [`ResultInterceptor::intercept_async`](interceptor::ResultInterceptor::intercept_async)
//!   enriches inline and renders on tokio's blocking pool
//!
//! Both produce identical bytes.
//!
//! ## Example
//!
//! ```
//! use pageflow_core::prelude::*;
//!
//! # fn main() -> Result<(), PipelineError> {
//! let menu = Menu::new([
//!     MenuEntry::new("Home", "/", "Home"),
//!     MenuEntry::new("Login", "/login", "Login"),
//! ]);
//! let chain = ConfigurerChain::standard(NavigationResolver::new(menu));
//! let templates = TemplateRegistry::new().template(
//!     "index",
//!     |context: &serde_json::Value| -> Result<String, TemplateError> {
//!         Ok(format!("<h1>{}</h1>", context["title"].as_str().unwrap_or_default()))
//!     },
//! );
//! let interceptor = ResultInterceptor::new(chain, Renderer::new(templates));
//!
//! let outcome = HandlerOutcome::<()>::page(StandardPage::new("index", "home"));
//! let request = RequestContext::new("/");
//!
//! match interceptor.intercept(outcome, &ModelMap::new(), &request)? {
//!     Intercepted::Rendered(rendered) => assert_eq!(rendered.body, b"<h1>Home</h1>"),
//!     Intercepted::Passthrough(()) => unreachable!(),
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod binding;
pub mod configurer;
pub mod error;
pub mod interceptor;
pub mod metrics;
pub mod navigation;
pub mod page;
pub mod render;
pub mod request;

// Re-export key types for convenience
pub use binding::{BindingStatus, FieldError, FieldView};
pub use configurer::{Configurer, ConfigurerChain, FnConfigurer};
pub use error::{FailureKind, PipelineError, TemplateError};
pub use interceptor::{HandlerOutcome, Intercepted, Interception, Phase, ResultInterceptor};
pub use navigation::{Menu, MenuEntry, NavigationResolver, Resolution, ResolutionOutcome};
pub use page::{ErrorPage, FieldSpec, FormSpec, MessageSlot, Page, PageKind, PageModel, StandardPage};
pub use render::{Rendered, Renderer, RendererConfig, Template, TemplateRegistry};
pub use request::{Attribute, CsrfToken, ModelMap, ModelValue, RequestContext};

/// Everything a page handler or integration usually needs.
pub mod prelude {
    pub use crate::binding::{BindingStatus, FieldView};
    pub use crate::configurer::{Configurer, ConfigurerChain, FnConfigurer};
    pub use crate::error::{FailureKind, PipelineError, TemplateError};
    pub use crate::interceptor::{HandlerOutcome, Intercepted, ResultInterceptor};
    pub use crate::navigation::{Menu, MenuEntry, NavigationResolver};
    pub use crate::page::{ErrorPage, FieldSpec, FormSpec, Page, PageKind, PageModel, StandardPage};
    pub use crate::render::{Rendered, Renderer, RendererConfig, Template, TemplateRegistry};
    pub use crate::request::{CsrfToken, ModelMap, RequestContext};
}
