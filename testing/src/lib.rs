//! # Pageflow Testing
//!
//! Testing utilities and helpers for pageflow pipelines.
//!
//! This crate provides:
//! - [`PageTest`], a Given-When-Then harness for configurer chains
//! - Mock configurers and templates
//! - A `tracing` capture layer for asserting on warnings
//! - Property-based testing strategies
//!
//! ## Example
//!
//! ```
//! use pageflow_core::prelude::*;
//! use pageflow_testing::mocks::{json_template, test_interceptor};
//!
//! let interceptor = test_interceptor(json_template());
//! let outcome = HandlerOutcome::<()>::page(StandardPage::new("index", "home"));
//!
//! let Ok(Intercepted::Rendered(rendered)) =
//!     interceptor.intercept(outcome, &ModelMap::new(), &RequestContext::new("/"))
//! else {
//!     panic!("page should render");
//! };
//! let context: serde_json::Value = serde_json::from_slice(&rendered.body).unwrap();
//! assert_eq!(context["title"], "Home");
//! ```

pub mod logs;

/// Mock implementations for testing.
pub mod mocks {
    use pageflow_core::{
        ConfigurerChain, Configurer, Menu, MenuEntry, ModelMap, NavigationResolver, Page,
        PipelineError, Renderer, RequestContext, ResultInterceptor, Template, TemplateError,
        TemplateRegistry,
    };
    use std::sync::{Arc, Mutex};

    /// Error raised by [`FailingConfigurer`].
    #[derive(Debug, Clone, thiserror::Error)]
    #[error("{0}")]
    pub struct MockError(pub String);

    /// Records every invocation, in order, into a shared log.
    ///
    /// Several recorders sharing one log show the chain's execution order.
    #[derive(Debug, Clone)]
    pub struct RecordingConfigurer {
        name: String,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingConfigurer {
        /// Create a recorder writing into `log`.
        #[must_use]
        pub fn new(name: impl Into<String>, log: Arc<Mutex<Vec<String>>>) -> Self {
            Self {
                name: name.into(),
                log,
            }
        }
    }

    impl Configurer for RecordingConfigurer {
        fn name(&self) -> &str {
            &self.name
        }

        fn configure(
            &self,
            _page: &mut dyn Page,
            _model: &ModelMap,
            _request: &RequestContext,
        ) -> Result<(), PipelineError> {
            if let Ok(mut log) = self.log.lock() {
                log.push(self.name.clone());
            }
            Ok(())
        }
    }

    /// Always fails with a [`MockError`].
    #[derive(Debug, Clone)]
    pub struct FailingConfigurer {
        name: String,
        message: String,
    }

    impl FailingConfigurer {
        /// Create a configurer that fails with `message`.
        #[must_use]
        pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
            Self {
                name: name.into(),
                message: message.into(),
            }
        }
    }

    impl Configurer for FailingConfigurer {
        fn name(&self) -> &str {
            &self.name
        }

        fn configure(
            &self,
            _page: &mut dyn Page,
            _model: &ModelMap,
            _request: &RequestContext,
        ) -> Result<(), PipelineError> {
            Err(PipelineError::configurer(
                self.name.clone(),
                MockError(self.message.clone()),
            ))
        }
    }

    /// Renders the data context as JSON, so tests can inspect exactly what a
    /// real template would have received.
    #[must_use]
    pub fn json_template(
    ) -> impl Fn(&serde_json::Value) -> Result<String, TemplateError> + Send + Sync + Clone + 'static
    {
        |context: &serde_json::Value| {
            serde_json::to_string(context).map_err(|e| TemplateError::new(e.to_string()))
        }
    }

    /// The `[Home "/", Login "/login"]` menu.
    #[must_use]
    pub fn test_menu() -> Menu {
        Menu::new([
            MenuEntry::new("Home", "/", "Home"),
            MenuEntry::new("Login", "/login", "Login"),
        ])
    }

    /// Resolver over [`test_menu`] with the default Home fallback.
    #[must_use]
    pub fn test_resolver() -> NavigationResolver {
        NavigationResolver::new(test_menu())
    }

    /// Standard chain over [`test_menu`], with `template` registered for the
    /// `index`, `login` and `error` page kinds.
    #[must_use]
    pub fn test_interceptor<T>(template: T) -> ResultInterceptor
    where
        T: Template + Clone + 'static,
    {
        let registry = TemplateRegistry::new()
            .template("index", template.clone())
            .template("login", template.clone())
            .template("error", template);
        ResultInterceptor::new(
            ConfigurerChain::standard(test_resolver()),
            Renderer::new(registry),
        )
    }
}

/// Property-based testing strategies.
pub mod properties {
    use pageflow_core::MenuEntry;
    use proptest::prelude::*;

    /// A menu entry name: a capitalised word.
    pub fn entry_name() -> impl Strategy<Value = String> {
        "[A-Z][a-z]{1,8}"
    }

    /// A menu of up to `max` entries with distinct names.
    pub fn menu_entries(max: usize) -> impl Strategy<Value = Vec<MenuEntry>> {
        proptest::collection::btree_set(entry_name(), 0..=max).prop_map(|names| {
            names
                .into_iter()
                .map(|name| {
                    let path = format!("/{}", name.to_lowercase());
                    MenuEntry::new(name.clone(), path, name)
                })
                .collect()
        })
    }

    /// An active key that may or may not match a generated entry, in any case.
    pub fn active_key() -> impl Strategy<Value = String> {
        prop_oneof![
            entry_name(),
            entry_name().prop_map(|name| name.to_lowercase()),
            entry_name().prop_map(|name| name.to_uppercase()),
            "[a-z]{1,12}",
        ]
    }

    /// A submitted form value, possibly absent.
    pub fn submitted_value() -> impl Strategy<Value = Option<String>> {
        proptest::option::of("[ -~]{0,16}")
    }

    /// Field error messages for one field.
    pub fn field_errors() -> impl Strategy<Value = Vec<String>> {
        proptest::collection::vec("[a-z ]{1,24}", 0..3)
    }
}

// Re-export commonly used items
pub use logs::{capture, CapturedEvent, CapturedLogs};
pub use mocks::{json_template, test_interceptor, test_menu, test_resolver};
pub use page_test::PageTest;
