//! Configurer chain.
//!
//! A [`Configurer`] enriches a page from request-scoped inputs. The
//! [`ConfigurerChain`] runs its configurers in registration order against one
//! page instance and stops at the first error: a half-enriched page (one
//! missing its CSRF token, say) must never reach the renderer.
//!
//! # Built-in configurers
//!
//! | Configurer | Reads | Writes |
//! |---|---|---|
//! | [`CsrfConfigurer`] | `_csrf` request attribute | `csrf` |
//! | [`BindingConfigurer`] | `BindingResult.<target>` model entries | `fields` |
//! | [`NavigationConfigurer`] | `active_key` | `menus`, `current`, `title` |
//! | [`ErrorMessageConfigurer`] | error message attribute | message slot |
//!
//! Every built-in replaces what it writes, so running the chain twice with
//! the same inputs leaves the page unchanged.

use crate::binding::FieldView;
use crate::error::PipelineError;
use crate::navigation::NavigationResolver;
use crate::page::{Page, PageModel};
use crate::request::{ModelMap, RequestContext};
use std::sync::Arc;

/// A unit of page enrichment.
///
/// Implementations mutate only `page`; the model and request are read-only.
pub trait Configurer: Send + Sync {
    /// Name used in logs and failure reports.
    fn name(&self) -> &str;

    /// Enrich `page`.
    ///
    /// # Errors
    ///
    /// Any error aborts the chain and fails the request.
    fn configure(
        &self,
        page: &mut dyn Page,
        model: &ModelMap,
        request: &RequestContext,
    ) -> Result<(), PipelineError>;
}

/// Ordered list of configurers.
#[derive(Clone, Default)]
pub struct ConfigurerChain {
    configurers: Vec<Arc<dyn Configurer>>,
}

impl std::fmt::Debug for ConfigurerChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigurerChain")
            .field("configurers", &self.names())
            .finish()
    }
}

impl ConfigurerChain {
    /// Create an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in chain: CSRF, binding, navigation, error message.
    #[must_use]
    pub fn standard(resolver: NavigationResolver) -> Self {
        Self::new()
            .register(CsrfConfigurer)
            .register(BindingConfigurer)
            .register(NavigationConfigurer::new(resolver))
            .register(ErrorMessageConfigurer)
    }

    /// Append a configurer. Registration order is execution order.
    #[must_use]
    pub fn register(mut self, configurer: impl Configurer + 'static) -> Self {
        self.configurers.push(Arc::new(configurer));
        self
    }

    /// Configurer names, in execution order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.configurers
            .iter()
            .map(|configurer| configurer.name().to_string())
            .collect()
    }

    /// Number of registered configurers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.configurers.len()
    }

    /// Whether the chain is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.configurers.is_empty()
    }

    /// Run every configurer against `page`.
    ///
    /// # Errors
    ///
    /// Returns the first configurer error; later configurers do not run.
    pub fn apply(
        &self,
        page: &mut dyn Page,
        model: &ModelMap,
        request: &RequestContext,
    ) -> Result<(), PipelineError> {
        for configurer in &self.configurers {
            tracing::debug!(
                configurer = configurer.name(),
                kind = %page.kind(),
                "Applying configurer"
            );

            if let Err(error) = configurer.configure(page, model, request) {
                tracing::warn!(
                    configurer = configurer.name(),
                    kind = %page.kind(),
                    error = %error,
                    "Configurer failed, aborting enrichment"
                );
                return Err(error);
            }
        }
        Ok(())
    }
}

/// Copies the CSRF token from the request into the page.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsrfConfigurer;

impl Configurer for CsrfConfigurer {
    fn name(&self) -> &str {
        "csrf"
    }

    fn configure(
        &self,
        page: &mut dyn Page,
        _model: &ModelMap,
        request: &RequestContext,
    ) -> Result<(), PipelineError> {
        if let Some(token) = request.csrf_token() {
            page.model_mut().csrf = Some(token.clone());
        }
        Ok(())
    }
}

/// Builds a [`FieldView`] for every field the page declares.
#[derive(Debug, Clone, Copy, Default)]
pub struct BindingConfigurer;

impl Configurer for BindingConfigurer {
    fn name(&self) -> &str {
        "binding"
    }

    fn configure(
        &self,
        page: &mut dyn Page,
        model: &ModelMap,
        _request: &RequestContext,
    ) -> Result<(), PipelineError> {
        let PageModel { forms, fields, .. } = page.model_mut();

        for form in forms.iter() {
            let status = model.binding(&form.target);
            for spec in &form.fields {
                let view = FieldView::build(
                    &spec.label,
                    &spec.name,
                    spec.submitted.as_deref(),
                    &spec.field_type,
                    status,
                );
                fields.insert(spec.name.clone(), view);
            }
        }
        Ok(())
    }
}

/// Resolves navigation for the page's active key.
#[derive(Debug, Clone)]
pub struct NavigationConfigurer {
    resolver: NavigationResolver,
}

impl NavigationConfigurer {
    /// Create a configurer backed by `resolver`.
    #[must_use]
    pub const fn new(resolver: NavigationResolver) -> Self {
        Self { resolver }
    }
}

impl Configurer for NavigationConfigurer {
    fn name(&self) -> &str {
        "navigation"
    }

    fn configure(
        &self,
        page: &mut dyn Page,
        _model: &ModelMap,
        _request: &RequestContext,
    ) -> Result<(), PipelineError> {
        let resolution = self.resolver.resolve(&page.model().active_key)?;

        let model = page.model_mut();
        model.title.clone_from(&resolution.current.title);
        model.menus = resolution.entries;
        model.current = Some(resolution.current);
        Ok(())
    }
}

/// Copies the framework error message into pages that have a message slot.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorMessageConfigurer;

impl Configurer for ErrorMessageConfigurer {
    fn name(&self) -> &str {
        "error-message"
    }

    fn configure(
        &self,
        page: &mut dyn Page,
        _model: &ModelMap,
        request: &RequestContext,
    ) -> Result<(), PipelineError> {
        if let (Some(message), Some(slot)) = (request.error_message(), page.message_slot()) {
            slot.set(message);
        }
        Ok(())
    }
}

/// Signature of a closure-backed configurer.
pub type ConfigureFn =
    dyn Fn(&mut dyn Page, &ModelMap, &RequestContext) -> Result<(), PipelineError> + Send + Sync;

/// A configurer defined by a closure.
pub struct FnConfigurer {
    name: String,
    f: Box<ConfigureFn>,
}

impl FnConfigurer {
    /// Wrap `f` under `name`.
    pub fn new<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut dyn Page, &ModelMap, &RequestContext) -> Result<(), PipelineError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            f: Box::new(f),
        }
    }
}

impl Configurer for FnConfigurer {
    fn name(&self) -> &str {
        &self.name
    }

    fn configure(
        &self,
        page: &mut dyn Page,
        model: &ModelMap,
        request: &RequestContext,
    ) -> Result<(), PipelineError> {
        (self.f)(page, model, request)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use crate::binding::BindingStatus;
    use crate::error::FailureKind;
    use crate::navigation::{Menu, MenuEntry};
    use crate::page::{ErrorPage, FieldSpec, FormSpec, StandardPage};
    use crate::request::CsrfToken;
    use std::sync::Mutex;

    fn resolver() -> NavigationResolver {
        NavigationResolver::new(Menu::new([
            MenuEntry::new("Home", "/", "Home"),
            MenuEntry::new("Login", "/login", "Login"),
        ]))
    }

    fn index_page() -> StandardPage {
        StandardPage::new("index", "home")
            .with_form(FormSpec::new("foo").field(FieldSpec::text("Value", "value")))
    }

    #[test]
    fn test_standard_chain_order() {
        let chain = ConfigurerChain::standard(resolver());
        assert_eq!(
            chain.names(),
            vec!["csrf", "binding", "navigation", "error-message"]
        );
    }

    #[test]
    fn test_standard_chain_enriches_page() {
        let chain = ConfigurerChain::standard(resolver());
        let mut page = index_page();
        let model = ModelMap::new().with_binding(
            BindingStatus::new("foo")
                .with_value("value", serde_json::Value::Null)
                .reject("value", "must not be blank"),
        );
        let request = RequestContext::new("/").with_csrf(CsrfToken::new("t0k3n"));

        chain.apply(&mut page, &model, &request).expect("chain");

        let enriched = page.model();
        assert_eq!(enriched.csrf.as_ref().map(|t| t.token.as_str()), Some("t0k3n"));
        assert_eq!(enriched.title, "Home");
        assert!(enriched.menus[0].active);
        assert!(!enriched.menus[1].active);

        let field = &enriched.fields["value"];
        assert!(!field.is_valid());
        assert_eq!(field.errors(), ["must not be blank".to_string()]);
        assert_eq!(field.value(), "");
    }

    #[test]
    fn test_missing_csrf_is_silent() {
        let chain = ConfigurerChain::standard(resolver());
        let mut page = index_page();

        chain
            .apply(&mut page, &ModelMap::new(), &RequestContext::new("/"))
            .expect("chain");

        assert!(page.model().csrf.is_none());
        assert!(page.model().fields["value"].is_valid());
    }

    #[test]
    fn test_chain_is_idempotent() {
        let chain = ConfigurerChain::standard(resolver());
        let model = ModelMap::new().with_binding(
            BindingStatus::new("foo").reject("value", "must not be blank"),
        );
        let request = RequestContext::new("/").with_csrf(CsrfToken::new("abc"));

        let mut page = index_page();
        chain.apply(&mut page, &model, &request).expect("first run");
        let once = page.clone();
        chain.apply(&mut page, &model, &request).expect("second run");

        assert_eq!(page, once);
        assert_eq!(page.model().fields["value"].errors().len(), 1);
    }

    #[test]
    fn test_error_message_copied_into_slot() {
        let chain = ConfigurerChain::standard(resolver());
        let mut page = ErrorPage::new(404);
        let request = RequestContext::new("/missing").with_error_message("Not Found");

        chain.apply(&mut page, &ModelMap::new(), &request).expect("chain");

        assert_eq!(page.message(), Some("Not Found"));
        // "error" is not a menu entry: the fallback supplies the title.
        assert_eq!(page.model().title, "Home");
        assert!(page.model().menus.iter().all(|entry| !entry.active));
    }

    #[test]
    fn test_failure_aborts_remaining_chain() {
        let ran = Arc::new(Mutex::new(Vec::new()));
        let after = Arc::clone(&ran);

        let chain = ConfigurerChain::new()
            .register(FnConfigurer::new("boom", |_, _, _| {
                Err(PipelineError::configurer("boom", "exploded"))
            }))
            .register(FnConfigurer::new("after", move |_, _, _| {
                after.lock().expect("lock").push("after");
                Ok(())
            }));

        let mut page = index_page();
        let err = chain
            .apply(&mut page, &ModelMap::new(), &RequestContext::new("/"))
            .expect_err("should fail");

        assert_eq!(err.kind(), FailureKind::RenderFailure);
        assert!(ran.lock().expect("lock").is_empty());
    }

    #[test]
    fn test_navigation_mismatch_propagates() {
        let chain = ConfigurerChain::standard(resolver().without_fallback());
        let mut page = StandardPage::new("about", "about");

        let err = chain
            .apply(&mut page, &ModelMap::new(), &RequestContext::new("/about"))
            .expect_err("should fail");

        assert_eq!(err.kind(), FailureKind::NavigationMismatch);
    }

    #[test]
    fn test_configurers_do_not_touch_model() {
        let chain = ConfigurerChain::standard(resolver());
        let model = ModelMap::new().with_binding(BindingStatus::new("foo"));
        let snapshot = model.clone();

        let mut page = index_page();
        chain
            .apply(&mut page, &model, &RequestContext::new("/"))
            .expect("chain");

        assert_eq!(model, snapshot);
    }
}
