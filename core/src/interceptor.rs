//! Result interceptor.
//!
//! Sits between the handler and the response body. If the handler produced a
//! page it drives the configurer chain and then the renderer; any other
//! outcome passes through untouched.
//!
//! # Phases
//!
//! ```text
//! Idle ──▶ Detected ──▶ Enriching ──▶ Rendering ──▶ Done
//!              │             │             │
//!              └─────────────┴─────────────┴──▶ Failed
//! ```
//!
//! Each request gets its own [`Interception`], so `Detected` is reachable
//! exactly once per request. The request deadline is checked before
//! enrichment and again before rendering.

use crate::configurer::ConfigurerChain;
use crate::error::PipelineError;
use crate::metrics::{PAGES_RENDERED, RENDER_DURATION, RENDER_FAILURES};
use crate::page::Page;
use crate::render::{Rendered, Renderer};
use crate::request::{ModelMap, RequestContext};
use std::time::Instant;
use tracing::Instrument;

/// Interception phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    /// Nothing observed yet
    #[default]
    Idle,
    /// A page was found in the handler outcome
    Detected,
    /// The configurer chain is running
    Enriching,
    /// The renderer is producing bytes
    Rendering,
    /// Bytes are ready
    Done,
    /// Enrichment or rendering failed
    Failed,
}

impl Phase {
    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Per-request interception state.
#[derive(Debug, Default)]
pub struct Interception {
    phase: Phase,
}

impl Interception {
    /// Start in [`Phase::Idle`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Move to `next`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidTransition`] for any move outside the
    /// documented state machine, including a second detection.
    pub fn advance(&mut self, next: Phase) -> Result<(), PipelineError> {
        let allowed = matches!(
            (self.phase, next),
            (Phase::Idle, Phase::Detected)
                | (Phase::Detected, Phase::Enriching)
                | (Phase::Enriching, Phase::Rendering)
                | (Phase::Rendering, Phase::Done)
                | (
                    Phase::Detected | Phase::Enriching | Phase::Rendering,
                    Phase::Failed
                )
        );

        if !allowed {
            return Err(PipelineError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }

        tracing::trace!(from = ?self.phase, to = ?next, "Interception phase change");
        self.phase = next;
        Ok(())
    }

    fn fail(&mut self) {
        if !self.phase.is_terminal() && self.phase != Phase::Idle {
            self.phase = Phase::Failed;
        }
    }
}

/// What a handler produced.
pub enum HandlerOutcome<T> {
    /// A page awaiting enrichment and rendering
    Page(Box<dyn Page>),
    /// Anything else; bypasses the pipeline
    Data(T),
}

impl<T> HandlerOutcome<T> {
    /// Wrap a page.
    pub fn page(page: impl Page) -> Self {
        Self::Page(Box::new(page))
    }

    /// Whether the outcome carries the page capability.
    #[must_use]
    pub const fn is_page(&self) -> bool {
        matches!(self, Self::Page(_))
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for HandlerOutcome<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Page(page) => f.debug_tuple("Page").field(page.kind()).finish(),
            Self::Data(data) => f.debug_tuple("Data").field(data).finish(),
        }
    }
}

/// Result of interception.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intercepted<T> {
    /// The page was enriched and rendered
    Rendered(Rendered),
    /// The outcome was not a page
    Passthrough(T),
}

fn ensure_live(request: &RequestContext, phase: Phase) -> Result<(), PipelineError> {
    if request.is_expired() {
        return Err(PipelineError::DeadlineExceeded { phase });
    }
    Ok(())
}

/// Drives enrichment and rendering for page outcomes.
#[derive(Debug, Clone)]
pub struct ResultInterceptor {
    chain: ConfigurerChain,
    renderer: Renderer,
}

impl ResultInterceptor {
    /// Create an interceptor. The chain order is fixed from here on.
    #[must_use]
    pub const fn new(chain: ConfigurerChain, renderer: Renderer) -> Self {
        Self { chain, renderer }
    }

    /// The configurer chain.
    #[must_use]
    pub const fn chain(&self) -> &ConfigurerChain {
        &self.chain
    }

    /// The renderer.
    #[must_use]
    pub const fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// Intercept a handler outcome on the calling thread.
    ///
    /// # Errors
    ///
    /// Returns the first configurer or rendering failure for page outcomes.
    pub fn intercept<T>(
        &self,
        outcome: HandlerOutcome<T>,
        model: &ModelMap,
        request: &RequestContext,
    ) -> Result<Intercepted<T>, PipelineError> {
        match outcome {
            HandlerOutcome::Data(data) => Ok(Intercepted::Passthrough(data)),
            HandlerOutcome::Page(mut page) => self
                .render_page(page.as_mut(), model, request)
                .map(Intercepted::Rendered),
        }
    }

    /// Intercept a handler outcome without blocking the async scheduler.
    ///
    /// # Errors
    ///
    /// Same as [`ResultInterceptor::intercept`].
    pub async fn intercept_async<T>(
        &self,
        outcome: HandlerOutcome<T>,
        model: &ModelMap,
        request: &RequestContext,
    ) -> Result<Intercepted<T>, PipelineError> {
        match outcome {
            HandlerOutcome::Data(data) => Ok(Intercepted::Passthrough(data)),
            HandlerOutcome::Page(mut page) => self
                .render_page_async(page.as_mut(), model, request)
                .await
                .map(Intercepted::Rendered),
        }
    }

    /// Enrich and render `page` on the calling thread.
    ///
    /// # Errors
    ///
    /// Returns the first configurer or rendering failure.
    pub fn render_page(
        &self,
        page: &mut dyn Page,
        model: &ModelMap,
        request: &RequestContext,
    ) -> Result<Rendered, PipelineError> {
        let span = tracing::debug_span!("page_interception", kind = %page.kind(), path = request.path());
        let _entered = span.enter();

        let started = Instant::now();
        let mut interception = Interception::new();

        let result = self
            .enrich(&mut interception, page, model, request)
            .and_then(|()| self.renderer.render(page))
            .and_then(|rendered| interception.advance(Phase::Done).map(|()| rendered));

        finish(&mut interception, started, &result);
        result
    }

    /// Enrich `page` inline, then render it through the async renderer.
    ///
    /// Enrichment is synchronous and fast; only the template call is
    /// deferred.
    ///
    /// # Errors
    ///
    /// Returns the first configurer or rendering failure.
    pub async fn render_page_async(
        &self,
        page: &mut dyn Page,
        model: &ModelMap,
        request: &RequestContext,
    ) -> Result<Rendered, PipelineError> {
        let span = tracing::debug_span!("page_interception", kind = %page.kind(), path = request.path());

        async move {
            let started = Instant::now();
            let mut interception = Interception::new();

            let result = match self.enrich(&mut interception, page, model, request) {
                Ok(()) => match self.renderer.render_async(page).await {
                    Ok(rendered) => interception.advance(Phase::Done).map(|()| rendered),
                    Err(error) => Err(error),
                },
                Err(error) => Err(error),
            };

            finish(&mut interception, started, &result);
            result
        }
        .instrument(span)
        .await
    }

    fn enrich(
        &self,
        interception: &mut Interception,
        page: &mut dyn Page,
        model: &ModelMap,
        request: &RequestContext,
    ) -> Result<(), PipelineError> {
        interception.advance(Phase::Detected)?;
        ensure_live(request, Phase::Enriching)?;
        interception.advance(Phase::Enriching)?;
        self.chain.apply(page, model, request)?;
        ensure_live(request, Phase::Rendering)?;
        interception.advance(Phase::Rendering)
    }
}

fn finish(interception: &mut Interception, started: Instant, result: &Result<Rendered, PipelineError>) {
    match result {
        Ok(rendered) => {
            metrics::counter!(PAGES_RENDERED).increment(1);
            metrics::histogram!(RENDER_DURATION).record(started.elapsed().as_secs_f64());
            tracing::debug!(
                bytes = rendered.body.len(),
                elapsed = ?started.elapsed(),
                "Page rendered"
            );
        }
        Err(error) => {
            interception.fail();
            metrics::counter!(RENDER_FAILURES, "kind" => error.kind().as_str()).increment(1);
            tracing::warn!(
                kind = error.kind().as_str(),
                phase = ?interception.phase(),
                error = %error,
                "Page interception failed"
            );
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use crate::configurer::FnConfigurer;
    use crate::error::{FailureKind, TemplateError};
    use crate::navigation::{Menu, MenuEntry, NavigationResolver};
    use crate::page::{ErrorPage, StandardPage};
    use crate::render::TemplateRegistry;
    use crate::request::CsrfToken;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn csrf_template(context: &serde_json::Value) -> Result<String, TemplateError> {
        let csrf = match context["csrf"]["token"].as_str() {
            Some(token) => format!("<input type=\"hidden\" name=\"_csrf\" value=\"{token}\">"),
            None => String::new(),
        };
        Ok(format!(
            "<title>{}</title><form>{csrf}</form>",
            context["title"].as_str().unwrap_or_default()
        ))
    }

    fn error_template(context: &serde_json::Value) -> Result<String, TemplateError> {
        Ok(format!(
            "<p>{}</p>",
            context["message"].as_str().unwrap_or_default()
        ))
    }

    fn interceptor(chain: ConfigurerChain) -> ResultInterceptor {
        let registry = TemplateRegistry::new()
            .template("index", csrf_template)
            .template("error", error_template);
        ResultInterceptor::new(chain, Renderer::new(registry))
    }

    fn standard() -> ResultInterceptor {
        interceptor(ConfigurerChain::standard(NavigationResolver::new(Menu::new([
            MenuEntry::new("Home", "/", "Home"),
            MenuEntry::new("Login", "/login", "Login"),
        ]))))
    }

    fn body(intercepted: Intercepted<()>) -> String {
        match intercepted {
            Intercepted::Rendered(rendered) => String::from_utf8(rendered.body).expect("utf-8"),
            Intercepted::Passthrough(()) => String::from("<passthrough>"),
        }
    }

    #[test]
    fn test_page_outcome_is_rendered() {
        let outcome = HandlerOutcome::<()>::page(StandardPage::new("index", "home"));
        let request = RequestContext::new("/").with_csrf(CsrfToken::new("abc"));

        let html = body(standard().intercept(outcome, &ModelMap::new(), &request).expect("ok"));

        assert!(html.contains("<title>Home</title>"));
        assert!(html.contains("name=\"_csrf\" value=\"abc\""));
    }

    #[test]
    fn test_missing_csrf_renders_without_field() {
        let outcome = HandlerOutcome::<()>::page(StandardPage::new("index", "home"));
        let html = body(
            standard()
                .intercept(outcome, &ModelMap::new(), &RequestContext::new("/"))
                .expect("ok"),
        );

        assert!(!html.contains("_csrf"));
    }

    #[test]
    fn test_data_outcome_bypasses_chain() {
        let chain = ConfigurerChain::new().register(FnConfigurer::new("never", |_, _, _| {
            Err(PipelineError::configurer("never", "should not run"))
        }));
        let outcome: HandlerOutcome<&str> = HandlerOutcome::Data("{\"ok\":true}");

        let result = interceptor(chain)
            .intercept(outcome, &ModelMap::new(), &RequestContext::new("/api"))
            .expect("passthrough");

        assert_eq!(result, Intercepted::Passthrough("{\"ok\":true}"));
    }

    #[test]
    fn test_configurer_failure_is_render_failure() {
        let chain = ConfigurerChain::new().register(FnConfigurer::new("broken", |_, _, _| {
            Err(PipelineError::configurer("broken", "no session"))
        }));
        let outcome = HandlerOutcome::<()>::page(StandardPage::new("index", "home"));

        let err = interceptor(chain)
            .intercept(outcome, &ModelMap::new(), &RequestContext::new("/"))
            .expect_err("fails");

        assert_eq!(err.kind(), FailureKind::RenderFailure);
    }

    #[test]
    fn test_error_page_receives_message() {
        let outcome = HandlerOutcome::<()>::page(ErrorPage::new(404));
        let request = RequestContext::new("/nope").with_error_message("Not Found");

        let html = body(standard().intercept(outcome, &ModelMap::new(), &request).expect("ok"));

        assert_eq!(html, "<p>Not Found</p>");
    }

    #[test]
    fn test_expired_deadline_aborts_before_enrichment() {
        let past = Instant::now()
            .checked_sub(Duration::from_millis(1))
            .unwrap_or_else(Instant::now);
        let request = RequestContext::new("/").with_deadline(past);
        let outcome = HandlerOutcome::<()>::page(StandardPage::new("index", "home"));

        let err = standard()
            .intercept(outcome, &ModelMap::new(), &request)
            .expect_err("deadline");

        assert_eq!(err.kind(), FailureKind::Aborted);
        assert!(matches!(
            err,
            PipelineError::DeadlineExceeded {
                phase: Phase::Enriching
            }
        ));
    }

    #[test]
    fn test_deadline_passing_during_enrichment_aborts_before_rendering() {
        let rendered = Arc::new(AtomicBool::new(false));
        let seen = Arc::clone(&rendered);
        let registry = TemplateRegistry::new().template(
            "index",
            move |_: &serde_json::Value| -> Result<String, TemplateError> {
                seen.store(true, Ordering::SeqCst);
                Ok(String::new())
            },
        );
        let chain = ConfigurerChain::new().register(FnConfigurer::new("slow", |_, _, _| {
            std::thread::sleep(Duration::from_millis(60));
            Ok(())
        }));
        let request =
            RequestContext::new("/").with_deadline(Instant::now() + Duration::from_millis(20));
        let outcome = HandlerOutcome::<()>::page(StandardPage::new("index", "home"));

        let err = ResultInterceptor::new(chain, Renderer::new(registry))
            .intercept(outcome, &ModelMap::new(), &request)
            .expect_err("deadline");

        assert!(matches!(
            err,
            PipelineError::DeadlineExceeded {
                phase: Phase::Rendering
            }
        ));
        assert!(!rendered.load(Ordering::SeqCst), "template must not run");
    }

    #[test]
    fn test_state_machine_rejects_second_detection() {
        let mut interception = Interception::new();
        interception.advance(Phase::Detected).expect("first");

        let err = interception.advance(Phase::Detected).expect_err("second");
        assert_eq!(err.kind(), FailureKind::Aborted);
    }

    #[test]
    fn test_state_machine_happy_path() {
        let mut interception = Interception::new();
        for phase in [Phase::Detected, Phase::Enriching, Phase::Rendering, Phase::Done] {
            interception.advance(phase).expect("valid transition");
        }
        assert!(interception.phase().is_terminal());
        assert!(interception.advance(Phase::Failed).is_err());
    }

    #[test]
    fn test_state_machine_failure_from_enriching() {
        let mut interception = Interception::new();
        interception.advance(Phase::Detected).expect("detect");
        interception.advance(Phase::Enriching).expect("enrich");
        interception.advance(Phase::Failed).expect("fail");
        assert_eq!(interception.phase(), Phase::Failed);
        assert!(interception.advance(Phase::Rendering).is_err());
    }

    #[test]
    fn test_idle_cannot_skip_to_enriching() {
        let mut interception = Interception::new();
        assert!(interception.advance(Phase::Enriching).is_err());
        assert_eq!(interception.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn test_async_matches_sync() {
        let interceptor = standard();
        let request = RequestContext::new("/").with_csrf(CsrfToken::new("abc"));

        let sync = interceptor
            .intercept(
                HandlerOutcome::<()>::page(StandardPage::new("index", "login")),
                &ModelMap::new(),
                &request,
            )
            .expect("sync");
        let deferred = interceptor
            .intercept_async(
                HandlerOutcome::<()>::page(StandardPage::new("index", "login")),
                &ModelMap::new(),
                &request,
            )
            .await
            .expect("async");

        assert_eq!(sync, deferred);
    }

    #[tokio::test]
    async fn test_async_data_passthrough() {
        let result = standard()
            .intercept_async(HandlerOutcome::Data(7_u8), &ModelMap::new(), &RequestContext::new("/"))
            .await
            .expect("passthrough");

        assert_eq!(result, Intercepted::Passthrough(7));
    }
}
