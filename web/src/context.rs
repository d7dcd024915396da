//! Request context extraction.
//!
//! Both execution modes build the pipeline's [`RequestContext`] the same way:
//! the path from the URI, the anti-forgery token and deadline from request
//! extensions, and the error message from the response the handler produced.

use http::{Extensions, StatusCode, Uri};
use pageflow_core::{CsrfToken, RequestContext};
use std::time::{Duration, Instant};

/// Point in time after which page rendering is abandoned.
///
/// Insert as a request extension; the pipeline checks it before enrichment
/// and before rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestDeadline(pub Instant);

impl RequestDeadline {
    /// Deadline `timeout` from now.
    #[must_use]
    pub fn after(timeout: Duration) -> Self {
        Self(Instant::now() + timeout)
    }
}

/// Error message a handler wants shown on its error page.
///
/// Insert as a response extension. Takes precedence over the status reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorMessage(pub String);

/// Build the pipeline context for a request.
#[must_use]
pub fn request_context(uri: &Uri, extensions: &Extensions) -> RequestContext {
    let mut context = RequestContext::new(uri.path());
    if let Some(token) = extensions.get::<CsrfToken>() {
        context = context.with_csrf(token.clone());
    }
    if let Some(RequestDeadline(deadline)) = extensions.get::<RequestDeadline>() {
        context = context.with_deadline(*deadline);
    }
    context
}

/// Framework error message for a response: an explicit [`ErrorMessage`], or
/// the canonical reason of a 4xx/5xx status.
#[must_use]
pub fn error_message(status: StatusCode, extensions: &Extensions) -> Option<String> {
    if let Some(ErrorMessage(message)) = extensions.get::<ErrorMessage>() {
        return Some(message.clone());
    }
    if status.is_client_error() || status.is_server_error() {
        return status.canonical_reason().map(str::to_string);
    }
    None
}
