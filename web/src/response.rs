//! Page responses.
//!
//! A handler returns a [`PageResponse`] instead of HTML. It converts into an
//! empty response carrying the page as a take-once extension; the
//! [`PageLayer`](crate::middleware::PageLayer) picks it up, runs the pipeline
//! and writes the body.

use crate::context::ErrorMessage;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use pageflow_core::{ModelMap, Page};
use std::fmt;
use std::sync::{Arc, Mutex};

type Pending = (Box<dyn Page>, ModelMap);

/// A page waiting in the response extensions for the interception layer.
///
/// Extensions must be `Clone`, so the page sits behind a shared slot that the
/// layer empties exactly once.
#[derive(Clone)]
pub struct PendingPage(Arc<Mutex<Option<Pending>>>);

impl PendingPage {
    fn new(page: Box<dyn Page>, model: ModelMap) -> Self {
        Self(Arc::new(Mutex::new(Some((page, model)))))
    }

    /// Take the page and its model out of the slot.
    ///
    /// Returns `None` if it was already taken. A poisoned slot is recovered.
    #[must_use]
    pub fn take(&self) -> Option<(Box<dyn Page>, ModelMap)> {
        let mut slot = self.0.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Pending page slot was poisoned; recovering the page");
            poisoned.into_inner()
        });
        slot.take()
    }
}

impl fmt::Debug for PendingPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self
            .0
            .lock()
            .ok()
            .and_then(|slot| slot.as_ref().map(|(page, _)| page.kind().to_string()));
        f.debug_tuple("PendingPage").field(&kind).finish()
    }
}

/// Handler return type for pages.
///
/// # Example
///
/// ```ignore
/// async fn login() -> PageResponse {
///     PageResponse::new(StandardPage::new("login", "login"))
/// }
///
/// async fn not_found() -> PageResponse {
///     PageResponse::new(ErrorPage::new(404)).with_status(StatusCode::NOT_FOUND)
/// }
/// ```
pub struct PageResponse {
    page: Box<dyn Page>,
    model: ModelMap,
    status: StatusCode,
    message: Option<String>,
}

impl PageResponse {
    /// A `200 OK` page with an empty model.
    #[must_use]
    pub fn new(page: impl Page) -> Self {
        Self {
            page: Box::new(page),
            model: ModelMap::new(),
            status: StatusCode::OK,
            message: None,
        }
    }

    /// Attach the handler's model map (binding results and other values).
    #[must_use]
    pub fn with_model(mut self, model: ModelMap) -> Self {
        self.model = model;
        self
    }

    /// Respond with `status`; the body is still the rendered page.
    #[must_use]
    pub const fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Error message for pages with a message slot.
    #[must_use]
    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl fmt::Debug for PageResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageResponse")
            .field("kind", self.page.kind())
            .field("status", &self.status)
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

impl IntoResponse for PageResponse {
    fn into_response(self) -> Response {
        let mut response = self.status.into_response();
        let extensions = response.extensions_mut();
        extensions.insert(PendingPage::new(self.page, self.model));
        if let Some(message) = self.message {
            extensions.insert(ErrorMessage(message));
        }
        response
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use pageflow_core::{ErrorPage, StandardPage};
    use pageflow_testing::capture;
    use tracing::Level;

    #[test]
    fn test_page_is_taken_once() {
        let response = PageResponse::new(StandardPage::new("index", "home")).into_response();
        let pending = response.extensions().get::<PendingPage>().unwrap();

        let (page, model) = pending.take().expect("first take");
        assert_eq!(page.kind().as_str(), "index");
        assert!(model.is_empty());
        assert!(pending.take().is_none());
    }

    #[test]
    #[allow(clippy::panic)] // Poisons the slot on purpose
    fn test_poisoned_slot_still_yields_page() {
        let pending = PendingPage::new(Box::new(StandardPage::new("index", "home")), ModelMap::new());
        let holder = pending.clone();
        let _ = std::thread::spawn(move || {
            let _guard = holder.0.lock().unwrap();
            panic!("handler thread died while holding the slot");
        })
        .join();
        assert!(pending.0.is_poisoned());

        let (taken, logs) = capture(|| pending.take());

        assert_eq!(taken.expect("recovered").0.kind().as_str(), "index");
        assert!(logs.contains(Level::WARN, "poisoned"));
    }

    #[test]
    fn test_status_and_message_carried() {
        let response = PageResponse::new(ErrorPage::new(410))
            .with_status(StatusCode::GONE)
            .with_error_message("Order 42 is gone")
            .into_response();

        assert_eq!(response.status(), StatusCode::GONE);
        assert_eq!(
            response.extensions().get::<ErrorMessage>(),
            Some(&ErrorMessage("Order 42 is gone".to_string()))
        );
    }
}
