//! Page interception layer for the non-blocking mode.
//!
//! # Example
//!
//! ```ignore
//! use axum::{routing::get, Router};
//! use pageflow_web::{page_layer, PageResponse};
//!
//! let app = Router::new()
//!     .route("/", get(home))
//!     .layer(page_layer(interceptor));
//! ```
//!
//! # Flow
//!
//! 1. **Capture** path, anti-forgery token and deadline from the request
//! 2. **Call** the inner service
//! 3. **Detect** a [`PendingPage`] in the response extensions; anything else passes through
//! 4. **Enrich and render** through [`ResultInterceptor::render_page_async`]
//! 5. **Write** the body and content type, keeping the handler's status and headers
//!
//! Pipeline failures replace the response with an [`AppError`].

use crate::context::{error_message, request_context};
use crate::error::AppError;
use crate::response::PendingPage;
use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};
use pageflow_core::{RequestContext, ResultInterceptor};
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::Instrument;

/// Create a layer that renders page responses with `interceptor`.
#[must_use]
pub fn page_layer(interceptor: ResultInterceptor) -> PageLayer {
    PageLayer::new(Arc::new(interceptor))
}

/// Layer for page interception.
#[derive(Clone, Debug)]
pub struct PageLayer {
    interceptor: Arc<ResultInterceptor>,
}

impl PageLayer {
    /// Share an existing interceptor.
    #[must_use]
    pub const fn new(interceptor: Arc<ResultInterceptor>) -> Self {
        Self { interceptor }
    }
}

impl<S> Layer<S> for PageLayer {
    type Service = PageMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        PageMiddleware {
            inner,
            interceptor: Arc::clone(&self.interceptor),
        }
    }
}

/// Middleware service for page interception.
#[derive(Clone, Debug)]
pub struct PageMiddleware<S> {
    inner: S,
    interceptor: Arc<ResultInterceptor>,
}

impl<S> Service<Request> for PageMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let context = request_context(req.uri(), req.extensions());
        let span = tracing::debug_span!(
            "page_layer",
            method = %req.method(),
            path = %req.uri().path(),
        );
        let interceptor = Arc::clone(&self.interceptor);
        let fut = self.inner.call(req);

        Box::pin(
            async move {
                let response = fut.await?;
                Ok(render_pending(&interceptor, context, response).await)
            }
            .instrument(span),
        )
    }
}

async fn render_pending(
    interceptor: &ResultInterceptor,
    mut context: RequestContext,
    response: Response,
) -> Response {
    let Some(pending) = response.extensions().get::<PendingPage>() else {
        return response;
    };
    let Some((mut page, model)) = pending.take() else {
        tracing::warn!(
            status = %response.status(),
            "Pending page was already taken; returning the handler response"
        );
        return response;
    };

    let (mut parts, _) = response.into_parts();
    parts.extensions.remove::<PendingPage>();
    if let Some(message) = error_message(parts.status, &parts.extensions) {
        context = context.with_error_message(message);
    }

    let rendered = match interceptor
        .render_page_async(page.as_mut(), &model, &context)
        .await
    {
        Ok(rendered) => rendered,
        Err(err) => return AppError::from(err).into_response(),
    };

    let Ok(content_type) = HeaderValue::from_str(&rendered.content_type) else {
        return AppError::internal("Renderer produced an invalid content type").into_response();
    };
    parts.headers.insert(header::CONTENT_TYPE, content_type);
    parts.headers.remove(header::CONTENT_LENGTH);

    Response::from_parts(parts, Body::from(rendered.body))
}
