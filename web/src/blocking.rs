//! Thread-per-request adapter.
//!
//! For servers that call handlers on a dedicated thread and want buffered
//! responses. Detection, enrichment and rendering all run on the calling
//! thread through [`ResultInterceptor::intercept`]; the output bytes are the
//! same as the non-blocking layer produces.
//!
//! # Example
//!
//! ```ignore
//! let pages = BlockingPages::new(interceptor);
//!
//! std::thread::spawn(move || {
//!     let outcome = http::Response::new(HandlerOutcome::<Vec<u8>>::page(login_page()));
//!     let response = pages.respond(&request_parts, outcome, &ModelMap::new());
//!     write_response(stream, response);
//! });
//! ```

use crate::context::{error_message, request_context};
use crate::error::AppError;
use http::{header, request, HeaderValue, Response};
use pageflow_core::{HandlerOutcome, Intercepted, ModelMap, ResultInterceptor};
use std::sync::Arc;

/// Renders handler outcomes synchronously.
#[derive(Debug, Clone)]
pub struct BlockingPages {
    interceptor: Arc<ResultInterceptor>,
}

impl BlockingPages {
    /// Create an adapter around `interceptor`.
    #[must_use]
    pub fn new(interceptor: ResultInterceptor) -> Self {
        Self::shared(Arc::new(interceptor))
    }

    /// Share an interceptor with other adapters or layers.
    #[must_use]
    pub const fn shared(interceptor: Arc<ResultInterceptor>) -> Self {
        Self { interceptor }
    }

    /// Turn a handler's response into bytes.
    ///
    /// Page outcomes are enriched and rendered; data outcomes become the body
    /// unchanged. Status and headers set by the handler are kept. A pipeline
    /// failure yields a JSON [`AppError`] response instead.
    pub fn respond<T>(
        &self,
        request: &request::Parts,
        response: Response<HandlerOutcome<T>>,
        model: &ModelMap,
    ) -> Response<Vec<u8>>
    where
        T: Into<Vec<u8>>,
    {
        let (mut parts, outcome) = response.into_parts();

        let mut context = request_context(&request.uri, &request.extensions);
        if outcome.is_page() {
            if let Some(message) = error_message(parts.status, &parts.extensions) {
                context = context.with_error_message(message);
            }
        }

        match self.interceptor.intercept(outcome, model, &context) {
            Ok(Intercepted::Passthrough(data)) => Response::from_parts(parts, data.into()),
            Ok(Intercepted::Rendered(rendered)) => {
                let Ok(content_type) = HeaderValue::from_str(&rendered.content_type) else {
                    return AppError::internal("Renderer produced an invalid content type")
                        .into_buffered();
                };
                parts.headers.insert(header::CONTENT_TYPE, content_type);
                Response::from_parts(parts, rendered.body)
            }
            Err(err) => AppError::from(err).into_buffered(),
        }
    }
}
