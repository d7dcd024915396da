//! Router configuration for the demo site.

use crate::config::{ConfigError, SiteConfig};
use crate::pages::{login_page, IndexPage, FOO_FORM, HOME_KEY};
use crate::templates;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::get,
    Form, Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use pageflow_core::{
    BindingStatus, ConfigurerChain, CsrfToken, ErrorPage, ModelMap, Renderer, RendererConfig,
    ResultInterceptor,
};
use pageflow_web::{page_layer, PageResponse, RequestDeadline};
use serde::Deserialize;
use std::time::Duration;
use uuid::Uuid;

/// Submitted home page form.
#[derive(Debug, Deserialize)]
pub struct Foo {
    #[serde(default)]
    value: String,
}

async fn home() -> PageResponse {
    PageResponse::new(IndexPage::new())
}

async fn submit(Form(foo): Form<Foo>) -> PageResponse {
    let mut status = BindingStatus::new(FOO_FORM).with_value("value", foo.value.clone());
    if foo.value.trim().is_empty() {
        status = status.reject("value", "must not be blank");
        tracing::debug!(form = FOO_FORM, "Rejected blank submission");
        return PageResponse::new(IndexPage::new()).with_model(ModelMap::new().with_binding(status));
    }

    PageResponse::new(IndexPage::new().with_value(foo.value))
        .with_model(ModelMap::new().with_binding(status))
}

async fn login() -> PageResponse {
    PageResponse::new(login_page())
}

async fn not_found() -> PageResponse {
    PageResponse::new(ErrorPage::new(StatusCode::NOT_FOUND.as_u16()).with_active_key(HOME_KEY))
        .with_status(StatusCode::NOT_FOUND)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Stand-in for a real security layer: issues a fresh anti-forgery token
/// per request.
async fn issue_csrf_token(mut req: Request, next: Next) -> Response {
    req.extensions_mut()
        .insert(CsrfToken::new(Uuid::new_v4().to_string()));
    next.run(req).await
}

async fn stamp_deadline(State(timeout): State<Duration>, mut req: Request, next: Next) -> Response {
    req.extensions_mut().insert(RequestDeadline::after(timeout));
    next.run(req).await
}

/// Build the page interceptor for `site`.
///
/// # Errors
///
/// Returns an error if the menu cannot be loaded or the fallback is unknown.
pub fn build_interceptor(site: &SiteConfig) -> Result<ResultInterceptor, ConfigError> {
    let resolver = site.resolver(site.menu()?)?;
    let renderer = Renderer::with_config(
        templates::registry(site.name.clone()),
        RendererConfig {
            offload: !site.render_inline,
            ..RendererConfig::default()
        },
    );
    Ok(ResultInterceptor::new(
        ConfigurerChain::standard(resolver),
        renderer,
    ))
}

/// Build the site router.
///
/// # Errors
///
/// Returns an error if the interceptor cannot be built.
pub fn build_router(site: &SiteConfig) -> Result<Router, ConfigError> {
    let interceptor = build_interceptor(site)?;
    tracing::info!(
        configurers = ?interceptor.chain().names(),
        templates = ?interceptor.renderer().registry(),
        "Page pipeline ready"
    );

    let router = Router::new()
        .route("/", get(home).post(submit))
        .route("/login", get(login))
        .route("/health", get(health))
        .fallback(not_found)
        .layer(page_layer(interceptor))
        .layer(middleware::from_fn(issue_csrf_token));

    Ok(match site.request_timeout() {
        Some(timeout) => router.layer(middleware::from_fn_with_state(timeout, stamp_deadline)),
        None => router,
    })
}

/// `/metrics` in Prometheus text format.
pub fn metrics_router(handle: PrometheusHandle) -> Router {
    Router::new().route("/metrics", get(move || std::future::ready(handle.render())))
}
