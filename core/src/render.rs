//! Renderer bridge.
//!
//! Turns an enriched page into response bytes. Template syntax is not this
//! crate's concern: a [`Template`] is anything that maps a JSON data context
//! to a string, and plain closures qualify.
//!
//! # Lookup
//!
//! 1. An explicit page-kind → template-id mapping, if one was registered
//! 2. Otherwise the naming convention `prefix + kind + suffix`
//!
//! # Layout
//!
//! When a layout template is configured the page template renders first, then
//! the layout renders with the same context plus a `body` key holding the
//! page output.
//!
//! # Execution modes
//!
//! [`Renderer::render`] runs on the calling thread. [`Renderer::render_async`]
//! produces the same bytes without blocking the async scheduler: by default it
//! moves the template call onto tokio's blocking pool.

use crate::error::{PipelineError, TemplateError};
use crate::page::{Page, PageKind};
use std::collections::HashMap;
use std::sync::Arc;

/// Default response content type.
pub const TEXT_HTML: &str = "text/html";

/// A compiled template.
pub trait Template: Send + Sync {
    /// Render `context` to text.
    ///
    /// # Errors
    ///
    /// Returns an error if the template cannot produce output for `context`.
    fn render(&self, context: &serde_json::Value) -> Result<String, TemplateError>;
}

impl<F> Template for F
where
    F: Fn(&serde_json::Value) -> Result<String, TemplateError> + Send + Sync,
{
    fn render(&self, context: &serde_json::Value) -> Result<String, TemplateError> {
        self(context)
    }
}

/// Page-kind to template mapping.
#[derive(Clone, Default)]
pub struct TemplateRegistry {
    templates: HashMap<String, Arc<dyn Template>>,
    mappings: HashMap<PageKind, String>,
    prefix: String,
    suffix: String,
    layout: Option<String>,
}

impl std::fmt::Debug for TemplateRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut templates: Vec<&String> = self.templates.keys().collect();
        templates.sort();
        f.debug_struct("TemplateRegistry")
            .field("templates", &templates)
            .field("mappings", &self.mappings)
            .field("prefix", &self.prefix)
            .field("suffix", &self.suffix)
            .field("layout", &self.layout)
            .finish()
    }
}

impl TemplateRegistry {
    /// Create an empty registry using the bare page kind as template id.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `prefix + kind + suffix` as the conventional template id.
    #[must_use]
    pub fn with_convention(mut self, prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self.suffix = suffix.into();
        self
    }

    /// Register a template under `id`.
    #[must_use]
    pub fn template(mut self, id: impl Into<String>, template: impl Template + 'static) -> Self {
        self.templates.insert(id.into(), Arc::new(template));
        self
    }

    /// Map `kind` to template `id`, bypassing the naming convention.
    #[must_use]
    pub fn map(mut self, kind: impl Into<PageKind>, id: impl Into<String>) -> Self {
        self.mappings.insert(kind.into(), id.into());
        self
    }

    /// Wrap every page in the template registered under `id`.
    #[must_use]
    pub fn with_layout(mut self, id: impl Into<String>) -> Self {
        self.layout = Some(id.into());
        self
    }

    /// Template id for `kind`.
    #[must_use]
    pub fn template_id(&self, kind: &PageKind) -> String {
        self.mappings
            .get(kind)
            .cloned()
            .unwrap_or_else(|| format!("{}{}{}", self.prefix, kind, self.suffix))
    }

    fn lookup(&self, kind: &PageKind, id: &str) -> Result<&Arc<dyn Template>, PipelineError> {
        self.templates
            .get(id)
            .ok_or_else(|| PipelineError::TemplateNotFound {
                kind: kind.clone(),
                template: id.to_string(),
            })
    }

    /// Render the data context of a page of `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::TemplateNotFound`] when the page or layout
    /// template is missing and [`PipelineError::Template`] when one fails.
    pub fn render_context(
        &self,
        kind: &PageKind,
        mut context: serde_json::Value,
    ) -> Result<String, PipelineError> {
        let id = self.template_id(kind);
        let body = self
            .lookup(kind, &id)?
            .render(&context)
            .map_err(|source| PipelineError::Template {
                template: id.clone(),
                source,
            })?;

        let Some(layout_id) = &self.layout else {
            return Ok(body);
        };

        let layout = self.lookup(kind, layout_id)?;
        if let Some(fields) = context.as_object_mut() {
            fields.insert("body".to_string(), serde_json::Value::String(body));
        } else {
            context = serde_json::json!({ "body": body });
        }
        layout
            .render(&context)
            .map_err(|source| PipelineError::Template {
                template: layout_id.clone(),
                source,
            })
    }
}

/// Rendered response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// UTF-8 encoded body
    pub body: Vec<u8>,
    /// Response content type
    pub content_type: String,
}

/// Renderer settings.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Content type of rendered pages
    pub content_type: String,
    /// Run templates on the blocking pool in async mode
    pub offload: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            content_type: TEXT_HTML.to_string(),
            offload: true,
        }
    }
}

/// Converts enriched pages into bytes, synchronously or asynchronously.
#[derive(Debug, Clone)]
pub struct Renderer {
    registry: Arc<TemplateRegistry>,
    config: RendererConfig,
}

impl Renderer {
    /// Create a renderer with default settings.
    #[must_use]
    pub fn new(registry: TemplateRegistry) -> Self {
        Self::with_config(registry, RendererConfig::default())
    }

    /// Create a renderer with explicit settings.
    #[must_use]
    pub fn with_config(registry: TemplateRegistry, config: RendererConfig) -> Self {
        Self {
            registry: Arc::new(registry),
            config,
        }
    }

    /// The template registry.
    #[must_use]
    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    /// The renderer settings.
    #[must_use]
    pub const fn config(&self) -> &RendererConfig {
        &self.config
    }

    fn encode(&self, kind: &PageKind, context: serde_json::Value) -> Result<Rendered, PipelineError> {
        let html = self.registry.render_context(kind, context)?;
        Ok(Rendered {
            body: html.into_bytes(),
            content_type: self.config.content_type.clone(),
        })
    }

    /// Render `page` on the calling thread.
    ///
    /// # Errors
    ///
    /// Fails if the page cannot be serialized or its templates are missing or fail.
    pub fn render(&self, page: &dyn Page) -> Result<Rendered, PipelineError> {
        let context = page.context()?;
        self.encode(page.kind(), context)
    }

    /// Render `page` without blocking the async scheduler.
    ///
    /// The data context is captured before the template runs, so output is
    /// identical to [`Renderer::render`].
    ///
    /// # Errors
    ///
    /// Same as [`Renderer::render`], plus [`PipelineError::Offload`] if the
    /// blocking task is cancelled or panics.
    pub async fn render_async(&self, page: &dyn Page) -> Result<Rendered, PipelineError> {
        let context = page.context()?;
        let kind = page.kind().clone();

        if !self.config.offload {
            return self.encode(&kind, context);
        }

        let renderer = self.clone();
        tokio::task::spawn_blocking(move || renderer.encode(&kind, context))
            .await
            .map_err(|e| PipelineError::Offload(e.to_string()))?
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use crate::page::StandardPage;

    fn title_template(context: &serde_json::Value) -> Result<String, TemplateError> {
        Ok(format!(
            "<h1>{}</h1>",
            context["title"].as_str().unwrap_or_default()
        ))
    }

    fn layout_template(context: &serde_json::Value) -> Result<String, TemplateError> {
        Ok(format!(
            "<html>{}</html>",
            context["body"].as_str().unwrap_or_default()
        ))
    }

    fn page() -> StandardPage {
        let mut page = StandardPage::new("index", "home");
        page.model_mut().title = "Home".to_string();
        page
    }

    #[test]
    fn test_render_by_convention() {
        let registry = TemplateRegistry::new()
            .with_convention("pages/", ".html")
            .template("pages/index.html", title_template);
        let rendered = Renderer::new(registry).render(&page()).expect("render");

        assert_eq!(rendered.body, b"<h1>Home</h1>");
        assert_eq!(rendered.content_type, "text/html");
    }

    #[test]
    fn test_explicit_mapping_wins() {
        let registry = TemplateRegistry::new()
            .with_convention("pages/", "")
            .map("index", "home-v2")
            .template("home-v2", title_template);

        assert_eq!(registry.template_id(&PageKind::new("index")), "home-v2");
        assert!(Renderer::new(registry).render(&page()).is_ok());
    }

    #[test]
    fn test_layout_wraps_body() {
        let registry = TemplateRegistry::new()
            .template("index", title_template)
            .template("layout", layout_template)
            .with_layout("layout");
        let rendered = Renderer::new(registry).render(&page()).expect("render");

        assert_eq!(rendered.body, b"<html><h1>Home</h1></html>");
    }

    #[test]
    fn test_missing_template_is_render_failure() {
        let err = Renderer::new(TemplateRegistry::new())
            .render(&page())
            .expect_err("no template");

        assert_eq!(err.kind(), FailureKind::RenderFailure);
        assert!(matches!(err, PipelineError::TemplateNotFound { .. }));
    }

    #[test]
    fn test_missing_layout_is_render_failure() {
        let registry = TemplateRegistry::new()
            .template("index", title_template)
            .with_layout("layout");
        let err = Renderer::new(registry).render(&page()).expect_err("no layout");

        assert!(matches!(
            err,
            PipelineError::TemplateNotFound { ref template, .. } if template == "layout"
        ));
    }

    #[test]
    fn test_template_error_propagates() {
        let registry = TemplateRegistry::new().template(
            "index",
            |_: &serde_json::Value| -> Result<String, TemplateError> {
                Err(TemplateError::new("unclosed section"))
            },
        );
        let err = Renderer::new(registry).render(&page()).expect_err("fails");

        assert_eq!(err.to_string(), "Template 'index' failed: unclosed section");
    }

    #[test]
    fn test_custom_content_type() {
        let config = RendererConfig {
            content_type: "text/html; charset=utf-8".to_string(),
            offload: false,
        };
        let registry = TemplateRegistry::new().template("index", title_template);
        let rendered = Renderer::with_config(registry, config)
            .render(&page())
            .expect("render");

        assert_eq!(rendered.content_type, "text/html; charset=utf-8");
    }

    #[tokio::test]
    async fn test_async_matches_sync() {
        let registry = TemplateRegistry::new()
            .template("index", title_template)
            .template("layout", layout_template)
            .with_layout("layout");
        let renderer = Renderer::new(registry);
        let page = page();

        let sync = renderer.render(&page).expect("sync");
        let deferred = renderer.render_async(&page).await.expect("async");

        assert_eq!(sync, deferred);
    }

    #[test]
    fn test_async_render_on_current_thread_runtime() {
        let registry = TemplateRegistry::new().template("index", title_template);
        let renderer = Renderer::new(registry);

        let rendered = tokio_test::block_on(renderer.render_async(&page())).expect("async");

        assert_eq!(rendered.body, b"<h1>Home</h1>");
    }

    #[tokio::test]
    async fn test_async_inline_matches_sync() {
        let config = RendererConfig {
            offload: false,
            ..RendererConfig::default()
        };
        let registry = TemplateRegistry::new().template("index", title_template);
        let renderer = Renderer::with_config(registry, config);
        let page = page();

        assert_eq!(
            renderer.render(&page).expect("sync"),
            renderer.render_async(&page).await.expect("async")
        );
    }
}
