//! Error types for the enrichment and rendering pipeline.
//!
//! Every failure surfaces as a [`PipelineError`]. Callers that need to react
//! to the cause (tests, the HTTP layer) match on [`PipelineError::kind`]
//! rather than on message text.

use crate::interceptor::Phase;
use crate::page::PageKind;
use thiserror::Error;

/// Broad classification of a pipeline failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// No menu entry matched the page's active key and no fallback was configured.
    NavigationMismatch,
    /// Enrichment or rendering failed; the page cannot be written.
    RenderFailure,
    /// The pipeline stopped early (deadline expiry or an out-of-order step).
    Aborted,
}

impl FailureKind {
    /// Stable lowercase label, used for metric labels and log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NavigationMismatch => "navigation_mismatch",
            Self::RenderFailure => "render_failure",
            Self::Aborted => "aborted",
        }
    }
}

/// Error raised by a template while producing output.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct TemplateError {
    message: String,
}

impl TemplateError {
    /// Create a template error with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors produced by the page pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The active key matched no menu entry and the resolver has no fallback.
    #[error("No menu entry matches active key '{key}' (menu: {menu:?})")]
    NavigationMismatch {
        /// The key the page asked for
        key: String,
        /// Names of the configured menu entries
        menu: Vec<String>,
    },

    /// A configurer failed; the remaining chain was skipped.
    #[error("Configurer '{configurer}' failed: {source}")]
    Configurer {
        /// Name of the failing configurer
        configurer: String,
        /// Underlying error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// No template is registered for the page kind.
    #[error("No template '{template}' registered for page kind '{kind}'")]
    TemplateNotFound {
        /// The page kind being rendered
        kind: PageKind,
        /// The template identifier the lookup resolved to
        template: String,
    },

    /// A template raised an error while rendering.
    #[error("Template '{template}' failed: {source}")]
    Template {
        /// The template identifier
        template: String,
        /// Underlying template error
        #[source]
        source: TemplateError,
    },

    /// The page could not be converted into a template data context.
    #[error("Failed to build template context: {0}")]
    Context(#[from] serde_json::Error),

    /// The deferred render task did not complete.
    #[error("Render task failed: {0}")]
    Offload(String),

    /// The request deadline passed before the named phase could start.
    #[error("Request deadline exceeded before {phase:?}")]
    DeadlineExceeded {
        /// The phase that was about to start
        phase: Phase,
    },

    /// The interceptor was driven through an invalid state transition.
    #[error("Invalid interception transition from {from:?} to {to:?}")]
    InvalidTransition {
        /// Current phase
        from: Phase,
        /// Requested phase
        to: Phase,
    },
}

impl PipelineError {
    /// Wrap an arbitrary error raised by a named configurer.
    pub fn configurer<E>(configurer: impl Into<String>, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Configurer {
            configurer: configurer.into(),
            source: source.into(),
        }
    }

    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::NavigationMismatch { .. } => FailureKind::NavigationMismatch,
            Self::Configurer { .. }
            | Self::TemplateNotFound { .. }
            | Self::Template { .. }
            | Self::Context(_)
            | Self::Offload(_) => FailureKind::RenderFailure,
            Self::DeadlineExceeded { .. } | Self::InvalidTransition { .. } => {
                FailureKind::Aborted
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        let err = PipelineError::NavigationMismatch {
            key: "nope".to_string(),
            menu: vec!["Home".to_string()],
        };
        assert_eq!(err.kind(), FailureKind::NavigationMismatch);

        let err = PipelineError::configurer("csrf", "boom");
        assert_eq!(err.kind(), FailureKind::RenderFailure);
        assert_eq!(err.to_string(), "Configurer 'csrf' failed: boom");

        let err = PipelineError::DeadlineExceeded {
            phase: Phase::Rendering,
        };
        assert_eq!(err.kind(), FailureKind::Aborted);
    }

    #[test]
    fn test_template_not_found_message() {
        let err = PipelineError::TemplateNotFound {
            kind: PageKind::new("login"),
            template: "pages/login".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "No template 'pages/login' registered for page kind 'login'"
        );
    }

    #[test]
    fn test_failure_kind_labels() {
        assert_eq!(FailureKind::RenderFailure.as_str(), "render_failure");
        assert_eq!(
            FailureKind::NavigationMismatch.as_str(),
            "navigation_mismatch"
        );
    }
}
