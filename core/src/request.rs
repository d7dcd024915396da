//! Request-scoped inputs to the configurer chain.
//!
//! - [`RequestContext`]: per-request attributes supplied by the transport and
//!   by external layers (CSRF token, framework error message, deadline)
//! - [`ModelMap`]: the request-scoped model the handler produced alongside
//!   its page, including binding results under the `BindingResult.<target>`
//!   key convention
//!
//! Configurers read both; neither is ever written by the pipeline.

use crate::binding::BindingStatus;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

/// Request attribute key under which the security layer stores the CSRF token.
pub const CSRF_ATTRIBUTE: &str = "_csrf";

/// Request attribute key holding the framework-supplied error message.
pub const ERROR_MESSAGE_ATTRIBUTE: &str = "error.message";

/// Model key prefix used by the binding layer: `BindingResult.<target>`.
pub const BINDING_RESULT_PREFIX: &str = "BindingResult";

/// Build the model key for the binding result of `target`.
#[must_use]
pub fn binding_key(target: &str) -> String {
    format!("{BINDING_RESULT_PREFIX}.{target}")
}

/// Anti-forgery token issued by the external security layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsrfToken {
    /// Header the token must be echoed under
    pub header_name: String,
    /// Form parameter the token must be echoed under
    pub parameter_name: String,
    /// Opaque token value
    pub token: String,
}

impl CsrfToken {
    /// Create a token using the conventional `X-CSRF-TOKEN` header and `_csrf` parameter.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            header_name: "X-CSRF-TOKEN".to_string(),
            parameter_name: CSRF_ATTRIBUTE.to_string(),
            token: token.into(),
        }
    }
}

/// A single request attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribute {
    /// Anti-forgery token
    Csrf(CsrfToken),
    /// Free-form text
    Text(String),
}

/// Per-request attributes visible to configurers.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    path: String,
    attributes: BTreeMap<String, Attribute>,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// Create a context for a request to `path`.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            attributes: BTreeMap::new(),
            deadline: None,
        }
    }

    /// Attach a CSRF token under [`CSRF_ATTRIBUTE`].
    #[must_use]
    pub fn with_csrf(mut self, token: CsrfToken) -> Self {
        self.attributes
            .insert(CSRF_ATTRIBUTE.to_string(), Attribute::Csrf(token));
        self
    }

    /// Attach the framework error message under [`ERROR_MESSAGE_ATTRIBUTE`].
    #[must_use]
    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.attributes.insert(
            ERROR_MESSAGE_ATTRIBUTE.to_string(),
            Attribute::Text(message.into()),
        );
        self
    }

    /// Attach an arbitrary attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: Attribute) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Abort the pipeline if it has not finished by `deadline`.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Request path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Look up an attribute.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&Attribute> {
        self.attributes.get(key)
    }

    /// The CSRF token, if the security layer supplied one.
    #[must_use]
    pub fn csrf_token(&self) -> Option<&CsrfToken> {
        match self.attributes.get(CSRF_ATTRIBUTE) {
            Some(Attribute::Csrf(token)) => Some(token),
            _ => None,
        }
    }

    /// The framework error message, if any.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match self.attributes.get(ERROR_MESSAGE_ATTRIBUTE) {
            Some(Attribute::Text(message)) => Some(message),
            _ => None,
        }
    }

    /// The request deadline, if the transport set one.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether the deadline has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// A value stored in the request-scoped model.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelValue {
    /// Binding/validation result for one target
    Binding(BindingStatus),
    /// Any other handler-supplied value
    Value(serde_json::Value),
}

/// Request-scoped model produced by the handler next to its page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelMap {
    entries: BTreeMap<String, ModelValue>,
}

impl ModelMap {
    /// Create an empty model.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a plain value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.entries
            .insert(key.into(), ModelValue::Value(value.into()));
    }

    /// Store a binding result under `BindingResult.<target>`.
    pub fn insert_binding(&mut self, status: BindingStatus) {
        self.entries.insert(
            binding_key(status.target()),
            ModelValue::Binding(status),
        );
    }

    /// Builder-style [`ModelMap::insert_binding`].
    #[must_use]
    pub fn with_binding(mut self, status: BindingStatus) -> Self {
        self.insert_binding(status);
        self
    }

    /// Look up a raw entry.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ModelValue> {
        self.entries.get(key)
    }

    /// The binding result for `target`, if the binding layer supplied one.
    #[must_use]
    pub fn binding(&self, target: &str) -> Option<&BindingStatus> {
        match self.entries.get(&binding_key(target)) {
            Some(ModelValue::Binding(status)) => Some(status),
            _ => None,
        }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the model is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_csrf_lookup() {
        let ctx = RequestContext::new("/").with_csrf(CsrfToken::new("abc"));
        let token = ctx.csrf_token();
        assert_eq!(token.map(|t| t.token.as_str()), Some("abc"));
        assert_eq!(token.map(|t| t.parameter_name.as_str()), Some("_csrf"));
    }

    #[test]
    fn test_missing_attributes_are_none() {
        let ctx = RequestContext::new("/login");
        assert!(ctx.csrf_token().is_none());
        assert!(ctx.error_message().is_none());
        assert!(!ctx.is_expired());
    }

    #[test]
    fn test_csrf_key_with_wrong_type_is_ignored() {
        let ctx = RequestContext::new("/")
            .with_attribute(CSRF_ATTRIBUTE, Attribute::Text("raw".to_string()));
        assert!(ctx.csrf_token().is_none());
    }

    #[test]
    fn test_expired_deadline() {
        let past = Instant::now()
            .checked_sub(Duration::from_millis(5))
            .unwrap_or_else(Instant::now);
        let ctx = RequestContext::new("/").with_deadline(past);
        assert!(ctx.is_expired());
    }

    #[test]
    fn test_binding_convention() {
        let model = ModelMap::new().with_binding(BindingStatus::new("foo"));
        assert!(model.get("BindingResult.foo").is_some());
        assert!(model.binding("foo").is_some());
        assert!(model.binding("bar").is_none());
    }
}
