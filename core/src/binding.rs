//! Binding/validation adapter.
//!
//! The external binding layer reports, per form target, the raw submitted
//! values and the field-level error messages it produced
//! ([`BindingStatus`]). [`FieldView::build`] folds that status into the
//! renderable view of a single form field.
//!
//! `FieldView` keeps its fields private so that `valid == errors.is_empty()`
//! holds for every instance.

use serde::Serialize;
use std::collections::BTreeMap;

/// One field-level error reported by the binding layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Field the error belongs to
    pub field: String,
    /// Default (user-facing) message
    pub message: String,
}

/// Binding result for one form target.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BindingStatus {
    target: String,
    values: BTreeMap<String, serde_json::Value>,
    errors: Vec<FieldError>,
}

impl BindingStatus {
    /// Create an empty status for `target`.
    #[must_use]
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            values: BTreeMap::new(),
            errors: Vec::new(),
        }
    }

    /// Record the raw submitted value of `field`.
    #[must_use]
    pub fn with_value(mut self, field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.values.insert(field.into(), value.into());
        self
    }

    /// Record a field error. Errors keep the order they were reported in.
    #[must_use]
    pub fn reject(mut self, field: impl Into<String>, message: impl Into<String>) -> Self {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
        self
    }

    /// The form target this status belongs to.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Whether any error was reported for `field`.
    #[must_use]
    pub fn has_errors_for(&self, field: &str) -> bool {
        self.errors.iter().any(|error| error.field == field)
    }

    /// Error messages for `field`, in reported order.
    #[must_use]
    pub fn error_messages(&self, field: &str) -> Vec<String> {
        self.errors
            .iter()
            .filter(|error| error.field == field)
            .map(|error| error.message.clone())
            .collect()
    }

    /// Raw submitted value for `field`.
    #[must_use]
    pub fn raw_value(&self, field: &str) -> Option<&serde_json::Value> {
        self.values.get(field)
    }
}

/// Text form of a raw binding value. `null` has no text form.
fn value_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

/// Renderable view of one form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldView {
    label: String,
    name: String,
    #[serde(rename = "type")]
    field_type: String,
    date: bool,
    value: String,
    valid: bool,
    errors: Vec<String>,
}

impl FieldView {
    /// Build the view of field `name`.
    ///
    /// Without a status the field is valid and shows `submitted` (or `""`).
    /// With a status, validity, errors and the displayed value all come from it.
    #[must_use]
    pub fn build(
        label: &str,
        name: &str,
        submitted: Option<&str>,
        field_type: &str,
        status: Option<&BindingStatus>,
    ) -> Self {
        let (value, errors) = match status {
            None => (submitted.unwrap_or_default().to_string(), Vec::new()),
            Some(status) => (
                status
                    .raw_value(name)
                    .and_then(value_text)
                    .unwrap_or_default(),
                status.error_messages(name),
            ),
        };

        Self {
            label: label.to_string(),
            name: name.to_string(),
            field_type: field_type.to_string(),
            date: field_type == "date",
            value,
            valid: errors.is_empty(),
            errors,
        }
    }

    /// Field label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared input type.
    #[must_use]
    pub fn field_type(&self) -> &str {
        &self.field_type
    }

    /// Whether the template should apply date formatting.
    #[must_use]
    pub const fn is_date(&self) -> bool {
        self.date
    }

    /// Displayed value, never absent.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Whether the field passed validation.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.valid
    }

    /// Validation messages, empty when valid.
    #[must_use]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_no_status_uses_submitted_value() {
        let field = FieldView::build("Value", "value", Some("hello"), "text", None);
        assert!(field.is_valid());
        assert!(field.errors().is_empty());
        assert_eq!(field.value(), "hello");
    }

    #[test]
    fn test_no_status_and_no_value_is_empty_string() {
        let field = FieldView::build("Value", "value", None, "text", None);
        assert_eq!(field.value(), "");
        assert!(field.is_valid());
    }

    #[test]
    fn test_blank_value_rejected() {
        let status = BindingStatus::new("foo")
            .with_value("value", serde_json::Value::Null)
            .reject("value", "must not be blank");

        let field = FieldView::build("Value", "value", Some("ignored"), "text", Some(&status));

        assert!(!field.is_valid());
        assert_eq!(field.errors(), ["must not be blank".to_string()]);
        assert_eq!(field.value(), "");
    }

    #[test]
    fn test_status_without_errors_for_field() {
        let status = BindingStatus::new("foo")
            .with_value("value", "kept")
            .reject("other", "too short");

        let field = FieldView::build("Value", "value", None, "text", Some(&status));

        assert!(field.is_valid());
        assert_eq!(field.value(), "kept");
    }

    #[test]
    fn test_non_string_raw_value_uses_text_form() {
        let status = BindingStatus::new("foo").with_value("count", 42);
        let field = FieldView::build("Count", "count", None, "number", Some(&status));
        assert_eq!(field.value(), "42");
    }

    #[test]
    fn test_errors_keep_reported_order() {
        let status = BindingStatus::new("foo")
            .reject("value", "first")
            .reject("other", "unrelated")
            .reject("value", "second");

        assert_eq!(status.error_messages("value"), vec!["first", "second"]);
    }

    #[test]
    fn test_date_flag_only_for_date_type() {
        assert!(FieldView::build("Born", "born", None, "date", None).is_date());
        assert!(!FieldView::build("Born", "born", None, "datetime-local", None).is_date());
        assert!(!FieldView::build("Born", "born", None, "DATE", None).is_date());
    }

    #[test]
    fn test_serializes_type_key() {
        let field = FieldView::build("Value", "value", None, "text", None);
        let json = serde_json::to_value(&field).unwrap_or_default();
        assert_eq!(json["type"], "text");
        assert_eq!(json["valid"], true);
    }

    proptest! {
        #[test]
        fn prop_valid_iff_no_errors(
            messages in proptest::collection::vec("[a-z ]{1,12}", 0..4),
            raw in proptest::option::of("[a-zA-Z0-9]{0,8}"),
        ) {
            let mut status = BindingStatus::new("target");
            if let Some(raw) = &raw {
                status = status.with_value("field", raw.as_str());
            }
            for message in &messages {
                status = status.reject("field", message.as_str());
            }

            let field = FieldView::build("Field", "field", None, "text", Some(&status));
            prop_assert_eq!(field.is_valid(), field.errors().is_empty());
            prop_assert_eq!(field.errors().len(), messages.len());
            prop_assert_eq!(field.value(), raw.as_deref().unwrap_or(""));
        }
    }
}
