//! Page model.
//!
//! A handler that wants HTML produces a [`Page`]: any type exposing the
//! shared [`PageModel`] slots plus its own data. The interceptor recognises
//! pages by this capability alone, never by concrete type.
//!
//! Pages that can show a framework error message additionally expose a
//! [`MessageSlot`] through [`Page::message_slot`].

use crate::binding::FieldView;
use crate::navigation::MenuEntry;
use crate::request::CsrfToken;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Which page this is; selects the template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageKind(String);

impl PageKind {
    /// Create a page kind.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self(kind.into())
    }

    /// The kind as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PageKind {
    fn from(kind: &str) -> Self {
        Self::new(kind)
    }
}

impl From<String> for PageKind {
    fn from(kind: String) -> Self {
        Self(kind)
    }
}

/// A form field the page's template renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// Label shown next to the input
    pub label: String,
    /// Input name, also the binding field name
    pub name: String,
    /// Input type (`text`, `date`, ...)
    pub field_type: String,
    /// Value submitted by the handler when no binding status exists
    pub submitted: Option<String>,
}

impl FieldSpec {
    /// A text field.
    #[must_use]
    pub fn text(label: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(label, name, "text")
    }

    /// A field with an explicit input type.
    #[must_use]
    pub fn new(label: impl Into<String>, name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            name: name.into(),
            field_type: field_type.into(),
            submitted: None,
        }
    }

    /// Set the value to show when no binding status is present.
    #[must_use]
    pub fn with_submitted(mut self, value: impl Into<String>) -> Self {
        self.submitted = Some(value.into());
        self
    }
}

/// A form bound to one model target (the `BindingResult.<target>` name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSpec {
    /// Binding target name
    pub target: String,
    /// Fields the template renders
    pub fields: Vec<FieldSpec>,
}

impl FormSpec {
    /// Create an empty form for `target`.
    #[must_use]
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            fields: Vec::new(),
        }
    }

    /// Add a field.
    #[must_use]
    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }
}

/// Slots shared by every page, filled by the configurer chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageModel {
    /// Page kind
    pub kind: PageKind,
    /// Page title; navigation sets it from the current menu entry
    pub title: String,
    /// Logical navigation identity
    pub active_key: String,
    /// Anti-forgery token, when the security layer issued one
    pub csrf: Option<CsrfToken>,
    /// Forms declared by the handler
    #[serde(skip)]
    pub forms: Vec<FormSpec>,
    /// Field views keyed by field name
    pub fields: BTreeMap<String, FieldView>,
    /// Per-request copy of the menu
    pub menus: Vec<MenuEntry>,
    /// The matched menu entry or the navigation fallback
    pub current: Option<MenuEntry>,
}

impl PageModel {
    /// Create an unenriched model.
    #[must_use]
    pub fn new(kind: impl Into<PageKind>, active_key: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            title: String::new(),
            active_key: active_key.into(),
            csrf: None,
            forms: Vec::new(),
            fields: BTreeMap::new(),
            menus: Vec::new(),
            current: None,
        }
    }

    /// Declare a form.
    #[must_use]
    pub fn with_form(mut self, form: FormSpec) -> Self {
        self.forms.push(form);
        self
    }

    /// Set the initial title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

/// Optional page capability: a place for the framework error message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MessageSlot(Option<String>);

impl MessageSlot {
    /// Store `message`, replacing any previous one.
    pub fn set(&mut self, message: impl Into<String>) {
        self.0 = Some(message.into());
    }

    /// The stored message.
    #[must_use]
    pub fn get(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

/// The "is a page" capability.
///
/// # Example
///
/// ```
/// use pageflow_core::page::{Page, PageModel};
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct ProfilePage {
///     #[serde(flatten)]
///     model: PageModel,
///     username: String,
/// }
///
/// impl Page for ProfilePage {
///     fn model(&self) -> &PageModel {
///         &self.model
///     }
///
///     fn model_mut(&mut self) -> &mut PageModel {
///         &mut self.model
///     }
///
///     fn context(&self) -> Result<serde_json::Value, serde_json::Error> {
///         serde_json::to_value(self)
///     }
/// }
/// ```
pub trait Page: Send + Sync + 'static {
    /// Shared slots.
    fn model(&self) -> &PageModel;

    /// Shared slots, mutably.
    fn model_mut(&mut self) -> &mut PageModel;

    /// Template data context: the shared slots plus page-specific data.
    ///
    /// # Errors
    ///
    /// Returns an error if the page cannot be serialized.
    fn context(&self) -> Result<serde_json::Value, serde_json::Error>;

    /// Page kind.
    fn kind(&self) -> &PageKind {
        &self.model().kind
    }

    /// Message slot capability; absent by default.
    fn message_slot(&mut self) -> Option<&mut MessageSlot> {
        None
    }
}

/// General-purpose page: shared slots plus free-form data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StandardPage {
    #[serde(flatten)]
    model: PageModel,
    #[serde(flatten)]
    data: serde_json::Map<String, serde_json::Value>,
}

impl StandardPage {
    /// Create a page of `kind` under navigation key `active_key`.
    #[must_use]
    pub fn new(kind: impl Into<PageKind>, active_key: impl Into<String>) -> Self {
        Self {
            model: PageModel::new(kind, active_key),
            data: serde_json::Map::new(),
        }
    }

    /// Add a page-specific value to the template context.
    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Declare a form.
    #[must_use]
    pub fn with_form(mut self, form: FormSpec) -> Self {
        self.model.forms.push(form);
        self
    }

    /// Page-specific data.
    #[must_use]
    pub const fn data(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.data
    }
}

impl Page for StandardPage {
    fn model(&self) -> &PageModel {
        &self.model
    }

    fn model_mut(&mut self) -> &mut PageModel {
        &mut self.model
    }

    fn context(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Page kind used by [`ErrorPage`].
pub const ERROR_PAGE_KIND: &str = "error";

/// Error page with a status code and a message slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorPage {
    #[serde(flatten)]
    model: PageModel,
    status: u16,
    message: MessageSlot,
}

impl ErrorPage {
    /// Create an error page for HTTP `status`.
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self {
            model: PageModel::new(ERROR_PAGE_KIND, ERROR_PAGE_KIND),
            status,
            message: MessageSlot::default(),
        }
    }

    /// Select the menu entry the error page highlights.
    ///
    /// Defaults to `error`, which only resolves through the navigation fallback.
    #[must_use]
    pub fn with_active_key(mut self, key: impl Into<String>) -> Self {
        self.model.active_key = key.into();
        self
    }

    /// Status code shown on the page.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// The message copied in by the chain, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.get()
    }
}

impl Page for ErrorPage {
    fn model(&self) -> &PageModel {
        &self.model
    }

    fn model_mut(&mut self) -> &mut PageModel {
        &mut self.model
    }

    fn context(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    fn message_slot(&mut self) -> Option<&mut MessageSlot> {
        Some(&mut self.message)
    }
}
