//! Demo pages.

use pageflow_core::{FieldSpec, FormSpec, Page, PageModel, StandardPage};
use serde::Serialize;

/// Binding target of the home page form.
pub const FOO_FORM: &str = "foo";

/// Navigation key of the home page; error pages highlight it too.
pub const HOME_KEY: &str = "home";

/// Home page: the `foo` form and an echo of the last accepted value.
#[derive(Debug, Clone, Serialize)]
pub struct IndexPage {
    #[serde(flatten)]
    model: PageModel,
    value: Option<String>,
}

impl IndexPage {
    /// Fresh home page.
    #[must_use]
    pub fn new() -> Self {
        Self {
            model: PageModel::new("index", HOME_KEY)
                .with_form(FormSpec::new(FOO_FORM).field(FieldSpec::text("Value", "value"))),
            value: None,
        }
    }

    /// Echo an accepted submission.
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

impl Default for IndexPage {
    fn default() -> Self {
        Self::new()
    }
}

impl Page for IndexPage {
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

/// Sign-in page.
#[must_use]
pub fn login_page() -> StandardPage {
    StandardPage::new("login", "login").with_form(
        FormSpec::new("login")
            .field(FieldSpec::text("Username", "username"))
            .field(FieldSpec::new("Password", "password", "password")),
    )
}
