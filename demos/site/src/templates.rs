//! HTML templates for the demo pages.
//!
//! Each template reads the page's data context. Every interpolated string
//! goes through [`escape`].

use pageflow_core::{TemplateError, TemplateRegistry};
use serde_json::Value;

/// Layout template id.
pub const LAYOUT: &str = "layout";

/// Escape text for HTML element content and quoted attributes.
#[must_use]
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn text<'a>(context: &'a Value, key: &str) -> &'a str {
    context[key].as_str().unwrap_or_default()
}

fn field<'a>(context: &'a Value, name: &str) -> Result<&'a Value, TemplateError> {
    context["fields"]
        .get(name)
        .ok_or_else(|| TemplateError::new(format!("no field view for '{name}'")))
}

/// Hidden anti-forgery input, or nothing when no token was issued.
fn csrf_input(context: &Value) -> String {
    let csrf = &context["csrf"];
    match csrf["token"].as_str() {
        Some(token) => format!(
            r#"<input type="hidden" name="{}" value="{}"/>"#,
            escape(csrf["parameter_name"].as_str().unwrap_or("_csrf")),
            escape(token)
        ),
        None => String::new(),
    }
}

/// One labelled input with its validation state.
fn input_field(view: &Value) -> String {
    let name = escape(text(view, "name"));
    let valid = view["valid"].as_bool().unwrap_or(true);
    let mut html = format!(
        r#"<div class="form-group{}"><label for="{name}">{}</label>"#,
        if valid { "" } else { " has-error" },
        escape(text(view, "label")),
    );
    html.push_str(&format!(
        r#"<input class="form-control" type="{}" id="{name}" name="{name}" value="{}"{}/>"#,
        escape(text(view, "type")),
        escape(text(view, "value")),
        if view["date"].as_bool().unwrap_or(false) {
            r#" placeholder="yyyy-mm-dd""#
        } else {
            ""
        },
    ));
    for error in view["errors"].as_array().into_iter().flatten() {
        html.push_str(&format!(
            r#"<span class="help-block">{}</span>"#,
            escape(error.as_str().unwrap_or_default())
        ));
    }
    html.push_str("</div>");
    html
}

fn nav_tabs(context: &Value) -> String {
    let mut html = String::from(r#"<ul class="nav nav-tabs">"#);
    for entry in context["menus"].as_array().into_iter().flatten() {
        html.push_str(&format!(
            r#"<li class="nav-item"><a class="nav-link{}" href="{}">{}</a></li>"#,
            if entry["active"].as_bool().unwrap_or(false) { " active" } else { "" },
            escape(text(entry, "path")),
            escape(text(entry, "name")),
        ));
    }
    html.push_str("</ul>");
    html
}

/// Page chrome around every body.
fn layout(site_name: &str, context: &Value) -> String {
    let title = text(context, "title");
    let head_title = if title.is_empty() {
        escape(site_name)
    } else {
        format!("{} - {}", escape(title), escape(site_name))
    };
    format!(
        concat!(
            "<!doctype html>\n<html><head><meta charset=\"utf-8\"/><title>{}</title></head>",
            "<body><div class=\"container\">{}<main>{}</main></div></body></html>\n",
        ),
        head_title,
        nav_tabs(context),
        text(context, "body"),
    )
}

fn index(context: &Value) -> Result<String, TemplateError> {
    let mut html = format!("<h1>{}</h1>", escape(text(context, "title")));
    if let Some(value) = context["value"].as_str() {
        html.push_str(&format!(
            r#"<p class="alert alert-info">You said: {}</p>"#,
            escape(value)
        ));
    }
    html.push_str(&format!(
        r#"<form method="post" action="/">{}{}<button type="submit" class="btn btn-primary">Submit</button></form>"#,
        csrf_input(context),
        input_field(field(context, "value")?),
    ));
    Ok(html)
}

fn login(context: &Value) -> Result<String, TemplateError> {
    Ok(format!(
        r#"<h1>{}</h1><form method="post" action="/login">{}{}{}<button type="submit" class="btn btn-primary">Sign in</button></form>"#,
        escape(text(context, "title")),
        csrf_input(context),
        input_field(field(context, "username")?),
        input_field(field(context, "password")?),
    ))
}

fn error(context: &Value) -> Result<String, TemplateError> {
    Ok(format!(
        r#"<h1>Error</h1><p class="alert alert-danger">{} {}</p>"#,
        context["status"].as_u64().unwrap_or(500),
        escape(text(context, "message")),
    ))
}

/// Templates for the `index`, `login` and `error` pages wrapped in the layout.
#[must_use]
pub fn registry(site_name: impl Into<String>) -> TemplateRegistry {
    let site_name = site_name.into();
    TemplateRegistry::new()
        .template("index", index)
        .template("login", login)
        .template("error", error)
        .template(LAYOUT, move |context: &Value| -> Result<String, TemplateError> {
            Ok(layout(&site_name, context))
        })
        .with_layout(LAYOUT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn value_field(valid: bool, errors: &[&str]) -> Value {
        json!({
            "label": "Value",
            "name": "value",
            "type": "text",
            "date": false,
            "value": "",
            "valid": valid,
            "errors": errors,
        })
    }

    #[test]
    fn test_escape() {
        assert_eq!(
            escape(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_csrf_input_only_with_token() {
        assert_eq!(csrf_input(&json!({ "csrf": null })), "");
        assert_eq!(
            csrf_input(&json!({ "csrf": { "parameter_name": "_csrf", "token": "abc" } })),
            r#"<input type="hidden" name="_csrf" value="abc"/>"#
        );
    }

    #[test]
    fn test_invalid_field_shows_errors() {
        let html = input_field(&value_field(false, &["must not be blank"]));

        assert!(html.contains("has-error"));
        assert!(html.contains(r#"<span class="help-block">must not be blank</span>"#));
    }

    #[test]
    fn test_date_field_placeholder() {
        let mut view = value_field(true, &[]);
        view["type"] = json!("date");
        view["date"] = json!(true);

        assert!(input_field(&view).contains(r#"type="date""#));
        assert!(input_field(&view).contains("yyyy-mm-dd"));
    }

    #[test]
    fn test_index_requires_field_view() {
        let err = index(&json!({ "title": "Home" })).unwrap_err();
        assert_eq!(err.message(), "no field view for 'value'");
    }

    #[test]
    fn test_layout_marks_active_tab() {
        let context = json!({
            "title": "Login",
            "body": "<p>hi</p>",
            "menus": [
                { "name": "Home", "path": "/", "title": "Home", "active": false },
                { "name": "Login", "path": "/login", "title": "Login", "active": true },
            ],
        });
        let html = layout("Demo", &context);

        assert!(html.contains("<title>Login - Demo</title>"));
        assert!(html.contains(r#"<a class="nav-link" href="/">Home</a>"#));
        assert!(html.contains(r#"<a class="nav-link active" href="/login">Login</a>"#));
        assert!(html.contains("<main><p>hi</p></main>"));
    }

    proptest! {
        #[test]
        fn prop_escaped_text_has_no_markup(input in ".{0,64}") {
            let escaped = escape(&input);
            prop_assert!(!escaped.contains('<'));
            prop_assert!(!escaped.contains('>'));
            prop_assert!(!escaped.contains('"'));
        }
    }
}
