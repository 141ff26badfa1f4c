//! `{{ name }}` substitution for transactional email templates.
//!
//! Templates live in the `email_templates` table; only plain variable
//! substitution is supported. Unknown variables render as empty strings.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

static VARIABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("valid template regex")
});

/// Render an HTML template. Substituted values are HTML-escaped.
pub fn render_html(source: &str, context: &HashMap<&str, String>) -> String {
    render(source, context, escape_html)
}

/// Render a plain-text template such as an email subject.
pub fn render_text(source: &str, context: &HashMap<&str, String>) -> String {
    render(source, context, str::to_string)
}

fn render(source: &str, context: &HashMap<&str, String>, encode: fn(&str) -> String) -> String {
    VARIABLE
        .replace_all(source, |caps: &Captures<'_>| {
            context
                .get(&caps[1])
                .map(|v| encode(v))
                .unwrap_or_default()
        })
        .into_owned()
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
    out
}
