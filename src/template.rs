//! Template interpolation
//!
//! Two template dialects live here:
//!
//! - `{{ variable }}` interpolation in catalog/data source settings (base URL,
//!   headers, auth values), e.g. `{{ config.api_key }}`.
//! - `{paramName}` placeholders in endpoint suffix and body templates, filled
//!   from the resolved query parameters, e.g. `/customers/{ID}/orders`.

use crate::error::{Error, Result};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// Regex for matching template variables: {{ variable.path }}
static TEMPLATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([a-zA-Z_][a-zA-Z0-9_]*(?:\.[a-zA-Z_][a-zA-Z0-9_]*)*)\s*\}\}").unwrap()
});

/// Regex for suffix placeholders: {paramName}
static PLACEHOLDER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_.\-]*)\}").unwrap());

/// Context for `{{ }}` interpolation
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    /// Data source configuration values
    pub config: Value,
    /// Additional context variables
    pub vars: Value,
}

impl TemplateContext {
    /// Create a new empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create context with config values
    pub fn with_config(config: Value) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Set additional variables
    pub fn set_vars(&mut self, vars: Value) -> &mut Self {
        self.vars = vars;
        self
    }

    /// Get a value by path (e.g., "config.api_key")
    pub fn get(&self, path: &str) -> Option<&Value> {
        let parts: Vec<&str> = path.split('.').collect();

        let root = match parts[0] {
            "config" => &self.config,
            "vars" => &self.vars,
            // Bare names resolve against config first, then vars
            _ => {
                if let Some(val) = get_nested_value(&self.config, &parts) {
                    return Some(val);
                }
                return get_nested_value(&self.vars, &parts);
            }
        };

        if parts.len() == 1 {
            Some(root)
        } else {
            get_nested_value(root, &parts[1..])
        }
    }
}

/// Get a nested value from a JSON value by path
fn get_nested_value<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = value;
    for part in path {
        match current {
            Value::Object(map) => {
                current = map.get(*part)?;
            }
            _ => return None,
        }
    }
    Some(current)
}

/// Render a `{{ }}` template string with the given context
pub fn render(template: &str, ctx: &TemplateContext) -> Result<String> {
    let mut result = template.to_string();
    let mut errors = Vec::new();

    for cap in TEMPLATE_REGEX.captures_iter(template) {
        let (full_match, [var_path]) = cap.extract();

        match ctx.get(var_path) {
            Some(value) => {
                let replacement = value_to_string(value);
                result = result.replace(full_match, &replacement);
            }
            None => {
                errors.push(var_path.to_string());
            }
        }
    }

    if errors.is_empty() {
        Ok(result)
    } else {
        Err(Error::undefined_var(errors.join(", ")))
    }
}

/// Check if a string contains `{{ }}` template variables
pub fn has_templates(s: &str) -> bool {
    TEMPLATE_REGEX.is_match(s)
}

/// Convert a JSON value to a string for template substitution
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

// ============================================================================
// Suffix placeholders
// ============================================================================

/// List the `{param}` placeholders of a suffix template, in order of appearance
pub fn placeholders(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for cap in PLACEHOLDER_REGEX.captures_iter(template) {
        let (_, [name]) = cap.extract();
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Check whether a template contains the literal `{name}` placeholder
pub fn has_placeholder(template: &str, name: &str) -> bool {
    template.contains(&format!("{{{name}}}"))
}

/// How substituted values are escaped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escape {
    /// Percent-encode (URL path segments)
    Url,
    /// Insert verbatim (request bodies)
    Raw,
}

/// Substitute `{param}` placeholders using `lookup`
///
/// Placeholders for which `lookup` returns `None` are replaced with an empty
/// string; their names are returned so callers can decide whether that is an
/// error (required parameter) or acceptable (optional one).
pub fn substitute<F>(template: &str, escape: Escape, lookup: F) -> (String, Vec<String>)
where
    F: Fn(&str) -> Option<String>,
{
    let mut missing = Vec::new();
    let rendered = PLACEHOLDER_REGEX.replace_all(template, |cap: &regex::Captures<'_>| {
        let name = &cap[1];
        match lookup(name) {
            Some(value) => match escape {
                Escape::Url => urlencoding::encode(&value).into_owned(),
                Escape::Raw => value,
            },
            None => {
                missing.push(name.to_string());
                String::new()
            }
        }
    });
    (rendered.into_owned(), missing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_simple_substitution() {
        let ctx = TemplateContext::with_config(json!({
            "api_key": "sk_test_123"
        }));

        let result = render("Bearer {{ config.api_key }}", &ctx).unwrap();
        assert_eq!(result, "Bearer sk_test_123");
    }

    #[test]
    fn test_nested_value() {
        let ctx = TemplateContext::with_config(json!({
            "credentials": { "client_id": "my-client" }
        }));

        let result = render("Client: {{ config.credentials.client_id }}", &ctx).unwrap();
        assert_eq!(result, "Client: my-client");
    }

    #[test]
    fn test_bare_name_falls_back_to_vars() {
        let mut ctx = TemplateContext::with_config(json!({"host": "api.example.com"}));
        ctx.set_vars(json!({"version": "v2"}));

        let result = render("https://{{ host }}/{{ version }}", &ctx).unwrap();
        assert_eq!(result, "https://api.example.com/v2");
    }

    #[test]
    fn test_undefined_variable() {
        let ctx = TemplateContext::new();
        let result = render("{{ config.missing }}", &ctx);
        assert!(result.unwrap_err().to_string().contains("config.missing"));
    }

    #[test]
    fn test_has_templates() {
        assert!(has_templates("{{ config.key }}"));
        assert!(!has_templates("/customers/{ID}"));
    }

    #[test]
    fn test_placeholders_in_order_without_duplicates() {
        let names = placeholders("/customers/{ID}/orders/{orderId}?again={ID}");
        assert_eq!(names, vec!["ID", "orderId"]);
        assert!(has_placeholder("/customers/{ID}/orders", "ID"));
        assert!(!has_placeholder("/customers/{ID}/orders", "id"));
    }

    #[test]
    fn test_substitute_customer_orders() {
        let (url, missing) = substitute("/customers/{ID}/orders", Escape::Url, |name| {
            (name == "ID").then(|| "1".to_string())
        });
        assert_eq!(url, "/customers/1/orders");
        assert!(missing.is_empty());
    }

    #[test]
    fn test_substitute_escapes_path_values() {
        let (url, _) = substitute("/search/{q}", Escape::Url, |_| Some("a b/c".to_string()));
        assert_eq!(url, "/search/a%20b%2Fc");

        let (body, _) = substitute(r#"{"q": "{q}"}"#, Escape::Raw, |_| Some("a b".to_string()));
        assert_eq!(body, r#"{"q": "a b"}"#);
    }

    #[test]
    fn test_substitute_reports_missing() {
        let (url, missing) = substitute("/a/{x}/b/{y}", Escape::Url, |name| {
            (name == "x").then(|| "1".to_string())
        });
        assert_eq!(url, "/a/1/b/");
        assert_eq!(missing, vec!["y"]);
    }
}
