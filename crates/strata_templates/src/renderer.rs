//! Logic-less variable substitution.

use regex::{Captures, Regex};
use serde_json::Value;
use tracing::debug;

use crate::context::Variables;

/// Mustache-style renderer supporting `{{name}}`, `{{{name}}}` and `{{& name}}`.
///
/// There are no sections or partials. Values are never HTML-escaped, so the
/// three forms render identically. A placeholder whose name is not in the
/// variable set is left in the output exactly as written.
pub struct TemplateRenderer {
    variable_pattern: Regex,
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRenderer {
    /// Create a new template renderer.
    pub fn new() -> Self {
        Self {
            variable_pattern: Regex::new(
                r"\{\{\{\s*([A-Za-z0-9_][A-Za-z0-9_:.\-]*)\s*\}\}\}|\{\{&?\s*([A-Za-z0-9_][A-Za-z0-9_:.\-]*)\s*\}\}",
            )
            .expect("placeholder pattern is valid"),
        }
    }

    /// Render `content` against `variables`.
    pub fn render(&self, content: &str, variables: &Variables) -> String {
        self.variable_pattern
            .replace_all(content, |caps: &Captures| {
                let name = placeholder_name(caps);
                match lookup(name, variables) {
                    Some(value) => render_value(value),
                    None => {
                        debug!("Leaving unresolved placeholder {{{{{}}}}}", name);
                        caps[0].to_string()
                    }
                }
            })
            .into_owned()
    }

    /// Names referenced in `content` that `variables` cannot supply.
    pub fn unresolved(&self, content: &str, variables: &Variables) -> Vec<String> {
        let mut names: Vec<String> = self
            .variable_pattern
            .captures_iter(content)
            .map(|caps| placeholder_name(&caps).to_string())
            .filter(|name| lookup(name, variables).is_none())
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

fn placeholder_name<'t>(caps: &Captures<'t>) -> &'t str {
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str())
        .unwrap_or_default()
}

/// Exact key first, then the longest dotted prefix with a nested lookup.
fn lookup<'v>(name: &str, variables: &'v Variables) -> Option<&'v Value> {
    if let Some(value) = variables.get(name) {
        return Some(value);
    }

    name.char_indices()
        .filter(|(_, c)| *c == '.')
        .map(|(i, _)| i)
        .rev()
        .find_map(|i| {
            let root = variables.get(&name[..i])?;
            name[i + 1..].split('.').try_fold(root, |value, segment| match value {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            })
        })
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars(value: Value) -> Variables {
        match value {
            Value::Object(map) => map.into_iter().collect(),
            _ => Variables::new(),
        }
    }

    #[test]
    fn test_render_content() {
        let renderer = TemplateRenderer::new();
        let vars = vars(json!({"hosted:id": "shop", "host:region": "eu-west-1"}));
        let rendered = renderer.render("id: {{hosted:id}}\nregion: {{ host:region }}", &vars);
        assert_eq!(rendered, "id: shop\nregion: eu-west-1");
    }

    #[test]
    fn test_raw_forms_render_the_same() {
        let renderer = TemplateRenderer::new();
        let vars = vars(json!({"domain": "a&b.example.com"}));
        assert_eq!(renderer.render("{{domain}}", &vars), "a&b.example.com");
        assert_eq!(renderer.render("{{{domain}}}", &vars), "a&b.example.com");
        assert_eq!(renderer.render("{{& domain}}", &vars), "a&b.example.com");
    }

    #[test]
    fn test_unresolved_stays_literal() {
        let renderer = TemplateRenderer::new();
        let vars = vars(json!({"known": "x"}));
        let content = "{{known}} {{unknown}} {{{also:unknown}}}";
        assert_eq!(renderer.render(content, &vars), "x {{unknown}} {{{also:unknown}}}");
        assert_eq!(renderer.unresolved(content, &vars), vec!["also:unknown", "unknown"]);
    }

    #[test]
    fn test_value_rendering() {
        let renderer = TemplateRenderer::new();
        let vars = vars(json!({
            "count": 3,
            "enabled": true,
            "missing": null,
            "zones": ["a", "b"],
        }));
        assert_eq!(
            renderer.render("{{count}} {{enabled}} [{{missing}}] {{zones}}", &vars),
            r#"3 true [] ["a","b"]"#
        );
    }

    #[test]
    fn test_dotted_lookup() {
        let renderer = TemplateRenderer::new();
        let vars = vars(json!({
            "eks": {"name": "main", "groups": [{"size": 2}]},
            "a.b": "flat",
        }));
        assert_eq!(renderer.render("{{eks.name}}", &vars), "main");
        assert_eq!(renderer.render("{{eks.groups.0.size}}", &vars), "2");
        assert_eq!(renderer.render("{{a.b}}", &vars), "flat");
        assert_eq!(renderer.render("{{eks.nope}}", &vars), "{{eks.nope}}");
    }
}
