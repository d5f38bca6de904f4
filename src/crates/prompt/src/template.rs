//! [`PromptTemplate`] parsing and rendering.

use crate::error::{PromptError, Result};
use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;

/// Values supplied to a template, keyed by placeholder name.
pub type Variables = HashMap<String, Value>;

static PLACEHOLDER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z_]\w*)\}").unwrap());

static CONDITIONAL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)\{%\s*if\s+([A-Za-z_]\w*)\s*%\}(.*?)(?:\{%\s*else\s*%\}(.*?))?\{%\s*endif\s*%\}",
    )
    .unwrap()
});

/// A reusable prompt with named placeholders, defaults and conditional
/// sections.
///
/// Conditionals are resolved in a single pass before substitution and do not
/// nest. Placeholders that end up in a dropped branch are not needed at render
/// time.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    template: String,
    variables: Vec<String>,
    required: BTreeSet<String>,
    required_overridden: bool,
    defaults: Variables,
}

impl PromptTemplate {
    /// Parse `template`, discovering its placeholders.
    pub fn new(template: impl Into<String>) -> Self {
        let template = template.into();
        let variables = discover_variables(&template);
        let required = variables.iter().cloned().collect();

        Self {
            template,
            variables,
            required,
            required_overridden: false,
            defaults: Variables::new(),
        }
    }

    /// Add default values. Defaulted names stop being required unless the
    /// required set was overridden.
    pub fn with_defaults(mut self, defaults: Variables) -> Self {
        self.defaults.extend(defaults);
        if !self.required_overridden {
            self.required = self
                .variables
                .iter()
                .filter(|name| !self.defaults.contains_key(*name))
                .cloned()
                .collect();
        }
        self
    }

    /// Replace the derived required set. Every name in it must have a value at
    /// render time, whether or not its placeholder survives conditionals.
    pub fn with_required<I, S>(mut self, required: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required = required.into_iter().map(Into::into).collect();
        self.required_overridden = true;
        self
    }

    /// Read a template from a text file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let template = std::fs::read_to_string(path.as_ref())?;
        debug!(path = %path.as_ref().display(), "loaded prompt template");
        Ok(Self::new(template))
    }

    /// Write the template text to `path`, replacing any existing file.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path.as_ref(), &self.template)?;
        Ok(())
    }

    /// Render with `values` merged over the defaults.
    ///
    /// # Errors
    ///
    /// [`PromptError::MissingVariable`] naming the first placeholder (or
    /// overridden required name) without a value. No text is produced.
    pub fn format(&self, values: &Variables) -> Result<String> {
        let mut merged = self.defaults.clone();
        merged.extend(values.iter().map(|(k, v)| (k.clone(), v.clone())));

        if self.required_overridden {
            if let Some(name) = self.required.iter().find(|n| !merged.contains_key(*n)) {
                return Err(PromptError::MissingVariable { name: name.clone() });
            }
        }

        let resolved = resolve_conditionals(&self.template, &merged);

        if let Some(name) = discover_variables(&resolved)
            .into_iter()
            .find(|n| !merged.contains_key(n))
        {
            return Err(PromptError::MissingVariable { name });
        }

        let rendered = PLACEHOLDER_REGEX.replace_all(&resolved, |caps: &Captures<'_>| {
            merged.get(&caps[1]).map(value_text).unwrap_or_default()
        });

        debug!(
            variables = self.variables.len(),
            supplied = values.len(),
            "rendered prompt template"
        );
        Ok(rendered.into_owned())
    }

    /// Alias for [`format`](Self::format).
    pub fn render(&self, values: &Variables) -> Result<String> {
        self.format(values)
    }

    /// Raw template text.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Placeholder names in order of first appearance.
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Names that must be supplied by the caller.
    pub fn required_variables(&self) -> &BTreeSet<String> {
        &self.required
    }

    /// Default values.
    pub fn defaults(&self) -> &Variables {
        &self.defaults
    }
}

/// Whether a conditional on this value keeps its if-branch.
///
/// Absent, `""`, `false`, `0`, `null`, `[]` and `{}` are falsy.
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map_or(true, |f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}

fn discover_variables(text: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for caps in PLACEHOLDER_REGEX.captures_iter(text) {
        let name = &caps[1];
        if !seen.iter().any(|s: &String| s == name) {
            seen.push(name.to_string());
        }
    }
    seen
}

fn resolve_conditionals(template: &str, values: &Variables) -> String {
    CONDITIONAL_REGEX
        .replace_all(template, |caps: &Captures<'_>| {
            if is_truthy(values.get(&caps[1])) {
                caps[2].to_string()
            } else {
                caps.get(3).map(|m| m.as_str().to_string()).unwrap_or_default()
            }
        })
        .into_owned()
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars(pairs: &[(&str, Value)]) -> Variables {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_discovers_variables_in_order() {
        let t = PromptTemplate::new("{greeting}, {name}! {greeting} again. {%if topic%}{topic}{%endif%}");
        assert_eq!(t.variables(), &["greeting", "name", "topic"]);
        assert_eq!(t.required_variables().len(), 3);
    }

    #[test]
    fn test_ignores_non_identifier_braces() {
        let t = PromptTemplate::new(r#"Reply as JSON: {"answer": {value}} or {}"#);
        assert_eq!(t.variables(), &["value"]);
        let out = t.format(&vars(&[("value", json!(42))])).unwrap();
        assert_eq!(out, r#"Reply as JSON: {"answer": 42} or {}"#);
    }

    #[test]
    fn test_defaults_are_not_required() {
        let t = PromptTemplate::new("{persona}: {question}")
            .with_defaults(vars(&[("persona", json!("Assistant"))]));

        assert!(!t.required_variables().contains("persona"));
        assert!(t.required_variables().contains("question"));
        assert_eq!(
            t.format(&vars(&[("question", json!("why?"))])).unwrap(),
            "Assistant: why?"
        );
        assert_eq!(
            t.format(&vars(&[("persona", json!("Tutor")), ("question", json!("how?"))]))
                .unwrap(),
            "Tutor: how?"
        );
    }

    #[test]
    fn test_missing_variable_is_an_error() {
        let t = PromptTemplate::new("Summarize {document} for {audience}");
        let err = t.format(&vars(&[("document", json!("text"))])).unwrap_err();
        assert!(matches!(err, PromptError::MissingVariable { ref name } if name == "audience"));
    }

    #[test]
    fn test_conditional_branches() {
        let t = PromptTemplate::new("Hi{%if name%} {name}{%else%} there{%endif%}.");
        assert_eq!(t.format(&vars(&[("name", json!("Ada"))])).unwrap(), "Hi Ada.");
        assert_eq!(t.format(&Variables::new()).unwrap(), "Hi there.");
        assert_eq!(t.format(&vars(&[("name", json!(""))])).unwrap(), "Hi there.");
    }

    #[test]
    fn test_conditional_without_else() {
        let t = PromptTemplate::new("Answer.{%if verbose%} Explain each step.{%endif%}");
        assert_eq!(t.format(&vars(&[("verbose", json!(true))])).unwrap(), "Answer. Explain each step.");
        assert_eq!(t.format(&vars(&[("verbose", json!(false))])).unwrap(), "Answer.");
    }

    #[test]
    fn test_multiple_conditionals_resolve_independently() {
        let t = PromptTemplate::new("{%if a%}A{%endif%}|{%if b%}B{%else%}notB{%endif%}");
        assert_eq!(t.format(&vars(&[("a", json!(1))])).unwrap(), "A|notB");
        assert_eq!(t.format(&vars(&[("b", json!(["x"]))])).unwrap(), "|B");
    }

    #[test]
    fn test_conditional_spans_lines() {
        let t = PromptTemplate::new("Start\n{% if notes %}\nNotes:\n{notes}\n{% endif %}\nEnd");
        assert_eq!(
            t.format(&vars(&[("notes", json!("remember"))])).unwrap(),
            "Start\n\nNotes:\nremember\n\nEnd"
        );
        assert_eq!(t.format(&Variables::new()).unwrap(), "Start\n\nEnd");
    }

    #[test]
    fn test_placeholder_in_dropped_branch_not_needed() {
        let t = PromptTemplate::new("{%if context%}Context: {context}. {extra}{%endif%}Go.");
        assert_eq!(t.format(&Variables::new()).unwrap(), "Go.");

        let err = t.format(&vars(&[("context", json!("c"))])).unwrap_err();
        assert!(matches!(err, PromptError::MissingVariable { ref name } if name == "extra"));
    }

    #[test]
    fn test_required_override() {
        let t = PromptTemplate::new("{%if user%}Hello {user}{%endif%}").with_required(["user"]);
        let err = t.format(&Variables::new()).unwrap_err();
        assert!(matches!(err, PromptError::MissingVariable { ref name } if name == "user"));

        let loose = PromptTemplate::new("{a} {b}").with_required(Vec::<String>::new());
        assert!(loose.required_variables().is_empty());
        // Placeholders that survive still need a value.
        assert!(loose.format(&vars(&[("a", json!("x"))])).is_err());
    }

    #[test]
    fn test_required_override_survives_defaults() {
        let t = PromptTemplate::new("{a} {b}")
            .with_required(["a", "b"])
            .with_defaults(vars(&[("a", json!("x"))]));
        assert_eq!(t.required_variables().len(), 2);
    }

    #[test]
    fn test_value_rendering() {
        let t = PromptTemplate::new("{s}|{n}|{b}|{z}|{l}");
        let out = t
            .format(&vars(&[
                ("s", json!("text")),
                ("n", json!(3.5)),
                ("b", json!(true)),
                ("z", Value::Null),
                ("l", json!([1, 2])),
            ]))
            .unwrap();
        assert_eq!(out, "text|3.5|true||[1,2]");
    }

    #[test]
    fn test_substituted_values_are_not_rescanned() {
        let t = PromptTemplate::new("{a}");
        let out = t.format(&vars(&[("a", json!("{b}"))])).unwrap();
        assert_eq!(out, "{b}");
    }

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(None));
        assert!(!is_truthy(Some(&json!(null))));
        assert!(!is_truthy(Some(&json!(""))));
        assert!(!is_truthy(Some(&json!(false))));
        assert!(!is_truthy(Some(&json!(0))));
        assert!(!is_truthy(Some(&json!(0.0))));
        assert!(!is_truthy(Some(&json!([]))));
        assert!(!is_truthy(Some(&json!({}))));
        assert!(is_truthy(Some(&json!("0"))));
        assert!(is_truthy(Some(&json!(-1))));
        assert!(is_truthy(Some(&json!({"k": 1}))));
    }

    #[test]
    fn test_render_is_format() {
        let t = PromptTemplate::new("{x}");
        let values = vars(&[("x", json!("y"))]);
        assert_eq!(t.render(&values).unwrap(), t.format(&values).unwrap());
    }
}
