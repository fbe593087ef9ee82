//! Compiles line templates such as `interface {{name}} {%...%}` into anchored matchers.
//!
//! Template grammar:
//! - `{{name}}` captures one identifier (letters, digits, `_`, `-`); exactly one is required.
//! - `{%...%}` matches any run of characters and captures nothing.
//! - everything else is matched literally.

pub mod error;

use regex::Regex;
use tracing::debug;

use crate::schema::{Anchor, SchemaRule};
use crate::template::error::TemplateError;

const NAME_PLACEHOLDER: &str = "name";
const NAME_CAPTURE: &str = r"(?P<name>[\w-]+)";
const WILDCARD: &str = ".*";

/// A compiled template together with the type label of the rule it came from.
#[derive(Debug, Clone)]
pub struct Pattern {
    type_label: String,
    template: String,
    regex: Regex,
}

impl Pattern {
    pub fn compile(type_label: &str, template: &str, anchor: Anchor) -> Result<Self, TemplateError> {
        if type_label.trim().is_empty() {
            return Err(TemplateError::new(
                "rule has an empty type label",
                0..template.len(),
            ));
        }

        let source = translate(template, anchor)?;
        let regex = Regex::new(&source).map_err(|e| {
            TemplateError::new(format!("template does not compile: {}", e), 0..template.len())
        })?;
        debug!(type_label, template, regex = %source, "compiled template");

        Ok(Pattern {
            type_label: type_label.to_string(),
            template: template.to_string(),
            regex,
        })
    }

    pub fn from_rule(rule: &SchemaRule, anchor: Anchor) -> Result<Self, TemplateError> {
        Pattern::compile(&rule.type_label, &rule.template, anchor)
    }

    pub fn type_label(&self) -> &str {
        &self.type_label
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// The captured name if `line` matches this template.
    pub fn capture_name<'l>(&self, line: &'l str) -> Option<&'l str> {
        self.regex
            .captures(line)
            .and_then(|caps| caps.name(NAME_PLACEHOLDER))
            .map(|m| m.as_str())
    }
}

/// Translate template text into regex source.
fn translate(template: &str, anchor: Anchor) -> Result<String, TemplateError> {
    let mut out = String::from("^");
    let mut name_span: Option<std::ops::Range<usize>> = None;
    let mut offset = 0;

    while offset < template.len() {
        let rest = &template[offset..];
        let next = [rest.find("{{"), rest.find("{%")].into_iter().flatten().min();
        let Some(at) = next else {
            out.push_str(&regex::escape(rest));
            break;
        };
        out.push_str(&regex::escape(&rest[..at]));

        let start = offset + at;
        let is_placeholder = rest[at..].starts_with("{{");
        let close = if is_placeholder { "}}" } else { "%}" };
        let body = &template[start + 2..];
        let Some(inner_len) = body.find(close) else {
            let token = if is_placeholder { "{{" } else { "{%" };
            return Err(TemplateError::new(
                format!("unterminated `{}` token", token),
                start..template.len(),
            )
            .with_note(format!("expected a closing `{}`", close)));
        };
        let end = start + 2 + inner_len + 2;

        if is_placeholder {
            let inner = body[..inner_len].trim();
            if inner != NAME_PLACEHOLDER {
                return Err(TemplateError::new(
                    format!("unknown placeholder `{{{{{}}}}}`", inner),
                    start..end,
                )
                .with_note("the only supported placeholder is `{{name}}`"));
            }
            if let Some(first) = &name_span {
                return Err(TemplateError::new("duplicate `{{name}}` placeholder", start..end)
                    .with_note(format!(
                        "first placeholder at bytes {}..{}; a template captures exactly one name",
                        first.start, first.end
                    )));
            }
            name_span = Some(start..end);
            out.push_str(NAME_CAPTURE);
        } else {
            out.push_str(WILDCARD);
        }

        offset = end;
    }

    if name_span.is_none() {
        return Err(TemplateError::new(
            "template has no `{{name}}` placeholder",
            0..template.len(),
        )
        .with_note("every schema template must capture the entity name with `{{name}}`"));
    }

    if anchor == Anchor::Full {
        out.push('$');
    }
    Ok(out)
}
