// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `{{variable}}` rendering for prompt steps

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use thiserror::Error;

/// `{{name}}` or `{{outer.inner}}`, whitespace allowed inside the braces.
/// Any name without braces counts, so `{{user-id}}` must resolve too.
// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
static VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([^{}\s](?:[^{}]*[^{}\s])?)\s*\}\}")
        .expect("constant regex pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("missing variable {0:?}")]
    Missing(String),
    #[error("template has placeholders but the input is not an object")]
    NotAnObject,
}

/// Names referenced by the template, in order of appearance.
pub fn placeholders(template: &str) -> Vec<String> {
    VAR_PATTERN.captures_iter(template).map(|c| c[1].to_string()).collect()
}

/// Substitute every placeholder with the matching input value.
///
/// Strings are inserted verbatim; any other value is inserted as compact
/// JSON. Dotted names walk nested objects. Every placeholder must resolve.
pub fn render(template: &str, input: &Value) -> Result<String, TemplateError> {
    let mut names = placeholders(template);
    if names.is_empty() {
        return Ok(template.to_string());
    }
    if !input.is_object() {
        return Err(TemplateError::NotAnObject);
    }
    names.dedup();
    if let Some(missing) = names.into_iter().find(|n| lookup(input, n).is_none()) {
        return Err(TemplateError::Missing(missing));
    }

    let rendered = VAR_PATTERN.replace_all(template, |caps: &regex::Captures| {
        match lookup(input, &caps[1]) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => caps[0].to_string(),
        }
    });
    Ok(rendered.into_owned())
}

fn lookup<'a>(input: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(input, |value, key| value.as_object()?.get(key))
}

#[cfg(test)]
#[path = "template_tests.rs"]
mod tests;
