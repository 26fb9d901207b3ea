// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[yare::parameterized(
    plain_string  = { "Hello {{name}}!",        json!({"name": "Ada"}),             "Hello Ada!" },
    spaced        = { "Hello {{ name }}!",      json!({"name": "Ada"}),             "Hello Ada!" },
    number        = { "n={{n}}",                json!({"n": 42}),                   "n=42" },
    object_value  = { "ctx: {{ctx}}",           json!({"ctx": {"a": [1, 2]}}),      r#"ctx: {"a":[1,2]}"# },
    nested_path   = { "city: {{user.address.city}}", json!({"user": {"address": {"city": "Oslo"}}}), "city: Oslo" },
    repeated      = { "{{x}}-{{x}}",            json!({"x": "a"}),                  "a-a" },
    null_value    = { "v={{v}}",                json!({"v": null}),                 "v=null" },
    no_vars       = { "static text",            json!("anything"),                  "static text" },
    single_braces = { "{name}",                 json!({}),                          "{name}" },
    hyphenated    = { "id={{ user-id }}",       json!({"user-id": 7}),              "id=7" },
    numeric_key   = { "first={{1}}",            json!({"1": "a"}),                  "first=a" },
)]
fn renders(template: &str, input: Value, expected: &str) {
    assert_eq!(render(template, &input).unwrap(), expected);
}

#[test]
fn missing_variable_is_error() {
    let err = render("Hi {{name}}, {{missing}}", &json!({"name": "x"})).unwrap_err();
    assert_eq!(err, TemplateError::Missing("missing".to_string()));
}

#[yare::parameterized(
    hyphenated = { "hello {{user-id}}", "user-id" },
    numeric    = { "{{1}} and {{name}}", "1" },
    spaced     = { "{{ first name }}", "first name" },
)]
fn unresolved_name_outside_identifier_charset_is_error(template: &str, missing: &str) {
    let err = render(template, &json!({"name": "x"})).unwrap_err();
    assert_eq!(err, TemplateError::Missing(missing.to_string()));
}

#[test]
fn missing_nested_key_is_error() {
    let err = render("{{user.email}}", &json!({"user": {"name": "x"}})).unwrap_err();
    assert_eq!(err, TemplateError::Missing("user.email".to_string()));
}

#[test]
fn placeholders_with_non_object_input_is_error() {
    assert_eq!(render("{{x}}", &json!([1, 2])).unwrap_err(), TemplateError::NotAnObject);
}

#[test]
fn substituted_values_are_not_rescanned() {
    let out = render("{{a}}", &json!({"a": "{{b}}", "b": "no"})).unwrap();
    assert_eq!(out, "{{b}}");
}

#[test]
fn placeholders_in_order() {
    assert_eq!(placeholders("{{b}} {{ a.c }} {{b}}"), vec!["b", "a.c", "b"]);
}
