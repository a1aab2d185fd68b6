//! Template interpolation — `{{path.to.field}}` placeholders.
//!
//! Pure path lookup only: no expression evaluation, no code execution.
//! A placeholder whose path resolves to nothing is left in the output
//! unchanged, which makes misspelled paths visible instead of silently
//! vanishing.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_\-]+(?:\.[A-Za-z0-9_\-]+)*)\s*\}\}").unwrap());

/// Walk `root` along a dotted path.  Numeric segments index into arrays;
/// missing intermediate keys yield `None`, never a panic.
pub fn lookup_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Replace every `{{path}}` occurrence with the stringified value at that
/// path in `context`.  Unresolvable paths keep the placeholder text.
pub fn interpolate(template: &str, context: &Value) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &regex::Captures<'_>| {
            match lookup_path(context, &caps[1]) {
                Some(value) => stringify(value),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Apply [`interpolate`] to every string leaf of a JSON value.  Used on
/// action parameters before dispatch; non-string values pass through
/// unchanged.
pub fn interpolate_value(value: &Value, context: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(interpolate(s, context)),
        Value::Array(items) => Value::Array(
            items.iter().map(|v| interpolate_value(v, context)).collect(),
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), interpolate_value(v, context)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Strings render raw (no surrounding quotes); everything else renders as
/// compact JSON.
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_a_nested_path() {
        let context = json!({"user": {"email": "a@b.com"}});
        assert_eq!(
            interpolate("Hello {{user.email}}", &context),
            "Hello a@b.com"
        );
    }

    #[test]
    fn unresolved_placeholder_is_left_unchanged() {
        assert_eq!(interpolate("Hi {{missing.x}}", &json!({})), "Hi {{missing.x}}");
    }

    #[test]
    fn numbers_and_bools_render_bare() {
        let context = json!({"n": 42, "ok": true, "nothing": null});
        assert_eq!(
            interpolate("{{n}} {{ok}} {{nothing}}", &context),
            "42 true null"
        );
    }

    #[test]
    fn objects_render_as_compact_json() {
        let context = json!({"obj": {"a": 1}});
        assert_eq!(interpolate("v={{obj}}", &context), r#"v={"a":1}"#);
    }

    #[test]
    fn array_index_segments_work() {
        let context = json!({"steps": [{"status": 200}, {"status": 404}]});
        assert_eq!(interpolate("first={{steps.0.status}}", &context), "first=200");
        assert_eq!(interpolate("second={{steps.1.status}}", &context), "second=404");
    }

    #[test]
    fn whitespace_inside_braces_is_tolerated() {
        let context = json!({"name": "ada"});
        assert_eq!(interpolate("{{ name }}", &context), "ada");
    }

    #[test]
    fn interpolate_value_touches_only_string_leaves() {
        let context = json!({"city": "berlin"});
        let input = json!({
            "url": "https://geo/{{city}}",
            "count": 3,
            "tags": ["{{city}}", "fixed"]
        });
        let out = interpolate_value(&input, &context);
        assert_eq!(
            out,
            json!({
                "url": "https://geo/berlin",
                "count": 3,
                "tags": ["berlin", "fixed"]
            })
        );
    }

    #[test]
    fn traversal_through_a_scalar_yields_nothing() {
        let context = json!({"a": 5});
        assert_eq!(interpolate("{{a.b.c}}", &context), "{{a.b.c}}");
    }
}
