//! Structural validation of request bodies against schema fragments.
//!
//! The check is deliberately shallow: it looks at JSON types, array elements
//! and declared object properties. Unknown object keys are accepted, and
//! combined schemas (`oneOf`/`anyOf`/`allOf`) are refused outright.

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::warn;

use crate::schema::{RequestBody, SchemaFragment, SchemaType};
use crate::types::RequiredDefault;

/// Validate a value using the default reading of an absent `required` flag.
pub fn validate_body(value: &Value, schema: &SchemaFragment) -> bool {
    validate_body_with(Some(value), schema, RequiredDefault::default())
}

/// Validate a possibly missing value against a fragment.
///
/// `None` and JSON `null` are both treated as a missing value. A missing
/// value passes when the fragment is `nullable: true` or `required: false`;
/// without a `required` flag, `required_default` decides.
pub fn validate_body_with(
    value: Option<&Value>,
    schema: &SchemaFragment,
    required_default: RequiredDefault,
) -> bool {
    validate_value(value, schema, false, required_default)
}

/// Validate a request body against a compiled operation's body schema.
pub fn validate_request_body(
    value: Option<&Value>,
    body: &RequestBody,
    required_default: RequiredDefault,
) -> bool {
    match body {
        RequestBody::Schema(schema) => validate_body_with(value, schema, required_default),
        RequestBody::Named(named) => match present(value) {
            Some(Value::Object(object)) => {
                validate_properties(object, named, &[], required_default)
            }
            Some(_) => false,
            None => required_default.allows_missing(None),
        },
    }
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn validate_value(
    value: Option<&Value>,
    schema: &SchemaFragment,
    listed_required: bool,
    required_default: RequiredDefault,
) -> bool {
    if let Some(alternatives) = &schema.alternatives {
        warn!(
            keyword = alternatives.kind.keyword(),
            "combined schemas are not supported in request bodies, rejecting value"
        );
        return false;
    }

    let Some(value) = present(value) else {
        // A property named in its parent's `required` list counts as
        // `required: true` unless it carries its own flag.
        let required = schema.required.or(listed_required.then_some(true));
        return schema.nullable == Some(true) || required_default.allows_missing(required);
    };

    match schema.kind {
        Some(SchemaType::Array) => match (value.as_array(), &schema.items) {
            (Some(elements), Some(items)) => elements
                .iter()
                .all(|element| validate_value(Some(element), items, false, required_default)),
            (Some(_), None) => true,
            (None, _) => false,
        },
        Some(SchemaType::Object) => match (value.as_object(), &schema.properties) {
            (Some(object), Some(properties)) => validate_properties(
                object,
                properties,
                &schema.required_properties,
                required_default,
            ),
            (Some(_), None) => true,
            (None, _) => false,
        },
        Some(SchemaType::Number | SchemaType::Integer | SchemaType::Float) => value.is_number(),
        Some(SchemaType::String) => value.is_string(),
        Some(SchemaType::Boolean) => value.is_boolean(),
        None => value.is_object(),
    }
}

fn validate_properties(
    object: &Map<String, Value>,
    properties: &IndexMap<String, SchemaFragment>,
    required_list: &[String],
    required_default: RequiredDefault,
) -> bool {
    properties.iter().all(|(name, property)| {
        let listed = required_list.iter().any(|r| r == name);
        validate_value(object.get(name), property, listed, required_default)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tracing::Level;
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    struct BufferWriter(Arc<Mutex<Vec<u8>>>);

    impl<'a> MakeWriter<'a> for SharedBuffer {
        type Writer = BufferWriter;

        fn make_writer(&'a self) -> Self::Writer {
            BufferWriter(Arc::clone(&self.0))
        }
    }

    impl io::Write for BufferWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn schema(value: Value) -> SchemaFragment {
        SchemaFragment::from_value(&value).unwrap()
    }

    fn rows_schema() -> SchemaFragment {
        schema(json!({
            "type": "object",
            "properties": { "rows": { "type": "number" } }
        }))
    }

    #[test]
    fn object_with_matching_property_is_valid() {
        assert!(validate_body(&json!({ "rows": 100 }), &rows_schema()));
    }

    #[test]
    fn missing_property_is_invalid_by_default() {
        assert!(!validate_body(&json!({}), &rows_schema()));
    }

    #[test]
    fn mistyped_property_is_invalid() {
        assert!(!validate_body(&json!({ "rows": "100" }), &rows_schema()));
    }

    #[test]
    fn extra_keys_are_accepted() {
        assert!(validate_body(
            &json!({ "rows": 1, "unknown": true }),
            &rows_schema()
        ));
    }

    #[test]
    fn optional_and_nullable_properties_may_be_missing() {
        let s = schema(json!({
            "type": "object",
            "properties": {
                "criteria": { "type": "string", "required": false },
                "start": { "type": "integer", "nullable": true },
                "rows": { "type": "integer" }
            }
        }));
        assert!(validate_body(&json!({ "rows": 10 }), &s));
        assert!(validate_body(&json!({ "rows": 10, "start": null }), &s));
        assert!(!validate_body(&json!({ "criteria": "*:*" }), &s));
    }

    #[test]
    fn explicit_required_true_overrides_optional_default() {
        let s = schema(json!({
            "type": "object",
            "properties": {
                "id": { "type": "string", "required": true },
                "note": { "type": "string" }
            }
        }));
        assert!(validate_body_with(
            Some(&json!({ "id": "a" })),
            &s,
            RequiredDefault::Optional
        ));
        assert!(!validate_body_with(
            Some(&json!({ "note": "n" })),
            &s,
            RequiredDefault::Optional
        ));
    }

    #[test]
    fn required_list_applies_under_optional_default() {
        let s = schema(json!({
            "type": "object",
            "required": ["name"],
            "properties": {
                "name": { "type": "string" },
                "age": { "type": "integer" }
            }
        }));
        assert!(validate_body_with(
            Some(&json!({ "name": "x" })),
            &s,
            RequiredDefault::Optional
        ));
        assert!(!validate_body_with(
            Some(&json!({ "age": 3 })),
            &s,
            RequiredDefault::Optional
        ));
    }

    #[test]
    fn integer_and_float_check_as_number() {
        assert!(validate_body(&json!(3), &schema(json!({ "type": "integer" }))));
        assert!(validate_body(&json!(3.5), &schema(json!({ "type": "float" }))));
        assert!(!validate_body(&json!("3"), &schema(json!({ "type": "integer" }))));
    }

    #[test]
    fn scalar_types_must_match_exactly() {
        assert!(validate_body(&json!(true), &schema(json!({ "type": "boolean" }))));
        assert!(!validate_body(&json!("true"), &schema(json!({ "type": "boolean" }))));
        assert!(validate_body(&json!("x"), &schema(json!({ "type": "string" }))));
        assert!(!validate_body(&json!(1), &schema(json!({ "type": "string" }))));
    }

    #[test]
    fn arrays_validate_every_element() {
        let s = schema(json!({ "type": "array", "items": { "type": "string" } }));
        assert!(validate_body(&json!(["a", "b"]), &s));
        assert!(validate_body(&json!([]), &s));
        assert!(!validate_body(&json!(["a", 1]), &s));
        assert!(!validate_body(&json!("a"), &s));
    }

    #[test]
    fn nested_structures() {
        let s = schema(json!({
            "type": "object",
            "properties": {
                "records": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": { "id": { "type": "integer" } }
                    }
                }
            }
        }));
        assert!(validate_body(&json!({ "records": [{ "id": 1 }, { "id": 2 }] }), &s));
        assert!(!validate_body(&json!({ "records": [{ "id": 1 }, {}] }), &s));
    }

    #[test]
    fn combinators_are_refused() {
        for keyword in ["oneOf", "anyOf", "allOf"] {
            let s = schema(json!({ keyword: [{ "type": "string" }] }));
            assert!(!validate_body(&json!("x"), &s), "{keyword} should be refused");
        }
    }

    #[test]
    fn missing_root_value() {
        let s = rows_schema();
        assert!(!validate_body_with(None, &s, RequiredDefault::Required));
        assert!(validate_body_with(None, &s, RequiredDefault::Optional));
        assert!(!validate_body(&Value::Null, &s));
    }

    #[test]
    fn untyped_fragment_requires_an_object() {
        let s = schema(json!({}));
        assert!(validate_body(&json!({ "a": 1 }), &s));
        assert!(!validate_body(&json!("a"), &s));
    }

    #[test]
    fn additional_properties_body_is_not_named_fields() {
        let body = RequestBody::from_value(&json!({
            "additionalProperties": { "type": "string" }
        }))
        .unwrap();
        assert!(validate_request_body(
            Some(&json!({ "a": "x" })),
            &body,
            RequiredDefault::Required
        ));
    }

    #[test]
    fn refused_combinator_is_logged() {
        let sink = SharedBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(sink.clone())
            .with_ansi(false)
            .with_max_level(Level::WARN)
            .finish();

        let s = schema(json!({ "anyOf": [{ "type": "string" }] }));
        let valid = tracing::subscriber::with_default(subscriber, || {
            validate_body(&json!("x"), &s)
        });
        assert!(!valid);

        let bytes = sink.0.lock().unwrap().clone();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("WARN"), "no warning logged: {text}");
        assert!(text.contains("anyOf"), "missing keyword field: {text}");
        assert!(text.contains("combined schemas are not supported"));
    }

    #[test]
    fn named_request_body_validates_as_object() {
        let body = RequestBody::from_value(&json!({
            "criteria": { "type": "string" },
            "rows": { "type": "integer" }
        }))
        .unwrap();
        let default = RequiredDefault::Required;
        assert!(validate_request_body(
            Some(&json!({ "criteria": "*:*", "rows": 100 })),
            &body,
            default
        ));
        assert!(!validate_request_body(Some(&json!({ "rows": 100 })), &body, default));
        assert!(!validate_request_body(Some(&json!([1])), &body, default));
        assert!(!validate_request_body(None, &body, default));
    }
}
