//! Schema fragment model.
//!
//! A [`SchemaFragment`] is the simplified, recursive view of an OpenAPI schema
//! object that the synthesizer and the body validator work on. Keywords other
//! than the ones modelled here (`description`, `format`, ...) are ignored.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Type tag of a fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    Array,
    Object,
    String,
    Boolean,
    Number,
    Integer,
    Float,
}

impl SchemaType {
    /// Returns the tag as written in a document.
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaType::Array => "array",
            SchemaType::Object => "object",
            SchemaType::String => "string",
            SchemaType::Boolean => "boolean",
            SchemaType::Number => "number",
            SchemaType::Integer => "integer",
            SchemaType::Float => "float",
        }
    }
}

/// Which combinator keyword a set of alternatives came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CombinatorKind {
    OneOf,
    AnyOf,
    AllOf,
}

impl CombinatorKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            CombinatorKind::OneOf => "oneOf",
            CombinatorKind::AnyOf => "anyOf",
            CombinatorKind::AllOf => "allOf",
        }
    }
}

/// A `oneOf`/`anyOf`/`allOf` list attached to a fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct Alternatives {
    pub kind: CombinatorKind,
    pub options: Vec<SchemaFragment>,
}

/// A node in the recursive description of a JSON value.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(from = "RawFragment")]
pub struct SchemaFragment {
    /// `None` for fragments that declare no `type`.
    pub kind: Option<SchemaType>,
    pub items: Option<Box<SchemaFragment>>,
    pub properties: Option<IndexMap<String, SchemaFragment>>,
    pub example: Option<Value>,
    /// Allowed values. Carried for callers; neither synthesis nor validation reads it.
    pub enum_values: Option<Vec<Value>>,
    /// Combinators. When several keywords are present, `oneOf` wins over
    /// `anyOf`, which wins over `allOf`.
    pub alternatives: Option<Alternatives>,
    /// Request-body flag: may this value be missing?
    pub required: Option<bool>,
    /// Object-level `required: [..]` list naming mandatory properties.
    pub required_properties: Vec<String>,
    /// Request-body flag: may this value be `null`?
    pub nullable: Option<bool>,
}

impl SchemaFragment {
    /// Create a fragment of the given type with no other keywords.
    pub fn of(kind: SchemaType) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    /// Decode a fragment from a JSON schema object.
    ///
    /// # Errors
    ///
    /// Fails on unknown `type` tags or keywords of the wrong JSON shape.
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(value)
    }

    /// Whether any of `oneOf`/`anyOf`/`allOf` is declared.
    pub fn has_combinator(&self) -> bool {
        self.alternatives.is_some()
    }

    /// Whether the named property is listed in this fragment's `required` array.
    pub fn lists_required(&self, property: &str) -> bool {
        self.required_properties.iter().any(|p| p == property)
    }
}

/// `required` is a flag on request-body fragments and a name list on object
/// schemas; both forms show up in the same documents.
#[derive(Deserialize)]
#[serde(untagged)]
enum RequiredKeyword {
    Flag(bool),
    Names(Vec<String>),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFragment {
    #[serde(rename = "type")]
    kind: Option<SchemaType>,
    items: Option<Box<SchemaFragment>>,
    properties: Option<IndexMap<String, SchemaFragment>>,
    example: Option<Value>,
    #[serde(rename = "enum")]
    enum_values: Option<Vec<Value>>,
    one_of: Option<Vec<SchemaFragment>>,
    any_of: Option<Vec<SchemaFragment>>,
    all_of: Option<Vec<SchemaFragment>>,
    required: Option<RequiredKeyword>,
    nullable: Option<bool>,
}

impl From<RawFragment> for SchemaFragment {
    fn from(raw: RawFragment) -> Self {
        let alternatives = [
            (CombinatorKind::OneOf, raw.one_of),
            (CombinatorKind::AnyOf, raw.any_of),
            (CombinatorKind::AllOf, raw.all_of),
        ]
        .into_iter()
        .find_map(|(kind, options)| options.map(|options| Alternatives { kind, options }));

        let (required, required_properties) = match raw.required {
            Some(RequiredKeyword::Flag(flag)) => (Some(flag), Vec::new()),
            Some(RequiredKeyword::Names(names)) => (None, names),
            None => (None, Vec::new()),
        };

        Self {
            kind: raw.kind,
            items: raw.items,
            properties: raw.properties,
            example: raw.example,
            enum_values: raw.enum_values,
            alternatives,
            required,
            required_properties,
            nullable: raw.nullable,
        }
    }
}

/// Keywords that mark a JSON object as a single schema rather than a
/// mapping of named schemas.
const SCHEMA_KEYWORDS: &[&str] = &[
    "$ref",
    "additionalProperties",
    "allOf",
    "anyOf",
    "default",
    "deprecated",
    "description",
    "discriminator",
    "enum",
    "example",
    "exclusiveMaximum",
    "exclusiveMinimum",
    "externalDocs",
    "format",
    "items",
    "maxItems",
    "maxLength",
    "maxProperties",
    "maximum",
    "minItems",
    "minLength",
    "minProperties",
    "minimum",
    "multipleOf",
    "not",
    "nullable",
    "oneOf",
    "pattern",
    "properties",
    "readOnly",
    "required",
    "title",
    "type",
    "uniqueItems",
    "writeOnly",
    "xml",
];

/// The schema a compiled operation validates request bodies against.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Schema(SchemaFragment),
    /// Named fragments, validated as the properties of an implicit object.
    Named(IndexMap<String, SchemaFragment>),
}

impl RequestBody {
    /// Decode a request-body schema, telling a single fragment apart from a
    /// mapping of named fragments.
    ///
    /// # Errors
    ///
    /// Fails when the schema (or one of the named fragments) does not decode.
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        let named = value.as_object().filter(|map| {
            !map.is_empty()
                && !map.keys().any(|k| SCHEMA_KEYWORDS.contains(&k.as_str()))
                && map.values().all(Value::is_object)
        });

        match named {
            Some(map) => map
                .iter()
                .map(|(name, schema)| Ok((name.clone(), SchemaFragment::from_value(schema)?)))
                .collect::<Result<IndexMap<_, _>, serde_json::Error>>()
                .map(RequestBody::Named),
            None => SchemaFragment::from_value(value).map(RequestBody::Schema),
        }
    }

    /// View the body schema as one fragment.
    pub fn to_fragment(&self) -> SchemaFragment {
        match self {
            RequestBody::Schema(fragment) => fragment.clone(),
            RequestBody::Named(named) => SchemaFragment {
                properties: Some(named.clone()),
                ..SchemaFragment::of(SchemaType::Object)
            },
        }
    }
}
