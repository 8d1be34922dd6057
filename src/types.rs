//! Core types shared by the compiler, router and request handler.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Media types scanned for a schema, in order of preference.
pub const CONTENT_TYPE_PREFERENCE: &[&str] =
    &["application/json", "application/x-www-form-urlencoded"];

/// The only response status compiled into an operation.
pub const SUCCESS_STATUS: &str = "200";

/// HTTP methods a contract operation can be compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    /// All supported methods, in the order they are looked up.
    pub const ALL: [Method; 4] = [Method::Get, Method::Post, Method::Put, Method::Delete];

    /// Returns the lowercase key used for this method in a document.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "get",
            Method::Post => "post",
            Method::Put => "put",
            Method::Delete => "delete",
        }
    }

    /// Parse a document key. Only exact lowercase keys are recognized.
    pub fn from_document_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == key)
    }

    /// Case-insensitive comparison against a request method string.
    pub fn matches(&self, method: &str) -> bool {
        self.as_str().eq_ignore_ascii_case(method)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_ascii_uppercase())
    }
}

/// Error for a request method outside the supported set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported method: {0}")]
pub struct UnsupportedMethod(pub String);

impl FromStr for Method {
    type Err = UnsupportedMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.matches(s))
            .ok_or_else(|| UnsupportedMethod(s.to_string()))
    }
}

/// How `oneOf`/`anyOf`/`allOf` fragments are turned into mock values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CombinatorPolicy {
    /// `oneOf`/`anyOf` use their first alternative; `allOf` is ignored.
    #[default]
    FirstAlternative,
    /// Like `FirstAlternative`, but `allOf` branches are merged into one fragment.
    MergeAllOf,
}

/// How a request-body fragment without a `required` flag treats an absent value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RequiredDefault {
    /// Absent `required` means the value must be present.
    #[default]
    Required,
    /// Absent `required` means the value may be missing.
    Optional,
}

impl RequiredDefault {
    /// Whether a missing value is accepted given a fragment's `required` flag.
    pub fn allows_missing(&self, required: Option<bool>) -> bool {
        match required {
            Some(required) => !required,
            None => matches!(self, RequiredDefault::Optional),
        }
    }
}

/// Construction options for [`OpenApiMocker`](crate::OpenApiMocker).
#[derive(Debug, Clone)]
pub struct MockerOptions {
    /// The raw contract document, resolved during `init`.
    pub definition: Value,
    /// When true, request bodies are checked against the declared schema.
    pub validate_request_body: bool,
    /// Prefix stripped from request paths before routing.
    pub base_path: Option<String>,
    pub combinator_policy: CombinatorPolicy,
    pub required_default: RequiredDefault,
}

impl MockerOptions {
    /// Create options with body validation enabled (default).
    pub fn new(definition: Value) -> Self {
        Self {
            definition,
            validate_request_body: true,
            base_path: None,
            combinator_policy: CombinatorPolicy::default(),
            required_default: RequiredDefault::default(),
        }
    }

    /// Enable or disable request body validation.
    pub fn validate_request_body(mut self, validate: bool) -> Self {
        self.validate_request_body = validate;
        self
    }

    /// Set the path prefix the mocked API is mounted under.
    ///
    /// A trailing `/` is dropped so `"/api/"` and `"/api"` behave the same.
    pub fn base_path(mut self, base_path: impl Into<String>) -> Self {
        let base_path = base_path.into();
        let trimmed = base_path.trim_end_matches('/');
        self.base_path = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    /// Set the combinator policy used when synthesizing mock responses.
    pub fn combinator_policy(mut self, policy: CombinatorPolicy) -> Self {
        self.combinator_policy = policy;
        self
    }

    /// Set how an absent `required` flag is read during body validation.
    pub fn required_default(mut self, required_default: RequiredDefault) -> Self {
        self.required_default = required_default;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn method_document_keys_are_exact() {
        assert_eq!(Method::from_document_key("get"), Some(Method::Get));
        assert_eq!(Method::from_document_key("delete"), Some(Method::Delete));
        assert_eq!(Method::from_document_key("GET"), None);
        assert_eq!(Method::from_document_key("patch"), None);
    }

    #[test]
    fn method_matching_ignores_case() {
        assert!(Method::Post.matches("POST"));
        assert!(Method::Post.matches("post"));
        assert!(Method::Post.matches("PoSt"));
        assert!(!Method::Post.matches("PUT"));
    }

    #[test]
    fn method_from_str() {
        assert_eq!("PUT".parse::<Method>(), Ok(Method::Put));
        assert_eq!(
            "PATCH".parse::<Method>(),
            Err(UnsupportedMethod("PATCH".into()))
        );
    }

    #[test]
    fn method_display_is_uppercase() {
        assert_eq!(Method::Delete.to_string(), "DELETE");
    }

    #[test]
    fn required_default_allows_missing() {
        assert!(RequiredDefault::Required.allows_missing(Some(false)));
        assert!(!RequiredDefault::Required.allows_missing(Some(true)));
        assert!(!RequiredDefault::Required.allows_missing(None));
        assert!(RequiredDefault::Optional.allows_missing(None));
        assert!(!RequiredDefault::Optional.allows_missing(Some(true)));
    }

    #[test]
    fn mocker_options_defaults() {
        let opts = MockerOptions::new(json!({}));
        assert!(opts.validate_request_body);
        assert_eq!(opts.base_path, None);
        assert_eq!(opts.combinator_policy, CombinatorPolicy::FirstAlternative);
        assert_eq!(opts.required_default, RequiredDefault::Required);
    }

    #[test]
    fn mocker_options_normalizes_base_path() {
        let opts = MockerOptions::new(json!({})).base_path("/api/v1/");
        assert_eq!(opts.base_path.as_deref(), Some("/api/v1"));

        let opts = MockerOptions::new(json!({})).base_path("/");
        assert_eq!(opts.base_path, None);
    }
}
