//! Request handling - routes intercepted requests to compiled mock responses.

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::compiler::{compile_with, Contract};
use crate::error::{BodyError, MockerError};
use crate::loader::{DocumentResolver, InlineRefResolver};
use crate::types::MockerOptions;
use crate::validator::validate_request_body;

/// A request delivered by the interception transport.
#[async_trait]
pub trait InboundRequest: Send {
    fn method(&self) -> &str;

    /// Request path, optionally followed by a query string.
    fn path(&self) -> &str;

    /// Read and parse the body as JSON.
    ///
    /// An empty body should be reported as [`BodyError::Empty`].
    async fn json(&mut self) -> Result<Value, BodyError>;
}

/// An in-memory request, for tests and one-shot lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    method: String,
    path: String,
    body: Option<String>,
}

impl RecordedRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            body: None,
        }
    }

    /// Attach a raw body. It is parsed only when the handler asks for it.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Attach a JSON body.
    pub fn with_json(self, body: &Value) -> Self {
        self.with_body(body.to_string())
    }
}

#[async_trait]
impl InboundRequest for RecordedRequest {
    fn method(&self) -> &str {
        &self.method
    }

    fn path(&self) -> &str {
        &self.path
    }

    async fn json(&mut self) -> Result<Value, BodyError> {
        match self.body.as_deref().map(str::trim) {
            None | Some("") => Err(BodyError::Empty),
            Some(body) => serde_json::from_str(body).map_err(|source| BodyError::InvalidJson { source }),
        }
    }
}

/// The three outcomes of handling a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "u16")]
pub enum MockStatus {
    Ok,
    BadRequest,
    NotFound,
}

impl MockStatus {
    pub fn code(&self) -> u16 {
        match self {
            MockStatus::Ok => 200,
            MockStatus::BadRequest => 400,
            MockStatus::NotFound => 404,
        }
    }
}

impl From<MockStatus> for u16 {
    fn from(status: MockStatus) -> Self {
        status.code()
    }
}

/// The decision handed back to the transport.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MockResponse {
    pub status: MockStatus,
    /// Present only for [`MockStatus::Ok`].
    pub body: Option<Value>,
}

impl MockResponse {
    pub fn ok(body: Value) -> Self {
        Self {
            status: MockStatus::Ok,
            body: Some(body),
        }
    }

    pub fn bad_request() -> Self {
        Self {
            status: MockStatus::BadRequest,
            body: None,
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: MockStatus::NotFound,
            body: None,
        }
    }
}

/// Serves mock responses compiled from an OpenAPI document.
///
/// Call [`init`](Self::init) before handling traffic. Until then every
/// request gets a 404. Re-running `init` or [`reload`](Self::reload) swaps in
/// a new compiled [`Contract`]; requests already in flight finish against the
/// snapshot they started with.
pub struct OpenApiMocker {
    options: MockerOptions,
    resolver: Box<dyn DocumentResolver>,
    contract: RwLock<Arc<Contract>>,
}

impl OpenApiMocker {
    /// Create a mocker that inlines local `$ref` pointers itself.
    pub fn new(options: MockerOptions) -> Self {
        Self::with_resolver(options, InlineRefResolver::new())
    }

    /// Create a mocker with a custom document resolver.
    pub fn with_resolver(options: MockerOptions, resolver: impl DocumentResolver + 'static) -> Self {
        Self {
            options,
            resolver: Box::new(resolver),
            contract: RwLock::new(Arc::new(Contract::default())),
        }
    }

    pub fn options(&self) -> &MockerOptions {
        &self.options
    }

    /// Resolve and compile the configured definition.
    ///
    /// # Errors
    ///
    /// Returns `MockerError::Resolve` if the resolver fails. The previously
    /// installed contract stays in place.
    pub async fn init(&self) -> Result<Arc<Contract>, MockerError> {
        self.reload(&self.options.definition).await
    }

    /// Resolve and compile `definition`, replacing the current contract.
    ///
    /// # Errors
    ///
    /// Returns `MockerError::Resolve` if the resolver fails.
    pub async fn reload(&self, definition: &Value) -> Result<Arc<Contract>, MockerError> {
        let resolved = self.resolver.resolve(definition).await?;
        Ok(self.install(&resolved))
    }

    /// Compile an already-resolved document and install it.
    pub fn install(&self, resolved: &Value) -> Arc<Contract> {
        let operations = compile_with(resolved, self.options.combinator_policy);

        let contract = {
            let mut current = self.contract.write().unwrap_or_else(PoisonError::into_inner);
            let contract = Arc::new(Contract::new(current.generation() + 1, operations));
            *current = Arc::clone(&contract);
            contract
        };

        info!(
            generation = contract.generation(),
            operations = contract.operations().len(),
            "installed contract"
        );
        contract
    }

    /// The currently installed contract.
    pub fn contract(&self) -> Arc<Contract> {
        let current = self.contract.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*current)
    }

    /// Decide the response for one request.
    ///
    /// Unmatched routes get 404, bodies failing validation get 400, and
    /// everything else gets 200 with the operation's precomputed mock.
    pub async fn handle<R>(&self, request: &mut R) -> MockResponse
    where
        R: InboundRequest + ?Sized,
    {
        let contract = self.contract();
        let method = request.method().to_string();
        let raw_path = request.path().to_string();

        let Some(path) = self.route_path(&raw_path) else {
            debug!(%method, path = %raw_path, "request outside base path");
            return MockResponse::not_found();
        };

        let Some(operation) = contract.find(path, &method) else {
            debug!(%method, %path, "no operation matches request");
            return MockResponse::not_found();
        };

        if let Some(body_schema) = operation
            .request_body
            .as_ref()
            .filter(|_| self.options.validate_request_body)
        {
            let body = match request.json().await {
                Ok(body) => Some(body),
                Err(BodyError::Empty) => None,
                Err(e) => {
                    debug!(%method, %path, error = %e, "rejecting unreadable request body");
                    return MockResponse::bad_request();
                }
            };

            if !validate_request_body(body.as_ref(), body_schema, self.options.required_default) {
                debug!(%method, %path, "request body does not match schema");
                return MockResponse::bad_request();
            }
        }

        if let Some(params) = operation.template.captures(path) {
            debug!(%method, template = %operation.template, ?params, "serving mock response");
        }
        MockResponse::ok(operation.mock_response_success.clone())
    }

    /// Strip the query string and the configured base path.
    ///
    /// Returns `None` for paths outside the base path.
    fn route_path<'p>(&self, path: &'p str) -> Option<&'p str> {
        let path = path.split(['?', '#']).next().unwrap_or(path);
        let Some(base) = self.options.base_path.as_deref() else {
            return Some(path);
        };

        match path.strip_prefix(base)? {
            "" => Some("/"),
            rest if rest.starts_with('/') => Some(rest),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResolveError;
    use serde_json::json;

    fn document() -> Value {
        json!({
            "paths": {
                "/items/{id}": {
                    "get": {
                        "responses": {
                            "200": {
                                "content": {
                                    "application/json": {
                                        "schema": { "type": "array", "items": { "type": "string" } }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        })
    }

    struct FailingResolver;

    #[async_trait]
    impl DocumentResolver for FailingResolver {
        async fn resolve(&self, _document: &Value) -> Result<Value, ResolveError> {
            Err(ResolveError::PointerNotFound {
                reference: "#/components".into(),
            })
        }
    }

    #[tokio::test]
    async fn not_initialized_serves_404() {
        let mocker = OpenApiMocker::new(MockerOptions::new(document()));
        let mut request = RecordedRequest::new("GET", "/items/1");
        assert_eq!(mocker.handle(&mut request).await, MockResponse::not_found());
        assert_eq!(mocker.contract().generation(), 0);
    }

    #[tokio::test]
    async fn strips_query_string() {
        let mocker = OpenApiMocker::new(MockerOptions::new(document()));
        mocker.init().await.unwrap();

        let mut request = RecordedRequest::new("GET", "/items/1?expand=true");
        let response = mocker.handle(&mut request).await;
        assert_eq!(response, MockResponse::ok(json!(["string"])));
    }

    #[tokio::test]
    async fn base_path_is_stripped() {
        let mocker = OpenApiMocker::new(MockerOptions::new(document()).base_path("/api"));
        mocker.init().await.unwrap();

        let mut inside = RecordedRequest::new("GET", "/api/items/1");
        assert_eq!(mocker.handle(&mut inside).await.status, MockStatus::Ok);

        let mut outside = RecordedRequest::new("GET", "/items/1");
        assert_eq!(mocker.handle(&mut outside).await.status, MockStatus::NotFound);

        let mut sibling = RecordedRequest::new("GET", "/apiv2/items/1");
        assert_eq!(mocker.handle(&mut sibling).await.status, MockStatus::NotFound);
    }

    #[tokio::test]
    async fn failed_resolution_keeps_previous_contract() {
        let mocker = OpenApiMocker::with_resolver(MockerOptions::new(document()), FailingResolver);
        mocker.install(&document());

        assert!(matches!(mocker.init().await, Err(MockerError::Resolve(_))));
        assert_eq!(mocker.contract().generation(), 1);
        assert_eq!(mocker.contract().operations().len(), 1);
    }

    #[tokio::test]
    async fn reload_swaps_snapshot() {
        let mocker = OpenApiMocker::new(MockerOptions::new(document()));
        let first = mocker.init().await.unwrap();
        assert_eq!(first.generation(), 1);

        let second = mocker.reload(&json!({ "paths": {} })).await.unwrap();
        assert_eq!(second.generation(), 2);
        assert!(second.operations().is_empty());

        // The old snapshot is untouched.
        assert_eq!(first.operations().len(), 1);
    }

    #[tokio::test]
    async fn recorded_request_body_parsing() {
        let mut empty = RecordedRequest::new("POST", "/").with_body("  ");
        assert!(matches!(empty.json().await, Err(BodyError::Empty)));

        let mut invalid = RecordedRequest::new("POST", "/").with_body("{");
        assert!(matches!(invalid.json().await, Err(BodyError::InvalidJson { .. })));

        let mut valid = RecordedRequest::new("POST", "/").with_json(&json!({ "a": 1 }));
        assert_eq!(valid.json().await.unwrap(), json!({ "a": 1 }));
    }

    #[test]
    fn mock_response_serializes_status_code() {
        let response = MockResponse::ok(json!(["string"]));
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({ "status": 200, "body": ["string"] })
        );
        assert_eq!(
            serde_json::to_value(MockResponse::not_found()).unwrap(),
            json!({ "status": 404, "body": null })
        );
    }
}
