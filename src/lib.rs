//! OpenAPI Mocker
//!
//! Deterministic mock responses compiled from an OpenAPI document, for test
//! suites that need a realistic API surface without a live backend.
//!
//! A document is resolved (all `$ref` pointers inlined), compiled once into a
//! list of [`Operation`]s with precomputed mock bodies, and then every
//! intercepted request is routed against that list.
//!
//! # Example
//!
//! ```
//! use openapi_mocker::{compile, find_operation};
//! use serde_json::json;
//!
//! let document = json!({
//!     "paths": {
//!         "/items/{id}": {
//!             "get": {
//!                 "responses": {
//!                     "200": {
//!                         "content": {
//!                             "application/json": {
//!                                 "schema": { "type": "array", "items": { "type": "string" } }
//!                             }
//!                         }
//!                     }
//!                 }
//!             }
//!         }
//!     }
//! });
//!
//! let operations = compile(&document);
//! let operation = find_operation(&operations, "/items/42", "GET").unwrap();
//! assert_eq!(operation.mock_response_success, json!(["string"]));
//! ```
//!
//! # Mock values
//!
//! | Schema | Mock |
//! |--------|------|
//! | `array` with `items` | one synthesized element |
//! | `array` without `items` | `[]` |
//! | `object` with `properties` | one entry per property |
//! | `object` without `properties` | `null` |
//! | scalar with `example` | the example |
//! | scalar without `example` | the type tag, e.g. `"string"` |
//!
//! # Responses
//!
//! [`OpenApiMocker::handle`] answers 404 when no operation matches, 400 when
//! the body fails validation, and 200 with the mock otherwise.

mod compiler;
mod error;
mod handler;
mod loader;
mod router;
mod schema;
mod synth;
mod types;
mod validator;

pub use compiler::{
    compile, compile_with, schema_from_content, Contract, Operation, OperationSummary,
};
pub use error::{BodyError, LoadError, MockerError, ResolveError};
pub use handler::{InboundRequest, MockResponse, MockStatus, OpenApiMocker, RecordedRequest};
pub use loader::{
    inline_refs, is_url, load_document, load_document_auto, load_document_str, navigate_pointer,
    DocumentResolver, InlineRefResolver,
};
pub use router::{find_operation, PathTemplate, Segment};
pub use schema::{Alternatives, CombinatorKind, RequestBody, SchemaFragment, SchemaType};
pub use synth::{synthesize, synthesize_with};
pub use types::{
    CombinatorPolicy, Method, MockerOptions, RequiredDefault, UnsupportedMethod,
    CONTENT_TYPE_PREFERENCE, SUCCESS_STATUS,
};
pub use validator::{validate_body, validate_body_with, validate_request_body};

#[cfg(feature = "remote")]
pub use loader::load_document_url;
