//! Contract compilation - turns a resolved document into routable operations.
//!
//! Compilation never fails. Paths, methods and responses that don't have the
//! expected shape are skipped, so a partially malformed document yields fewer
//! operations rather than an error.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::router::{self, PathTemplate};
use crate::schema::{RequestBody, SchemaFragment};
use crate::synth::synthesize_with;
use crate::types::{CombinatorPolicy, Method, CONTENT_TYPE_PREFERENCE, SUCCESS_STATUS};

/// A single routable contract entry with its precomputed mock response.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub operation_id: Option<String>,
    pub path: String,
    pub template: PathTemplate,
    pub method: Method,
    pub mock_response_success: Value,
    pub request_body: Option<RequestBody>,
}

impl Operation {
    pub fn new(
        operation_id: Option<String>,
        path: impl Into<String>,
        method: Method,
        mock_response_success: Value,
        request_body: Option<RequestBody>,
    ) -> Self {
        let path = path.into();
        Self {
            operation_id,
            template: PathTemplate::parse(&path),
            path,
            method,
            mock_response_success,
            request_body,
        }
    }

    /// A serializable summary, as printed by the CLI.
    pub fn summary(&self) -> OperationSummary<'_> {
        OperationSummary {
            operation_id: self.operation_id.as_deref(),
            method: self.method,
            path: &self.path,
            mock_response_success: &self.mock_response_success,
            has_request_body: self.request_body.is_some(),
        }
    }
}

/// Borrowed view of an [`Operation`] for JSON output.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationSummary<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<&'a str>,
    pub method: Method,
    pub path: &'a str,
    pub mock_response_success: &'a Value,
    pub has_request_body: bool,
}

/// An immutable compiled operation list.
///
/// Each compilation produces a new snapshot; the generation counts how many
/// snapshots the owning mocker has installed.
#[derive(Debug, Clone, Default)]
pub struct Contract {
    generation: u64,
    operations: Vec<Operation>,
}

impl Contract {
    pub fn new(generation: u64, operations: Vec<Operation>) -> Self {
        Self {
            generation,
            operations,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Route a request against this snapshot.
    pub fn find(&self, path: &str, method: &str) -> Option<&Operation> {
        router::find_operation(&self.operations, path, method)
    }
}

/// Compile a resolved document with the default combinator policy.
pub fn compile(document: &Value) -> Vec<Operation> {
    compile_with(document, CombinatorPolicy::default())
}

/// Compile a resolved document.
///
/// Operations come out in document order: paths first, then methods within
/// each path. Only `get`, `post`, `put` and `delete` are compiled, and only
/// the `"200"` response of each.
pub fn compile_with(document: &Value, policy: CombinatorPolicy) -> Vec<Operation> {
    let Some(paths) = document.get("paths").and_then(Value::as_object) else {
        debug!("document has no paths, nothing to compile");
        return Vec::new();
    };

    let mut operations = Vec::new();

    for (path, item) in paths {
        let Some(item) = item.as_object() else {
            debug!(%path, "skipping path item that is not an object");
            continue;
        };

        for (key, entry) in item {
            let Some(method) = Method::from_document_key(key) else {
                continue;
            };
            if let Some(operation) = compile_operation(path, method, entry, policy) {
                operations.push(operation);
            }
        }
    }

    info!(operations = operations.len(), "compiled contract");
    operations
}

fn compile_operation(
    path: &str,
    method: Method,
    entry: &Value,
    policy: CombinatorPolicy,
) -> Option<Operation> {
    let Some(responses) = entry.get("responses").and_then(Value::as_object) else {
        debug!(%path, %method, "skipping operation without responses");
        return None;
    };

    let Some(success) = responses.get(SUCCESS_STATUS) else {
        debug!(%path, %method, "skipping operation without a 200 response");
        return None;
    };

    let Some(schema) = schema_from_content(success) else {
        debug!(%path, %method, "skipping 200 response without a JSON schema");
        return None;
    };

    let fragment = match SchemaFragment::from_value(schema) {
        Ok(fragment) => fragment,
        Err(e) => {
            warn!(%path, %method, error = %e, "skipping operation with undecodable response schema");
            return None;
        }
    };

    let request_body = entry.get("requestBody").and_then(|body| {
        let Some(schema) = schema_from_content(body) else {
            debug!(%path, %method, "request body has no JSON schema, bodies won't be validated");
            return None;
        };
        match RequestBody::from_value(schema) {
            Ok(body) => Some(body),
            Err(e) => {
                warn!(%path, %method, error = %e, "undecodable request body schema, bodies won't be validated");
                None
            }
        }
    });

    let operation_id = entry
        .get("operationId")
        .and_then(Value::as_str)
        .map(String::from);

    Some(Operation::new(
        operation_id,
        path,
        method,
        synthesize_with(&fragment, policy),
        request_body,
    ))
}

/// Extract the schema of a response or request body object.
///
/// Media types are looked up in [`CONTENT_TYPE_PREFERENCE`] order and the
/// first one present decides; it is not skipped when it lacks a `schema`.
pub fn schema_from_content(object: &Value) -> Option<&Value> {
    let content = object.get("content")?.as_object()?;
    let media = CONTENT_TYPE_PREFERENCE
        .iter()
        .find_map(|key| content.get(*key).filter(|media| !media.is_null()))?;
    media.get("schema").filter(|schema| !schema.is_null())
}
