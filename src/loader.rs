//! Document loading and `$ref` inlining.
//!
//! Handles loading contract documents from files, strings and HTTP URLs, and
//! provides the default [`DocumentResolver`], which inlines `$ref` pointers so
//! the compiler only ever sees a self-contained, acyclic document.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::{LoadError, ResolveError};

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Turns a raw document into a fully inlined one.
///
/// Implementations must return a document without unresolved or circular
/// references; mock synthesis walks schemas without cycle protection.
#[async_trait]
pub trait DocumentResolver: Send + Sync {
    async fn resolve(&self, document: &Value) -> Result<Value, ResolveError>;
}

/// Resolver that inlines `$ref` pointers.
///
/// Local pointers (`#/components/schemas/Item`) resolve against the document
/// itself. Relative file references (`common.json#/Item`) resolve against
/// the base directory, when one is configured.
#[derive(Debug, Clone, Default)]
pub struct InlineRefResolver {
    base_dir: Option<PathBuf>,
}

impl InlineRefResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative file references against `base_dir`.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }
}

#[async_trait]
impl DocumentResolver for InlineRefResolver {
    async fn resolve(&self, document: &Value) -> Result<Value, ResolveError> {
        inline_refs(document, self.base_dir.as_deref())
    }
}

/// Load a document from a file path.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist,
/// or `LoadError::InvalidJson` if the file isn't valid JSON.
pub fn load_document(path: &Path) -> Result<Value, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&content).map_err(|source| LoadError::InvalidJson { source })
}

/// Load a document from a JSON string.
///
/// # Errors
///
/// Returns `LoadError::InvalidJson` if the string isn't valid JSON.
pub fn load_document_str(content: &str) -> Result<Value, LoadError> {
    serde_json::from_str(content).map_err(|source| LoadError::InvalidJson { source })
}

/// Load a document from an HTTP/HTTPS URL.
///
/// Requires the `remote` feature (enabled by default). Uses a blocking
/// client, so call it outside of an async runtime.
///
/// # Errors
///
/// Returns `LoadError::NetworkError` if the request fails or the response
/// isn't valid JSON.
#[cfg(feature = "remote")]
pub fn load_document_url(url: &str) -> Result<Value, LoadError> {
    let network_error = |source| LoadError::NetworkError {
        url: url.to_string(),
        source,
    };

    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(network_error)?;

    client
        .get(url)
        .send()
        .and_then(|response| response.error_for_status())
        .and_then(|response| response.json())
        .map_err(network_error)
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Load a document from a file path or URL.
///
/// URL loading requires the `remote` feature.
pub fn load_document_auto(source: &str) -> Result<Value, LoadError> {
    if is_url(source) {
        #[cfg(feature = "remote")]
        {
            load_document_url(source)
        }
        #[cfg(not(feature = "remote"))]
        {
            Err(LoadError::FileNotFound {
                path: PathBuf::from(source),
            })
        }
    } else {
        load_document(Path::new(source))
    }
}

/// Navigate a JSON Pointer fragment such as `#/components/schemas/Item`.
///
/// Array elements are addressed by index.
pub fn navigate_pointer<'a>(document: &'a Value, fragment: &str) -> Result<&'a Value, ResolveError> {
    let path = fragment.trim_start_matches('#').trim_start_matches('/');
    if path.is_empty() {
        return Ok(document);
    }

    let mut current = document;
    for part in path.split('/') {
        // Unescape JSON Pointer encoding (~1 = /, ~0 = ~)
        let key = part.replace("~1", "/").replace("~0", "~");
        current = current
            .get(&key)
            .or_else(|| key.parse::<usize>().ok().and_then(|i| current.get(i)))
            .ok_or_else(|| ResolveError::PointerNotFound {
                reference: fragment.to_string(),
            })?;
    }
    Ok(current)
}

/// Return a copy of `document` with every `$ref` inlined.
///
/// Keys written next to a `$ref` are inlined as well and take precedence
/// over the keys of the referenced object.
///
/// # Errors
///
/// Fails on dangling pointers, circular references, and referenced files
/// that cannot be loaded. File references need a `base_dir`.
pub fn inline_refs(document: &Value, base_dir: Option<&Path>) -> Result<Value, ResolveError> {
    let mut resolved = document.clone();
    let origin = Origin {
        root: document,
        name: String::new(),
        base_dir,
    };
    inline_refs_inner(&mut resolved, &origin, &mut Vec::new())?;
    Ok(resolved)
}

/// The document a `$ref` is resolved against.
struct Origin<'a> {
    root: &'a Value,
    /// Canonical file path, empty for the document being resolved.
    name: String,
    base_dir: Option<&'a Path>,
}

fn inline_refs_inner(
    value: &mut Value,
    origin: &Origin<'_>,
    stack: &mut Vec<String>,
) -> Result<(), ResolveError> {
    let reference = value.get("$ref").and_then(Value::as_str).map(str::to_owned);
    if let Some(reference) = reference {
        let target = if reference.starts_with('#') {
            resolve_local(&reference, origin, stack)?
        } else {
            resolve_external(&reference, origin, stack)?
        };

        match target {
            Value::Object(target) => {
                if let Value::Object(obj) = value {
                    obj.shift_remove("$ref");
                    for sibling in obj.values_mut() {
                        inline_refs_inner(sibling, origin, stack)?;
                    }
                    for (k, v) in target {
                        obj.entry(k).or_insert(v);
                    }
                }
            }
            other => *value = other,
        }
        return Ok(());
    }

    match value {
        Value::Object(obj) => {
            for child in obj.values_mut() {
                inline_refs_inner(child, origin, stack)?;
            }
        }
        Value::Array(arr) => {
            for item in arr {
                inline_refs_inner(item, origin, stack)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn resolve_local(
    reference: &str,
    origin: &Origin<'_>,
    stack: &mut Vec<String>,
) -> Result<Value, ResolveError> {
    enter(stack, format!("{}{}", origin.name, reference), reference)?;

    let mut target = navigate_pointer(origin.root, reference)?.clone();
    inline_refs_inner(&mut target, origin, stack)?;

    stack.pop();
    Ok(target)
}

fn resolve_external(
    reference: &str,
    origin: &Origin<'_>,
    stack: &mut Vec<String>,
) -> Result<Value, ResolveError> {
    if is_url(reference) {
        return Err(ResolveError::UnsupportedReference {
            reference: reference.to_string(),
            message: "remote references are not inlined".into(),
        });
    }
    let Some(base_dir) = origin.base_dir else {
        return Err(ResolveError::UnsupportedReference {
            reference: reference.to_string(),
            message: "file references need a base directory".into(),
        });
    };

    let (file_part, fragment) = match reference.find('#') {
        Some(idx) => (&reference[..idx], &reference[idx..]),
        None => (reference, "#"),
    };

    let path = base_dir.join(file_part);
    let canonical = path.canonicalize().unwrap_or_else(|_| path.clone());
    let name = canonical.display().to_string();
    enter(stack, format!("{}{}", name, fragment), reference)?;

    debug!(path = %path.display(), "loading referenced document");
    let loaded = load_document(&path).map_err(|source| ResolveError::Load {
        reference: reference.to_string(),
        source,
    })?;

    // Internal refs inside the loaded file resolve against that file.
    let ref_dir = canonical.parent().unwrap_or(base_dir);
    let file_origin = Origin {
        root: &loaded,
        name,
        base_dir: Some(ref_dir),
    };
    let mut target = navigate_pointer(&loaded, fragment)?.clone();
    inline_refs_inner(&mut target, &file_origin, stack)?;

    stack.pop();
    Ok(target)
}

fn enter(stack: &mut Vec<String>, key: String, reference: &str) -> Result<(), ResolveError> {
    if stack.contains(&key) {
        return Err(ResolveError::CircularReference {
            reference: reference.to_string(),
        });
    }
    stack.push(key);
    Ok(())
}
