//! OpenAPI Mocker CLI
//!
//! Command-line interface for inspecting compiled operations and answering
//! single requests against an OpenAPI document.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use openapi_mocker::{
    is_url, load_document_auto, CombinatorPolicy, InlineRefResolver, MockStatus, MockerOptions,
    OpenApiMocker, OperationSummary, RecordedRequest, RequiredDefault,
};
use serde::Serialize;
use tokio::runtime::Runtime;

#[derive(Parser)]
#[command(name = "openapi-mocker")]
#[command(about = "Compile OpenAPI documents into deterministic mock responses")]
#[command(version)]
struct Cli {
    /// Log compilation and routing decisions to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the operations compiled from a document
    Operations {
        /// Document source: file path or URL (http:// or https://)
        document: String,

        /// Merge allOf branches when synthesizing mock responses
        #[arg(long)]
        merge_all_of: bool,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Answer one request against a document
    Request {
        /// Document source: file path or URL (http:// or https://)
        document: String,

        /// HTTP method (case-insensitive)
        #[arg(long, short, default_value = "GET")]
        method: String,

        /// Request path, e.g. /items/42
        #[arg(long, short)]
        path: String,

        /// File holding the JSON request body
        #[arg(long)]
        body: Option<PathBuf>,

        /// Path prefix the API is mounted under
        #[arg(long)]
        base_path: Option<String>,

        /// Skip request body validation
        #[arg(long)]
        no_validate: bool,

        /// Treat body fields without a `required` flag as optional
        #[arg(long)]
        optional_by_default: bool,

        /// Merge allOf branches when synthesizing mock responses
        #[arg(long)]
        merge_all_of: bool,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Operations {
            document,
            merge_all_of,
            pretty,
        } => run_operations(&document, merge_all_of, pretty),

        Commands::Request {
            document,
            method,
            path,
            body,
            base_path,
            no_validate,
            optional_by_default,
            merge_all_of,
            pretty,
        } => run_request(RequestArgs {
            document,
            method,
            path,
            body,
            base_path,
            validate: !no_validate,
            optional_by_default,
            merge_all_of,
            pretty,
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();
}

fn combinator_policy(merge_all_of: bool) -> CombinatorPolicy {
    if merge_all_of {
        CombinatorPolicy::MergeAllOf
    } else {
        CombinatorPolicy::FirstAlternative
    }
}

/// Load, resolve and compile a document into a ready mocker.
///
/// The document is fetched before the runtime starts since remote loading
/// uses a blocking client.
fn build_mocker(
    source: &str,
    configure: impl FnOnce(MockerOptions) -> MockerOptions,
) -> Result<(OpenApiMocker, Runtime), u8> {
    let document = load_document_auto(source).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    // Relative file refs resolve next to the document
    let resolver = if is_url(source) {
        InlineRefResolver::new()
    } else {
        let base_dir = Path::new(source)
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        InlineRefResolver::with_base_dir(base_dir)
    };

    let mocker = OpenApiMocker::with_resolver(configure(MockerOptions::new(document)), resolver);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .map_err(|e| {
            eprintln!("Error starting runtime: {}", e);
            3u8
        })?;
    runtime.block_on(mocker.init()).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    Ok((mocker, runtime))
}

fn print_json(value: &impl Serialize, pretty: bool) -> Result<(), u8> {
    let output = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;
    println!("{}", output);
    Ok(())
}

fn run_operations(source: &str, merge_all_of: bool, pretty: bool) -> Result<(), u8> {
    let (mocker, _runtime) = build_mocker(source, |options| {
        options.combinator_policy(combinator_policy(merge_all_of))
    })?;

    let contract = mocker.contract();
    let summaries: Vec<OperationSummary<'_>> =
        contract.operations().iter().map(|op| op.summary()).collect();
    print_json(&summaries, pretty)
}

struct RequestArgs {
    document: String,
    method: String,
    path: String,
    body: Option<PathBuf>,
    base_path: Option<String>,
    validate: bool,
    optional_by_default: bool,
    merge_all_of: bool,
    pretty: bool,
}

fn run_request(args: RequestArgs) -> Result<(), u8> {
    let RequestArgs {
        document,
        method,
        path,
        body,
        base_path,
        validate,
        optional_by_default,
        merge_all_of,
        pretty,
    } = args;

    let mut request = RecordedRequest::new(method, path);
    if let Some(body_path) = body {
        let content = std::fs::read_to_string(&body_path).map_err(|e| {
            eprintln!("Error reading {}: {}", body_path.display(), e);
            3u8
        })?;
        request = request.with_body(content);
    }

    let (mocker, runtime) = build_mocker(&document, |options| {
        let options = options
            .validate_request_body(validate)
            .combinator_policy(combinator_policy(merge_all_of));
        let options = match base_path {
            Some(base_path) => options.base_path(base_path),
            None => options,
        };
        if optional_by_default {
            options.required_default(RequiredDefault::Optional)
        } else {
            options
        }
    })?;

    let response = runtime.block_on(mocker.handle(&mut request));

    print_json(&response, pretty)?;
    match response.status {
        MockStatus::Ok => Ok(()),
        MockStatus::BadRequest | MockStatus::NotFound => Err(1),
    }
}
