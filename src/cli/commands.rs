use crate::document::{ApiDocument, DocumentHandle};
use crate::hot_reload::watch_spec;
use crate::mock::MockEngine;
use crate::pipeline::{Pipeline, Response};
use crate::request::Request;
use crate::runtime_config::RuntimeConfig;
use crate::spec::{lint_document, load_spec};
use crate::validator::print_issues;
use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use http::Method;
use serde_json::{json, Value};
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Command-line interface for oasmock
///
/// Inspects OpenAPI/Swagger documents and runs requests through the
/// parameter pipeline and mock engine.
#[derive(Parser, Debug)]
#[command(name = "oasmock", version)]
#[command(about = "OpenAPI parameter parsing and mock responses", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the operations of a document
    Routes {
        /// Path to the OpenAPI/Swagger document (YAML or JSON)
        #[arg(short, long, env = "OASMOCK_SPEC")]
        spec: PathBuf,
    },
    /// Report every problem found while loading a document
    Lint {
        #[arg(short, long, env = "OASMOCK_SPEC")]
        spec: PathBuf,

        /// Exit with an error when any issue is found
        #[arg(long, default_value_t = false)]
        fail_on_error: bool,
    },
    /// Parse one request and print the typed parameters
    Parse {
        #[command(flatten)]
        request: RequestArgs,

        /// Skip JSON schema validation of parsed values
        #[arg(long, default_value_t = false)]
        no_validation: bool,
    },
    /// Answer requests from the mock engine
    ///
    /// With `--target` one request is answered. Without it, requests are read
    /// from stdin, one per line: `METHOD TARGET [JSON BODY]`.
    Mock {
        #[command(flatten)]
        request: RequestArgs,

        /// Directory for file-backed mock data (memory when unset)
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Reload the document when the file changes
        #[arg(long, default_value_t = false)]
        watch: bool,

        #[arg(long, default_value_t = false)]
        no_validation: bool,
    },
}

/// One request described on the command line.
#[derive(Args, Debug, Clone)]
pub struct RequestArgs {
    #[arg(short, long, env = "OASMOCK_SPEC")]
    pub spec: PathBuf,

    /// HTTP method
    #[arg(short = 'X', long, default_value = "GET")]
    pub method: String,

    /// Request target, e.g. `/pets?limit=10`
    #[arg(short, long)]
    pub target: Option<String>,

    /// Header as `Name: value` (repeatable)
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,

    /// Request body
    #[arg(short, long)]
    pub body: Option<String>,

    /// Content type of the body
    #[arg(long, default_value = "application/json")]
    pub content_type: String,
}

impl RequestArgs {
    pub fn to_request(&self) -> anyhow::Result<Request> {
        let Some(target) = &self.target else {
            bail!("--target is required");
        };
        build_request(
            &self.method,
            target,
            &self.headers,
            self.body.as_deref(),
            &self.content_type,
        )
    }
}

/// Build a [`Request`] from textual parts.
pub fn build_request(
    method: &str,
    target: &str,
    headers: &[String],
    body: Option<&str>,
    content_type: &str,
) -> anyhow::Result<Request> {
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("Invalid HTTP method \"{method}\""))?;
    let mut request = Request::new(method, target);
    for header in headers {
        let Some((name, value)) = header.split_once(':') else {
            bail!("Header \"{header}\" is not in `Name: value` form");
        };
        request = request.with_header(name.trim(), value.trim());
    }
    if let Some(body) = body {
        let content_type = request
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| content_type.to_string());
        request = request.with_body(&content_type, body.as_bytes().to_vec());
    }
    Ok(request)
}

pub fn run_cli(cli: Cli) -> anyhow::Result<()> {
    let config = RuntimeConfig::from_env();
    match cli.command {
        Commands::Routes { spec } => {
            let doc = ApiDocument::build(load_spec(&spec)?, 1, false);
            println!(
                "{} {} ({})",
                doc.spec.title, doc.spec.api_version, doc.spec.version
            );
            doc.router.dump_routes();
            Ok(())
        }
        Commands::Lint { spec, fail_on_error } => lint(&spec, fail_on_error),
        Commands::Parse {
            request,
            no_validation,
        } => {
            let handle = load_handle(&request.spec, config.schema_validation && !no_validation)?;
            let pipeline = Pipeline::new(handle);
            let output = match pipeline.process(&request.to_request()?) {
                Ok(parsed) => json!({
                    "operation": parsed.route.key(),
                    "parameters": parsed.to_json(),
                }),
                Err(e) => json!({ "error": e.message, "status": e.status }),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Commands::Mock {
            request,
            data_dir,
            watch,
            no_validation,
        } => {
            let handle = load_handle(&request.spec, config.schema_validation && !no_validation)?;
            let mut pipeline = Pipeline::new(Arc::clone(&handle));
            if config.mock {
                let data_dir = data_dir.or(config.data_dir);
                pipeline = pipeline.with_mock(MockEngine::with_data_dir(data_dir.as_deref())?);
            } else {
                info!("Mock responses disabled, answering with parsed parameters");
            }

            if request.target.is_some() {
                print_response(&pipeline.handle(&request.to_request()?));
                return Ok(());
            }

            let _watcher = if watch || config.watch {
                Some(watch_spec(&request.spec, handle, |doc| {
                    info!(routes = doc.routes.len(), "Document reloaded");
                })?)
            } else {
                None
            };
            serve_lines(&pipeline, io::stdin().lock(), &request)
        }
    }
}

fn load_handle(spec: &Path, validate: bool) -> anyhow::Result<Arc<DocumentHandle>> {
    let loaded = load_spec(spec)?;
    Ok(Arc::new(DocumentHandle::from_spec(loaded, validate)))
}

fn lint(spec: &Path, fail_on_error: bool) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(spec)
        .with_context(|| format!("Cannot read {}", spec.display()))?;
    let (version, issues) = lint_document(&content, &spec.to_string_lossy())?;
    if issues.is_empty() {
        println!("{}: no issues ({version})", spec.display());
        return Ok(());
    }
    print_issues(&issues);
    if fail_on_error {
        bail!("{} issue(s) found in {}", issues.len(), spec.display());
    }
    Ok(())
}

/// Answer `METHOD TARGET [JSON BODY]` lines until end of input.
pub fn serve_lines(
    pipeline: &Pipeline,
    input: impl BufRead,
    defaults: &RequestArgs,
) -> anyhow::Result<()> {
    for line in input.lines() {
        let line = line.context("Cannot read request line")?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.splitn(3, ' ');
        let (Some(method), Some(target)) = (parts.next(), parts.next()) else {
            eprintln!("Expected `METHOD TARGET [BODY]`, got \"{line}\"");
            continue;
        };
        let body = parts.next().map(str::trim).filter(|b| !b.is_empty());
        match build_request(method, target, &defaults.headers, body, &defaults.content_type) {
            Ok(request) => print_response(&pipeline.handle(&request)),
            Err(e) => eprintln!("{e:#}"),
        }
    }
    Ok(())
}

fn print_response(res: &Response) {
    let out = json!({
        "status": res.status,
        "headers": res.headers,
        "body": res.body,
    });
    println!(
        "{}",
        serde_json::to_string(&out).unwrap_or_else(|_| Value::Null.to_string())
    );
}
