//! Policy decision point command line.
//!
//! Loads policy documents, evaluates one request and prints the response as
//! JSON.

use xacml_pdp::{telemetry, Config, PolicyCombiningAlgId, PolicyDecisionPoint, Request, Result};

use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::info;

/// Policy decision point
#[derive(Parser, Debug)]
#[command(name = "pdp")]
#[command(about = "Evaluate a decision request against XACML-style policies")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "PDP_CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Policy file to load (repeatable)
    #[arg(short = 'f', long = "policy-file")]
    policy_files: Vec<PathBuf>,

    /// Directory whose YAML and JSON files are loaded as policies
    #[arg(short = 'd', long, env = "PDP_POLICY_DIR")]
    policy_dir: Option<PathBuf>,

    /// Request file (JSON or YAML)
    #[arg(short, long)]
    request: PathBuf,

    /// URN of the algorithm combining the top-level policies
    #[arg(long)]
    root_algorithm: Option<PolicyCombiningAlgId>,

    /// Keep evaluating after the outcome is settled to collect obligations
    #[arg(long)]
    respect_abandoned: bool,

    /// Log level
    #[arg(long, env = "PDP_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON log format
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };

    if let Some(level) = &args.log_level {
        config.telemetry.log_level = level.clone();
    }
    if args.json_logs {
        config.telemetry.json_logs = true;
    }
    if let Some(root) = args.root_algorithm {
        config.engine.root_combining_algorithm = root;
    }
    if args.respect_abandoned {
        config.engine.respect_abandoned_evaluatables = true;
    }

    telemetry::init_logging(&config.telemetry)?;
    info!("Starting policy decision point v{}", xacml_pdp::VERSION);

    let mut builder = PolicyDecisionPoint::builder().with_config(config);
    for path in &args.policy_files {
        builder = builder.with_policy_file(path);
    }
    let pdp = builder.build().await?;

    if let Some(dir) = &args.policy_dir {
        load_policies_from_dir(&pdp, dir).await?;
    }

    let request = load_request(&args.request).await?;
    let response = pdp.evaluate(&request)?;

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

/// Read a request, choosing the format from the file extension.
async fn load_request(path: &Path) -> Result<Request> {
    let content = tokio::fs::read_to_string(path).await?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Request::from_json(&content),
        _ => Request::from_yaml(&content),
    }
}

/// Load policies from a directory.
async fn load_policies_from_dir(pdp: &PolicyDecisionPoint, dir: &Path) -> Result<()> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if path.is_file() && matches!(extension.to_lowercase().as_str(), "yaml" | "yml" | "json") {
            paths.push(path);
        }
    }
    // Load order decides evaluation order among equal priorities.
    paths.sort();

    let mut loaded = 0;
    for path in paths {
        match pdp.load_policy_file(&path).await {
            Ok(ids) => loaded += ids.len(),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to load policies"),
        }
    }

    info!(dir = %dir.display(), loaded, "Loaded policies from directory");
    Ok(())
}
