//! Binary entry point: `setup` writes the connection configuration and the
//! default prompt templates; `start` validates them and launches the
//! scheduler.

use aioptim::classifier::{Classifier, LearnedClassifier, PromptClassifier};
use aioptim::cli::{Cli, Command};
use aioptim::config::{Config, Prompts};
use aioptim::metrics::{MetricsClient, MetricsSource};
use aioptim::model::RunContext;
use aioptim::model_client::{ModelBackend, ModelClient};
use aioptim::parser::{JavaParser, PythonParser};
use aioptim::regenerator::Regenerator;
use aioptim::repo::{RepoBackend, RepoClient};
use aioptim::{AioptimError, PipelineRunner, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};

/// The GitHub REST API this crate targets. Not configuration — github.com
/// is the only host this client speaks to.
const GITHUB_API_BASE: &str = "https://api.github.com";

const MAX_RUNS: u32 = 3;

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .init();
}

#[tokio::main]
async fn main() {
    init_logging();
    let cli = Cli::parse();

    let outcome = match cli.command {
        Command::Setup {
            tenant,
            unit,
            api,
            label,
            pat,
            repo,
            branch,
            model,
            ollama,
        } => run_setup(tenant, unit, api, label, pat, repo, branch, model, ollama),
        Command::Start { threshold, delay } => run_start(threshold as f64, delay).await,
    };

    if let Err(err) = outcome {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

#[allow(clippy::too_many_arguments)]
fn run_setup(
    tenant: String,
    unit: String,
    api: String,
    label: String,
    pat: String,
    repo: String,
    branch: String,
    model: String,
    ollama: String,
) -> Result<()> {
    let config = Config {
        ibm_tenant: tenant,
        ibm_unit: unit,
        ibm_key: api,
        ibm_label: label,
        github: pat,
        repository: repo,
        branch,
        model,
        model_path: ollama,
    };
    config.store()?;
    Prompts::ensure_default()?;
    println!("Setup completed successfully");
    Ok(())
}

async fn run_start(threshold_ms: f64, tick_interval_minutes: u64) -> Result<()> {
    let config = Config::load()?;
    let prompts = Prompts::load()?;

    let metrics: Arc<dyn MetricsSource> = Arc::new(MetricsClient::new(
        &config.ibm_tenant,
        &config.ibm_unit,
        config.ibm_key.clone(),
    ));
    let repo: Arc<dyn RepoBackend> =
        Arc::new(RepoClient::resolve(GITHUB_API_BASE, &config.github, &config.repository).await?);
    // `ModelPath` is the base URL of the Ollama host (the `-ollama` setup
    // flag), not a filesystem path.
    let model: Arc<dyn ModelBackend> =
        Arc::new(ModelClient::new(config.model_path.clone(), config.model.clone()));

    let classifier: Arc<dyn Classifier> = match load_learned_classifier() {
        Ok(learned) => {
            info!("loaded local classifier model, using LearnedClassifier");
            Arc::new(learned)
        }
        Err(err) => {
            warn!(
                error = %err,
                "no local classifier model available, falling back to the LLM-prompt classifier"
            );
            Arc::new(PromptClassifier::with_default_template(model.clone()))
        }
    };

    let python_parser = PythonParser::new()?;
    let java_parser = JavaParser::new()?;
    let regenerator = Regenerator::new(model.clone(), prompts, MAX_RUNS);
    let runner = PipelineRunner::new(python_parser, java_parser, regenerator);

    let ctx = RunContext::new(
        metrics,
        repo,
        model,
        classifier,
        threshold_ms,
        tick_interval_minutes,
        MAX_RUNS,
    );

    aioptim::scheduler::run(runner, ctx).await
}

/// Resolve and load a [`LearnedClassifier`] from `model/` next to the
/// running executable. The model-training pipeline that produces this
/// artifact is out of scope for this crate (see spec §1); when it is
/// absent, `start` falls back to the [`PromptClassifier`] rather than
/// refusing to run.
fn load_learned_classifier() -> Result<LearnedClassifier> {
    let model_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("model")))
        .unwrap_or_else(|| std::path::PathBuf::from("model"));

    let model_path = model_dir.join("graphcodebert-slowcode-detector.onnx");
    let tokenizer_path = model_dir.join("tokenizer.json");
    if !model_path.is_file() || !tokenizer_path.is_file() {
        return Err(AioptimError::Other(format!(
            "no classifier model found under {}",
            model_dir.display()
        )));
    }
    LearnedClassifier::load(&model_path.to_string_lossy(), &tokenizer_path.to_string_lossy())
}
