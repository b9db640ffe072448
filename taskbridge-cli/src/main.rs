//! Taskbridge CLI
//!
//! Drives requests through the dispatch bridge: classify, answer locally or
//! delegate to the remote host, report the outcome. Speech capture is out of
//! scope here — requests come from the command line or stdin.
//!
//! Usage:
//!   taskbridge --config bridge.toml "Open Safari"
//!   taskbridge            # interactive line loop

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use taskbridge::action::ActionVocabulary;
use taskbridge::classifier::IntentClassifier;
use taskbridge::config::{BackendKind, BridgeConfig};
use taskbridge::dispatcher::{DispatchOutcome, Dispatcher, InferenceAnswerer};
use taskbridge::executor::{InProcessExecutor, InferenceProposer, LoggingSink};
use taskbridge::inference::{InferenceProvider, InferenceProviderFactory};
use taskbridge::remote::{HttpRemoteBackend, RemoteBackend, SubmitOptions};
use taskbridge::types::TaskOutcome;

/// CLI arguments
#[derive(Parser, Debug)]
#[command(name = "taskbridge")]
#[command(about = "Dispatch natural-language tasks to a remote GUI host")]
struct Args {
    /// Path to configuration file (TOML format)
    #[arg(long, env = "TASKBRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// One request to process; omit for an interactive line loop
    request: Option<String>,
}

fn build_dispatcher(
    config: &BridgeConfig,
) -> anyhow::Result<(Dispatcher, Option<Arc<HttpRemoteBackend>>)> {
    let provider: Arc<dyn InferenceProvider> =
        InferenceProviderFactory::create(&config.inference)?.into();
    info!(provider = %provider.info().name, model = %provider.info().model, "inference provider ready");

    let vocabulary = ActionVocabulary::with_extensions(&config.vocabulary.actions);

    let mut http_backend = None;
    let backend: Arc<dyn RemoteBackend> = match config.remote.backend {
        BackendKind::Http => {
            info!(base_url = %config.remote.base_url(), "using HTTP remote backend");
            let backend = Arc::new(HttpRemoteBackend::new(&config.remote)?);
            http_backend = Some(backend.clone());
            backend
        }
        BackendKind::InProcess => {
            info!("using in-process executor");
            Arc::new(InProcessExecutor::new(
                Arc::new(InferenceProposer::new(provider.clone(), vocabulary.clone())),
                Arc::new(LoggingSink),
                vocabulary,
            ))
        }
    };

    let dispatcher = Dispatcher::new(
        IntentClassifier::new(provider.clone(), config.classifier.clone()),
        Arc::new(InferenceAnswerer::new(
            provider,
            config.classifier.answer_max_tokens,
        )),
        backend,
        config.remote.poller_settings(),
        SubmitOptions {
            send_screenshot: config.remote.send_screenshot,
        },
    );

    Ok((dispatcher, http_backend))
}

/// Fetch a result artifact into the configured directory, if both exist.
async fn fetch_artifact(
    outcome: &DispatchOutcome,
    backend: &Option<Arc<HttpRemoteBackend>>,
    config: &BridgeConfig,
) {
    let (Some(url), Some(backend), Some(dir)) = (
        &outcome.artifact_url,
        backend.as_ref(),
        config.remote.artifact_dir.as_ref(),
    ) else {
        return;
    };

    match backend.download_artifact(url, dir).await {
        Ok(path) => println!("     artifact saved: {}", path.display()),
        Err(e) => eprintln!("artifact download failed: {}", e),
    }
}

fn print_outcome(outcome: &DispatchOutcome) {
    let marker = match outcome.outcome {
        TaskOutcome::Succeeded => "ok",
        TaskOutcome::Failed => "failed",
        TaskOutcome::TimedOut => "timed out",
    };
    println!("[{}] {}", marker, outcome.message);
    if let Some(url) = &outcome.artifact_url {
        println!("     artifact: {}", url);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("taskbridge=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => {
            info!("loading configuration from {}", path.display());
            BridgeConfig::from_toml_file(path)?
        }
        None => BridgeConfig::default(),
    };

    let (dispatcher, http_backend) = build_dispatcher(&config)?;

    if let Some(request) = args.request {
        let outcome = dispatcher.handle(&request).await?;
        print_outcome(&outcome);
        fetch_artifact(&outcome, &http_backend, &config).await;
        return Ok(());
    }

    // Interactive loop: one request per line, processed to completion
    // before the next line is read.
    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }
        match dispatcher.handle(line).await {
            Ok(outcome) => {
                print_outcome(&outcome);
                fetch_artifact(&outcome, &http_backend, &config).await;
            }
            Err(e) => eprintln!("error: {}", e),
        }
    }

    Ok(())
}
