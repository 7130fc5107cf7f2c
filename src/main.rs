//! DeepResearcher - iterative web research with a local LLM
//!
//! A CLI tool that repeatedly searches the web, summarizes what it finds
//! with an Ollama model, reflects on knowledge gaps and finally writes a
//! cited research report.
//!
//! Exit codes:
//!   0 - Report written (including early stops and Ctrl-C partial reports)
//!   1 - Runtime error or failed research run (no report)

mod analysis;
mod cli;
mod config;
mod error;
mod llm;
mod models;
mod report;
mod research;
mod search;

use anyhow::{Context, Result};
use cli::Args;
use config::{Config, ResearchSettings, DEFAULT_CONFIG_FILE};
use indicatif::{ProgressBar, ProgressStyle};
use llm::{OllamaClient, OllamaConfig};
use models::OutputFormat;
use report::ReportRenderer;
use research::{
    Collaborators, DomainReputationVerifier, ProgressObserver, ResearchController, ResearchState,
    Stage,
};
use search::HttpPageFetcher;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // The config file may ask for verbose logging, so read it first
    let file = read_config_file(&args);
    let file_verbose = file
        .as_ref()
        .ok()
        .and_then(Option::as_ref)
        .is_some_and(|config| config.general.verbose);

    // Initialize logging
    init_logging(args.log_level(file_verbose));

    info!("DeepResearcher v{}", env!("CARGO_PKG_VERSION"));
    debug!("Topic: {}", args.topic());

    match run_research(args, file).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Research failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .deepresearcher.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to customize the model, search backend and research loop.");
    Ok(())
}

/// Initialize logging at `level`.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run one research session. Returns the exit code.
async fn run_research(args: Args, file: Result<Option<Config>>) -> Result<i32> {
    let config = resolve_config(&args, file)?;
    let settings = ResearchSettings::from(&config);
    let topic = args.topic().to_string();

    println!("🔎 Researching: {}", topic);
    println!("   Model: {} ({})", config.model.name, config.model.ollama_url);
    println!("   Search: {}", config.search.api);
    println!(
        "   Strategy: {} | Cycles: {} | Sources per cycle: {}",
        settings.strategy, settings.max_loops, settings.max_sources_per_loop
    );

    let collaborators = build_collaborators(&config)?;

    // Ctrl-C stops the loop at the next stage boundary with a partial report
    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing with the results collected so far");
            interrupt.cancel();
        }
    });

    let spinner = (!args.quiet).then(|| Arc::new(SpinnerObserver::new(settings.max_loops)));

    let mut controller = ResearchController::new(settings.clone(), collaborators);
    if let Some(ref spinner) = spinner {
        controller = controller.with_observer(spinner.clone());
    }

    let run = controller.run(&topic, &cancel).await;

    if let Some(spinner) = spinner {
        spinner.finish();
    }

    if run.state.sources().is_empty() {
        warn!("No sources were collected for '{}'", run.state.topic());
    }

    let Some(rendered) = run.report else {
        if run.termination.is_fatal() {
            eprintln!("\n❌ Research failed: {}", run.termination);
        } else {
            eprintln!("\n❌ Could not write a report ({})", run.termination);
        }
        if let Some(e) = run.error {
            eprintln!("   {}", e);
        }
        return Ok(1);
    };

    let output = output_path(&args, &config, rendered.format);
    std::fs::write(&output, &rendered.content)
        .with_context(|| format!("Failed to write report to {}", output.display()))?;

    let metadata = &rendered.report.metadata;
    println!("\n📊 Research Summary:");
    println!(
        "   Cycles: {} of {} ({})",
        metadata.loops_completed, metadata.max_loops, metadata.termination
    );
    println!("   Sources: {}", rendered.report.sources.len());
    println!(
        "   Search attempts: {} | Duplicates: {} | Dropped: {}",
        run.stats.search_attempts, run.stats.duplicates_discarded, run.stats.fetch_drops
    );
    println!("   Duration: {:.1}s", metadata.duration_seconds);
    println!("\n✅ Report saved to: {}", output.display());

    Ok(0)
}

/// Read the config file layer: the `--config` path, else the default file.
fn read_config_file(args: &Args) -> Result<Option<Config>> {
    match args.config {
        Some(ref config_path) => Config::load(config_path).map(Some),
        None => Config::load_default(),
    }
}

/// Apply CLI/env overrides on top of the config file layer.
///
/// A broken `--config` file is an error; a broken default file is skipped.
fn resolve_config(args: &Args, file: Result<Option<Config>>) -> Result<Config> {
    let file = match (file, &args.config) {
        (Ok(Some(config)), Some(path)) => {
            info!("Loaded config from: {}", path.display());
            Some(config)
        }
        (Ok(Some(config)), None) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Some(config)
        }
        (Ok(None), _) => {
            debug!("No config file found, using defaults");
            None
        }
        (Err(e), Some(_)) => return Err(e),
        (Err(e), None) => {
            warn!("Failed to load config: {:#}", e);
            None
        }
    };

    Config::resolve(file, &args.overrides()).context("Invalid configuration")
}

/// Wire up the production collaborators.
fn build_collaborators(config: &Config) -> Result<Collaborators> {
    let model = OllamaClient::new(OllamaConfig::from(config))?;
    let search = search::build_search_client(config)?;
    let fetcher =
        HttpPageFetcher::new(Duration::from_secs(config.research.fetch_timeout_seconds))?;

    Ok(Collaborators {
        model: Arc::new(model),
        search,
        fetcher: Arc::new(fetcher),
        renderer: Arc::new(ReportRenderer::new()),
        verifier: Arc::new(DomainReputationVerifier::new()),
    })
}

/// Explicit `--output` wins; otherwise the configured path gets the
/// extension of the rendered format.
fn output_path(args: &Args, config: &Config, format: OutputFormat) -> PathBuf {
    match args.output {
        Some(ref path) => path.clone(),
        None => PathBuf::from(&config.general.output).with_extension(format.extension()),
    }
}

/// Spinner showing the current cycle and stage.
struct SpinnerObserver {
    bar: ProgressBar,
    max_loops: usize,
}

impl SpinnerObserver {
    fn new(max_loops: usize) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar, max_loops }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressObserver for SpinnerObserver {
    fn on_stage(&self, stage: Stage, state: &ResearchState) {
        if stage.is_terminal() {
            self.bar
                .set_message(format!("{} ({} sources)", stage, state.sources().len()));
            return;
        }
        let cycle = (state.loop_count() + 1).min(self.max_loops);
        self.bar.set_message(format!(
            "Cycle {}/{}: {} ({} sources)",
            cycle,
            self.max_loops,
            stage,
            state.sources().len()
        ));
    }
}
