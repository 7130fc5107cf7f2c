//! Configuration file handling.
//!
//! This module handles loading `.deepresearcher.toml` files and layering
//! run-time overrides on top of them. Precedence, highest first:
//! explicit override (CLI flag or environment variable) > configuration
//! file > compiled-in defaults.

use crate::models::{OutputFormat, ResearchStrategy};
use crate::search::SearchApi;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".deepresearcher.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Model settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Research loop settings.
    #[serde(default)]
    pub research: ResearchConfig,

    /// Search backend settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
        }
    }
}

fn default_output() -> String {
    "research_report.md".to_string()
}

/// LLM model settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Local model name served by Ollama.
    #[serde(default = "default_model")]
    pub name: String,

    /// Ollama API URL.
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    /// Temperature for generation.
    #[serde(default)]
    pub temperature: f32,

    /// Request timeout in seconds.
    #[serde(default = "default_model_timeout")]
    pub timeout_seconds: u64,

    /// Remove `<think>...</think>` spans from model output.
    #[serde(default = "default_true")]
    pub strip_thinking_tokens: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            ollama_url: default_ollama_url(),
            temperature: 0.0,
            timeout_seconds: default_model_timeout(),
            strip_thinking_tokens: true,
        }
    }
}

fn default_model() -> String {
    "llama3.2".to_string()
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model_timeout() -> u64 {
    300
}

fn default_true() -> bool {
    true
}

/// Research loop settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// Number of research cycles before the report is forced.
    #[serde(default = "default_max_loops")]
    pub max_web_research_loops: usize,

    /// Query framing strategy.
    #[serde(default)]
    pub strategy: ResearchStrategy,

    /// Maximum search results kept per cycle.
    #[serde(default = "default_max_sources")]
    pub max_sources_per_loop: usize,

    /// Fetch the full page behind each search result.
    #[serde(default = "default_true")]
    pub fetch_full_page: bool,

    /// Assign credibility tiers to sources before rendering.
    #[serde(default)]
    pub enable_source_verification: bool,

    /// Ask the model to polish follow-up queries proposed by reflection.
    #[serde(default)]
    pub refine_gap_queries: bool,

    /// Timeout for one search transport call, in seconds.
    #[serde(default = "default_search_timeout")]
    pub search_timeout_seconds: u64,

    /// Timeout for one full-page fetch, in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_seconds: u64,

    /// Delay before the single search retry, in milliseconds.
    #[serde(default = "default_retry_backoff")]
    pub search_retry_backoff_ms: u64,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_web_research_loops: default_max_loops(),
            strategy: ResearchStrategy::default(),
            max_sources_per_loop: default_max_sources(),
            fetch_full_page: true,
            enable_source_verification: false,
            refine_gap_queries: false,
            search_timeout_seconds: default_search_timeout(),
            fetch_timeout_seconds: default_fetch_timeout(),
            search_retry_backoff_ms: default_retry_backoff(),
        }
    }
}

fn default_max_loops() -> usize {
    3
}

fn default_max_sources() -> usize {
    3
}

fn default_search_timeout() -> u64 {
    30
}

fn default_fetch_timeout() -> u64 {
    10
}

fn default_retry_backoff() -> u64 {
    1000
}

/// Search backend settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Which search backend to use.
    #[serde(default)]
    pub api: SearchApi,

    /// Base URL of a SearXNG instance.
    #[serde(default = "default_searxng_url")]
    pub searxng_url: String,

    /// API key for Tavily.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tavily_api_key: Option<String>,

    /// API key for Perplexity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perplexity_api_key: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api: SearchApi::default(),
            searxng_url: default_searxng_url(),
            tavily_api_key: None,
            perplexity_api_key: None,
        }
    }
}

fn default_searxng_url() -> String {
    "http://localhost:8888".to_string()
}

/// Report generation settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Rendered output format.
    #[serde(default)]
    pub format: OutputFormat,
}

/// Explicit run-time overrides, typically from CLI flags or environment.
///
/// `None` leaves the lower layer untouched.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub output: Option<String>,
    pub verbose: Option<bool>,
    pub model: Option<String>,
    pub ollama_url: Option<String>,
    pub temperature: Option<f32>,
    pub timeout_seconds: Option<u64>,
    pub strip_thinking_tokens: Option<bool>,
    pub max_loops: Option<usize>,
    pub strategy: Option<ResearchStrategy>,
    pub max_sources: Option<usize>,
    pub fetch_full_page: Option<bool>,
    pub enable_source_verification: Option<bool>,
    pub search_api: Option<SearchApi>,
    pub searxng_url: Option<String>,
    pub tavily_api_key: Option<String>,
    pub perplexity_api_key: Option<String>,
    pub format: Option<OutputFormat>,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Resolve the final configuration from an optional file layer and overrides.
    ///
    /// The result is validated and should be treated as immutable for the run.
    pub fn resolve(file: Option<Config>, overrides: &ConfigOverrides) -> Result<Self> {
        let mut config = file.unwrap_or_default();
        config.apply(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides in place. Only `Some` values win.
    pub fn apply(&mut self, overrides: &ConfigOverrides) {
        let o = overrides;

        if let Some(ref output) = o.output {
            self.general.output = output.clone();
        }
        if let Some(verbose) = o.verbose {
            self.general.verbose = verbose;
        }

        if let Some(ref model) = o.model {
            self.model.name = model.clone();
        }
        if let Some(ref url) = o.ollama_url {
            self.model.ollama_url = url.clone();
        }
        if let Some(temperature) = o.temperature {
            self.model.temperature = temperature;
        }
        if let Some(timeout) = o.timeout_seconds {
            self.model.timeout_seconds = timeout;
        }
        if let Some(strip) = o.strip_thinking_tokens {
            self.model.strip_thinking_tokens = strip;
        }

        if let Some(loops) = o.max_loops {
            self.research.max_web_research_loops = loops;
        }
        if let Some(strategy) = o.strategy {
            self.research.strategy = strategy;
        }
        if let Some(max_sources) = o.max_sources {
            self.research.max_sources_per_loop = max_sources;
        }
        if let Some(fetch) = o.fetch_full_page {
            self.research.fetch_full_page = fetch;
        }
        if let Some(verify) = o.enable_source_verification {
            self.research.enable_source_verification = verify;
        }

        if let Some(api) = o.search_api {
            self.search.api = api;
        }
        if let Some(ref url) = o.searxng_url {
            self.search.searxng_url = url.clone();
        }
        if let Some(ref key) = o.tavily_api_key {
            self.search.tavily_api_key = Some(key.clone());
        }
        if let Some(ref key) = o.perplexity_api_key {
            self.search.perplexity_api_key = Some(key.clone());
        }

        if let Some(format) = o.format {
            self.report.format = format;
        }
    }

    /// Check value ranges and cross-field requirements.
    pub fn validate(&self) -> Result<()> {
        if self.research.max_web_research_loops < 1 {
            bail!("max_web_research_loops must be at least 1");
        }
        if self.research.max_sources_per_loop < 1 {
            bail!("max_sources_per_loop must be at least 1");
        }
        if self.model.timeout_seconds == 0
            || self.research.search_timeout_seconds == 0
            || self.research.fetch_timeout_seconds == 0
        {
            bail!("Timeouts must be at least 1 second");
        }
        if !(0.0..=1.0).contains(&self.model.temperature) {
            bail!("Temperature must be between 0.0 and 1.0");
        }
        if !is_http_url(&self.model.ollama_url) {
            bail!("Ollama URL must start with 'http://' or 'https://'");
        }

        match self.search.api {
            SearchApi::Searxng if !is_http_url(&self.search.searxng_url) => {
                bail!("SearXNG URL must start with 'http://' or 'https://'")
            }
            SearchApi::Tavily if self.search.tavily_api_key.is_none() => {
                bail!("Tavily search requires an API key (TAVILY_API_KEY)")
            }
            SearchApi::Perplexity if self.search.perplexity_api_key.is_none() => {
                bail!("Perplexity search requires an API key (PERPLEXITY_API_KEY)")
            }
            _ => {}
        }

        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// The slice of configuration the research controller runs on.
#[derive(Debug, Clone)]
pub struct ResearchSettings {
    pub model_name: String,
    pub max_loops: usize,
    pub strategy: ResearchStrategy,
    pub max_sources_per_loop: usize,
    pub fetch_full_page: bool,
    pub enable_source_verification: bool,
    pub refine_gap_queries: bool,
    pub strip_thinking_tokens: bool,
    pub output_format: OutputFormat,
    pub model_timeout: Duration,
    pub search_timeout: Duration,
    pub fetch_timeout: Duration,
    pub search_retry_backoff: Duration,
}

impl From<&Config> for ResearchSettings {
    fn from(config: &Config) -> Self {
        Self {
            model_name: config.model.name.clone(),
            max_loops: config.research.max_web_research_loops,
            strategy: config.research.strategy,
            max_sources_per_loop: config.research.max_sources_per_loop,
            fetch_full_page: config.research.fetch_full_page,
            enable_source_verification: config.research.enable_source_verification,
            refine_gap_queries: config.research.refine_gap_queries,
            strip_thinking_tokens: config.model.strip_thinking_tokens,
            output_format: config.report.format,
            model_timeout: Duration::from_secs(config.model.timeout_seconds),
            search_timeout: Duration::from_secs(config.research.search_timeout_seconds),
            fetch_timeout: Duration::from_secs(config.research.fetch_timeout_seconds),
            search_retry_backoff: Duration::from_millis(config.research.search_retry_backoff_ms),
        }
    }
}
