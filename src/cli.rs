//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap. Flags that are
//! left unset fall through to the config file and then to built-in defaults.

use crate::config::ConfigOverrides;
use crate::models::{OutputFormat, ResearchStrategy};
use crate::search::SearchApi;
use clap::Parser;
use std::path::PathBuf;

/// DeepResearcher - iterative web research with a local LLM
///
/// Searches the web, summarizes what it finds, looks for gaps in its own
/// knowledge and searches again, then writes a cited report.
///
/// Examples:
///   deepresearcher "solar panel efficiency"
///   deepresearcher "rust vs go for cli tools" --strategy comparative --loops 5
///   deepresearcher "perovskite stability" --search-api tavily --format html
///   deepresearcher --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Research topic
    #[arg(value_name = "TOPIC", required_unless_present = "init_config")]
    pub topic: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .deepresearcher.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Ollama model to use
    #[arg(short, long, env = "LOCAL_LLM")]
    pub model: Option<String>,

    /// Ollama API endpoint URL
    #[arg(long, value_name = "URL", env = "OLLAMA_BASE_URL")]
    pub ollama_url: Option<String>,

    /// Maximum number of research cycles
    #[arg(short, long, value_name = "COUNT", env = "MAX_WEB_RESEARCH_LOOPS")]
    pub loops: Option<usize>,

    /// How search queries are framed
    #[arg(short, long, value_name = "STRATEGY", env = "RESEARCH_STRATEGY")]
    pub strategy: Option<ResearchStrategy>,

    /// Maximum search results kept per cycle
    #[arg(long, value_name = "COUNT", env = "MAX_SOURCES_PER_LOOP")]
    pub max_sources: Option<usize>,

    /// Search backend
    #[arg(long, value_name = "API", env = "SEARCH_API")]
    pub search_api: Option<SearchApi>,

    /// SearXNG instance URL
    #[arg(long, value_name = "URL", env = "SEARXNG_URL")]
    pub searxng_url: Option<String>,

    /// Tavily API key
    #[arg(long, value_name = "KEY", env = "TAVILY_API_KEY", hide_env_values = true)]
    pub tavily_api_key: Option<String>,

    /// Perplexity API key
    #[arg(long, value_name = "KEY", env = "PERPLEXITY_API_KEY", hide_env_values = true)]
    pub perplexity_api_key: Option<String>,

    /// Fetch and read the full page of every result
    ///
    /// Pass --fetch-full-page=false to use search snippets only
    #[arg(
        long,
        value_name = "BOOL",
        env = "FETCH_FULL_PAGE",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub fetch_full_page: Option<bool>,

    /// Assign a credibility tier to every source in the report
    #[arg(
        long,
        value_name = "BOOL",
        env = "ENABLE_SOURCE_VERIFICATION",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub verify_sources: Option<bool>,

    /// Output format
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Output file path for the report
    ///
    /// Defaults to research_report.<ext> for the chosen format
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Remove <think> blocks from model replies
    #[arg(
        long,
        value_name = "BOOL",
        env = "STRIP_THINKING_TOKENS",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub strip_thinking_tokens: Option<bool>,

    /// Model request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Temperature for LLM responses (0.0 - 1.0)
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .deepresearcher.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The research topic, empty if not set (validate first).
    pub fn topic(&self) -> &str {
        self.topic.as_deref().unwrap_or("").trim()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.topic().is_empty() {
            return Err("Research topic must not be empty".to_string());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.loops == Some(0) {
            return Err("Loop count must be at least 1".to_string());
        }
        if self.max_sources == Some(0) {
            return Err("Max sources must be at least 1".to_string());
        }
        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if let Some(temperature) = self.temperature {
            if !(0.0..=1.0).contains(&temperature) {
                return Err("Temperature must be between 0.0 and 1.0".to_string());
            }
        }

        Ok(())
    }

    /// Flags as the top configuration layer.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            output: self.output.as_ref().map(|p| p.display().to_string()),
            verbose: self.verbose.then_some(true),
            model: self.model.clone(),
            ollama_url: self.ollama_url.clone(),
            temperature: self.temperature,
            timeout_seconds: self.timeout,
            strip_thinking_tokens: self.strip_thinking_tokens,
            max_loops: self.loops,
            strategy: self.strategy,
            max_sources: self.max_sources,
            fetch_full_page: self.fetch_full_page,
            enable_source_verification: self.verify_sources,
            search_api: self.search_api,
            searxng_url: self.searxng_url.clone(),
            tavily_api_key: self.tavily_api_key.clone(),
            perplexity_api_key: self.perplexity_api_key.clone(),
            format: self.format,
        }
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `config_verbose` is the config file's `general.verbose`; `--quiet`
    /// still wins over it.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args::parse_from(["deepresearcher", "solar panel efficiency"])
    }

    #[test]
    fn test_parse_topic_and_flags() {
        let args = Args::parse_from([
            "deepresearcher",
            "rust vs go",
            "--strategy",
            "comparative",
            "--loops",
            "5",
            "--search-api",
            "duckduckgo",
            "--format",
            "html",
            "--fetch-full-page=false",
        ]);

        assert_eq!(args.topic(), "rust vs go");
        assert_eq!(args.strategy, Some(ResearchStrategy::Comparative));
        assert_eq!(args.loops, Some(5));
        assert_eq!(args.search_api, Some(SearchApi::DuckDuckGo));
        assert_eq!(args.format, Some(OutputFormat::Html));
        assert_eq!(args.fetch_full_page, Some(false));
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_overrides_leave_unset_flags_alone() {
        let args = make_args();
        let overrides = args.overrides();

        assert_eq!(overrides.verbose, None);
        assert_eq!(overrides.format, None);
        assert_eq!(overrides.output, None);
    }

    #[test]
    fn test_boolean_flags() {
        let args = Args::parse_from([
            "deepresearcher",
            "--verify-sources",
            "--strip-thinking-tokens=false",
            "topic after flags",
        ]);

        assert_eq!(args.topic(), "topic after flags");
        let overrides = args.overrides();
        assert_eq!(overrides.enable_source_verification, Some(true));
        assert_eq!(overrides.strip_thinking_tokens, Some(false));
    }

    #[test]
    fn test_validation_errors() {
        let mut args = make_args();
        args.loops = Some(0);
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.topic = Some("   ".to_string());
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.temperature = Some(1.5);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_init_config_without_topic() {
        let args = Args::parse_from(["deepresearcher", "--init-config"]);
        assert!(args.topic.is_none());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(false), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(false), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(false), tracing::Level::ERROR);
    }

    #[test]
    fn test_config_file_verbose_raises_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(true), tracing::Level::DEBUG);

        args.quiet = true;
        assert_eq!(args.log_level(true), tracing::Level::ERROR);
    }
}
