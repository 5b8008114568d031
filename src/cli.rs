//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Reaction Search - adverse drug reaction reports from openFDA
///
/// Runs the backend proxy in front of openFDA, or searches reactions by
/// drug brand name and pages through the aggregated counts.
///
/// Examples:
///   reaction-search serve --port 5000
///   reaction-search search Tylenol
///   reaction-search search Tylenol --page 3 --format json
///   reaction-search search Vimizim --interactive
///   reaction-search search Tylenol --direct
///   reaction-search --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .reaction-search.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// openFDA drug event endpoint
    #[arg(long, value_name = "URL", env = "OPENFDA_URL", global = true)]
    pub openfda_url: Option<String>,

    /// openFDA API key (raises the upstream rate limit)
    #[arg(
        long,
        value_name = "KEY",
        env = "OPENFDA_API_KEY",
        hide_env_values = true,
        global = true
    )]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS", global = true)]
    pub timeout: Option<u64>,

    /// Generate a default .reaction-search.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the backend HTTP proxy
    Serve(ServeArgs),
    /// Search reactions for a drug brand name
    Search(SearchArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// Address to bind
    #[arg(long, value_name = "ADDR")]
    pub host: Option<String>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct SearchArgs {
    /// Drug brand name, e.g. Tylenol
    #[arg(value_name = "DRUG")]
    pub drug_name: String,

    /// Reports per page
    #[arg(short, long, value_name = "COUNT", env = "REACTION_SEARCH_PAGE_SIZE")]
    pub limit: Option<u32>,

    /// Page to show (pages before it are walked first)
    #[arg(short, long, default_value = "1", value_name = "PAGE")]
    pub page: u32,

    /// Browse pages interactively
    #[arg(short, long)]
    pub interactive: bool,

    /// Backend base URL
    #[arg(long, value_name = "URL", env = "REACTION_SEARCH_API_URL")]
    pub api_url: Option<String>,

    /// Query openFDA directly instead of going through the backend
    #[arg(long)]
    pub direct: bool,

    /// Output format (text, markdown, json)
    #[arg(long, default_value = "text", value_name = "FORMAT")]
    pub format: OutputFormat,
}

/// Output format for rendered pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Plain terminal text (default)
    #[default]
    Text,
    /// Markdown format
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        let Some(ref command) = self.command else {
            return Err("A command is required: use 'serve' or 'search'".to_string());
        };

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some(ref url) = self.openfda_url {
            validate_http_url("openFDA URL", url)?;
        }

        match command {
            Command::Serve(serve) => {
                if serve.port == Some(0) {
                    return Err("Port must be between 1 and 65535".to_string());
                }
            }
            Command::Search(search) => {
                if search.drug_name.trim().is_empty() {
                    return Err("Drug name must not be empty".to_string());
                }
                if search.limit == Some(0) {
                    return Err("Limit must be at least 1".to_string());
                }
                if search.page == 0 {
                    return Err("Page must be at least 1".to_string());
                }
                if search.interactive && search.format == OutputFormat::Json {
                    return Err("Cannot use --format json with --interactive".to_string());
                }
                if let Some(ref url) = search.api_url {
                    validate_http_url("API URL", url)?;
                }
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

fn validate_http_url(name: &str, url: &str) -> Result<(), String> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(format!("{} must start with 'http://' or 'https://'", name));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_search_args() -> SearchArgs {
        SearchArgs {
            drug_name: "Tylenol".to_string(),
            limit: None,
            page: 1,
            interactive: false,
            api_url: None,
            direct: false,
            format: OutputFormat::Text,
        }
    }

    fn make_args(command: Command) -> Args {
        Args {
            command: Some(command),
            config: None,
            verbose: false,
            quiet: false,
            openfda_url: None,
            api_key: None,
            timeout: None,
            init_config: false,
        }
    }

    #[test]
    fn test_parse_search_command() {
        let args = Args::try_parse_from([
            "reaction-search",
            "search",
            "Tylenol",
            "--limit",
            "10",
            "--page",
            "2",
            "--format",
            "markdown",
        ])
        .unwrap();

        match args.command {
            Some(Command::Search(search)) => {
                assert_eq!(search.drug_name, "Tylenol");
                assert_eq!(search.limit, Some(10));
                assert_eq!(search.page, 2);
                assert_eq!(search.format, OutputFormat::Markdown);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args =
            Args::try_parse_from(["reaction-search", "serve", "--port", "8080", "-v"]).unwrap();

        assert!(args.verbose);
        assert!(matches!(
            args.command,
            Some(Command::Serve(ServeArgs { port: Some(8080), .. }))
        ));
    }

    #[test]
    fn test_validation_requires_command() {
        let mut args = make_args(Command::Search(make_search_args()));
        args.command = None;
        assert!(args.validate().is_err());

        args.init_config = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_search() {
        let mut search = make_search_args();
        search.drug_name = "   ".to_string();
        assert!(make_args(Command::Search(search)).validate().is_err());

        let mut search = make_search_args();
        search.limit = Some(0);
        assert!(make_args(Command::Search(search)).validate().is_err());

        let mut search = make_search_args();
        search.page = 0;
        assert!(make_args(Command::Search(search)).validate().is_err());

        let mut search = make_search_args();
        search.api_url = Some("localhost:5000".to_string());
        assert!(make_args(Command::Search(search)).validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args(Command::Search(make_search_args()));
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args(Command::Search(make_search_args()));
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
