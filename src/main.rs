//! Reaction Search - adverse drug reaction reports from openFDA
//!
//! Ships both halves of the application: a backend proxy that aggregates
//! openFDA reports into reaction counts, and a search client that pages
//! through those counts.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (invalid arguments, config, request failure, etc.)

mod analysis;
mod browse;
mod cli;
mod client;
mod config;
mod error;
mod models;
mod pagination;
mod report;
mod server;
mod upstream;

#[cfg(test)]
mod test_support;

use anyhow::{Context, Result};
use cli::{Args, Command, SearchArgs};
use client::BackendClient;
use config::{Config, CONFIG_FILE_NAME};
use pagination::PageSource;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use upstream::OpenFdaClient;

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

    init_logging(&args);

    info!("Reaction Search v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&args).await {
        error!("{:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .reaction-search.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize the server port, openFDA endpoint and page size.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// `RUST_LOG` wins over `--verbose`/`--quiet` when set. Logs go to stderr
/// so they never mix with rendered pages.
fn init_logging(args: &Args) {
    let level = args.log_level();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

async fn run(args: &Args) -> Result<()> {
    let mut config = load_config(args)?;
    config.merge_with_args(args);

    match args.command {
        Some(Command::Serve(_)) => server::start_server(config).await,
        Some(Command::Search(ref search)) => run_search(search, &config, !args.quiet).await,
        None => Ok(()),
    }
}

/// Run the search client against the backend, or openFDA with --direct.
async fn run_search(search: &SearchArgs, config: &Config, show_progress: bool) -> Result<()> {
    let source: Box<dyn PageSource> = if search.direct {
        info!("Querying openFDA directly at {}", config.upstream.base_url);
        Box::new(
            OpenFdaClient::new(&config.upstream).context("Failed to create openFDA client")?,
        )
    } else {
        info!("Using backend at {}", config.client.api_url);
        Box::new(
            BackendClient::new(&config.client, config.upstream.timeout_seconds)
                .context("Failed to create backend client")?,
        )
    };

    let drug_name = search.drug_name.trim();
    let limit = config.client.page_size;

    if search.interactive {
        return browse::run_interactive(
            drug_name,
            limit,
            source.as_ref(),
            search.format,
            show_progress,
        )
        .await;
    }

    let session =
        browse::show_page(drug_name, limit, search.page, source.as_ref(), show_progress).await?;
    debug!(
        "Session for '{}' ended on page {} (cached pages {:?}, state {})",
        session.query,
        session.current_page,
        session.cache.pages(),
        session.state
    );

    print!("{}", browse::render(&session, search.format)?);
    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
