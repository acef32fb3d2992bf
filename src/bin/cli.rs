//! Mayor crawler CLI
//!
//! Local execution entry point.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use crawler::{
    browser::{self, Browser},
    error::{AppError, Result},
    models::{BackendKind, Config, MunicipalityLink},
    pipeline,
    storage::CsvSink,
};

/// Mayor contact crawler for the Bulgarian administrative register
#[derive(Parser, Debug)]
#[command(
    name = "mayor-crawler",
    version,
    about = "Collect municipal mayors' names and emails into a CSV"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// Overrides for the browser session.
#[derive(Args, Debug)]
struct SessionArgs {
    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Browser backend
    #[arg(long, value_enum)]
    backend: Option<BackendKind>,

    /// Maximum number of listing pages to walk
    #[arg(long)]
    max_pages: Option<usize>,
}

impl SessionArgs {
    fn apply(&self, config: &mut Config) {
        if self.headed {
            config.browser.headless = false;
        }
        if let Some(backend) = self.backend {
            config.browser.backend = backend;
        }
        if let Some(max_pages) = self.max_pages {
            config.crawler.max_pages = max_pages;
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Walk the listing, visit every municipality and write the CSV
    Crawl {
        /// Visit the links saved by `links` instead of walking the listing
        #[arg(long)]
        links: Option<PathBuf>,

        /// CSV output path (default: output.csv_path)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        session: SessionArgs,
    },

    /// Walk the listing and save the municipality links as JSON
    Links {
        /// JSON output path (default: output.links_path)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        session: SessionArgs,
    },

    /// Validate the configuration file
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Close the session whatever the outcome of the work done with it.
async fn finish<T>(mut browser: Box<dyn Browser>, outcome: Result<T>) -> Result<T> {
    if let Err(e) = browser.close().await {
        log::warn!("Closing browser failed: {}", e);
    }
    outcome
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = if cli.config.exists() {
        log::info!("Loaded configuration from {}", cli.config.display());
        Config::load(&cli.config)?
    } else {
        Config::load_or_default(&cli.config)
    };

    match cli.command {
        Command::Crawl {
            links,
            output,
            session,
        } => {
            session.apply(&mut config);
            config.validate()?;

            let links = match links {
                Some(path) => {
                    if !path.exists() {
                        log::error!("Links file not found at {}. Run 'links' first.", path.display());
                        return Err(AppError::config("Links file not found"));
                    }
                    Some(MunicipalityLink::load_all(&path)?)
                }
                None => None,
            };
            let output = output.unwrap_or_else(|| PathBuf::from(&config.output.csv_path));
            let sink = CsvSink::new(output);

            let mut browser = browser::connect(&config.browser).await?;
            let outcome =
                pipeline::run_crawler(&config, browser.as_mut(), &sink, links).await;
            let summary = finish(browser, outcome).await?;

            log::info!(
                "Crawl complete: {} of {} municipalities with email",
                summary.with_email,
                summary.links_discovered
            );
        }

        Command::Links { output, session } => {
            session.apply(&mut config);
            config.validate()?;

            let output = output.unwrap_or_else(|| PathBuf::from(&config.output.links_path));

            let mut browser = browser::connect(&config.browser).await?;
            let outcome = pipeline::run_link_discovery(&config, browser.as_mut(), &output).await;
            finish(browser, outcome).await?;
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!(
                "✓ Config OK (backend {:?}, up to {} listing pages)",
                config.browser.backend,
                config.crawler.max_pages
            );
        }
    }

    log::info!("Done!");

    Ok(())
}
