//! Forum harvester CLI
//!
//! Local execution entry point.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use harvester::{
    error::Result,
    models::Config,
    pipeline::{self, CrawlOptions},
    storage::SqliteStore,
    utils::fs::{create_backup, ensure_parent},
};

/// Harvester - forum post crawler with LLM enrichment
#[derive(Parser, Debug)]
#[command(
    name = "harvester",
    version,
    about = "Crawl forum posts into SQLite and score them with an LLM"
)]
struct Cli {
    /// Path to storage directory containing config.toml and the database
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Back up the database before running the command
    #[arg(short, long)]
    backup: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Page the forum feed into the database
    Crawl(CrawlArgs),

    /// Score stored posts that have not been enriched yet
    Analyze(AnalyzeArgs),

    /// Run full pipeline: Crawl → Analyze
    Run {
        /// Forum to crawl (default: feed.forum)
        #[arg(long)]
        forum: Option<String>,

        /// Maximum posts to fetch (default: feed.total_posts)
        #[arg(long)]
        total: Option<usize>,

        #[command(flatten)]
        analyze: AnalyzeArgs,
    },

    /// Validate configuration and show database counts
    Verify,

    /// Export all stored posts as JSON
    Export {
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Clone, Default)]
struct CrawlArgs {
    /// Forum to crawl (default: feed.forum)
    #[arg(long)]
    forum: Option<String>,

    /// Maximum posts to fetch (default: feed.total_posts)
    #[arg(long)]
    limit: Option<usize>,
}

#[derive(Args, Debug, Clone, Default)]
struct AnalyzeArgs {
    /// Maximum posts to analyze
    #[arg(long)]
    limit: Option<usize>,

    /// API key for the classifier
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model name
    #[arg(long)]
    model: Option<String>,

    /// Chat-completions endpoint (OpenAI or Azure)
    #[arg(long, env = "ENDPOINT_URL")]
    endpoint: Option<String>,

    /// Azure deployment name
    #[arg(long, env = "AZURE_DEPLOYMENT_NAME")]
    deployment: Option<String>,
}

impl AnalyzeArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(api_key) = &self.api_key {
            config.llm.api_key = Some(api_key.clone());
        }
        if let Some(model) = &self.model {
            config.llm.model = model.clone();
        }
        if let Some(endpoint) = &self.endpoint {
            config.llm.endpoint = endpoint.clone();
        }
        if let Some(deployment) = &self.deployment {
            config.llm.deployment = Some(deployment.clone());
        }
    }
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    log::info!("Harvester starting...");

    let config_path = cli.storage_dir.join("config.toml");
    let mut config = Config::load_or_default(&config_path);
    log::info!("Loaded configuration from {}", cli.storage_dir.display());

    if let Command::Analyze(analyze) | Command::Run { analyze, .. } = &cli.command {
        analyze.apply(&mut config);
    }

    let db_path = config.database_path(&cli.storage_dir);
    if cli.backup {
        create_backup(&db_path).await?;
    }
    ensure_parent(&db_path).await?;
    let store = SqliteStore::open(&db_path)?;
    log::info!("Using database {}", db_path.display());

    let success = match &cli.command {
        Command::Crawl(crawl) => {
            let options = CrawlOptions {
                forum: crawl.forum.clone(),
                limit: crawl.limit,
            };
            let report = pipeline::run_crawler(&config, &store, &options).await?;
            report.is_success()
        }

        Command::Analyze(analyze) => {
            let report = pipeline::run_analysis(&config, &store, analyze.limit).await?;
            report.is_success()
        }

        Command::Run {
            forum,
            total,
            analyze,
        } => {
            let options = CrawlOptions {
                forum: forum.clone(),
                limit: *total,
            };
            let report = pipeline::run_pipeline(&config, &store, &options, analyze.limit).await?;
            report.is_success()
        }

        Command::Verify => {
            if let Err(e) = pipeline::run_verify(&config, &store) {
                log::error!("Verification failed: {}", e);
                return Err(e);
            }
            log::info!("All checks passed!");
            true
        }

        Command::Export { output } => {
            pipeline::run_export(&store, output.as_deref()).await?;
            true
        }
    };

    if success {
        log::info!("Done!");
    } else {
        log::error!("Command did not complete successfully");
    }

    Ok(exit_code(success))
}
