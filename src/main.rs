use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use botdb_init::{bootstrap, config, BootstrapError, Mode, Outcome};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Create the bot's MongoDB collections and indexes if they do not exist yet"
)]
struct Args {
    /// Optional YAML config file; MONGODB_URI and MONGODB_DATABASE override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Inspect the database and print what would be created, without writing
    #[arg(long)]
    dry_run: bool,

    /// Apply the schema even if the `users` collection already exists
    #[arg(long)]
    force: bool,

    /// After applying, check that every declared index exists as declared
    #[arg(long)]
    verify: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Before the subscriber, so RUST_LOG may come from .env. Real environment
    // variables take precedence over .env entries.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let mode = Mode {
        dry_run: args.dry_run,
        force: args.force,
        verify: args.verify,
    };

    match execute(args.config.as_deref(), mode).await {
        Ok(outcome) => {
            info!("{outcome}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(kind = err.kind(), "MongoDB initialization error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn execute(
    config_path: Option<&std::path::Path>,
    mode: Mode,
) -> Result<Outcome, BootstrapError> {
    info!("initializing MongoDB");
    let cfg = config::load(config_path)?;
    bootstrap::run(&cfg, mode).await
}
