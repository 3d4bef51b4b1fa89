use cashline_core::SyncConfig;
use cashline_storage::SqliteLedger;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "cashline", version, about = "Bank transaction sync into a classified ledger")]
struct Cli {
    /// TOML config file; built-in defaults are used when omitted.
    #[arg(long, global = true, env = "CASHLINE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch new bank transactions, classify them and append them to the ledger.
    Sync {
        /// Don't refresh the cash balance afterwards.
        #[arg(long)]
        skip_balance: bool,
    },
    /// Publish the summed balance of all active bank accounts.
    Balance,
    /// Write the ledger as CSV.
    Export {
        /// Output file; stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so `export` can stream CSV on stdout.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => SyncConfig::load(path)?,
        None => SyncConfig::default(),
    };

    let db_path = commands::database_path(&config)?;
    let db = cashline_storage::create_db(&db_path).await?;
    tracing::debug!("ledger database: {}", db_path.display());
    let ledger = SqliteLedger::new(db);

    match cli.command {
        Command::Sync { skip_balance } => commands::sync(&config, &ledger, skip_balance).await?,
        Command::Balance => commands::balance(&config, &ledger).await?,
        Command::Export { output } => commands::export(&ledger, output.as_deref()).await?,
    }

    Ok(())
}
