use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use std::sync::Arc;
use tg_eye::auth::StdinPrompt;
use tg_eye::client::Client;
use tg_eye::config::ClientConfig;
use tg_eye::store::StatusStore;
use tg_eye::td::{Function, Transport};

/// Logs contact online-status and profile changes to a local SQLite
/// database.
#[derive(Parser, Debug)]
#[command(name = "tg-eye")]
struct Args {
    /// Path of the status database, created if absent.
    #[arg(long, default_value = "user_status.sqlite3")]
    db: PathBuf,

    /// TDLib log verbosity (0 = fatal errors only).
    #[arg(long, default_value_t = 1)]
    td_verbosity: i32,
}

fn main() {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "{} [{:<5}] [{}] - {}",
                Local::now().format("%H:%M:%S"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to build tokio runtime");

    if let Err(e) = rt.block_on(run(args)) {
        error!("{e:#}");
        std::process::exit(1);
    }
}

#[cfg(feature = "tdjson")]
fn create_transport() -> Result<Arc<dyn Transport>> {
    Ok(Arc::new(tg_eye::td::TdJsonTransport::new()))
}

#[cfg(not(feature = "tdjson"))]
fn create_transport() -> Result<Arc<dyn Transport>> {
    anyhow::bail!("this build has no TDLib backend; rebuild with `--features tdjson`")
}

async fn run(args: Args) -> Result<()> {
    let transport = create_transport()?;
    transport.execute(Function::SetLogVerbosityLevel {
        new_verbosity_level: args.td_verbosity,
    });

    let store = StatusStore::open(&args.db)
        .with_context(|| format!("opening status database at {}", args.db.display()))?;
    info!("status database ready at {}", args.db.display());

    let client = Client::new(transport, store, Arc::new(StdinPrompt), ClientConfig::default());
    client.run().await;

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    info!("shutting down");
    client.shutdown().await;
    Ok(())
}
