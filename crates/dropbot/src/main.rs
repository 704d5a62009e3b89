use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;
use teloxide::prelude::*;
use tokio_util::sync::CancellationToken;

use dropbot::cli::{Cli, Commands};
use dropbot::telegram::{create_bot, schema, setup_bot_commands, HandlerDeps};
use dropcore::config::log_file_path;
use dropcore::{init_logger, log_startup_configuration, CleanupScheduler, Pipeline, Settings};

/// Main entry point for the Telegram bot
///
/// Parses CLI arguments and dispatches to the selected subcommand.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Log panics from handler tasks instead of losing them
    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic caught: {:?}", panic_info);
        if let Some(location) = panic_info.location() {
            log::error!("Panic at {}:{}:{}", location.file(), location.line(), location.column());
        }
        if let Some(msg) = panic_info.payload().downcast_ref::<&str>() {
            log::error!("Panic message: {}", msg);
        }
    }));

    // Initialize logger (console + file)
    init_logger(&log_file_path())?;

    // Load environment variables from .env if present
    let _ = dotenv();

    let settings = Settings::load(&cli.config)?;
    settings.validate()?;
    let settings = Arc::new(settings);

    match cli.command {
        Some(Commands::Run) => run_bot(settings).await,
        Some(Commands::Sweep) => run_sweep(&settings).await,
        None => {
            log::info!("No command specified, running bot in default mode");
            run_bot(settings).await
        }
    }
}

/// One-off retention sweep
async fn run_sweep(settings: &Settings) -> Result<()> {
    let scheduler = CleanupScheduler::from_settings(settings);
    log::info!(
        "Sweeping {} (retention {}s)",
        scheduler.dir().display(),
        scheduler.retention().as_secs()
    );

    let report = scheduler.sweep().await?;
    println!(
        "scanned: {}, deleted: {}, failed: {}",
        report.scanned, report.deleted, report.failed
    );
    Ok(())
}

async fn run_bot(settings: Arc<Settings>) -> Result<()> {
    log::info!("Starting bot...");
    log_startup_configuration(&settings);

    if settings.telegram.token.is_empty() {
        anyhow::bail!("Telegram token is not set (telegram.token, BOT_TOKEN or TELOXIDE_TOKEN)");
    }

    let work_dir = settings.download_dir();
    tokio::fs::create_dir_all(&work_dir).await?;

    let shutdown = CancellationToken::new();

    // Started exactly once; lives until shutdown
    let cleanup = CleanupScheduler::from_settings(&settings);
    let cleanup_handle = cleanup.clone().spawn(shutdown.clone());

    let pipeline = Arc::new(Pipeline::from_settings(&settings)?);

    let bot = create_bot(&settings.telegram)?;
    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to set bot commands: {}", e);
    }

    let deps = HandlerDeps::new(pipeline, cleanup);

    Dispatcher::builder(bot, schema(deps))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    log::info!("Dispatcher shutdown gracefully");
    shutdown.cancel();
    if let Err(e) = cleanup_handle.await {
        log::warn!("Cleanup scheduler task ended abnormally: {}", e);
    }

    Ok(())
}
