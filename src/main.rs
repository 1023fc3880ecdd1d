mod cache;
mod checker;
mod cli;
mod commands;
mod config;
mod constants;
mod metadata;
mod models;
mod providers;
mod report;
mod ui;
mod version;

use checker::Interrupted;
use clap::Parser;
use cli::{CheckArgs, Cli, Commands};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

const EXIT_FAILURE: i32 = 1;
const EXIT_INTERRUPTED: i32 = 130;

fn init_logging(debug: bool, log_file: Option<&Path>) -> anyhow::Result<()> {
    let default_filter = if debug { "debug" } else { "warn" };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter));

    if let Some(path) = log_file {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.try_init()?;
    Ok(())
}

/// First Ctrl-C asks the run to stop at the next mod, a second one exits
fn spawn_interrupt_handler(flag: Arc<AtomicBool>) {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if flag.swap(true, Ordering::SeqCst) {
                std::process::exit(EXIT_INTERRUPTED);
            }
            ui::warning("Interrupt received, stopping after the current mod (Ctrl-C again to quit)");
        }
    });
}

async fn run(cli: Cli, interrupt: Arc<AtomicBool>) -> anyhow::Result<()> {
    let config_path = cli.config.unwrap_or_else(config::config_path);

    match cli
        .command
        .unwrap_or_else(|| Commands::Check(CheckArgs::default()))
    {
        Commands::Check(args) => commands::check::check(&config_path, &args, interrupt).await,
        Commands::Init(args) => commands::init::init(&config_path, args),
        Commands::Cache { action } => commands::cache::cache(&config_path, action),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.debug, cli.log_file.as_deref()) {
        ui::error(&format!("Could not set up logging: {}", e));
        std::process::exit(EXIT_FAILURE);
    }

    let interrupt = Arc::new(AtomicBool::new(false));
    spawn_interrupt_handler(interrupt.clone());

    let code = match run(cli, interrupt).await {
        Ok(()) => 0,
        Err(e) if e.downcast_ref::<Interrupted>().is_some() => {
            ui::warning("Operation cancelled by user");
            EXIT_INTERRUPTED
        }
        Err(e) => {
            ui::error(&format!("{:#}", e));
            EXIT_FAILURE
        }
    };

    std::process::exit(code);
}
