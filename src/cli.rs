// CLI module for handling command-line interface

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "nyxpatcher")]
#[command(version)]
#[command(about = "Check Minecraft mods for updates on Modrinth and CurseForge")]
pub struct Cli {
    /// Enable debug output
    #[arg(long, global = true)]
    pub debug: bool,

    /// Write log records to this file instead of stderr
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Path to the configuration file (default: $NYX_DIR/config.json)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check installed mods for updates (default)
    Check(CheckArgs),
    /// Write a default configuration file
    Init(InitArgs),
    /// Inspect or maintain the resolution cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Args, Default)]
pub struct CheckArgs {
    /// Force update check, ignoring cache
    #[arg(long)]
    pub force: bool,

    /// Simulate downloads without transferring anything
    #[arg(long)]
    pub dry_run: bool,

    /// Run without interactive prompts, skipping downloads (wins over --download-all)
    #[arg(long)]
    pub no_interaction: bool,

    /// Download all available updates without prompting
    #[arg(long)]
    pub download_all: bool,
}

#[derive(Args)]
pub struct InitArgs {
    #[arg(long, value_name = "VERSION")]
    pub minecraft_version: Option<String>,

    /// fabric, forge or quilt
    #[arg(long)]
    pub loader: Option<String>,

    /// Mod directory to scan (repeatable)
    #[arg(long = "mods-dir", value_name = "DIR")]
    pub mods_dirs: Vec<String>,

    #[arg(long)]
    pub provider: Option<String>,

    #[arg(long)]
    pub fallback_provider: Option<String>,

    #[arg(long, value_name = "KEY")]
    pub curseforge_api_key: Option<String>,
}

#[derive(Subcommand)]
pub enum CacheAction {
    /// Show cache entry counts and scan age
    Status,
    /// Drop cached versions older than the given age
    Prune {
        #[arg(long, value_name = "N")]
        max_age_days: Option<u64>,
    },
    /// Reset the cache
    Clear,
}
