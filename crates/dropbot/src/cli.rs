use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "dropbot")]
#[command(author, version, about = "Telegram bot that downloads media with yt-dlp and delivers it inline or via Yandex Disk", long_about = None)]
pub struct Cli {
    /// Path to the YAML config file (optional; environment overrides it)
    #[arg(long, global = true, default_value = "config.yaml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run the bot (default)
    Run,

    /// Run one retention sweep over the working directory and exit
    Sweep,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
