use std::{net::SocketAddr, path::PathBuf};

use clap::{Parser, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "aigw", version, about = "Provider-agnostic OpenAI-compatible LLM gateway")]
pub(crate) struct Args {
    /// Listen address, overriding SERVICE_HOST/SERVICE_PORT from the
    /// environment.
    #[arg(short, long)]
    pub listen_address: Option<SocketAddr>,

    /// Log output style.
    #[arg(long, default_value = "color")]
    pub log_style: LogStyle,

    /// Dotenv file to load before reading the environment. Without this
    /// flag a `.env` in the working directory is picked up when present.
    #[arg(long)]
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub(crate) enum LogStyle {
    Color,
    Text,
    Json,
}
