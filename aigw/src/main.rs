use std::{net::ToSocketAddrs, sync::Arc};

use anyhow::{Context, anyhow};
use clap::Parser;
use config::Settings;
use server::ServeConfig;

mod args;
mod logger;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = args::Args::parse();

    match &args.env_file {
        Some(path) => {
            dotenvy::from_path(path).with_context(|| format!("failed to load env file {}", path.display()))?;
        }
        None => {
            // A .env in the working directory is a development convenience;
            // its absence is not an error.
            let _ = dotenvy::dotenv();
        }
    }

    let settings = match Settings::from_env() {
        Ok(settings) => Arc::new(settings),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    logger::init(&settings, args.log_style);

    let listen_address = match args.listen_address {
        Some(address) => address,
        None => format!("{}:{}", settings.host, settings.port)
            .to_socket_addrs()
            .context("failed to resolve SERVICE_HOST/SERVICE_PORT")?
            .next()
            .ok_or_else(|| anyhow!("SERVICE_HOST/SERVICE_PORT did not resolve to an address"))?,
    };

    if let Err(e) = server::serve(ServeConfig { listen_address, settings }).await {
        log::error!("server failed to start: {e}");
        std::process::exit(1);
    }

    Ok(())
}
