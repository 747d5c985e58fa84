use clap::Parser;
use cli::Cli;
use color_eyre::{eyre::eyre, Result};

use crate::{
    config::{pathconfig::PathConfig, Config},
    discordclient::DiscordClient,
    mpvclient::MpvClient,
    syncworker::SyncWorker,
};

mod activitybuilder;
mod cli;
mod config;
mod discordclient;
mod errors;
mod ipcerror;
mod logging;
mod mpvclient;
mod syncworker;

#[tokio::main]
async fn main() -> Result<()> {
    crate::errors::init()?;

    let args = Cli::parse();
    if let Some(msg) = args.is_valid() {
        return Err(eyre!(msg));
    }

    let paths = PathConfig::new(
        args.data.clone(),
        args.no_data,
        args.config.clone(),
        args.no_config,
    );
    crate::logging::init(paths.data.as_deref())?;

    let mut config = Config::new(&paths)?;
    config.apply_args(args.socket, args.client_id);
    if let Some(msg) = config.is_valid() {
        return Err(eyre!(msg));
    }

    let worker = SyncWorker::new(
        MpvClient::new(),
        config.player.socket.clone(),
        DiscordClient::new(config.presence.client_id.clone()),
        config.sync.interval(),
        config.presence.retry_interval(),
    );
    worker.run().await?;
    Ok(())
}
