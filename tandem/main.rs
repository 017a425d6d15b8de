mod catalog;
mod config;
mod dbus;
mod error;
mod player;
mod sync;

use crate::config::{config_dir, Config};
use crate::error::App;
use crate::player::{GstMedia, PlayerCommand, Session};
use crate::sync::relay::SyncRelay;
use crate::sync::socket;
use flexi_logger::{Cleanup, Criterion, Duplicate, FileSpec, Logger, Naming};
use log::{error, info, warn};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::{mpsc, watch};
use tokio::task;

#[tokio::main]
async fn main() -> Result<(), App> {
    let base_dir = config_dir()?;
    let log_dir = format!("{base_dir}/logs");
    fs::create_dir_all(&log_dir).await?;

    // Logger setup
    Logger::try_with_env_or_str("info")?
        .log_to_file(FileSpec::default().directory(&log_dir))
        .rotate(
            Criterion::Size(1_000_000),
            Naming::Timestamps,
            Cleanup::KeepLogFiles(3),
        )
        .duplicate_to_stderr(Duplicate::Warn)
        .start()?;

    let config = Arc::new(Config::load_or_create(&format!("{base_dir}/config.toml")).await?);

    let (command_sender, command_receiver) = mpsc::channel(16);
    let (media_sender, media_receiver) = mpsc::channel(4);
    let (inbound_sender, inbound_receiver) = mpsc::channel(64);
    let (stop_sender, stop_receiver) = watch::channel(());

    let relay = if config.relay.enabled {
        let outbound = match socket::connect(&config.relay.url, inbound_sender).await {
            Ok(outbound) => Some(outbound),
            Err(e) => {
                warn!("Listen Together unavailable: {e}");
                None
            }
        };
        SyncRelay::new(outbound, config.relay.listen_together)
    } else {
        info!("Running without Listen Together");
        drop(inbound_sender);
        SyncRelay::baseline()
    };

    let media = GstMedia::new(media_sender)?;
    let session = Session::new(media, relay, Arc::clone(&config));
    let player = task::spawn(session.run(command_receiver, media_receiver, inbound_receiver));

    task::spawn({
        let command_sender = command_sender.clone();
        let stop_sender = stop_sender.clone();
        async move {
            if let Err(e) = dbus::run_dbus_server(command_sender, stop_sender).await {
                error!("DBus server error: {e}");
            }
        }
    });

    wait_for_stop_signal(stop_receiver).await;
    let _ = command_sender.send(PlayerCommand::Stop).await;
    let _ = stop_sender.send(());
    player.await?;
    info!("Tandem stopped");
    Ok(())
}

async fn wait_for_stop_signal(mut stop_receiver: watch::Receiver<()>) {
    tokio::select! {
        _ = stop_receiver.changed() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted");
        }
    }
}
