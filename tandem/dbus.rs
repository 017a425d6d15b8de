use log::info;
use tokio::sync::{mpsc, oneshot, watch};
use zbus::{fdo, interface, ConnectionBuilder};

use crate::player::controller::click_fraction;
use crate::player::PlayerCommand;

#[derive(Clone)]
pub struct PlayerDBus {
    tx: mpsc::Sender<PlayerCommand>,
    stop_signal: watch::Sender<()>,
}

impl PlayerDBus {
    async fn send(&self, command: PlayerCommand) -> fdo::Result<()> {
        self.tx
            .send(command)
            .await
            .map_err(|_| fdo::Error::Failed("Player is not running".into()))
    }

    async fn ask<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> PlayerCommand,
    ) -> fdo::Result<T> {
        let (reply, answer) = oneshot::channel();
        self.send(command(reply)).await?;
        answer
            .await
            .map_err(|_| fdo::Error::Failed("Player dropped the request".into()))
    }
}

#[interface(name = "org.tandem.Player")]
impl PlayerDBus {
    async fn test_connection(&self) -> fdo::Result<()> {
        Ok(())
    }

    async fn toggle_play_pause(&self) -> fdo::Result<()> {
        self.send(PlayerCommand::TogglePlayPause).await
    }

    async fn play_index(&self, index: u32) -> fdo::Result<()> {
        let index = usize::try_from(index)
            .map_err(|_| fdo::Error::InvalidArgs("Index too large".into()))?;
        self.send(PlayerCommand::PlayIndex(index)).await
    }

    async fn next(&self) -> fdo::Result<()> {
        self.send(PlayerCommand::Next).await
    }

    async fn previous(&self) -> fdo::Result<()> {
        self.send(PlayerCommand::Previous).await
    }

    /// A click `offset_x` pixels into a seek bar `width` pixels wide.
    async fn seek(&self, offset_x: f64, width: f64) -> fdo::Result<()> {
        if width <= 0.0 || !(0.0..=width).contains(&offset_x) {
            return Err(fdo::Error::InvalidArgs(
                "Seek click must land inside the bar".into(),
            ));
        }
        self.send(PlayerCommand::Seek(click_fraction(offset_x, width)))
            .await
    }

    async fn load_folder(&self, folder: String, autoplay: bool) -> fdo::Result<()> {
        self.send(PlayerCommand::LoadFolder { folder, autoplay })
            .await
    }

    async fn toggle_listen_together(&self) -> fdo::Result<bool> {
        self.ask(PlayerCommand::ToggleListenTogether).await
    }

    /// `(name, artist, index, reveal delay in ms)` per entry.
    async fn playlist(&self) -> fdo::Result<Vec<(String, String, u32, u32)>> {
        let entries = self.ask(PlayerCommand::Playlist).await?;
        Ok(entries
            .into_iter()
            .map(|entry| {
                (
                    entry.name,
                    entry.artist,
                    u32::try_from(entry.index).unwrap_or(u32::MAX),
                    u32::try_from(entry.reveal_delay.as_millis()).unwrap_or(u32::MAX),
                )
            })
            .collect())
    }

    /// `(status, song, time, progress percent, listen together, track number, track count)`.
    /// The track number is 1-based, 0 when nothing is selected.
    async fn status(&self) -> fdo::Result<(String, String, String, f64, bool, u32, u32)> {
        let report = self.ask(PlayerCommand::Status).await?;
        let track = report.state.current_index.map_or(0, |index| index + 1);
        Ok((
            report.status.as_str().to_string(),
            report.song,
            report.time,
            report.progress_percent,
            report.listen_together,
            u32::try_from(track).unwrap_or(u32::MAX),
            u32::try_from(report.track_count).unwrap_or(u32::MAX),
        ))
    }

    async fn stop(&self) -> fdo::Result<()> {
        self.send(PlayerCommand::Stop).await?;
        self.stop_signal
            .send(())
            .map_err(|_| fdo::Error::Failed("Nobody is waiting for stop".into()))
    }
}

pub async fn run_dbus_server(
    command_sender: mpsc::Sender<PlayerCommand>,
    stop_signal: watch::Sender<()>,
) -> Result<(), zbus::Error> {
    let player_dbus = PlayerDBus {
        tx: command_sender,
        stop_signal: stop_signal.clone(),
    };

    let _connection = ConnectionBuilder::session()?
        .name("org.tandem.Player")?
        .serve_at("/org/tandem/Player", player_dbus)?
        .build()
        .await?;

    let mut stop_receiver = stop_signal.subscribe();

    // Wait for the stop signal
    tokio::select! {
        _ = stop_receiver.changed() => {
            info!("Stop signal received, shutting down DBus server...");
        }
    }

    Ok(())
}
