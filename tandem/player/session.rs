use crate::catalog;
use crate::config::Config;
use crate::error::App;
use crate::player::controller::{Controller, PlaybackState, PlaybackStatus};
use crate::player::media::{MediaElement, MediaEvent};
use crate::player::playlist::Playlist;
use crate::player::render::{render, PlaylistEntry};
use crate::sync::message::{Origin, SyncMessage};
use crate::sync::relay::SyncRelay;
use log::{error, info};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task;

const TIME_UPDATE_PERIOD: Duration = Duration::from_millis(250);

pub enum PlayerCommand {
    TogglePlayPause,
    PlayIndex(usize),
    Next,
    Previous,
    Seek(f64),
    LoadFolder { folder: String, autoplay: bool },
    ToggleListenTogether(oneshot::Sender<bool>),
    Playlist(oneshot::Sender<Vec<PlaylistEntry>>),
    Status(oneshot::Sender<StatusReport>),
    Stop,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub status: PlaybackStatus,
    pub song: String,
    pub time: String,
    pub progress_percent: f64,
    pub listen_together: bool,
    pub state: PlaybackState,
    pub track_count: usize,
}

struct LoadedFolder {
    folder: String,
    playlist: Playlist,
    autoplay: bool,
}

/// Owns the controller and the relay; every input is handled here, one at a time.
pub struct Session<M: MediaElement> {
    controller: Controller<M>,
    relay: SyncRelay,
    client: Client,
    config: Arc<Config>,
}

impl<M: MediaElement> Session<M> {
    pub fn new(media: M, relay: SyncRelay, config: Arc<Config>) -> Self {
        Self {
            controller: Controller::new(media),
            relay,
            client: Client::new(),
            config,
        }
    }

    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<PlayerCommand>,
        mut media_events: mpsc::Receiver<MediaEvent>,
        mut inbound: mpsc::Receiver<SyncMessage>,
    ) {
        let (loaded_sender, mut loaded) = mpsc::channel::<LoadedFolder>(4);
        let mut ticker = tokio::time::interval(TIME_UPDATE_PERIOD);

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(PlayerCommand::Stop) | None => {
                        let state = self.controller.state();
                        info!(
                            "Player session stopping at track {:?}, {:.1}s of {:.1}s (playing: {})",
                            state.current_index,
                            state.current_time,
                            state.duration,
                            state.is_playing
                        );
                        break;
                    }
                    Some(command) => self.handle_command(command, &loaded_sender),
                },
                Some(MediaEvent::Ended { source }) = media_events.recv() => {
                    info!("Track finished playing");
                    if let Err(e) = self.controller.on_ended(source) {
                        error!("Failed to advance after end of track: {e}");
                    }
                }
                Some(message) = inbound.recv() => {
                    if let Err(e) = self.controller.apply_remote(&message) {
                        error!("Failed to apply remote {message:?}: {e}");
                    }
                }
                Some(done) = loaded.recv() => self.finish_load(done),
                _ = ticker.tick() => {
                    if self.controller.status() == PlaybackStatus::Playing {
                        self.controller.on_time_update();
                    }
                }
            }
        }
    }

    fn handle_command(
        &mut self,
        command: PlayerCommand,
        loaded_sender: &mpsc::Sender<LoadedFolder>,
    ) {
        let result = match command {
            PlayerCommand::TogglePlayPause => self.local(|c| c.toggle_play_pause(Origin::Local)),
            PlayerCommand::PlayIndex(index) => self.local(|c| c.play_at(index, Origin::Local)),
            PlayerCommand::Next => self.local(|c| c.next(Origin::Local)),
            PlayerCommand::Previous => self.local(|c| c.previous(Origin::Local)),
            PlayerCommand::Seek(fraction) => self.local(|c| c.seek(fraction, Origin::Local)),
            PlayerCommand::LoadFolder { folder, autoplay } => {
                self.start_load(folder, autoplay, loaded_sender.clone());
                Ok(())
            }
            PlayerCommand::ToggleListenTogether(reply) => {
                let _ = reply.send(self.relay.toggle());
                Ok(())
            }
            PlayerCommand::Playlist(reply) => {
                let _ = reply.send(render(self.controller.playlist()));
                Ok(())
            }
            PlayerCommand::Status(reply) => {
                let _ = reply.send(self.status_report());
                Ok(())
            }
            PlayerCommand::Stop => Ok(()),
        };
        if let Err(e) = result {
            error!("Player command failed: {e}");
        }
    }

    /// Runs a local action and broadcasts whatever it reports.
    fn local(
        &mut self,
        action: impl FnOnce(&mut Controller<M>) -> Result<Option<SyncMessage>, App>,
    ) -> Result<(), App> {
        if let Some(message) = action(&mut self.controller)? {
            self.relay.broadcast(message)?;
        }
        Ok(())
    }

    // Loads are not cancelled; whichever finishes last replaces the playlist.
    fn start_load(
        &self,
        folder: String,
        autoplay: bool,
        loaded_sender: mpsc::Sender<LoadedFolder>,
    ) {
        let client = self.client.clone();
        let config = Arc::clone(&self.config);
        task::spawn(async move {
            let playlist = catalog::load_folder(&client, &config, &folder).await;
            let done = LoadedFolder {
                folder,
                playlist,
                autoplay,
            };
            if loaded_sender.send(done).await.is_err() {
                error!("Player session is gone, dropping loaded folder");
            }
        });
    }

    fn finish_load(&mut self, done: LoadedFolder) {
        info!("Folder {} ready", done.folder);
        if let Err(e) = self.controller.replace_playlist(done.playlist) {
            error!("Failed to stop the previous track: {e}");
        }
        if done.autoplay && !self.controller.playlist().is_empty() {
            if let Err(e) = self.local(|c| c.play_at(0, Origin::Local)) {
                error!("Failed to start folder {}: {e}", done.folder);
            }
        }
    }

    fn status_report(&self) -> StatusReport {
        let display = self.controller.display();
        StatusReport {
            status: self.controller.status(),
            song: display.song_info.clone(),
            time: display.song_time.clone(),
            progress_percent: display.progress_percent,
            listen_together: self.relay.is_active(),
            state: self.controller.state(),
            track_count: self.controller.playlist().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::controller::tests::FakeMedia;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::time::timeout;

    struct Harness {
        commands: mpsc::Sender<PlayerCommand>,
        media_events: mpsc::Sender<MediaEvent>,
        inbound: mpsc::Sender<SyncMessage>,
        outbound: mpsc::UnboundedReceiver<SyncMessage>,
    }

    async fn listing_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 2048];
                let _ = socket.read(&mut buf).await;
                let body = r#"<a href="a.mp3">a</a><a href="b.mp3">b</a><a href="c.mp3">c</a>"#;
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{addr}")
    }

    async fn start(listen_together: bool) -> Harness {
        let config = Config {
            server: listing_server().await,
            fade_delay_ms: 0,
            ..Config::default()
        };
        let (outbound_sender, outbound) = mpsc::unbounded_channel();
        let relay = SyncRelay::new(Some(outbound_sender), listen_together);
        let session = Session::new(FakeMedia::new(), relay, Arc::new(config));

        let (commands, command_receiver) = mpsc::channel(8);
        let (media_events, media_receiver) = mpsc::channel(8);
        let (inbound, inbound_receiver) = mpsc::channel(8);
        tokio::spawn(session.run(command_receiver, media_receiver, inbound_receiver));

        Harness {
            commands,
            media_events,
            inbound,
            outbound,
        }
    }

    async fn status(harness: &Harness) -> StatusReport {
        let (reply, answer) = oneshot::channel();
        harness.commands.send(PlayerCommand::Status(reply)).await.unwrap();
        answer.await.unwrap()
    }

    async fn next_outbound(harness: &mut Harness) -> SyncMessage {
        timeout(Duration::from_secs(5), harness.outbound.recv())
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn load_with_autoplay_starts_first_track_and_broadcasts() {
        let mut harness = start(true).await;
        harness
            .commands
            .send(PlayerCommand::LoadFolder {
                folder: "mix".to_string(),
                autoplay: true,
            })
            .await
            .unwrap();
        assert_eq!(next_outbound(&mut harness).await, SyncMessage::Skip { index: 0 });

        let report = status(&harness).await;
        assert_eq!(report.status, PlaybackStatus::Playing);
        assert_eq!(report.song, "a.mp3");
        assert!(report.listen_together);

        let (reply, answer) = oneshot::channel();
        harness.commands.send(PlayerCommand::Playlist(reply)).await.unwrap();
        assert_eq!(answer.await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn remote_messages_apply_even_when_inactive() {
        let mut harness = start(false).await;
        harness
            .commands
            .send(PlayerCommand::LoadFolder {
                folder: "mix".to_string(),
                autoplay: false,
            })
            .await
            .unwrap();

        let mut report = status(&harness).await;
        for _ in 0..50 {
            harness.inbound.send(SyncMessage::Skip { index: 2 }).await.unwrap();
            report = status(&harness).await;
            if report.song == "c.mp3" {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(report.song, "c.mp3");

        harness.commands.send(PlayerCommand::Next).await.unwrap();
        let report = status(&harness).await;
        assert_eq!(report.song, "c.mp3");
        assert!(harness.outbound.try_recv().is_err());
    }

    #[tokio::test]
    async fn end_of_an_earlier_source_does_not_skip_the_chosen_track() {
        let mut harness = start(true).await;
        harness
            .commands
            .send(PlayerCommand::LoadFolder {
                folder: "mix".to_string(),
                autoplay: true,
            })
            .await
            .unwrap();
        assert_eq!(next_outbound(&mut harness).await, SyncMessage::Skip { index: 0 });
        harness.commands.send(PlayerCommand::PlayIndex(1)).await.unwrap();
        assert_eq!(next_outbound(&mut harness).await, SyncMessage::Skip { index: 1 });

        // Sources are numbered per load: a.mp3 was 1, b.mp3 is 2.
        harness.media_events.send(MediaEvent::Ended { source: 1 }).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        let report = status(&harness).await;
        assert_eq!(report.song, "b.mp3");
        assert_eq!(report.state.current_index, Some(1));

        harness.media_events.send(MediaEvent::Ended { source: 2 }).await.unwrap();
        let mut report = status(&harness).await;
        for _ in 0..50 {
            if report.song == "c.mp3" {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
            report = status(&harness).await;
        }
        assert_eq!(report.song, "c.mp3");
        assert!(harness.outbound.try_recv().is_err());
    }

    #[tokio::test]
    async fn toggling_listen_together_gates_broadcasts() {
        let mut harness = start(false).await;
        harness
            .commands
            .send(PlayerCommand::LoadFolder {
                folder: "mix".to_string(),
                autoplay: true,
            })
            .await
            .unwrap();
        for _ in 0..50 {
            if status(&harness).await.status == PlaybackStatus::Playing {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(harness.outbound.try_recv().is_err());

        let (reply, answer) = oneshot::channel();
        harness
            .commands
            .send(PlayerCommand::ToggleListenTogether(reply))
            .await
            .unwrap();
        assert!(answer.await.unwrap());

        harness.commands.send(PlayerCommand::TogglePlayPause).await.unwrap();
        assert_eq!(next_outbound(&mut harness).await, SyncMessage::Pause);
    }
}
