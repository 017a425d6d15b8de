use crate::error::App;
use crate::player::media::MediaElement;
use crate::player::playlist::Playlist;
use crate::sync::message::{Origin, SyncMessage};
use log::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    Idle,
    Playing,
    Paused,
}

impl PlaybackStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PlaybackStatus::Idle => "Idle",
            PlaybackStatus::Playing => "Playing",
            PlaybackStatus::Paused => "Paused",
        }
    }
}

/// Icon shown on the play/pause button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Icon {
    Play,
    Pause,
}

/// What the now-playing bar shows.
#[derive(Debug, Clone, PartialEq)]
pub struct Display {
    pub icon: Icon,
    pub song_info: String,
    pub song_time: String,
    pub progress_percent: f64,
}

impl Default for Display {
    fn default() -> Self {
        Self {
            icon: Icon::Play,
            song_info: String::new(),
            song_time: format!("{} / {}", format_time(f64::NAN), format_time(f64::NAN)),
            progress_percent: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    pub current_index: Option<usize>,
    pub is_playing: bool,
    pub current_time: f64,
    pub duration: f64,
}

pub struct Controller<M: MediaElement> {
    media: M,
    playlist: Playlist,
    current_index: Option<usize>,
    has_source: bool,
    // Set when the last track ran out; the next resume starts it over.
    finished: bool,
    display: Display,
}

impl<M: MediaElement> Controller<M> {
    pub fn new(media: M) -> Self {
        Self {
            media,
            playlist: Playlist::default(),
            current_index: None,
            has_source: false,
            finished: false,
            display: Display::default(),
        }
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn display(&self) -> &Display {
        &self.display
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn status(&self) -> PlaybackStatus {
        if !self.has_source {
            PlaybackStatus::Idle
        } else if self.media.is_paused() {
            PlaybackStatus::Paused
        } else {
            PlaybackStatus::Playing
        }
    }

    pub fn state(&self) -> PlaybackState {
        PlaybackState {
            current_index: self.current_index,
            is_playing: self.status() == PlaybackStatus::Playing,
            current_time: self.media.current_time(),
            duration: self.media.duration(),
        }
    }

    /// Swaps in a freshly loaded playlist and points the index at its head.
    /// The old track stops, so the display never names a song from another folder.
    pub fn replace_playlist(&mut self, playlist: Playlist) -> Result<(), App> {
        info!("Playlist replaced with {} tracks", playlist.len());
        let stopped = if self.has_source && !self.media.is_paused() {
            self.media.pause()
        } else {
            Ok(())
        };
        self.has_source = false;
        self.finished = false;
        self.display = Display::default();
        self.current_index = if playlist.is_empty() { None } else { Some(0) };
        self.playlist = playlist;
        stopped
    }

    pub fn play_at(&mut self, index: usize, origin: Origin) -> Result<Option<SyncMessage>, App> {
        let track = self.playlist.get_track(index)?.clone();

        if !self.media.is_paused() {
            self.media.pause()?;
        }
        self.current_index = Some(index);
        self.media.set_source(&track.url)?;
        self.has_source = true;
        self.finished = false;
        self.media.play()?;

        info!("Playing {} ({:?})", track.name, origin);
        self.display.icon = Icon::Pause;
        self.display.song_info = track.name;
        self.display.progress_percent = 0.0;

        Ok(local(origin, SyncMessage::Skip { index }))
    }

    pub fn toggle_play_pause(&mut self, origin: Origin) -> Result<Option<SyncMessage>, App> {
        match self.status() {
            PlaybackStatus::Playing => {
                self.media.pause()?;
                self.display.icon = Icon::Play;
                Ok(local(origin, SyncMessage::Pause))
            }
            PlaybackStatus::Paused => {
                self.resume()?;
                Ok(local(origin, SyncMessage::Play))
            }
            // Nothing loaded yet: start the track the index points at.
            PlaybackStatus::Idle => match self.current_index {
                Some(index) => self.play_at(index, origin),
                None => Ok(None),
            },
        }
    }

    pub fn next(&mut self, origin: Origin) -> Result<Option<SyncMessage>, App> {
        match self.current_index.and_then(|i| self.playlist.next_index(i)) {
            Some(index) => self.play_at(index, origin),
            None => Ok(None),
        }
    }

    pub fn previous(&mut self, origin: Origin) -> Result<Option<SyncMessage>, App> {
        match self.current_index.and_then(|i| self.playlist.previous_index(i)) {
            Some(index) => self.play_at(index, origin),
            None => Ok(None),
        }
    }

    /// Auto-advance at end of stream. At the end of the list the last track stays
    /// selected and paused, ready to start over.
    pub fn on_ended(&mut self, source: u64) -> Result<(), App> {
        if !self.has_source || source != self.media.source_id() {
            debug!("Ignoring end of stale source {source}");
            return Ok(());
        }
        // Every listener reaches the end on their own, so this is never broadcast.
        if self.next(Origin::Remote)?.is_none() {
            debug!("Reached the end of the playlist");
            self.media.pause()?;
            self.finished = true;
            self.display.icon = Icon::Play;
        }
        Ok(())
    }

    fn resume(&mut self) -> Result<(), App> {
        if self.finished {
            self.media.set_current_time(0.0)?;
            self.finished = false;
        }
        self.media.play()?;
        self.display.icon = Icon::Pause;
        Ok(())
    }

    /// Seeks to `fraction` of the current track's duration.
    pub fn seek(&mut self, fraction: f64, origin: Origin) -> Result<Option<SyncMessage>, App> {
        let duration = self.media.duration();
        if !self.has_source || !duration.is_finite() || fraction.is_nan() {
            return Ok(None);
        }
        let time = fraction.clamp(0.0, 1.0) * duration;
        self.media.set_current_time(time)?;
        self.finished = false;
        Ok(local(origin, SyncMessage::Seek { time }))
    }

    pub fn on_time_update(&mut self) {
        let current = self.media.current_time();
        let total = self.media.duration();
        self.display.song_time = format!("{} / {}", format_time(current), format_time(total));

        let percent = current / total * 100.0;
        if percent.is_finite() {
            self.display.progress_percent = percent.clamp(0.0, 100.0);
        }
    }

    /// Applies a message received from another listener. Never produces a broadcast.
    pub fn apply_remote(&mut self, message: &SyncMessage) -> Result<(), App> {
        debug!("Applying remote {message:?}");
        match *message {
            SyncMessage::Play => {
                if self.status() == PlaybackStatus::Paused {
                    self.resume()?;
                } else {
                    self.display.icon = Icon::Pause;
                }
            }
            SyncMessage::Pause => {
                if self.status() == PlaybackStatus::Playing {
                    self.media.pause()?;
                }
                self.display.icon = Icon::Play;
            }
            SyncMessage::Skip { index } => {
                if self.playlist.contains_index(index) {
                    self.play_at(index, Origin::Remote)?;
                } else {
                    debug!("Ignoring remote skip to missing track {index}");
                }
            }
            SyncMessage::Seek { time } => {
                if self.has_source && time.is_finite() {
                    self.media.set_current_time(time.max(0.0))?;
                    self.finished = false;
                }
            }
        }
        Ok(())
    }
}

fn local(origin: Origin, message: SyncMessage) -> Option<SyncMessage> {
    (origin == Origin::Local).then_some(message)
}

/// Fraction of the seek bar left of a click.
pub fn click_fraction(offset_x: f64, width: f64) -> f64 {
    if width > 0.0 {
        (offset_x / width).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// `m:ss`, or `00:00` while the time is unknown.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() {
        return "00:00".to_string();
    }
    let whole = seconds.max(0.0).floor() as u64;
    format!("{}:{:02}", whole / 60, whole % 60)
}
