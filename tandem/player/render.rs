use crate::player::playlist::Playlist;
use std::time::Duration;

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
const REVEAL_STEP: Duration = Duration::from_millis(100);

/// One row of the playlist view. Clicking it plays `index`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistEntry {
    pub index: usize,
    pub name: String,
    pub artist: String,
    pub reveal_delay: Duration,
}

pub fn render(playlist: &Playlist) -> Vec<PlaylistEntry> {
    playlist
        .tracks
        .iter()
        .enumerate()
        .map(|(index, track)| PlaylistEntry {
            index,
            name: track.name.clone(),
            artist: UNKNOWN_ARTIST.to_string(),
            reveal_delay: reveal_delay(index),
        })
        .collect()
}

pub fn reveal_delay(index: usize) -> Duration {
    REVEAL_STEP.saturating_mul(u32::try_from(index).unwrap_or(u32::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::controller::tests::abc;

    #[test]
    fn one_entry_per_track_in_order() {
        let entries = render(&abc());
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["A.mp3", "B.mp3", "C.mp3"]);
        assert!(entries.iter().all(|e| e.artist == UNKNOWN_ARTIST));
        assert_eq!(entries[2].index, 2);
    }

    #[test]
    fn reveal_is_staggered_by_index() {
        let entries = render(&abc());
        assert_eq!(entries[0].reveal_delay, Duration::ZERO);
        assert_eq!(entries[1].reveal_delay, Duration::from_millis(100));
        assert_eq!(entries[2].reveal_delay, Duration::from_millis(200));
    }

    #[test]
    fn empty_playlist_renders_nothing() {
        assert!(render(&Playlist::default()).is_empty());
    }
}
