use crate::error::App;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Track {
    pub name: String,
    pub url: String,
}

/// Ordered tracks of the currently loaded folder. Replaced wholesale on every load.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Playlist {
    pub tracks: Vec<Track>,
}

impl Playlist {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self { tracks }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn contains_index(&self, index: usize) -> bool {
        index < self.tracks.len()
    }

    pub fn get_track(&self, index: usize) -> Result<&Track, App> {
        self.tracks
            .get(index)
            .ok_or_else(|| App::InvalidInput(format!("Track index {index} out of bounds")))
    }

    pub fn next_index(&self, current: usize) -> Option<usize> {
        let next = current + 1;
        self.contains_index(next).then_some(next)
    }

    pub fn previous_index(&self, current: usize) -> Option<usize> {
        current.checked_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playlist(names: &[&str]) -> Playlist {
        Playlist::new(
            names
                .iter()
                .map(|name| Track {
                    name: (*name).to_string(),
                    url: format!("http://localhost/Songs/{name}"),
                })
                .collect(),
        )
    }

    #[test]
    fn neighbours_stop_at_the_edges() {
        let list = playlist(&["a.mp3", "b.mp3", "c.mp3"]);
        assert_eq!(list.next_index(0), Some(1));
        assert_eq!(list.next_index(2), None);
        assert_eq!(list.previous_index(2), Some(1));
        assert_eq!(list.previous_index(0), None);
    }

    #[test]
    fn out_of_range_track_is_invalid_input() {
        let list = playlist(&["a.mp3"]);
        assert_eq!(list.get_track(0).unwrap().name, "a.mp3");
        assert!(matches!(list.get_track(1), Err(App::InvalidInput(_))));
    }
}
