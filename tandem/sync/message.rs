use serde::{Deserialize, Serialize};

/// Playback event exchanged between listen-together peers.
///
/// On the wire this is a JSON object tagged by `type`, e.g. `{"type":"skip","index":2}`.
/// `time` is absolute seconds, not a fraction of the duration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SyncMessage {
    Play,
    Pause,
    Skip { index: usize },
    Seek { time: f64 },
}

/// Where a playback mutation came from. Only local mutations are broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Local,
    Remote,
}

impl SyncMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_format_is_flat_and_tagged() {
        assert_eq!(SyncMessage::Play.to_json().unwrap(), r#"{"type":"play"}"#);
        assert_eq!(
            SyncMessage::Skip { index: 3 }.to_json().unwrap(),
            r#"{"type":"skip","index":3}"#
        );
        assert_eq!(
            SyncMessage::Seek { time: 42.5 }.to_json().unwrap(),
            r#"{"type":"seek","time":42.5}"#
        );
    }

    #[test]
    fn parses_frames_from_browser_peers() {
        assert_eq!(
            SyncMessage::from_json(r#"{"type":"pause"}"#).unwrap(),
            SyncMessage::Pause
        );
        assert_eq!(
            SyncMessage::from_json(r#"{"index":0,"type":"skip"}"#).unwrap(),
            SyncMessage::Skip { index: 0 }
        );
        // Browsers send whole-second positions as integers.
        assert_eq!(
            SyncMessage::from_json(r#"{"type":"seek","time":12}"#).unwrap(),
            SyncMessage::Seek { time: 12.0 }
        );
    }

    #[test]
    fn rejects_unknown_or_incomplete_frames() {
        assert!(SyncMessage::from_json(r#"{"type":"rewind"}"#).is_err());
        assert!(SyncMessage::from_json(r#"{"type":"skip"}"#).is_err());
        assert!(SyncMessage::from_json("not json").is_err());
    }
}
