use serde::Deserialize;

use crate::error::RefreshError;

/// Message shown in place of the card whenever a poll fails.
pub const FETCH_ERROR_MESSAGE: &str = "Error fetching Spotify data";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NowPlaying {
    pub album: String,
    pub album_image_url: String,
    pub artist: String,
    pub is_playing: bool,
    pub song_url: String,
    pub title: String,
}

/// Payload as it arrives on the wire. Track fields may be absent when nothing is playing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNowPlaying {
    album: Option<String>,
    album_image_url: Option<String>,
    artist: Option<String>,
    is_playing: bool,
    song_url: Option<String>,
    title: Option<String>,
}

impl NowPlaying {
    /// Decode an API response body.
    pub fn from_json(body: &[u8]) -> Result<Self, RefreshError> {
        let raw: RawNowPlaying = serde_json::from_slice(body)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawNowPlaying) -> Result<Self, RefreshError> {
        let playing = raw.is_playing;
        let field = |value: Option<String>, name: &'static str| match value {
            Some(v) => Ok(v),
            None if playing => Err(RefreshError::MissingField(name)),
            None => Ok(String::new()),
        };

        Ok(Self {
            album: field(raw.album, "album")?,
            album_image_url: field(raw.album_image_url, "albumImageUrl")?,
            artist: field(raw.artist, "artist")?,
            is_playing: playing,
            song_url: field(raw.song_url, "songUrl")?,
            title: field(raw.title, "title")?,
        })
    }
}

/// View state of the widget. Exactly one of these holds at any time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WidgetState {
    /// Before the first poll resolves
    #[default]
    Loading,
    Error(String),
    Ready(NowPlaying),
}

impl WidgetState {
    /// State after a poll resolves. Failures collapse to one generic message.
    pub fn from_poll(result: &Result<NowPlaying, RefreshError>) -> Self {
        match result {
            Ok(track) => WidgetState::Ready(track.clone()),
            Err(_) => WidgetState::Error(FETCH_ERROR_MESSAGE.to_string()),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, WidgetState::Loading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decodes_playing_payload() {
        let body = br#"{"isPlaying":true,"title":"A","artist":"B","album":"C","albumImageUrl":"http://x/y.png","songUrl":"http://open.spotify.com/track/1"}"#;
        let track = NowPlaying::from_json(body).unwrap();
        assert_eq!(
            track,
            NowPlaying {
                album: "C".into(),
                album_image_url: "http://x/y.png".into(),
                artist: "B".into(),
                is_playing: true,
                song_url: "http://open.spotify.com/track/1".into(),
                title: "A".into(),
            }
        );
    }

    #[test]
    fn not_playing_payload_may_omit_track_fields() {
        let track = NowPlaying::from_json(br#"{"isPlaying":false}"#).unwrap();
        assert!(!track.is_playing);
        assert!(track.title.is_empty());
        assert!(track.song_url.is_empty());
    }

    #[test]
    fn playing_payload_requires_track_fields() {
        let err = NowPlaying::from_json(br#"{"isPlaying":true,"title":"A"}"#).unwrap_err();
        assert!(matches!(err, RefreshError::MissingField("album")));
    }

    #[test]
    fn malformed_body_is_a_decode_failure() {
        let err = NowPlaying::from_json(b"<html>oops</html>").unwrap_err();
        assert!(matches!(err, RefreshError::Decode(_)));

        let err = NowPlaying::from_json(br#"{"title":"A"}"#).unwrap_err();
        assert!(matches!(err, RefreshError::Decode(_)));
    }

    #[test]
    fn failed_poll_uses_generic_message() {
        let state = WidgetState::from_poll(&Err(RefreshError::Status(
            reqwest::StatusCode::INTERNAL_SERVER_ERROR,
        )));
        assert_eq!(state, WidgetState::Error(FETCH_ERROR_MESSAGE.to_string()));
        assert!(!state.is_loading());
    }
}
