use std::fmt;
use std::time::Instant;

use crate::bars::{generate_bars, Bar};
use crate::types::{NowPlaying, WidgetState};

pub const NOT_PLAYING_MESSAGE: &str = "Not currently playing";
const ARTIST_SEARCH_BASE: &str = "https://open.spotify.com/search/";

/// Characters a browser's `encodeURIComponent` leaves as-is but `urlencoding` escapes.
const URI_COMPONENT_SAFE: [(&str, &str); 5] =
    [("%21", "!"), ("%27", "'"), ("%28", "("), ("%29", ")"), ("%2A", "*")];

/// Search link for an artist name, percent-encoded like `encodeURIComponent`.
pub fn artist_search_url(artist: &str) -> String {
    let mut encoded = urlencoding::encode(artist).into_owned();
    for (escaped, raw) in URI_COMPONENT_SAFE {
        encoded = encoded.replace(escaped, raw);
    }
    format!("{}{}", ARTIST_SEARCH_BASE, encoded)
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackCard {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub cover_url: String,
    pub cover_alt: String,
    pub song_url: String,
    pub artist_search_url: String,
    pub bars: Vec<Bar>,
}

impl TrackCard {
    fn from_track(track: &NowPlaying) -> Self {
        Self {
            title: track.title.clone(),
            artist: track.artist.clone(),
            album: track.album.clone(),
            cover_url: track.album_image_url.clone(),
            cover_alt: format!("{} cover", track.album),
            song_url: track.song_url.clone(),
            artist_search_url: artist_search_url(&track.artist),
            bars: generate_bars(),
        }
    }
}

/// What the card shows for a given widget state.
#[derive(Debug, Clone, PartialEq)]
pub enum CardView {
    Loading,
    Error { message: String },
    NotPlaying,
    Playing(TrackCard),
}

impl CardView {
    /// Loading wins over everything, then an error, then the `is_playing` flag.
    pub fn render(state: &WidgetState) -> Self {
        match state {
            WidgetState::Loading => CardView::Loading,
            WidgetState::Error(message) => CardView::Error {
                message: message.clone(),
            },
            WidgetState::Ready(track) if !track.is_playing => CardView::NotPlaying,
            WidgetState::Ready(track) => CardView::Playing(TrackCard::from_track(track)),
        }
    }

    pub fn track(&self) -> Option<&TrackCard> {
        match self {
            CardView::Playing(card) => Some(card),
            _ => None,
        }
    }
}

impl fmt::Display for CardView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardView::Loading => write!(f, "Loading..."),
            CardView::Error { message } => write!(f, "{}", message),
            CardView::NotPlaying => write!(f, "{}", NOT_PLAYING_MESSAGE),
            CardView::Playing(card) => {
                write!(f, "{} - {} ({}) <{}>", card.title, card.artist, card.album, card.song_url)
            }
        }
    }
}

/// A rendered card and when it was mounted. Bar animation is timed from `mounted_at`.
#[derive(Debug, Clone)]
pub struct Widget {
    pub view: CardView,
    pub mounted_at: Instant,
}

impl Widget {
    pub fn mount(state: &WidgetState) -> Self {
        Self {
            view: CardView::render(state),
            mounted_at: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.mounted_at.elapsed().as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bars::BAR_COUNT;
    use crate::types::FETCH_ERROR_MESSAGE;
    use pretty_assertions::assert_eq;

    fn track(is_playing: bool) -> NowPlaying {
        NowPlaying {
            album: "C".into(),
            album_image_url: "http://x/y.png".into(),
            artist: "B".into(),
            is_playing,
            song_url: "http://open.spotify.com/track/1".into(),
            title: "A".into(),
        }
    }

    #[test]
    fn ready_and_playing_shows_track_fields() {
        let view = CardView::render(&WidgetState::Ready(track(true)));
        let card = view.track().expect("playing card");

        assert_eq!(card.title, "A");
        assert_eq!(card.artist, "B");
        assert_eq!(card.album, "C");
        assert_eq!(card.cover_url, "http://x/y.png");
        assert_eq!(card.cover_alt, "C cover");
        assert_eq!(card.song_url, "http://open.spotify.com/track/1");
        assert_eq!(card.artist_search_url, "https://open.spotify.com/search/B");
        assert_eq!(card.bars.len(), BAR_COUNT);
    }

    #[test]
    fn not_playing_hides_track_details() {
        let view = CardView::render(&WidgetState::Ready(track(false)));
        assert_eq!(view, CardView::NotPlaying);
        assert_eq!(view.to_string(), "Not currently playing");
        assert!(view.track().is_none());
    }

    #[test]
    fn error_takes_priority() {
        let view = CardView::render(&WidgetState::Error(FETCH_ERROR_MESSAGE.into()));
        assert_eq!(
            view,
            CardView::Error {
                message: FETCH_ERROR_MESSAGE.into()
            }
        );
        assert_eq!(view.to_string(), FETCH_ERROR_MESSAGE);
    }

    #[test]
    fn loading_renders_spinner_state() {
        assert_eq!(CardView::render(&WidgetState::Loading), CardView::Loading);
    }

    #[test]
    fn artist_search_is_percent_encoded() {
        assert_eq!(
            artist_search_url("Simon & Garfunkel"),
            "https://open.spotify.com/search/Simon%20%26%20Garfunkel"
        );
        assert_eq!(
            artist_search_url("Guns N' Roses"),
            "https://open.spotify.com/search/Guns%20N'%20Roses"
        );
        assert_eq!(
            artist_search_url("(hed) p.e.*!"),
            "https://open.spotify.com/search/(hed)%20p.e.*!"
        );
        // A literal percent sign still gets escaped
        assert_eq!(
            artist_search_url("100%21"),
            "https://open.spotify.com/search/100%2521"
        );
        assert_eq!(
            artist_search_url("Sigur Rós"),
            "https://open.spotify.com/search/Sigur%20R%C3%B3s"
        );
    }

    #[test]
    fn display_summarises_the_track() {
        let view = CardView::render(&WidgetState::Ready(track(true)));
        assert_eq!(
            view.to_string(),
            "A - B (C) <http://open.spotify.com/track/1>"
        );
    }
}
