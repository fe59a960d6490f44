//! "Now playing" card for a Spotify account: polls the now-playing endpoint,
//! keeps the card's view state and exports the card as a PNG.

pub mod bars;
pub mod compositor;
pub mod config;
pub mod error;
pub mod exporter;
pub mod refresher;
pub mod source;
pub mod state;
pub mod types;
pub mod view;

pub use config::Config;
pub use error::{ConfigError, ExportError, RefreshError};
pub use exporter::{Exporter, Snapshot};
pub use refresher::Refresher;
pub use source::{ArtworkSource, HttpSource, NowPlayingSource};
pub use types::{NowPlaying, WidgetState};
pub use view::{CardView, Widget};
