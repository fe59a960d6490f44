use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use base64::Engine;
use image::RgbaImage;

use crate::compositor::{decode_data_url, Compositor};
use crate::error::ExportError;
use crate::source::ArtworkSource;
use crate::view::{CardView, Widget};

const FILE_PREFIX: &str = "spotify-now-playing-";

/// An encoded PNG of the card, stamped with the time it was taken.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub png: Vec<u8>,
    pub taken_at_ms: u128,
}

impl Snapshot {
    pub fn file_name(&self) -> String {
        format!("{}{}.png", FILE_PREFIX, self.taken_at_ms)
    }

    pub fn data_uri(&self) -> String {
        format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&self.png)
        )
    }
}

fn epoch_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

/// Rasterizes the mounted card and saves it as a PNG.
pub struct Exporter<A> {
    compositor: Compositor,
    artwork: A,
    out_dir: PathBuf,
}

impl<A: ArtworkSource> Exporter<A> {
    pub fn new(compositor: Compositor, artwork: A, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            compositor,
            artwork,
            out_dir: out_dir.into(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Render the widget to a PNG snapshot.
    ///
    /// Returns `None` without doing anything when no widget is mounted, and
    /// `None` after logging when rasterization fails.
    pub async fn snapshot(&self, widget: Option<&Widget>) -> Option<Snapshot> {
        let Some(widget) = widget else {
            log::debug!("Export requested before the card was mounted, ignoring");
            return None;
        };

        match self.render(widget).await {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                log::error!("Error generating image: {:#}", e);
                None
            }
        }
    }

    /// Snapshot the widget and write it to the export directory.
    /// Returns the path of the written file.
    pub async fn export(&self, widget: Option<&Widget>) -> Option<PathBuf> {
        let snapshot = self.snapshot(widget).await?;

        match self.save(&snapshot).await {
            Ok(path) => {
                log::info!("Saved snapshot to {}", path.display());
                Some(path)
            }
            Err(e) => {
                log::error!("Error saving image: {}", e);
                None
            }
        }
    }

    async fn render(&self, widget: &Widget) -> Result<Snapshot, ExportError> {
        // Only the playing card carries a cover
        let artwork = match &widget.view {
            CardView::Playing(card) => self.load_artwork(&card.cover_url).await?,
            _ => None,
        };

        let image = self
            .compositor
            .render_card(&widget.view, artwork.as_ref(), widget.elapsed_ms());
        let png = self.compositor.encode_png(&image)?;

        Ok(Snapshot {
            png,
            taken_at_ms: epoch_ms(),
        })
    }

    /// Cover art for the card. A card without a cover URL gets the placeholder;
    /// a cover that cannot be fetched or decoded fails the whole snapshot.
    async fn load_artwork(&self, url: &str) -> Result<Option<RgbaImage>, ExportError> {
        if url.is_empty() {
            return Ok(None);
        }

        // Inline data URLs never hit the network
        let bytes = match decode_data_url(url) {
            Some(decoded) => decoded,
            None => self.artwork.fetch_artwork(url).await,
        };

        let image = bytes
            .and_then(|b| self.compositor.decode_artwork(&b))
            .with_context(|| format!("Failed to capture cover artwork {}", url))?;

        Ok(Some(image))
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<PathBuf, ExportError> {
        let path = self.out_dir.join(snapshot.file_name());
        tokio::fs::write(&path, &snapshot.png)
            .await
            .map_err(|source| ExportError::Write {
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }
}
