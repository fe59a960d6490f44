use std::path::{Path, PathBuf};

use ab_glyph::{FontVec, PxScale};
use anyhow::{Context, Result};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use crate::bars::{hue_at, Bar};
use crate::view::{CardView, TrackCard, NOT_PLAYING_MESSAGE};

/// Snapshots are rendered at twice the logical card size.
pub const SCALE_FACTOR: u32 = 2;
pub const CARD_WIDTH: u32 = 480;
pub const CARD_HEIGHT: u32 = 133;

const STATUS_PANEL_HEIGHT: u32 = 100;
const CORNER_RADIUS: u32 = 6;
const COVER_X: u32 = 16;
const COVER_Y: u32 = 16;
pub const COVER_SIZE: u32 = 100;
const CONTENT_X: u32 = 132;
const CONTENT_RIGHT_PAD: u32 = 16;
const TITLE_Y: u32 = 22;
const ARTIST_Y: u32 = 52;
const BARS_BASELINE_Y: u32 = 122;
const BAR_WIDTH: u32 = 3;
const BAR_MIN_HEIGHT: f32 = 2.0;
const BAR_MAX_HEIGHT: f32 = 24.0;
const SPINNER_RADIUS: u32 = 16;
const SPINNER_THICKNESS: u32 = 2;
const SPINNER_PERIOD_MS: u64 = 1000;

const TITLE_PX: f32 = 20.0;
const ARTIST_PX: f32 = 15.0;
const STATUS_PX: f32 = 16.0;

const PANEL: Rgba<u8> = Rgba([24, 20, 20, 255]);
const PURPLE: Rgba<u8> = Rgba([168, 85, 247, 255]);
const ERROR_RED: Rgba<u8> = Rgba([248, 113, 113, 255]);
const MUTED_GRAY: Rgba<u8> = Rgba([156, 163, 175, 255]);
const TITLE_WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const ARTIST_GRAY: Rgba<u8> = Rgba([179, 179, 179, 255]);

/// System fonts tried in order when no font is configured.
const FONT_CANDIDATES: &[&str] = &[
    "/System/Library/Fonts/SFNS.ttf",
    "/Library/Fonts/Arial Unicode.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

fn px(logical: u32) -> u32 {
    logical * SCALE_FACTOR
}

fn scale(logical_px: f32) -> PxScale {
    PxScale::from(logical_px * SCALE_FACTOR as f32)
}

/// Rasterizes card views into bitmaps.
pub struct Compositor {
    font: Option<FontVec>,
}

impl Compositor {
    /// Load the configured font, or the first system font found.
    /// Without any font the card is still drawn, just without text.
    pub fn load(font_path: Option<&Path>) -> Result<Self> {
        // An explicitly configured font must load
        if let Some(path) = font_path {
            let data = std::fs::read(path)
                .with_context(|| format!("Failed to load font {:?}", path))?;
            return Self::from_font_data(data);
        }

        // Otherwise take the first system font that parses
        for candidate in FONT_CANDIDATES.iter().map(PathBuf::from) {
            if let Ok(data) = std::fs::read(&candidate) {
                match Self::from_font_data(data) {
                    Ok(compositor) => {
                        log::info!("Using font {:?}", candidate);
                        return Ok(compositor);
                    }
                    Err(e) => log::debug!("Skipping font {:?}: {:#}", candidate, e),
                }
            }
        }

        log::warn!("No usable system font found, snapshots will have no text");
        Ok(Self::without_font())
    }

    pub fn from_font_data(data: Vec<u8>) -> Result<Self> {
        let font = FontVec::try_from_vec(data).context("Failed to parse font data")?;
        Ok(Self { font: Some(font) })
    }

    pub fn without_font() -> Self {
        Self { font: None }
    }

    /// Draw a card at [`SCALE_FACTOR`]. `elapsed_ms` picks the animation frame.
    pub fn render_card(
        &self,
        view: &CardView,
        artwork: Option<&RgbaImage>,
        elapsed_ms: u64,
    ) -> RgbaImage {
        // Create transparent canvas at snapshot scale
        let width = px(CARD_WIDTH);
        let mut canvas = RgbaImage::from_pixel(width, px(CARD_HEIGHT), Rgba([0, 0, 0, 0]));

        match view {
            CardView::Loading => {
                self.draw_panel(&mut canvas, px(STATUS_PANEL_HEIGHT));
                self.draw_spinner(&mut canvas, elapsed_ms);
            }
            CardView::Error { message } => {
                self.draw_panel(&mut canvas, px(STATUS_PANEL_HEIGHT));
                self.draw_centered_text(&mut canvas, message, ERROR_RED);
            }
            CardView::NotPlaying => {
                self.draw_panel(&mut canvas, px(STATUS_PANEL_HEIGHT));
                self.draw_centered_text(&mut canvas, NOT_PLAYING_MESSAGE, MUTED_GRAY);
            }
            CardView::Playing(card) => {
                // Track card fills the whole height
                self.draw_panel(&mut canvas, px(CARD_HEIGHT));
                self.draw_track(&mut canvas, card, artwork, elapsed_ms);
            }
        }

        canvas
    }

    fn draw_track(
        &self,
        canvas: &mut RgbaImage,
        card: &TrackCard,
        artwork: Option<&RgbaImage>,
        elapsed_ms: u64,
    ) {
        // Draw album art or placeholder
        match artwork {
            Some(art) => self.overlay_image(canvas, art, px(COVER_X) as i64, px(COVER_Y) as i64),
            None => self.draw_placeholder_art(canvas),
        }

        // Title and artist share the column right of the cover
        let max_width = px(CARD_WIDTH - CONTENT_X - CONTENT_RIGHT_PAD) as f32;
        if let Some(font) = &self.font {
            let title = self.truncate_text(&card.title, scale(TITLE_PX), max_width);
            draw_text_mut(
                canvas,
                TITLE_WHITE,
                px(CONTENT_X) as i32,
                px(TITLE_Y) as i32,
                scale(TITLE_PX),
                font,
                &title,
            );

            let artist = self.truncate_text(&card.artist, scale(ARTIST_PX), max_width);
            draw_text_mut(
                canvas,
                ARTIST_GRAY,
                px(CONTENT_X) as i32,
                px(ARTIST_Y) as i32,
                scale(ARTIST_PX),
                font,
                &artist,
            );
        }

        // Visualizer along the bottom of the text column
        self.draw_bars(canvas, &card.bars, elapsed_ms);
    }

    fn draw_bars(&self, canvas: &mut RgbaImage, bars: &[Bar], elapsed_ms: u64) {
        // All bars share one colour at a given frame
        let [r, g, b] = hsl_to_rgb(hue_at(elapsed_ms), 0.7, 0.6);
        let color = Rgba([r, g, b, 255]);

        for bar in bars {
            // Bars grow upwards from a common baseline
            let level = bar.level_at(elapsed_ms);
            let height = BAR_MIN_HEIGHT + (BAR_MAX_HEIGHT - BAR_MIN_HEIGHT) * level;
            let height = (height * SCALE_FACTOR as f32).round() as u32;
            let x = px(CONTENT_X + bar.left_px);
            let y = px(BARS_BASELINE_Y) - height;
            draw_filled_rect_mut(
                canvas,
                Rect::at(x as i32, y as i32).of_size(px(BAR_WIDTH), height.max(1)),
                color,
            );
        }
    }

    /// Background panel with rounded corners spanning the full card width.
    fn draw_panel(&self, canvas: &mut RgbaImage, height: u32) {
        let width = canvas.width();
        let r = px(CORNER_RADIUS);

        // Cross of two rects, then round the corners with circles
        draw_filled_rect_mut(canvas, Rect::at(r as i32, 0).of_size(width - 2 * r, height), PANEL);
        draw_filled_rect_mut(canvas, Rect::at(0, r as i32).of_size(width, height - 2 * r), PANEL);
        for (cx, cy) in [
            (r, r),
            (width - r - 1, r),
            (r, height - r - 1),
            (width - r - 1, height - r - 1),
        ] {
            draw_filled_circle_mut(canvas, (cx as i32, cy as i32), r as i32, PANEL);
        }
    }

    /// Two opposite quarter arcs, rotated one full turn per second.
    fn draw_spinner(&self, canvas: &mut RgbaImage, elapsed_ms: u64) {
        let cx = (canvas.width() / 2) as f32;
        let cy = (px(STATUS_PANEL_HEIGHT) / 2) as f32;
        let outer = px(SPINNER_RADIUS) as f32;
        let inner = outer - px(SPINNER_THICKNESS) as f32;
        let turn = (elapsed_ms % SPINNER_PERIOD_MS) as f32 / SPINNER_PERIOD_MS as f32 * 360.0;
        let arcs = [turn - 90.0, turn + 90.0];

        // Only scan the ring's bounding box
        let x0 = (cx - outer).floor().max(0.0) as u32;
        let y0 = (cy - outer).floor().max(0.0) as u32;
        let x1 = ((cx + outer).ceil() as u32).min(canvas.width() - 1);
        let y1 = ((cy + outer).ceil() as u32).min(canvas.height() - 1);

        for y in y0..=y1 {
            for x in x0..=x1 {
                let dx = x as f32 + 0.5 - cx;
                let dy = y as f32 + 0.5 - cy;
                let dist = (dx * dx + dy * dy).sqrt();
                if dist < inner || dist > outer {
                    continue;
                }
                // Image y grows downwards, so -90 degrees is the top
                let angle = dy.atan2(dx).to_degrees();
                if arcs.iter().any(|center| angle_distance(angle, *center) <= 45.0) {
                    canvas.put_pixel(x, y, PURPLE);
                }
            }
        }
    }

    fn draw_centered_text(&self, canvas: &mut RgbaImage, text: &str, color: Rgba<u8>) {
        let Some(font) = &self.font else {
            return;
        };

        let text_scale = scale(STATUS_PX);
        let max_width = (canvas.width() - px(2 * CONTENT_RIGHT_PAD)) as f32;
        // Center horizontally within the status panel
        let text = self.truncate_text(text, text_scale, max_width);
        let width = self.measure_text_width(&text, text_scale);
        let x = ((canvas.width() as f32 - width) / 2.0).max(0.0) as i32;
        let y = ((px(STATUS_PANEL_HEIGHT) as f32 - text_scale.y) / 2.0) as i32;

        draw_text_mut(canvas, color, x, y, text_scale, font, &text);
    }

    /// Decode artwork bytes and resize them to the cover slot.
    pub fn decode_artwork(&self, bytes: &[u8]) -> Result<RgbaImage> {
        let img = image::load_from_memory(bytes).context("Failed to load image from memory")?;
        let size = px(COVER_SIZE);
        let resized = img.resize_exact(size, size, image::imageops::FilterType::Lanczos3);

        Ok(resized.to_rgba8())
    }

    /// Overlay one image onto another at specified position
    fn overlay_image(&self, canvas: &mut RgbaImage, overlay: &RgbaImage, x: i64, y: i64) {
        image::imageops::overlay(canvas, overlay, x, y);
    }

    /// Purple square in place of missing artwork
    fn draw_placeholder_art(&self, canvas: &mut RgbaImage) {
        draw_filled_rect_mut(
            canvas,
            Rect::at(px(COVER_X) as i32, px(COVER_Y) as i32).of_size(px(COVER_SIZE), px(COVER_SIZE)),
            PURPLE,
        );
    }

    /// Truncate text with an ellipsis so it fits within `max_width` pixels
    fn truncate_text(&self, text: &str, scale: PxScale, max_width: f32) -> String {
        let full_width = self.measure_text_width(text, scale);
        if full_width <= max_width {
            return text.to_string();
        }

        // Truncate with ellipsis
        let ellipsis = "...";
        let available_for_text = max_width - self.measure_text_width(ellipsis, scale);

        let mut truncated = String::new();
        for ch in text.chars() {
            truncated.push(ch);
            if self.measure_text_width(&truncated, scale) > available_for_text {
                truncated.pop();
                break;
            }
        }

        format!("{}{}", truncated.trim_end(), ellipsis)
    }

    /// Measure the width of text in pixels
    fn measure_text_width(&self, text: &str, scale: PxScale) -> f32 {
        use ab_glyph::{Font, ScaleFont};

        let Some(font) = &self.font else {
            return 0.0;
        };

        let scaled_font = font.as_scaled(scale);
        text.chars()
            .map(|ch| scaled_font.h_advance(font.glyph_id(ch)))
            .sum()
    }

    /// Encode image as PNG bytes
    pub fn encode_png(&self, image: &RgbaImage) -> Result<Vec<u8>> {
        use image::codecs::png::PngEncoder;
        use image::ImageEncoder;

        let mut buffer = Vec::new();
        let encoder = PngEncoder::new(&mut buffer);

        encoder
            .write_image(
                image.as_raw(),
                image.width(),
                image.height(),
                image::ExtendedColorType::Rgba8,
            )
            .context("Failed to encode PNG")?;

        Ok(buffer)
    }
}

/// Payload of a base64 `data:` URL. Returns `None` for any other URL.
pub fn decode_data_url(url: &str) -> Option<Result<Vec<u8>>> {
    url.strip_prefix("data:").map(decode_data_payload)
}

fn decode_data_payload(rest: &str) -> Result<Vec<u8>> {
    use base64::Engine;

    let (_, payload) = rest.split_once(',').context("Invalid data URL format")?;
    base64::engine::general_purpose::STANDARD
        .decode(payload)
        .context("Failed to decode base64 artwork")
}

fn angle_distance(a: f32, b: f32) -> f32 {
    let d = (a - b).rem_euclid(360.0);
    d.min(360.0 - d)
}

fn hsl_to_rgb(hue: f32, saturation: f32, lightness: f32) -> [u8; 3] {
    let c = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let h = hue.rem_euclid(360.0) / 60.0;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = lightness - c / 2.0;
    let channel = |v: f32| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    [channel(r), channel(g), channel(b)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bars::generate_bars;
    use crate::view::TrackCard;

    fn playing() -> CardView {
        CardView::Playing(TrackCard {
            title: "A".into(),
            artist: "B".into(),
            album: "C".into(),
            cover_url: "http://x/y.png".into(),
            cover_alt: "C cover".into(),
            song_url: "http://open.spotify.com/track/1".into(),
            artist_search_url: "https://open.spotify.com/search/B".into(),
            bars: generate_bars(),
        })
    }

    fn cover_center() -> (u32, u32) {
        (px(COVER_X + COVER_SIZE / 2), px(COVER_Y + COVER_SIZE / 2))
    }

    #[test]
    fn renders_at_double_scale() {
        let compositor = Compositor::without_font();
        for view in [
            CardView::Loading,
            CardView::Error { message: "x".into() },
            CardView::NotPlaying,
            playing(),
        ] {
            let image = compositor.render_card(&view, None, 0);
            assert_eq!(image.dimensions(), (960, 266));
        }
    }

    #[test]
    fn status_panels_leave_bottom_transparent() {
        let image = Compositor::without_font().render_card(&CardView::NotPlaying, None, 0);
        assert_eq!(*image.get_pixel(px(20), px(50)), PANEL);
        assert_eq!(image.get_pixel(px(20), px(120))[3], 0);
        assert_eq!(image.get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn spinner_starts_at_the_top() {
        let image = Compositor::without_font().render_card(&CardView::Loading, None, 0);
        let cx = image.width() / 2;
        let top = px(STATUS_PANEL_HEIGHT) / 2 - px(SPINNER_RADIUS) + 1;
        assert_eq!(*image.get_pixel(cx, top), PURPLE);
        // sides of the ring are open at t=0
        let side = image.width() / 2 + px(SPINNER_RADIUS) - 2;
        assert_eq!(*image.get_pixel(side, px(STATUS_PANEL_HEIGHT) / 2), PANEL);
    }

    #[test]
    fn missing_artwork_uses_placeholder() {
        let image = Compositor::without_font().render_card(&playing(), None, 0);
        let (x, y) = cover_center();
        assert_eq!(*image.get_pixel(x, y), PURPLE);
    }

    #[test]
    fn artwork_is_drawn_in_cover_slot() {
        let compositor = Compositor::without_font();
        let art = RgbaImage::from_pixel(8, 8, Rgba([200, 10, 10, 255]));
        let png = compositor.encode_png(&art).unwrap();
        let cover = compositor.decode_artwork(&png).unwrap();
        assert_eq!(cover.dimensions(), (px(COVER_SIZE), px(COVER_SIZE)));

        let image = compositor.render_card(&playing(), Some(&cover), 0);
        let (x, y) = cover_center();
        let pixel = image.get_pixel(x, y);
        for (got, want) in pixel.0.iter().zip([200u8, 10, 10, 255]) {
            assert!(got.abs_diff(want) <= 1, "{:?}", pixel);
        }
    }

    #[test]
    fn bars_rest_at_minimum_height_before_delay() {
        let mut card = match playing() {
            CardView::Playing(card) => card,
            _ => unreachable!(),
        };
        for bar in &mut card.bars {
            bar.delay_ms = 500;
        }
        let image = Compositor::without_font().render_card(&CardView::Playing(card), None, 0);

        let x = px(CONTENT_X);
        let baseline = px(BARS_BASELINE_Y);
        assert_eq!(image.get_pixel(x, baseline - 1)[3], 255);
        assert_eq!(*image.get_pixel(x, baseline - px(10)), PANEL);
    }

    #[test]
    fn encoded_png_decodes_to_same_size() {
        let compositor = Compositor::without_font();
        let image = compositor.render_card(&CardView::NotPlaying, None, 0);
        let png = compositor.encode_png(&image).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");

        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (960, 266));
    }

    #[test]
    fn data_urls_are_decoded_inline() {
        assert!(decode_data_url("http://x/y.png").is_none());
        let bytes = decode_data_url("data:image/png;base64,aGVsbG8=").unwrap().unwrap();
        assert_eq!(bytes, b"hello");
        assert!(decode_data_url("data:image/png;base64").unwrap().is_err());
    }

    #[test]
    fn explicit_missing_font_is_an_error() {
        assert!(Compositor::load(Some(Path::new("/nonexistent/font.ttf"))).is_err());
        assert!(Compositor::from_font_data(vec![0, 1, 2]).is_err());
    }

    #[test]
    fn hsl_primaries() {
        assert_eq!(hsl_to_rgb(0.0, 1.0, 0.5), [255, 0, 0]);
        assert_eq!(hsl_to_rgb(120.0, 1.0, 0.5), [0, 255, 0]);
        assert_eq!(hsl_to_rgb(240.0, 1.0, 0.5), [0, 0, 255]);
    }
}
