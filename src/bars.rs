use rand::Rng;

pub const BAR_COUNT: usize = 84;
/// Horizontal distance between neighbouring bars, in logical pixels.
pub const BAR_SPACING_PX: u32 = 4;
/// Period of the shared hue cycle all bars run through.
pub const COLOR_CYCLE_MS: u64 = 15_000;

const DURATION_MS: std::ops::Range<u32> = 500..1000;
const DELAY_MS: std::ops::Range<u32> = 0..800;

/// One visualizer bar. Timing is randomized per render and purely cosmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bar {
    pub left_px: u32,
    pub duration_ms: u32,
    pub delay_ms: u32,
}

impl Bar {
    /// Height of the bar as a fraction in `[0, 1]`, `elapsed_ms` after the render started.
    ///
    /// Before its delay expires a bar rests at zero; afterwards it bounces up and
    /// down once per `duration_ms`.
    pub fn level_at(&self, elapsed_ms: u64) -> f32 {
        let Some(running) = elapsed_ms.checked_sub(self.delay_ms as u64) else {
            return 0.0;
        };
        let period = self.duration_ms.max(1) as u64;
        let phase = (running % period) as f32 / period as f32;
        1.0 - (2.0 * phase - 1.0).abs()
    }
}

pub fn generate_bars() -> Vec<Bar> {
    generate_bars_with(&mut rand::thread_rng())
}

pub fn generate_bars_with<R: Rng>(rng: &mut R) -> Vec<Bar> {
    (0..BAR_COUNT as u32)
        .map(|i| Bar {
            left_px: i * BAR_SPACING_PX,
            duration_ms: rng.gen_range(DURATION_MS),
            delay_ms: rng.gen_range(DELAY_MS),
        })
        .collect()
}

/// Hue in degrees shared by every bar at `elapsed_ms`.
pub fn hue_at(elapsed_ms: u64) -> f32 {
    (elapsed_ms % COLOR_CYCLE_MS) as f32 / COLOR_CYCLE_MS as f32 * 360.0
}
