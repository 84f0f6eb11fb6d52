//! Volume ramp applied when a sounding note is cut off.

use std::time::Duration;

/// Interval between volume updates during a fade.
pub const FADE_STEP: Duration = Duration::from_millis(10);

/// Volumes to apply one [`FADE_STEP`] apart to fade `start` down to silence
/// over `fade`. Ends at exactly 0.0. Empty when `fade` is shorter than one step,
/// in which case the note is cut immediately.
pub fn fade_out_volumes(start: f32, fade: Duration) -> Vec<f32> {
    let steps = (fade.as_millis() / FADE_STEP.as_millis()) as u32;
    (0..steps)
        .rev()
        .map(|step| start * step as f32 / steps as f32)
        .collect()
}
