use std::f32::consts::PI;

/// Hann taper coefficients for an analysis frame of `size` samples.
///
/// `size` must be at least 2; both endpoints are zero and the peak is 1.
pub fn hann_window(size: usize) -> Vec<f32> {
    debug_assert!(size >= 2, "window needs at least two samples");
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / (size - 1) as f32).cos()))
        .collect()
}
