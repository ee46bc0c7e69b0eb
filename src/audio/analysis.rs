use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

use super::window::hann_window;
use crate::config::{MAGNITUDE_SCALE, MAX_DISPLAY_FREQ};

/// Turns a slice of the sample buffer into per-column bar heights.
///
/// Owns the window table, the FFT plan and all scratch space, so one
/// analyzer serves every frame of a run without reallocating.
pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    frame: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    sample_rate: u32,
    channels: usize,
    max_display_freq: f32,
}

impl SpectrumAnalyzer {
    pub fn new(frame_len: usize, sample_rate: u32, channels: usize) -> Self {
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(frame_len);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];

        Self {
            fft,
            window: hann_window(frame_len),
            frame: vec![Complex::new(0.0, 0.0); frame_len],
            scratch,
            sample_rate,
            channels: channels.max(1),
            max_display_freq: MAX_DISPLAY_FREQ,
        }
    }

    pub fn frame_len(&self) -> usize {
        self.window.len()
    }

    /// Upper bound on display columns: one per usable bin.
    pub fn max_columns(&self) -> usize {
        self.frame_len() / 2
    }

    /// Bar heights for `columns` columns, each within `0..=rows`.
    ///
    /// `position` is a raw sample-buffer index. The frame is read from the
    /// first channel slot at that index onward, so a position that is not
    /// frame-aligned reads from another channel. Reads past the end of
    /// `samples` are silence.
    pub fn analyze(
        &mut self,
        samples: &[f32],
        position: usize,
        columns: usize,
        rows: usize,
    ) -> Vec<usize> {
        let columns = columns.min(self.max_columns());
        self.load_frame(samples, position);
        self.fft.process_with_scratch(&mut self.frame, &mut self.scratch);

        let spectrum = &self.frame[..self.frame_len() / 2 + 1];
        let bins = assign_bins(columns, self.frame_len(), self.sample_rate, self.max_display_freq);
        display_values(spectrum, &bins, rows)
    }

    fn load_frame(&mut self, samples: &[f32], position: usize) {
        let stride = self.channels;
        for (i, (slot, &w)) in self.frame.iter_mut().zip(self.window.iter()).enumerate() {
            let sample = samples.get(position + stride * i).copied().unwrap_or(0.0);
            *slot = Complex::new(sample * w, 0.0);
        }
    }
}

/// Maps display columns to FFT bins.
///
/// Column `c` targets `c * max_freq / (columns - 1)` Hz and takes the first
/// bin at or above that frequency. The bin cursor is shared across columns
/// and never moves backward, and it stops at the last bin below Nyquist.
pub fn assign_bins(
    columns: usize,
    frame_len: usize,
    sample_rate: u32,
    max_freq: f32,
) -> Vec<usize> {
    let last_bin = (frame_len / 2).saturating_sub(1);
    let bin_width = sample_rate as f32 / frame_len as f32;

    let mut cursor = 0;
    (0..columns)
        .map(|col| {
            let target = if columns > 1 {
                col as f32 * max_freq / (columns - 1) as f32
            } else {
                0.0
            };
            while cursor < last_bin && (cursor as f32) * bin_width < target {
                cursor += 1;
            }
            cursor
        })
        .collect()
}

/// Whole-number magnitude of each assigned bin, scaled to `rows` and clamped.
fn display_values(spectrum: &[Complex<f32>], bins: &[usize], rows: usize) -> Vec<usize> {
    let scale = rows as f32 / MAGNITUDE_SCALE;
    bins.iter()
        .map(|&bin| ((spectrum[bin].norm().trunc() * scale) as usize).min(rows))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FRAME_LEN;
    use std::f32::consts::PI;

    fn stereo_sine(freq: f32, sample_rate: u32, frames: usize) -> Vec<f32> {
        (0..frames)
            .flat_map(|i| {
                let s = (2.0 * PI * freq * i as f32 / sample_rate as f32).sin();
                [s, s]
            })
            .collect()
    }

    fn target_freq(col: usize, columns: usize) -> f32 {
        col as f32 * MAX_DISPLAY_FREQ / (columns - 1) as f32
    }

    #[test]
    fn bins_never_regress() {
        for &(columns, rate) in &[(80, 44_100), (512, 44_100), (200, 48_000), (37, 22_050)] {
            let bins = assign_bins(columns, FRAME_LEN, rate, MAX_DISPLAY_FREQ);
            assert_eq!(bins.len(), columns);
            assert!(bins.windows(2).all(|w| w[0] <= w[1]));
            assert!(bins.iter().all(|&b| b < FRAME_LEN / 2));
        }
    }

    #[test]
    fn bins_first_bin_at_or_above_target() {
        let bins = assign_bins(80, FRAME_LEN, 44_100, MAX_DISPLAY_FREQ);
        let bin_width = 44_100.0 / FRAME_LEN as f32;

        assert_eq!(bins[0], 0);
        for (col, &bin) in bins.iter().enumerate().skip(1) {
            let target = target_freq(col, 80);
            assert!(bin as f32 * bin_width >= target);
            assert!(((bin - 1) as f32) * bin_width < target);
        }
    }

    #[test]
    fn bins_capped_below_nyquist() {
        // 10 kHz lies above Nyquist at 8 kHz
        let bins = assign_bins(512, FRAME_LEN, 8_000, MAX_DISPLAY_FREQ);
        assert_eq!(*bins.last().unwrap(), FRAME_LEN / 2 - 1);
        assert!(bins.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn bins_degenerate_columns() {
        assert_eq!(assign_bins(1, FRAME_LEN, 44_100, MAX_DISPLAY_FREQ), vec![0]);
        assert!(assign_bins(0, FRAME_LEN, 44_100, MAX_DISPLAY_FREQ).is_empty());
    }

    #[test]
    fn sine_peaks_in_nearest_column() {
        let samples = stereo_sine(440.0, 44_100, 2048);
        let mut analyzer = SpectrumAnalyzer::new(FRAME_LEN, 44_100, 2);
        let columns = 80;
        let values = analyzer.analyze(&samples, 0, columns, 60);

        let nearest = (0..columns)
            .min_by(|&a, &b| {
                let da = (target_freq(a, columns) - 440.0).abs();
                let db = (target_freq(b, columns) - 440.0).abs();
                da.partial_cmp(&db).unwrap()
            })
            .unwrap();

        for col in 0..columns {
            if (target_freq(col, columns) - 440.0).abs() > 1000.0 {
                assert!(
                    values[nearest] > values[col],
                    "column {} ({}) vs {} ({})",
                    nearest,
                    values[nearest],
                    col,
                    values[col]
                );
            }
        }
    }

    #[test]
    fn values_clamped_to_rows() {
        let samples = stereo_sine(1000.0, 44_100, 4096);
        let mut analyzer = SpectrumAnalyzer::new(FRAME_LEN, 44_100, 2);

        for rows in [0, 1, 5, 23, 200] {
            let values = analyzer.analyze(&samples, 0, 120, rows);
            assert!(values.iter().all(|&v| v <= rows));
        }
        // a full-scale sine saturates a short terminal
        assert!(analyzer.analyze(&samples, 0, 120, 5).contains(&5));
    }

    #[test]
    fn columns_limited_to_half_frame() {
        let samples = vec![0.0; 4096];
        let mut analyzer = SpectrumAnalyzer::new(FRAME_LEN, 44_100, 2);
        assert_eq!(analyzer.analyze(&samples, 0, 2000, 40).len(), FRAME_LEN / 2);
    }

    #[test]
    fn reads_past_end_are_silent() {
        let samples = stereo_sine(440.0, 44_100, 600);
        let mut analyzer = SpectrumAnalyzer::new(FRAME_LEN, 44_100, 2);

        for position in [samples.len() - 2, samples.len() - 1, samples.len(), samples.len() + 10] {
            let values = analyzer.analyze(&samples, position, 80, 40);
            assert_eq!(values.len(), 80);
            assert!(values.iter().all(|&v| v <= 40));
        }
        assert!(analyzer.analyze(&samples, samples.len(), 80, 40).iter().all(|&v| v == 0));
    }

    #[test]
    fn magnitude_truncated_before_scaling() {
        let spectrum = [
            Complex::new(0.9, 0.0),
            Complex::new(3.5, 0.0),
            Complex::new(0.0, -1.99),
        ];
        // 120 rows doubles each whole magnitude
        assert_eq!(display_values(&spectrum, &[0, 1, 2], 120), vec![0, 6, 2]);
    }

    #[test]
    fn silence_is_flat() {
        let samples = vec![0.0; 2 * 2048];
        let mut analyzer = SpectrumAnalyzer::new(FRAME_LEN, 44_100, 2);
        assert!(analyzer.analyze(&samples, 0, 80, 40).iter().all(|&v| v == 0));
    }
}
