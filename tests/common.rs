/// Shared helpers: synthetic signals, EDF pairs and stub models.
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use ezscore::classify::{StageModel, N_STAGES};
use ezscore::edf::EdfWriter;
use ezscore::{ChannelTrace, InferenceError, RawRecording, RecordingPair};
use ndarray::{Array2, ArrayView3};

#[allow(unused)]
/// Pure sinusoid.
pub fn sine(freq: f32, amp: f32, sfreq: f32, n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| amp * (2.0 * std::f32::consts::PI * freq * i as f32 / sfreq).sin())
        .collect()
}

#[allow(unused)]
/// Delta + alpha + drift + uniform noise, roughly forehead-EEG shaped (µV).
pub fn eeg_like(sfreq: f32, seconds: f32, seed: u32) -> Vec<f32> {
    let n = (sfreq * seconds).round() as usize;
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
    (0..n)
        .map(|i| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            let noise = (state >> 8) as f32 / (1u32 << 24) as f32 - 0.5;
            let t = i as f32 / sfreq;
            let tau = 2.0 * std::f32::consts::PI;
            40.0 * (tau * 1.2 * t).sin()
                + 12.0 * (tau * 10.0 * t + seed as f32).sin()
                + 25.0 * (tau * 0.05 * t).sin()
                + 8.0 * noise
        })
        .collect()
}

#[allow(unused)]
pub fn trace(samples: Vec<f32>, sfreq: f64, label: &str) -> ChannelTrace {
    ChannelTrace {
        samples,
        sfreq,
        label: label.to_string(),
        source: PathBuf::from(format!("{label}.edf")),
    }
}

#[allow(unused)]
/// In-memory `[left, right]` recording.
pub fn synthetic_recording(sfreq: f32, seconds: f32) -> RawRecording {
    let left = trace(eeg_like(sfreq, seconds, 1), sfreq as f64, "EEG L");
    let right = trace(eeg_like(sfreq, seconds, 2), sfreq as f64, "EEG R");
    RawRecording::from_traces(left, right, 0).unwrap()
}

#[allow(unused)]
/// Write `<dir>/<stem>L.edf` and `<dir>/<stem>R.edf`.
pub fn write_pair(dir: &Path, stem: &str, left: &[f32], right: &[f32], sfreq: f64) -> RecordingPair {
    let pair = RecordingPair::from_stem(dir, stem);
    EdfWriter::new(&format!("{stem}L"), sfreq).write(&pair.left, left).unwrap();
    EdfWriter::new(&format!("{stem}R"), sfreq).write(&pair.right, right).unwrap();
    pair
}

#[allow(unused)]
/// Deterministic logits: epoch `i` of each call favours stage `i % 6`.
#[derive(Debug)]
pub struct StubModel {
    pub channels: usize,
    pub samples: usize,
    pub calls: AtomicUsize,
}

#[allow(unused)]
impl StubModel {
    pub fn new(channels: usize, samples: usize) -> Self {
        Self { channels, samples, calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl StageModel for StubModel {
    fn input_shape(&self) -> (usize, usize) {
        (self.channels, self.samples)
    }

    fn predict(&self, epochs: ArrayView3<'_, f32>) -> Result<Array2<f32>, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Array2::from_shape_fn((epochs.shape()[0], N_STAGES), |(i, k)| {
            if k == i % N_STAGES { 3.0 } else { -1.0 }
        }))
    }
}

#[allow(unused)]
/// Returns the same probability rows for every call, cycling if needed.
#[derive(Debug)]
pub struct FixedModel {
    pub rows: Array2<f32>,
}

impl StageModel for FixedModel {
    fn input_shape(&self) -> (usize, usize) {
        (2, 1920)
    }

    fn predict(&self, epochs: ArrayView3<'_, f32>) -> Result<Array2<f32>, InferenceError> {
        let n = self.rows.nrows();
        Ok(Array2::from_shape_fn((epochs.shape()[0], N_STAGES), |(i, k)| self.rows[[i % n, k]]))
    }
}

#[allow(unused)]
/// Channel-wise (mean, population variance).
pub fn row_moments(data: &Array2<f32>) -> Vec<(f64, f64)> {
    data.rows()
        .into_iter()
        .map(|row| {
            let n = row.len() as f64;
            let m = row.iter().map(|&v| v as f64).sum::<f64>() / n;
            let v = row.iter().map(|&x| (x as f64 - m).powi(2)).sum::<f64>() / n;
            (m, v)
        })
        .collect()
}

#[allow(unused)]
/// Maximum absolute difference between two slices.
pub fn max_abs_diff(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).fold(0.0_f32, f32::max)
}
