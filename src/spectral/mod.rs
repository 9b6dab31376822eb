//! Multitaper time-frequency analysis.
//!
//! - [`dpss`]: Slepian taper computation.
//! - [`multitaper`]: sliding-window estimator ([`MultitaperAnalyzer`]).

pub mod dpss;
pub mod multitaper;

pub use dpss::dpss;
pub use multitaper::{multitaper_spectrogram, MultitaperAnalyzer};

use ndarray::Array2;

/// Per-channel `[F, W]` power with shared axes.
///
/// Units are µV²/Hz for raw input and units²/Hz for z-scored input.
#[derive(Debug, Clone)]
pub struct SpectrogramResult {
    power: Vec<Array2<f32>>,
    ch_names: Vec<String>,
    freqs: Vec<f32>,
    times: Vec<f32>,
    window_s: f32,
    step_s: f32,
    duration_s: f32,
}

impl SpectrogramResult {
    pub fn from_parts(
        power: Vec<Array2<f32>>,
        ch_names: Vec<String>,
        freqs: Vec<f32>,
        times: Vec<f32>,
        window_s: f32,
        step_s: f32,
        duration_s: f32,
    ) -> Self {
        Self { power, ch_names, freqs, times, window_s, step_s, duration_s }
    }

    pub fn power(&self) -> &[Array2<f32>] {
        &self.power
    }

    pub fn ch_names(&self) -> &[String] {
        &self.ch_names
    }

    /// Hz.
    pub fn freqs(&self) -> &[f32] {
        &self.freqs
    }

    /// Window centres, seconds.
    pub fn times(&self) -> &[f32] {
        &self.times
    }

    pub fn window_s(&self) -> f32 {
        self.window_s
    }

    pub fn step_s(&self) -> f32 {
        self.step_s
    }

    /// Duration of the analysed signal.
    pub fn duration_s(&self) -> f32 {
        self.duration_s
    }

    pub fn n_channels(&self) -> usize {
        self.power.len()
    }

    /// Time covered from the first window start to the last window end.
    pub fn span_s(&self) -> f32 {
        match self.times.len() {
            0 => 0.0,
            n => self.window_s + self.step_s * (n - 1) as f32,
        }
    }

    /// `10·log10(power)`, floored at the smallest positive `f32`.
    pub fn to_db(&self) -> Vec<Array2<f32>> {
        self.power
            .iter()
            .map(|p| p.mapv(|v| 10.0 * v.max(f32::MIN_POSITIVE).log10()))
            .collect()
    }
}
