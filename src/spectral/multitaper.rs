//! Sliding-window multitaper spectrogram.
//!
//! For every window `w` of `L` samples, hop `H`:
//!
//! ```text
//!   x_w     = x[w·H .. w·H + L] − mean            constant detrend
//!   X_k     = FFT_nfft(x_w · v_k)                 k = 0 … K−1
//!   S(f)    = Σ_k |X_k(f)|² / (K · fs)            unity weights
//!   S(f)   *= 2  for 0 < f < fs/2                 one-sided
//! ```
//!
//! `nfft` is the next power of two ≥ `L`. Window times are centres.
use std::ops::RangeInclusive;
use std::sync::Arc;

use log::debug;
use ndarray::Array2;
use rustfft::{num_complex::Complex, Fft, FftPlanner};

use super::dpss::dpss;
use super::SpectrogramResult;
use crate::config::SpectralConfig;
use crate::error::AnalysisError;
use crate::preprocess::CleanedSignal;

/// Tapers and FFT plan for one configuration and sampling rate.
pub struct MultitaperAnalyzer {
    cfg: SpectralConfig,
    sfreq: f32,
    win: usize,
    step: usize,
    nfft: usize,
    bins: RangeInclusive<usize>,
    tapers: Vec<Vec<f64>>,
    fft: Arc<dyn Fft<f64>>,
}

impl MultitaperAnalyzer {
    /// Validate `cfg` against `sfreq` and precompute the tapers.
    pub fn new(cfg: &SpectralConfig, sfreq: f32) -> Result<Self, AnalysisError> {
        let invalid = |msg: String| Err(AnalysisError::InvalidConfig(msg));
        if !(sfreq.is_finite() && sfreq > 0.0) {
            return invalid(format!("sampling rate {sfreq} Hz"));
        }
        if !(cfg.window_s > 0.0 && cfg.step_s > 0.0) {
            return invalid(format!("window {} s / step {} s must be positive", cfg.window_s, cfg.step_s));
        }
        let win = (cfg.window_s * sfreq).round() as usize;
        let step = ((cfg.step_s * sfreq).round() as usize).max(1);
        if win < 2 {
            return invalid(format!("window of {win} samples"));
        }
        let max_tapers = (2.0 * cfg.time_bandwidth - 1.0).floor();
        if cfg.num_tapers == 0 || cfg.num_tapers as f32 > max_tapers {
            return invalid(format!(
                "{} tapers with NW = {} (at most {max_tapers})",
                cfg.num_tapers, cfg.time_bandwidth
            ));
        }

        let nfft = win.next_power_of_two();
        let df = sfreq / nfft as f32;
        let nyq_bin = nfft / 2;
        let lo = (cfg.min_freq.max(0.0) / df).ceil() as usize;
        let hi = ((cfg.max_freq / df).floor().max(0.0) as usize).min(nyq_bin);
        if !(cfg.max_freq > cfg.min_freq) || lo > hi {
            return invalid(format!("empty frequency range {} to {} Hz", cfg.min_freq, cfg.max_freq));
        }

        let tapers = dpss(win, cfg.time_bandwidth as f64, cfg.num_tapers)?;
        let fft = FftPlanner::<f64>::new().plan_fft_forward(nfft);
        debug!(
            "multitaper: {win}-sample window, {step}-sample step, nfft {nfft}, {} tapers, bins {lo}..={hi}",
            tapers.len()
        );
        Ok(Self { cfg: cfg.clone(), sfreq, win, step, nfft, bins: lo..=hi, tapers, fft })
    }

    pub fn config(&self) -> &SpectralConfig {
        &self.cfg
    }

    pub fn window_samples(&self) -> usize {
        self.win
    }

    pub fn step_samples(&self) -> usize {
        self.step
    }

    pub fn nfft(&self) -> usize {
        self.nfft
    }

    pub fn tapers(&self) -> &[Vec<f64>] {
        &self.tapers
    }

    /// Frequency axis in Hz.
    pub fn freqs(&self) -> Vec<f32> {
        let df = self.sfreq / self.nfft as f32;
        self.bins.clone().map(|k| k as f32 * df).collect()
    }

    /// Number of complete windows in `n_times` samples.
    pub fn n_windows(&self, n_times: usize) -> usize {
        if n_times < self.win {
            0
        } else {
            (n_times - self.win) / self.step + 1
        }
    }

    /// Window centres in seconds.
    pub fn times(&self, n_times: usize) -> Vec<f32> {
        (0..self.n_windows(n_times))
            .map(|w| (w * self.step) as f32 / self.sfreq + self.win as f32 / (2.0 * self.sfreq))
            .collect()
    }

    /// `[F, W]` power of a single channel.
    pub fn channel_spectrogram(&self, x: &[f32]) -> Result<Array2<f32>, AnalysisError> {
        let n_win = self.n_windows(x.len());
        if n_win == 0 {
            return Err(AnalysisError::TooShort { samples: x.len(), window: self.win });
        }

        let n_freq = self.bins.end() - self.bins.start() + 1;
        let mut out = Array2::<f32>::zeros((n_freq, n_win));
        let mut buf = vec![Complex::<f64>::default(); self.nfft];
        let mut acc = vec![0.0_f64; n_freq];
        let scale = 1.0 / (self.tapers.len() as f64 * self.sfreq as f64);
        let nyq_bin = self.nfft / 2;

        for w in 0..n_win {
            let seg = &x[w * self.step..w * self.step + self.win];
            let mean = seg.iter().map(|&v| v as f64).sum::<f64>() / self.win as f64;

            acc.fill(0.0);
            for taper in &self.tapers {
                buf.fill(Complex::default());
                for ((b, &v), &t) in buf.iter_mut().zip(seg).zip(taper) {
                    b.re = (v as f64 - mean) * t;
                }
                self.fft.process(&mut buf);
                for (a, k) in acc.iter_mut().zip(self.bins.clone()) {
                    *a += buf[k].norm_sqr();
                }
            }

            for (fi, (a, k)) in acc.iter().zip(self.bins.clone()).enumerate() {
                let one_sided = if k == 0 || (self.nfft % 2 == 0 && k == nyq_bin) { 1.0 } else { 2.0 };
                out[[fi, w]] = (a * scale * one_sided) as f32;
            }
        }
        Ok(out)
    }

    /// Spectrogram of every channel of `signal`.
    pub fn analyze(&self, signal: &CleanedSignal) -> Result<SpectrogramResult, AnalysisError> {
        if (signal.sfreq() - self.sfreq).abs() > 1e-3 {
            return Err(AnalysisError::InvalidConfig(format!(
                "analyzer built for {} Hz, signal is {} Hz",
                self.sfreq,
                signal.sfreq()
            )));
        }
        let n_times = signal.n_times();
        let power = signal
            .data()
            .rows()
            .into_iter()
            .map(|row| match row.as_slice() {
                Some(x) => self.channel_spectrogram(x),
                None => self.channel_spectrogram(&row.to_vec()),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SpectrogramResult::from_parts(
            power,
            signal.ch_names().to_vec(),
            self.freqs(),
            self.times(n_times),
            self.win as f32 / self.sfreq,
            self.step as f32 / self.sfreq,
            signal.duration_secs(),
        ))
    }
}

/// One-shot helper: build an analyzer for `signal` and run it.
pub fn multitaper_spectrogram(
    signal: &CleanedSignal,
    cfg: &SpectralConfig,
) -> Result<SpectrogramResult, AnalysisError> {
    MultitaperAnalyzer::new(cfg, signal.sfreq())?.analyze(signal)
}
