//! FIR highpass design (MNE / `scipy.signal.firwin` conventions).
//!
//! For a highpass at `l_freq` Hz and sampling rate `sfreq`:
//!   • transition bandwidth = min(max(0.25 · l_freq, 2.0), l_freq)
//!   • filter length N      = ceil(3.3 / trans_bw · sfreq), rounded to odd
//!   • Hamming-windowed sinc lowpass at the transition midpoint,
//!     spectrally inverted
use std::f64::consts::PI;

use ndarray::Array2;

use super::apply::apply_fir_zero_phase;
use crate::error::PreprocessError;

/// Transition bandwidth for a highpass: `min(max(0.25 · l_freq, 2.0), l_freq)`.
pub fn auto_trans_bandwidth(l_freq: f32) -> f32 {
    (0.25 * l_freq).max(2.0).min(l_freq)
}

/// Number of taps for a transition bandwidth: `ceil(3.3 / trans_bw · sfreq)`,
/// bumped to the next odd integer.
pub fn auto_filter_length(trans_bw: f32, sfreq: f32) -> usize {
    let n_raw = (3.3 / trans_bw * sfreq).ceil() as usize;
    if n_raw % 2 == 0 { n_raw + 1 } else { n_raw }
}

/// Zero-phase linear-phase FIR highpass.
#[derive(Debug, Clone)]
pub struct FirHighpass {
    /// Passband edge in Hz.
    pub l_freq: f32,
    /// Transition bandwidth in Hz.
    pub trans_bw: f32,
    pub sfreq: f32,
    taps: Vec<f32>,
}

impl FirHighpass {
    /// Design the filter with automatic transition band and length.
    ///
    /// Matches `mne.filter.create_filter(l_freq=l_freq, h_freq=None,
    /// fir_window='hamming', fir_design='firwin', phase='zero')`.
    ///
    /// # Errors
    ///
    /// [`PreprocessError::InvalidRate`] for a non-positive `sfreq`,
    /// [`PreprocessError::InvalidCutoff`] unless `0 < l_freq < sfreq / 2`.
    pub fn design(l_freq: f32, sfreq: f32) -> Result<Self, PreprocessError> {
        if !sfreq.is_finite() || sfreq <= 0.0 {
            return Err(PreprocessError::InvalidRate(sfreq));
        }
        let nyquist = sfreq / 2.0;
        if !l_freq.is_finite() || l_freq <= 0.0 || l_freq >= nyquist {
            return Err(PreprocessError::InvalidCutoff { hp_freq: l_freq, nyquist });
        }
        let trans_bw = auto_trans_bandwidth(l_freq);
        let n = auto_filter_length(trans_bw, sfreq);
        let cutoff_hz = l_freq - trans_bw / 2.0;

        let mut h = firwin_lowpass(n, cutoff_hz, sfreq);
        // highpass = delta[N/2] − lowpass
        h.iter_mut().for_each(|v| *v = -*v);
        h[n / 2] += 1.0;

        Ok(Self {
            l_freq,
            trans_bw,
            sfreq,
            taps: h.into_iter().map(|v| v as f32).collect(),
        })
    }

    /// Impulse response (odd length, symmetric).
    pub fn taps(&self) -> &[f32] {
        &self.taps
    }

    pub fn len(&self) -> usize {
        self.taps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taps.is_empty()
    }

    /// Filter every channel of `data` ([C, T]) in place.
    pub fn apply(&self, data: &mut Array2<f32>) {
        apply_fir_zero_phase(data, &self.taps);
    }
}

/// Hamming-windowed sinc lowpass with unit DC gain.
///
/// `cutoff_hz` is the −6 dB point; `n` must be odd.
pub fn firwin_lowpass(n: usize, cutoff_hz: f32, sfreq: f32) -> Vec<f64> {
    assert!(n % 2 == 1, "firwin requires odd N for linear-phase filter");
    let alpha = (n - 1) as f64 / 2.0;
    let fc = cutoff_hz as f64 / (sfreq as f64 / 2.0);

    let mut h: Vec<f64> = hamming(n)
        .into_iter()
        .enumerate()
        .map(|(i, w)| {
            let x = i as f64 - alpha;
            // lim x→0 of sin(π·fc·x) / (π·x) = fc
            let sinc = if x == 0.0 { fc } else { (PI * fc * x).sin() / (PI * x) };
            sinc * w
        })
        .collect();

    let s: f64 = h.iter().sum();
    h.iter_mut().for_each(|v| *v /= s);
    h
}

/// Hamming window of length `n`.
pub fn hamming(n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![1.0];
    }
    (0..n)
        .map(|i| 0.54 - 0.46 * (2.0 * PI * i as f64 / (n - 1) as f64).cos())
        .collect()
}
