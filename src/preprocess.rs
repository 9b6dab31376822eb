//! Resample → highpass → (normalise) → epoch.
//!
//! Resampling and filtering run exactly once per recording; the
//! [`CleanedSignal`] and the [`EpochArray`] are both cut from the same
//! filtered samples so classifier epochs line up with the spectrogram.
use log::debug;
use ndarray::Array2;

use crate::config::PipelineConfig;
use crate::epoch::EpochArray;
use crate::error::PreprocessError;
use crate::filter::FirHighpass;
use crate::normalize::{zscore_channels_inplace, ChannelStats};
use crate::recording::RawRecording;
use crate::resample::resample;

/// Recording after resampling and filtering, optionally normalised.
#[derive(Debug, Clone)]
pub struct CleanedSignal {
    data: Array2<f32>,
    sfreq: f32,
    ch_names: Vec<String>,
    /// Per-channel statistics if the signal was z-scored.
    stats: Option<Vec<ChannelStats>>,
}

impl CleanedSignal {
    /// `[C, T]` samples at [`Self::sfreq`].
    pub fn data(&self) -> &Array2<f32> {
        &self.data
    }

    pub fn sfreq(&self) -> f32 {
        self.sfreq
    }

    pub fn ch_names(&self) -> &[String] {
        &self.ch_names
    }

    pub fn is_normalized(&self) -> bool {
        self.stats.is_some()
    }

    pub fn channel_stats(&self) -> Option<&[ChannelStats]> {
        self.stats.as_deref()
    }

    pub fn n_channels(&self) -> usize {
        self.data.nrows()
    }

    #[inline]
    pub fn n_times(&self) -> usize {
        self.data.ncols()
    }

    #[inline]
    pub fn duration_secs(&self) -> f32 {
        self.n_times() as f32 / self.sfreq
    }
}

/// Run the preprocessing chain on one recording.
///
/// # Steps
///
/// 1. Resample to [`PipelineConfig::target_sfreq`] (FFT; skipped when the
///    source rate already matches).
/// 2. Zero-phase highpass FIR at [`PipelineConfig::hp_freq`].
/// 3. Per-channel z-score if [`PipelineConfig::normalize`]; otherwise the
///    signal stays in µV.
/// 4. Cut [`PipelineConfig::epoch_dur`]-second epochs; a trailing partial
///    epoch is dropped, a recording shorter than one epoch yields none.
///
/// # Errors
///
/// [`PreprocessError::NonFinite`] if resampling or filtering produces NaN
/// or infinity, [`PreprocessError::InvalidRate`] for unusable rates,
/// [`PreprocessError::InvalidCutoff`] for a highpass cutoff outside
/// `(0, target_sfreq / 2)`.
pub fn preprocess(
    raw: &RawRecording,
    cfg: &PipelineConfig,
) -> Result<(CleanedSignal, EpochArray), PreprocessError> {
    let src_sfreq = raw.sfreq() as f32;
    // Validates the cutoff before any work.
    let hp = FirHighpass::design(cfg.hp_freq, cfg.target_sfreq)?;

    // 1. Resample.
    let mut data = if (src_sfreq - cfg.target_sfreq).abs() > 1e-3 {
        resample(raw.data(), src_sfreq, cfg.target_sfreq)?
    } else {
        raw.data().clone()
    };
    ensure_finite(&data, "resampling")?;

    // 2. Highpass.
    hp.apply(&mut data);
    ensure_finite(&data, "highpass filtering")?;
    debug!(
        "resampled {} → {} Hz, {}-tap highpass at {} Hz",
        src_sfreq,
        cfg.target_sfreq,
        hp.len(),
        cfg.hp_freq
    );

    // 3. Normalise.
    let stats = cfg.normalize.then(|| zscore_channels_inplace(&mut data));

    // 4. Epoch.
    let epochs = EpochArray::from_signal(data.view(), cfg.target_sfreq, cfg.epoch_dur);
    debug!("{} epochs of {} s", epochs.len(), cfg.epoch_dur);

    let cleaned = CleanedSignal {
        data,
        sfreq: cfg.target_sfreq,
        ch_names: raw.ch_names().to_vec(),
        stats,
    };
    Ok((cleaned, epochs))
}

fn ensure_finite(data: &Array2<f32>, stage: &'static str) -> Result<(), PreprocessError> {
    match data
        .rows()
        .into_iter()
        .position(|row| row.iter().any(|v| !v.is_finite()))
    {
        Some(channel) => Err(PreprocessError::NonFinite { stage, channel }),
        None => Ok(()),
    }
}
