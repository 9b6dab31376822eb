//! Pipeline configuration.
//!
//! [`PipelineConfig`] holds every tunable parameter of the scoring pipeline.
//! All fields have defaults matching the settings the pretrained ezscore
//! models were trained with.
use std::fmt;
use std::str::FromStr;

use crate::error::ParseVariantError;

/// Which pretrained model family to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelVariant {
    /// Single model trained on per-channel z-scored input (`ez6`).
    Normalized,
    /// Single model trained on raw microvolt input (`ez6rt`).
    Raw,
    /// Ensemble of normalized-input models, probabilities averaged (`ez6moe`).
    Mixture,
}

impl ModelVariant {
    pub const ALL: [ModelVariant; 3] = [Self::Normalized, Self::Raw, Self::Mixture];

    /// Directory name of the artifact under the model root.
    pub fn artifact_name(self) -> &'static str {
        match self {
            Self::Normalized => "ez6",
            Self::Raw => "ez6rt",
            Self::Mixture => "ez6moe",
        }
    }

    /// Whether the model expects z-scored input.
    pub fn expects_normalized(self) -> bool {
        !matches!(self, Self::Raw)
    }

    pub fn is_ensemble(self) -> bool {
        matches!(self, Self::Mixture)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normalized => "normalized",
            Self::Raw => "raw",
            Self::Mixture => "mixture",
        }
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelVariant {
    type Err = ParseVariantError;

    /// Accepts the variant names and the artifact names (`ez6`, `ez6rt`, `ez6moe`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normalized" | "ez6" => Ok(Self::Normalized),
            "raw" | "ez6rt" => Ok(Self::Raw),
            "mixture" | "moe" | "ez6moe" => Ok(Self::Mixture),
            _ => Err(ParseVariantError(s.to_string())),
        }
    }
}

/// Multitaper spectrogram parameters.
///
/// These are fixed analysis constants, independent of the classifier's
/// epoch length.
#[derive(Debug, Clone)]
pub struct SpectralConfig {
    /// Time-half-bandwidth product `NW` of the DPSS tapers.
    ///
    /// Default: `3.0`.
    pub time_bandwidth: f32,

    /// Number of tapers averaged per window. Must not exceed `2·NW − 1`.
    ///
    /// Default: `5`.
    pub num_tapers: usize,

    /// Window length in seconds.
    ///
    /// Default: `4.0` s.
    pub window_s: f32,

    /// Hop between consecutive windows in seconds.
    ///
    /// Default: `1.0` s.
    pub step_s: f32,

    /// Lowest frequency kept in the output, Hz.
    pub min_freq: f32,

    /// Highest frequency kept in the output, Hz.
    ///
    /// Default: `25.0` Hz.
    pub max_freq: f32,
}

impl Default for SpectralConfig {
    fn default() -> Self {
        Self {
            time_bandwidth: 3.0,
            num_tapers: 5,
            window_s: 4.0,
            step_s: 1.0,
            min_freq: 0.0,
            max_freq: 25.0,
        }
    }
}

/// Configuration for the full scoring pipeline.
///
/// All fields are `pub` so you can construct one with struct-update syntax:
///
/// ```
/// use ezscore::PipelineConfig;
///
/// let cfg = PipelineConfig {
///     hp_freq: 0.3,
///     ..PipelineConfig::default()
/// };
/// assert_eq!(cfg.epoch_samples(), 1920);
/// ```
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Target sampling rate in Hz after resampling.
    ///
    /// The resampler is skipped when the source rate already equals this
    /// value (within 1 mHz).
    ///
    /// Default: `64.0` Hz.
    pub target_sfreq: f32,

    /// Cutoff of the zero-phase highpass FIR filter in Hz.
    ///
    /// At 0.5 Hz / 64 Hz the automatic design yields a 423-tap kernel.
    ///
    /// Default: `0.5` Hz.
    pub hp_freq: f32,

    /// Duration of one classification epoch in seconds.
    ///
    /// Default: `30.0` s (1 920 samples at 64 Hz).
    pub epoch_dur: f32,

    /// Z-score each channel before epoching.
    ///
    /// Derived from the model variant by [`PipelineConfig::for_variant`].
    ///
    /// Default: `true`.
    pub normalize: bool,

    /// Largest left/right length difference, in seconds, that is silently
    /// truncated away. Larger differences reject the recording.
    ///
    /// Default: `1.0` s.
    pub length_tolerance_s: f32,

    /// Multitaper spectrogram parameters.
    pub spectral: SpectralConfig,
}

impl Default for PipelineConfig {
    /// 64 Hz · 0.5 Hz HP · 30 s epochs · normalized input.
    fn default() -> Self {
        Self {
            target_sfreq: 64.0,
            hp_freq: 0.5,
            epoch_dur: 30.0,
            normalize: true,
            length_tolerance_s: 1.0,
            spectral: SpectralConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Defaults with `normalize` set to what `variant` was trained on.
    pub fn for_variant(variant: ModelVariant) -> Self {
        Self {
            normalize: variant.expects_normalized(),
            ..Self::default()
        }
    }

    /// Number of samples per epoch at the target sampling rate.
    ///
    /// ```
    /// use ezscore::PipelineConfig;
    /// assert_eq!(PipelineConfig::default().epoch_samples(), 1920);
    /// ```
    pub fn epoch_samples(&self) -> usize {
        (self.epoch_dur * self.target_sfreq).round() as usize
    }

    /// Length tolerance in samples at the given (source) sampling rate.
    pub fn length_tolerance_samples(&self, sfreq: f64) -> usize {
        (self.length_tolerance_s as f64 * sfreq).round().max(0.0) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_parses_aliases() {
        assert_eq!("ez6".parse::<ModelVariant>().unwrap(), ModelVariant::Normalized);
        assert_eq!("RAW".parse::<ModelVariant>().unwrap(), ModelVariant::Raw);
        assert_eq!("ez6moe".parse::<ModelVariant>().unwrap(), ModelVariant::Mixture);
        assert!("ez7".parse::<ModelVariant>().is_err());
    }

    #[test]
    fn normalize_follows_variant() {
        assert!(PipelineConfig::for_variant(ModelVariant::Normalized).normalize);
        assert!(PipelineConfig::for_variant(ModelVariant::Mixture).normalize);
        assert!(!PipelineConfig::for_variant(ModelVariant::Raw).normalize);
    }

    #[test]
    fn tolerance_in_samples() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.length_tolerance_samples(256.0), 256);
    }
}
