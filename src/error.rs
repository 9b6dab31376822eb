//! Error taxonomy, one enum per pipeline stage.
//!
//! Every stage returns its own error type so callers can tell a bad input
//! file from a broken model artifact.  [`PipelineError`] wraps all of them
//! for the per-recording driver in [`crate::pipeline`].
use std::path::PathBuf;
use thiserror::Error;

use crate::config::ModelVariant;

/// Reading or aligning the left/right recording pair failed.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("recording file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed EDF header in {}: {reason}", path.display())]
    Header { path: PathBuf, reason: String },

    #[error("cannot decode EDF data in {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },

    #[error("{} holds {found} data signals, expected exactly one", path.display())]
    NotSingleChannel { path: PathBuf, found: usize },

    #[error("{} contains no samples", .0.display())]
    Empty(PathBuf),

    #[error("sampling rate mismatch: left {left} Hz, right {right} Hz")]
    SampleRateMismatch { left: f64, right: f64 },

    #[error("length mismatch: left {left} samples, right {right} samples (tolerance {tolerance})")]
    LengthMismatch { left: usize, right: usize, tolerance: usize },

    #[error("cannot derive right-channel path from {}: stem must end in 'L'", .0.display())]
    NotLeftChannel(PathBuf),

    #[error("invalid glob pattern: {0}")]
    Pattern(String),
}

/// Resampling or filtering produced unusable samples.
#[derive(Error, Debug)]
pub enum PreprocessError {
    #[error("non-finite sample after {stage} on channel {channel}")]
    NonFinite { stage: &'static str, channel: usize },

    #[error("invalid sampling rate: {0} Hz")]
    InvalidRate(f32),

    #[error("highpass cutoff {hp_freq} Hz must be positive and below Nyquist ({nyquist} Hz)")]
    InvalidCutoff { hp_freq: f32, nyquist: f32 },
}

/// Loading or running the stage model failed.
#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("model artifact for '{variant}' is unavailable: {reason}")]
    ArtifactUnavailable { variant: ModelVariant, reason: String },

    #[error("failed to load model {}: {reason}", path.display())]
    ModelLoad { path: PathBuf, reason: String },

    #[error("{variant} expects {expected} model graph(s), found {found}")]
    MemberCount {
        variant: ModelVariant,
        expected: &'static str,
        found: usize,
    },

    #[error("epoch shape [{channels}, {samples}] does not match model input [{expected_channels}, {expected_samples}]")]
    ShapeMismatch {
        channels: usize,
        samples: usize,
        expected_channels: usize,
        expected_samples: usize,
    },

    #[error("model returned shape {got:?}, expected [{epochs}, {classes}]")]
    OutputShape { got: Vec<usize>, epochs: usize, classes: usize },

    #[error("inference failed: {0}")]
    Runtime(String),
}

/// An [`crate::classify::ArtifactProvider`] could not produce a local model
/// directory.
#[derive(Error, Debug, Clone)]
#[error("model artifact for '{variant}' is unavailable: {reason}")]
pub struct ArtifactUnavailable {
    pub variant: ModelVariant,
    pub reason: String,
}

impl From<ArtifactUnavailable> for InferenceError {
    fn from(e: ArtifactUnavailable) -> Self {
        Self::ArtifactUnavailable { variant: e.variant, reason: e.reason }
    }
}

/// The spectral estimator cannot run on this signal or configuration.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("signal has {samples} samples, multitaper window needs {window}")]
    TooShort { samples: usize, window: usize },

    #[error("invalid spectral configuration: {0}")]
    InvalidConfig(String),
}

/// Classification and spectrogram timelines disagree.
#[derive(Error, Debug)]
pub enum ConsistencyError {
    #[error("{epochs} epochs of {epoch_s} s do not tile a {duration_s} s recording")]
    EpochTimeline { epochs: usize, epoch_s: f32, duration_s: f32 },

    #[error("spectrogram spans {span_s} s, recording lasts {duration_s} s")]
    SpectrogramSpan { span_s: f32, duration_s: f32 },

    #[error("spectrogram channel {channel} has shape {got:?}, expected {expected:?}")]
    ChannelShape { channel: usize, got: [usize; 2], expected: [usize; 2] },
}

/// Any failure while processing one recording end-to-end.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Preprocess(#[from] PreprocessError),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Consistency(#[from] ConsistencyError),
}

/// Writing a summary or report failed.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("safetensors serialization failed: {0}")]
    SafeTensors(String),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Unknown `model_variant` string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown model variant '{0}' (expected normalized, raw or mixture)")]
pub struct ParseVariantError(pub String);
