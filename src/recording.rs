//! Paired left/right recording loader.
//!
//! A ZMax night is two single-channel EDF files that share a stem and differ
//! only in a trailing `L` / `R` (`EEG L.edf`, `EEG R.edf`). Loading pairs
//! them into one time-aligned [`RawRecording`].
use std::path::{Path, PathBuf};

use log::{debug, warn};
use ndarray::{Array2, ArrayView1};

use crate::config::PipelineConfig;
use crate::edf::open_edf;
use crate::error::LoadError;

// ── Pair naming ───────────────────────────────────────────────────────────

/// Paths of one left/right recording pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct RecordingPair {
    pub left: PathBuf,
    pub right: PathBuf,
}

impl RecordingPair {
    pub fn new(left: impl Into<PathBuf>, right: impl Into<PathBuf>) -> Self {
        Self { left: left.into(), right: right.into() }
    }

    /// Derive the right-channel path by swapping the trailing `L` of the stem.
    pub fn from_left(left: impl AsRef<Path>) -> Result<Self, LoadError> {
        let left = left.as_ref();
        let not_left = || LoadError::NotLeftChannel(left.to_path_buf());
        let stem = left.file_stem().and_then(|s| s.to_str()).ok_or_else(not_left)?;
        let base = stem.strip_suffix('L').ok_or_else(not_left)?;
        let mut name = format!("{base}R");
        if let Some(ext) = left.extension().and_then(|e| e.to_str()) {
            name.push('.');
            name.push_str(ext);
        }
        Ok(Self { left: left.to_path_buf(), right: left.with_file_name(name) })
    }

    /// `<dir>/<stem>L.edf` and `<dir>/<stem>R.edf`.
    pub fn from_stem(dir: impl AsRef<Path>, stem: &str) -> Self {
        let dir = dir.as_ref();
        Self {
            left: dir.join(format!("{stem}L.edf")),
            right: dir.join(format!("{stem}R.edf")),
        }
    }

    /// Identifier used for reports and output file names:
    /// `<parent dir>_<shared stem>`, whitespace replaced by `_`.
    pub fn id(&self) -> String {
        let stem = self
            .left
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        let stem = stem.strip_suffix('L').unwrap_or(stem).trim();
        let parent = self
            .left
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|p| p.to_str())
            .unwrap_or_default();
        let id = match (parent.is_empty(), stem.is_empty()) {
            (true, true) => "recording".to_string(),
            (true, false) => stem.to_string(),
            (false, true) => parent.to_string(),
            (false, false) => format!("{parent}_{stem}"),
        };
        id.split_whitespace().collect::<Vec<_>>().join("_")
    }
}

/// Every `*L.edf` below `dir`, paired with its right channel, sorted by path.
pub fn discover_pairs(dir: impl AsRef<Path>) -> Result<Vec<RecordingPair>, LoadError> {
    let pattern = dir.as_ref().join("**").join("*L.edf");
    let pattern = pattern.to_string_lossy();
    let entries = glob::glob(&pattern).map_err(|e| LoadError::Pattern(e.to_string()))?;

    let mut pairs = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) => pairs.push(RecordingPair::from_left(path)?),
            Err(e) => warn!("skipping unreadable path: {e}"),
        }
    }
    pairs.sort();
    Ok(pairs)
}

// ── Channel traces ────────────────────────────────────────────────────────

/// One single-channel trace before pairing.
#[derive(Debug, Clone)]
pub struct ChannelTrace {
    /// Samples in µV.
    pub samples: Vec<f32>,
    pub sfreq: f64,
    pub label: String,
    pub source: PathBuf,
}

impl ChannelTrace {
    /// Read the only data signal of an EDF file.
    pub fn from_edf(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let edf = open_edf(path.as_ref())?;
        let idx = edf.single_signal()?;
        let samples = edf.read_signal(idx);
        Ok(Self {
            samples,
            sfreq: edf.sfreq(idx),
            label: edf.signal(idx).label.clone(),
            source: edf.path.clone(),
        })
    }
}

// ── RawRecording ──────────────────────────────────────────────────────────

/// Two time-aligned forehead channels, ordered `[left, right]`.
///
/// Immutable once constructed; both channels share one length and rate.
#[derive(Debug, Clone)]
pub struct RawRecording {
    data: Array2<f32>,
    sfreq: f64,
    ch_names: Vec<String>,
    sources: Vec<PathBuf>,
}

impl RawRecording {
    /// Pair two traces.
    ///
    /// Lengths differing by at most `tolerance` samples are truncated to the
    /// shorter one; anything else is rejected.
    pub fn from_traces(
        left: ChannelTrace,
        right: ChannelTrace,
        tolerance: usize,
    ) -> Result<Self, LoadError> {
        if left.samples.is_empty() {
            return Err(LoadError::Empty(left.source));
        }
        if right.samples.is_empty() {
            return Err(LoadError::Empty(right.source));
        }
        if (left.sfreq - right.sfreq).abs() > 1e-6 {
            return Err(LoadError::SampleRateMismatch { left: left.sfreq, right: right.sfreq });
        }

        let (n_l, n_r) = (left.samples.len(), right.samples.len());
        if n_l.abs_diff(n_r) > tolerance {
            return Err(LoadError::LengthMismatch { left: n_l, right: n_r, tolerance });
        }
        let n = n_l.min(n_r);
        if n_l != n_r {
            warn!(
                "left/right lengths differ by {} samples, truncating to {n}",
                n_l.abs_diff(n_r)
            );
        }

        let mut data = Array2::<f32>::zeros((2, n));
        data.row_mut(0).assign(&ArrayView1::from(&left.samples[..n]));
        data.row_mut(1).assign(&ArrayView1::from(&right.samples[..n]));

        Ok(Self {
            data,
            sfreq: left.sfreq,
            ch_names: vec![left.label, right.label],
            sources: vec![left.source, right.source],
        })
    }

    /// `[2, T]` samples in µV.
    pub fn data(&self) -> &Array2<f32> {
        &self.data
    }

    pub fn sfreq(&self) -> f64 {
        self.sfreq
    }

    pub fn ch_names(&self) -> &[String] {
        &self.ch_names
    }

    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    #[inline]
    pub fn n_times(&self) -> usize {
        self.data.ncols()
    }

    #[inline]
    pub fn duration_secs(&self) -> f64 {
        self.n_times() as f64 / self.sfreq
    }
}

/// Load and align a left/right pair.
///
/// No partial recording is returned: any failure on either side rejects
/// the pair.
pub fn load_pair(pair: &RecordingPair, cfg: &PipelineConfig) -> Result<RawRecording, LoadError> {
    let left = ChannelTrace::from_edf(&pair.left)?;
    let right = ChannelTrace::from_edf(&pair.right)?;
    let tolerance = cfg.length_tolerance_samples(left.sfreq);
    let raw = RawRecording::from_traces(left, right, tolerance)?;
    debug!(
        "loaded {}: {} samples @ {} Hz ({:.1} s)",
        pair.id(),
        raw.n_times(),
        raw.sfreq(),
        raw.duration_secs()
    );
    Ok(raw)
}
