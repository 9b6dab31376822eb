//! Summary and report export.
//!
//! A [`SummaryBundle`] is written as one safetensors file:
//!
//! ```text
//!   probabilities    [E, 6]   F32
//!   hypnogram        [E]      I32   codes 1..=6
//!   freqs            [F]      F32   Hz
//!   times            [W]      F32   window centres, s
//!   spectrogram_<c>  [F, W]   F32   one per channel
//!
//!   metadata: model_variant, epoch_duration_s, duration_s, channels
//! ```
//!
//! Batch outcomes go to a JSON report.
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use ndarray::Array2;
use safetensors::tensor::{Dtype, TensorView};
use serde::{Deserialize, Serialize};

use crate::classify::SleepStage;
use crate::config::ModelVariant;
use crate::error::ExportError;
use crate::pipeline::BatchOutcome;
use crate::summary::SummaryBundle;

// ── Generic safetensors builder ──────────────────────────────────────────────

/// Collects little-endian tensors and string metadata, then writes one file.
///
/// ```rust,no_run
/// use ezscore::io::TensorWriter;
/// let mut w = TensorWriter::new();
/// w.add_f32("signal", &[1.0f32, 2.0, 3.0], &[1, 3]);
/// w.add_i32("labels", &[1, 2, 3], &[3]);
/// w.add_metadata("units", "uV");
/// w.write("/tmp/out.safetensors").unwrap();
/// ```
#[derive(Debug, Default)]
pub struct TensorWriter {
    entries: Vec<(String, Dtype, Vec<usize>, Vec<u8>)>,
    metadata: HashMap<String, String>,
}

impl TensorWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_f32(&mut self, name: &str, data: &[f32], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), Dtype::F32, shape.to_vec(), bytes));
    }

    pub fn add_f32_arr2(&mut self, name: &str, arr: &Array2<f32>) {
        let data: Vec<f32> = arr.iter().copied().collect();
        self.add_f32(name, &data, &[arr.nrows(), arr.ncols()]);
    }

    pub fn add_i32(&mut self, name: &str, data: &[i32], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), Dtype::I32, shape.to_vec(), bytes));
    }

    pub fn add_metadata(&mut self, key: &str, value: impl Into<String>) {
        self.metadata.insert(key.to_string(), value.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), ExportError> {
        let st_err = |e: safetensors::SafeTensorError| ExportError::SafeTensors(e.to_string());
        let views = self
            .entries
            .iter()
            .map(|(name, dtype, shape, bytes)| {
                TensorView::new(*dtype, shape.clone(), bytes).map(|v| (name.clone(), v))
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(st_err)?;
        let metadata = (!self.metadata.is_empty()).then(|| self.metadata.clone());
        safetensors::serialize_to_file(views, &metadata, path.as_ref()).map_err(st_err)
    }
}

// ── Summary ──────────────────────────────────────────────────────────────────

/// `hypnos_<id>_<artifact>.safetensors`.
pub fn summary_file_name(id: &str, variant: ModelVariant) -> String {
    format!("hypnos_{id}_{}.safetensors", variant.artifact_name())
}

/// Write one bundle (layout in the module docs).
pub fn write_summary(bundle: &SummaryBundle, path: impl AsRef<Path>) -> Result<(), ExportError> {
    let cls = bundle.classification();
    let spec = bundle.spectrogram();

    let mut w = TensorWriter::new();
    w.add_f32_arr2("probabilities", cls.probabilities());
    w.add_i32("hypnogram", &cls.hypnogram_codes(), &[cls.len()]);
    w.add_f32("freqs", spec.freqs(), &[spec.freqs().len()]);
    w.add_f32("times", spec.times(), &[spec.times().len()]);
    for (c, p) in spec.power().iter().enumerate() {
        w.add_f32_arr2(&format!("spectrogram_{c}"), p);
    }

    w.add_metadata("model_variant", bundle.variant().as_str());
    w.add_metadata("epoch_duration_s", cls.epoch_dur().to_string());
    w.add_metadata("duration_s", bundle.duration_s().to_string());
    w.add_metadata("channels", spec.ch_names().join(","));
    w.write(path)
}

// ── Report ───────────────────────────────────────────────────────────────────

/// One line of the batch report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub id: String,
    pub left: PathBuf,
    pub right: PathBuf,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epochs: Option<usize>,
    /// Epochs per stage label, successful recordings only.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub stages: BTreeMap<String, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    pub elapsed_s: f64,
}

impl ReportEntry {
    pub fn from_outcome(outcome: &BatchOutcome, output: Option<PathBuf>) -> Self {
        let (ok, error, epochs, stages) = match &outcome.result {
            Ok(bundle) => {
                let cls = bundle.classification();
                let stages = SleepStage::ALL
                    .iter()
                    .zip(cls.stage_counts())
                    .map(|(s, n)| (s.label().to_string(), n))
                    .collect();
                (true, None, Some(cls.len()), stages)
            }
            Err(e) => (false, Some(e.to_string()), None, BTreeMap::new()),
        };
        Self {
            id: outcome.pair.id(),
            left: outcome.pair.left.clone(),
            right: outcome.pair.right.clone(),
            ok,
            error,
            epochs,
            stages,
            output,
            elapsed_s: outcome.elapsed.as_secs_f64(),
        }
    }

    /// Scored, but the summary could not be written: the entry counts as failed.
    pub fn with_export_error(mut self, err: &ExportError) -> Self {
        self.ok = false;
        self.error = Some(format!("summary export failed: {err}"));
        self.output = None;
        self
    }
}

/// The whole batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub model_variant: String,
    pub succeeded: usize,
    pub failed: usize,
    pub recordings: Vec<ReportEntry>,
}

impl BatchReport {
    pub fn new(variant: ModelVariant, recordings: Vec<ReportEntry>) -> Self {
        let succeeded = recordings.iter().filter(|r| r.ok).count();
        Self {
            model_variant: variant.as_str().to_string(),
            succeeded,
            failed: recordings.len() - succeeded,
            recordings,
        }
    }
}

/// Pretty-printed JSON.
pub fn write_report(report: &BatchReport, path: impl AsRef<Path>) -> Result<(), ExportError> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json).map_err(|source| ExportError::Io { path: path.to_path_buf(), source })
}

pub fn read_report(path: impl AsRef<Path>) -> Result<BatchReport, ExportError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|source| ExportError::Io { path: path.to_path_buf(), source })?;
    Ok(serde_json::from_str(&text)?)
}
