//! EDF reading on top of the `edf-reader` crate.
//!
//! `edf-reader` parses the headers, decodes the 16-bit data records and
//! calibrates digital samples to physical units:
//!
//! ```text
//! phys[t] = (digital[t] − dig_min) × (phys_max − phys_min) / (dig_max − dig_min) + phys_min
//! µV[t]   = phys[t] × unit_scale          V → 1e6, mV → 1e3, nV → 1e-3, µV → 1
//! ```
//!
//! This module adds the unit conversion and single-signal lookup the
//! loader needs.
use std::fmt::Display;
use std::path::{Path, PathBuf};

use edf_reader::file_reader::LocalFileReader;
use edf_reader::sync_reader::SyncEDFReader;
use log::debug;

use crate::error::LoadError;

/// Label EDF+ uses for its annotation channel.
pub const ANNOTATION_LABEL: &str = "EDF Annotations";

/// Multiplier from a physical unit to microvolts.
///
/// Unknown or empty units are taken to already be microvolts.
pub fn microvolt_scale(physical_dimension: &str) -> f64 {
    match physical_dimension.trim() {
        "V" => 1e6,
        "mV" => 1e3,
        "nV" => 1e-3,
        _ => 1.0,
    }
}

/// Per-signal header fields the pipeline uses.
#[derive(Debug, Clone, PartialEq)]
pub struct EdfSignal {
    pub label: String,
    pub physical_dimension: String,
    pub samples_per_record: usize,
}

impl EdfSignal {
    pub fn is_annotation(&self) -> bool {
        self.label == ANNOTATION_LABEL
    }
}

/// A decoded EDF file, samples in their physical units.
#[derive(Debug, Clone)]
pub struct EdfFile {
    pub path: PathBuf,
    pub signals: Vec<EdfSignal>,
    pub n_records: usize,
    /// Duration of one data record in seconds.
    pub record_duration: f64,
    data: Vec<Vec<f32>>,
}

fn malformed(path: &Path, reason: impl Display) -> LoadError {
    LoadError::Header { path: path.to_path_buf(), reason: reason.to_string() }
}

/// Open an EDF file and decode every data record.
pub fn open_edf<P: AsRef<Path>>(path: P) -> Result<EdfFile, LoadError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(LoadError::FileNotFound(path.to_path_buf()));
    }
    let path_str = path.to_string_lossy();
    let file_reader = LocalFileReader::init(&*path_str).map_err(|e| malformed(path, e))?;
    let reader = SyncEDFReader::init_with_file_reader(file_reader).map_err(|e| malformed(path, e))?;

    let header = &reader.edf_header;
    let signals: Vec<EdfSignal> = header
        .channels
        .iter()
        .map(|c| EdfSignal {
            label: c.label.trim().to_string(),
            physical_dimension: c.physical_dimension.trim().to_string(),
            samples_per_record: c.number_of_samples_in_data_record as usize,
        })
        .collect();
    let record_ms = header.block_duration as u64;
    let n_records = header.number_of_blocks as u64;
    if record_ms == 0 {
        return Err(malformed(path, "data record duration is zero"));
    }

    let data = if n_records == 0 {
        vec![Vec::new(); signals.len()]
    } else {
        reader
            .read_data_window(0, record_ms * n_records)
            .map_err(|e| LoadError::Decode { path: path.to_path_buf(), reason: e.to_string() })?
    };
    if data.len() != signals.len() {
        return Err(LoadError::Decode {
            path: path.to_path_buf(),
            reason: format!("{} signal headers but {} decoded signals", signals.len(), data.len()),
        });
    }
    debug!(
        "{}: {} signal(s), {n_records} records of {record_ms} ms",
        path.display(),
        signals.len()
    );

    Ok(EdfFile {
        path: path.to_path_buf(),
        signals,
        n_records: n_records as usize,
        record_duration: record_ms as f64 / 1000.0,
        data,
    })
}

impl EdfFile {
    pub fn signal(&self, idx: usize) -> &EdfSignal {
        &self.signals[idx]
    }

    /// Sampling rate of signal `idx` in Hz.
    pub fn sfreq(&self, idx: usize) -> f64 {
        self.signals[idx].samples_per_record as f64 / self.record_duration
    }

    /// Samples decoded for signal `idx`.
    pub fn n_samples(&self, idx: usize) -> usize {
        self.data[idx].len()
    }

    /// Index of the only data signal, or [`LoadError::NotSingleChannel`].
    pub fn single_signal(&self) -> Result<usize, LoadError> {
        let data: Vec<usize> = self
            .signals
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.is_annotation())
            .map(|(i, _)| i)
            .collect();
        match data.as_slice() {
            [idx] => Ok(*idx),
            other => Err(LoadError::NotSingleChannel { path: self.path.clone(), found: other.len() }),
        }
    }

    /// Samples of signal `idx` in microvolts.
    pub fn read_signal(&self, idx: usize) -> Vec<f32> {
        let scale = microvolt_scale(&self.signals[idx].physical_dimension);
        self.data[idx].iter().map(|&v| (v as f64 * scale) as f32).collect()
    }
}
