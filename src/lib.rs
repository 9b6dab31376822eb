//! # ezscore: sleep staging for two-channel forehead EEG
//!
//! `ezscore` scores paired ZMax recordings (`… L.edf` / `… R.edf`) with a
//! pretrained six-class network and computes the multitaper spectrograms
//! that accompany the hypnogram. Everything runs in Rust: EDF parsing,
//! FFT resampling, FIR filtering, ONNX inference via
//! [tract](https://crates.io/crates/tract-onnx) and DPSS tapers.
//!
//! ## Pipeline overview
//!
//! ```text
//! EEG L.edf + EEG R.edf
//!   │
//!   ├─ recording::load_pair()   edf-reader decode, µV, [left, right]
//!   ├─ resample::resample()     FFT → target_sfreq (default 64 Hz)
//!   ├─ filter (FIR HP)          firwin + overlap-add → 0.5 Hz cutoff
//!   ├─ normalize (z-score)      per channel, skipped for the raw model
//!   ├─ epoch                    non-overlapping 30 s windows [E, 2, 1920]
//!   │    │
//!   │    └─ classify            ez6 / ez6rt / ez6moe → [E, 6] + hypnogram
//!   │
//!   ├─ spectral                 multitaper, NW = 3, K = 5, 4 s / 1 s
//!   └─ summary::assemble()      timeline checks → SummaryBundle
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use ezscore::{
//!     discover_pairs, LocalArtifacts, ModelCache, ModelVariant, Pipeline, PipelineConfig,
//! };
//!
//! let variant = ModelVariant::Normalized;
//! let mut models = ModelCache::new(LocalArtifacts::new("model"));
//! let classifier = models.get_or_load(variant).unwrap();
//!
//! let pipeline = Pipeline::new(&classifier, PipelineConfig::for_variant(variant)).unwrap();
//! for outcome in pipeline.score_batch(&discover_pairs("data").unwrap()) {
//!     match outcome.result {
//!         Ok(bundle) => println!("{}: {:?}", outcome.pair.id(), bundle.classification().hypnogram_codes()),
//!         Err(e) => eprintln!("{}: {e}", outcome.pair.id()),
//!     }
//! }
//! ```
//!
//! ## Running individual steps
//!
//! ```no_run
//! use ezscore::recording::{load_pair, RecordingPair};
//! use ezscore::preprocess::preprocess;
//! use ezscore::spectral::multitaper_spectrogram;
//! use ezscore::PipelineConfig;
//!
//! let cfg = PipelineConfig::default();
//! let raw = load_pair(&RecordingPair::from_left("night1/EEG L.edf").unwrap(), &cfg).unwrap();
//! let (cleaned, epochs) = preprocess(&raw, &cfg).unwrap();
//! let spec = multitaper_spectrogram(&cleaned, &cfg.spectral).unwrap();
//! println!("{} epochs, {} windows", epochs.len(), spec.times().len());
//! ```

pub mod classify;
pub mod config;
pub mod edf;
pub mod epoch;
pub mod error;
pub mod filter;
pub mod io;
pub mod normalize;
pub mod pipeline;
pub mod preprocess;
pub mod recording;
pub mod resample;
pub mod spectral;
pub mod summary;

// ── Crate-root re-exports ─────────────────────────────────────────────────

// config
pub use config::{ModelVariant, PipelineConfig, SpectralConfig};

// errors
pub use error::{
    AnalysisError, ArtifactUnavailable, ConsistencyError, ExportError, InferenceError, LoadError,
    PipelineError, PreprocessError,
};

// recording
pub use recording::{discover_pairs, load_pair, ChannelTrace, RawRecording, RecordingPair};

// preprocessing
pub use epoch::{epoch, EpochArray};
pub use normalize::{zscore_channels_inplace, ChannelStats};
pub use preprocess::{preprocess, CleanedSignal};

// classification
pub use classify::{
    ArtifactProvider, ClassificationResult, LocalArtifacts, ModelCache, OnnxModel, SleepStage,
    StageClassifier, StageModel,
};

// spectral
pub use spectral::{multitaper_spectrogram, MultitaperAnalyzer, SpectrogramResult};

// summary + driver
pub use pipeline::{score_batch, score_pair, score_recording, BatchOutcome, Pipeline};
pub use summary::{assemble, SummaryBundle};

// io
pub use io::{write_report, write_summary, BatchReport, ReportEntry, TensorWriter};
