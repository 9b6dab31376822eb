//! Per-recording driver and parallel batch runner.
//!
//! ```text
//! RecordingPair ─ load_pair ─→ RawRecording ─ preprocess ─┬─→ EpochArray ─ classify ──┐
//!                                                         └─→ CleanedSignal ─ analyze ─┴─ assemble ─→ SummaryBundle
//! ```
//!
//! A batch runs recordings on the current rayon pool; one recording's
//! failure is reported in its own [`BatchOutcome`] and never aborts the rest.
use std::time::{Duration, Instant};

use log::{info, warn};
use rayon::prelude::*;

use crate::classify::{StageClassifier, StageModel};
use crate::config::PipelineConfig;
use crate::error::{AnalysisError, PipelineError};
use crate::preprocess::preprocess;
use crate::recording::{load_pair, RawRecording, RecordingPair};
use crate::spectral::MultitaperAnalyzer;
use crate::summary::{assemble, SummaryBundle};

/// Result of one recording in a batch.
#[derive(Debug)]
pub struct BatchOutcome {
    pub pair: RecordingPair,
    pub result: Result<SummaryBundle, PipelineError>,
    pub elapsed: Duration,
}

impl BatchOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// A loaded classifier plus the tapers for the configured target rate.
///
/// `Sync`: one instance serves every worker of a batch.
pub struct Pipeline<'a, M> {
    classifier: &'a StageClassifier<M>,
    analyzer: MultitaperAnalyzer,
    cfg: PipelineConfig,
}

impl<'a, M: StageModel> Pipeline<'a, M> {
    /// # Errors
    ///
    /// [`AnalysisError::InvalidConfig`] if the spectral settings do not
    /// fit the target sampling rate.
    pub fn new(classifier: &'a StageClassifier<M>, cfg: PipelineConfig) -> Result<Self, AnalysisError> {
        if cfg.normalize != classifier.variant().expects_normalized() {
            warn!(
                "{} was trained on {} input but normalize = {}",
                classifier.variant(),
                if classifier.variant().expects_normalized() { "z-scored" } else { "raw µV" },
                cfg.normalize
            );
        }
        let analyzer = MultitaperAnalyzer::new(&cfg.spectral, cfg.target_sfreq)?;
        Ok(Self { classifier, analyzer, cfg })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.cfg
    }

    pub fn classifier(&self) -> &StageClassifier<M> {
        self.classifier
    }

    /// Preprocess, classify, analyse and assemble one loaded recording.
    pub fn score(&self, raw: &RawRecording) -> Result<SummaryBundle, PipelineError> {
        let (cleaned, epochs) = preprocess(raw, &self.cfg)?;
        let classification = self.classifier.classify(&epochs)?;
        let spectrogram = self.analyzer.analyze(&cleaned)?;
        Ok(assemble(classification, spectrogram, self.classifier.variant())?)
    }

    /// Load then score.
    pub fn score_pair(&self, pair: &RecordingPair) -> Result<SummaryBundle, PipelineError> {
        let raw = load_pair(pair, &self.cfg)?;
        self.score(&raw)
    }

    /// Score every pair in parallel, preserving input order.
    pub fn score_batch(&self, pairs: &[RecordingPair]) -> Vec<BatchOutcome> {
        pairs
            .par_iter()
            .map(|pair| {
                let t0 = Instant::now();
                let result = self.score_pair(pair);
                let elapsed = t0.elapsed();
                match &result {
                    Ok(bundle) => info!(
                        "{}: {} epochs in {:.2} s",
                        pair.id(),
                        bundle.classification().len(),
                        elapsed.as_secs_f32()
                    ),
                    Err(e) => warn!("{}: {e}", pair.id()),
                }
                BatchOutcome { pair: pair.clone(), result, elapsed }
            })
            .collect()
    }
}

/// One-shot [`Pipeline::score`].
pub fn score_recording<M: StageModel>(
    raw: &RawRecording,
    classifier: &StageClassifier<M>,
    cfg: &PipelineConfig,
) -> Result<SummaryBundle, PipelineError> {
    Pipeline::new(classifier, cfg.clone())?.score(raw)
}

/// One-shot [`Pipeline::score_pair`].
pub fn score_pair<M: StageModel>(
    pair: &RecordingPair,
    classifier: &StageClassifier<M>,
    cfg: &PipelineConfig,
) -> Result<SummaryBundle, PipelineError> {
    Pipeline::new(classifier, cfg.clone())?.score_pair(pair)
}

/// One-shot [`Pipeline::score_batch`].
///
/// An invalid spectral configuration fails every outcome identically.
pub fn score_batch<M: StageModel>(
    pairs: &[RecordingPair],
    classifier: &StageClassifier<M>,
    cfg: &PipelineConfig,
) -> Vec<BatchOutcome> {
    match Pipeline::new(classifier, cfg.clone()) {
        Ok(pipeline) => pipeline.score_batch(pairs),
        Err(e) => pairs
            .iter()
            .map(|pair| BatchOutcome {
                pair: pair.clone(),
                result: Err(AnalysisError::InvalidConfig(e.to_string()).into()),
                elapsed: Duration::ZERO,
            })
            .collect(),
    }
}
