//! Epoch-wise sleep-stage classification.
//!
//! ```text
//! EpochArray [E, C, S]
//!   │
//!   ├─ member.predict()        chunked forward passes → [E, 6]
//!   ├─ ensure_probabilities    softmax rows that do not already sum to 1
//!   ├─ average_probabilities   mixture: arithmetic mean over members
//!   └─ argmax_rows             ties → lowest label index
//!        │
//!        └─→ ClassificationResult
//! ```
//!
//! - [`model`]: the [`StageModel`] seam and its ONNX implementation.
//! - [`cache`]: artifact resolution and the caller-owned [`ModelCache`].

pub mod cache;
pub mod model;

pub use cache::{ArtifactProvider, LocalArtifacts, ModelCache};
pub use model::{InputLayout, ModelLoader, ModelManifest, OnnxLoader, OnnxModel, StageModel};

use std::fmt;
use std::path::Path;

use log::debug;
use ndarray::{Array2, ArrayView1, ArrayView2, ArrayViewMut1, Axis};

use crate::config::ModelVariant;
use crate::epoch::EpochArray;
use crate::error::InferenceError;

/// Number of output classes.
pub const N_STAGES: usize = 6;

/// Row-sum tolerance for treating a model output as already normalised.
pub const PROB_TOLERANCE: f32 = 1e-4;

// ── Stages ───────────────────────────────────────────────────────────────────

/// Output label, in model output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SleepStage {
    N1,
    N2,
    N3,
    Rem,
    Wake,
    Artifact,
}

impl SleepStage {
    pub const ALL: [SleepStage; N_STAGES] =
        [Self::N1, Self::N2, Self::N3, Self::Rem, Self::Wake, Self::Artifact];

    /// Column index in the probability matrix.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Hypnogram code: 1=N1, 2=N2, 3=N3, 4=REM, 5=W, 6=ART.
    #[inline]
    pub fn code(self) -> i32 {
        self as i32 + 1
    }

    pub fn from_index(i: usize) -> Option<Self> {
        Self::ALL.get(i).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::N1 => "N1",
            Self::N2 => "N2",
            Self::N3 => "N3",
            Self::Rem => "REM",
            Self::Wake => "W",
            Self::Artifact => "ART",
        }
    }
}

impl fmt::Display for SleepStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── Result ───────────────────────────────────────────────────────────────────

/// Per-epoch probabilities and the selected stage.
#[derive(Debug, Clone)]
pub struct ClassificationResult {
    probabilities: Array2<f32>,
    stages: Vec<SleepStage>,
    epoch_dur: f32,
}

impl ClassificationResult {
    /// Build from an `[E, 6]` probability matrix; stages are its row argmax.
    pub fn from_probabilities(probabilities: Array2<f32>, epoch_dur: f32) -> Self {
        let stages = argmax_rows(probabilities.view());
        Self { probabilities, stages, epoch_dur }
    }

    pub fn empty(epoch_dur: f32) -> Self {
        Self::from_probabilities(Array2::zeros((0, N_STAGES)), epoch_dur)
    }

    /// `[E, 6]`, rows sum to 1.
    pub fn probabilities(&self) -> &Array2<f32> {
        &self.probabilities
    }

    pub fn stages(&self) -> &[SleepStage] {
        &self.stages
    }

    pub fn epoch_dur(&self) -> f32 {
        self.epoch_dur
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Hypnogram as integer codes (see [`SleepStage::code`]).
    pub fn hypnogram_codes(&self) -> Vec<i32> {
        self.stages.iter().map(|s| s.code()).collect()
    }

    /// Time covered by the classified epochs, seconds.
    pub fn duration_s(&self) -> f32 {
        self.len() as f32 * self.epoch_dur
    }

    /// Epoch count per stage, indexed like [`SleepStage::ALL`].
    pub fn stage_counts(&self) -> [usize; N_STAGES] {
        let mut counts = [0; N_STAGES];
        for s in &self.stages {
            counts[s.index()] += 1;
        }
        counts
    }
}

// ── Probability helpers ──────────────────────────────────────────────────────

/// Numerically stable row-wise softmax, in place.
pub fn softmax_rows(logits: &mut Array2<f32>) {
    for row in logits.rows_mut() {
        softmax_row(row);
    }
}

fn softmax_row(mut row: ArrayViewMut1<'_, f32>) {
    let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    row.mapv_inplace(|v| (v - max).exp());
    let sum = row.sum();
    row.mapv_inplace(|v| v / sum);
}

/// Entries in `[0, 1]` summing to one within [`PROB_TOLERANCE`].
pub fn is_distribution(row: ArrayView1<'_, f32>) -> bool {
    row.iter().all(|&v| (0.0..=1.0).contains(&v)) && (row.sum() - 1.0).abs() <= PROB_TOLERANCE
}

/// True when every row is a probability distribution.
pub fn is_probability_rows(p: ArrayView2<'_, f32>) -> bool {
    p.rows().into_iter().all(is_distribution)
}

/// Softmax every row that is not already a probability distribution.
///
/// Decided per row: distributions in a mixed output pass through unchanged.
pub fn ensure_probabilities(mut out: Array2<f32>) -> Array2<f32> {
    for row in out.rows_mut() {
        if !is_distribution(row.view()) {
            softmax_row(row);
        }
    }
    out
}

/// Element-wise arithmetic mean of equally shaped matrices.
///
/// Returns `None` for an empty slice.
pub fn average_probabilities(members: &[Array2<f32>]) -> Option<Array2<f32>> {
    let (first, rest) = members.split_first()?;
    let mut acc = first.clone();
    for m in rest {
        acc += m;
    }
    acc /= members.len() as f32;
    Some(acc)
}

/// Index of the maximum per row; ties resolve to the lowest index.
pub fn argmax_rows(p: ArrayView2<'_, f32>) -> Vec<SleepStage> {
    p.axis_iter(Axis(0))
        .map(|row| {
            let mut best = 0;
            for (i, &v) in row.iter().enumerate().skip(1) {
                if v > row[best] {
                    best = i;
                }
            }
            SleepStage::ALL[best.min(N_STAGES - 1)]
        })
        .collect()
}

// ── Classifier ───────────────────────────────────────────────────────────────

/// How many graphs `variant` needs, checked against `found`.
pub(crate) fn check_member_count(variant: ModelVariant, found: usize) -> Result<(), InferenceError> {
    let (ok, expected) = if variant.is_ensemble() {
        (found >= 1, "at least one")
    } else {
        (found == 1, "exactly one")
    };
    if ok {
        Ok(())
    } else {
        Err(InferenceError::MemberCount { variant, expected, found })
    }
}

/// A loaded model variant: one member, or a fixed ensemble for the mixture.
///
/// Read-only after construction; share it across threads by reference or
/// behind an `Arc`.
#[derive(Debug)]
pub struct StageClassifier<M> {
    variant: ModelVariant,
    members: Vec<M>,
}

impl StageClassifier<OnnxModel> {
    /// Load every graph of `variant` from `dir`.
    pub fn load(variant: ModelVariant, dir: impl AsRef<Path>) -> Result<Self, InferenceError> {
        Self::new(variant, OnnxLoader.load(variant, dir.as_ref())?)
    }
}

impl<M: StageModel> StageClassifier<M> {
    /// All members must agree on the input shape.
    pub fn new(variant: ModelVariant, members: Vec<M>) -> Result<Self, InferenceError> {
        check_member_count(variant, members.len())?;
        let (channels, samples) = members[0].input_shape();
        if let Some(odd) = members.iter().find(|m| m.input_shape() != (channels, samples)) {
            let (c, s) = odd.input_shape();
            return Err(InferenceError::ShapeMismatch {
                channels: c,
                samples: s,
                expected_channels: channels,
                expected_samples: samples,
            });
        }
        Ok(Self { variant, members })
    }

    pub fn variant(&self) -> ModelVariant {
        self.variant
    }

    pub fn members(&self) -> &[M] {
        &self.members
    }

    /// `(channels, samples per epoch)` the members expect.
    pub fn input_shape(&self) -> (usize, usize) {
        self.members[0].input_shape()
    }

    /// Classify every epoch.
    ///
    /// Zero epochs yield an empty result without invoking any member.
    ///
    /// # Errors
    ///
    /// [`InferenceError::ShapeMismatch`] if the epochs do not fit the model
    /// input, [`InferenceError::OutputShape`] or
    /// [`InferenceError::Runtime`] if a member misbehaves.
    pub fn classify(&self, epochs: &EpochArray) -> Result<ClassificationResult, InferenceError> {
        let (expected_channels, expected_samples) = self.input_shape();
        if epochs.n_channels() != expected_channels || epochs.epoch_samples() != expected_samples {
            return Err(InferenceError::ShapeMismatch {
                channels: epochs.n_channels(),
                samples: epochs.epoch_samples(),
                expected_channels,
                expected_samples,
            });
        }
        if epochs.is_empty() {
            return Ok(ClassificationResult::empty(epochs.epoch_dur()));
        }

        let n = epochs.len();
        let mut member_probs = Vec::with_capacity(self.members.len());
        for member in &self.members {
            let out = member.predict(epochs.view())?;
            if out.dim() != (n, N_STAGES) {
                return Err(InferenceError::OutputShape {
                    got: out.shape().to_vec(),
                    epochs: n,
                    classes: N_STAGES,
                });
            }
            if out.iter().any(|v| !v.is_finite()) {
                return Err(InferenceError::Runtime("model produced non-finite output".into()));
            }
            member_probs.push(ensure_probabilities(out));
        }

        let probs = average_probabilities(&member_probs)
            .ok_or_else(|| InferenceError::Runtime("classifier has no members".into()))?;
        debug!(
            "{}: classified {n} epochs with {} member(s)",
            self.variant,
            self.members.len()
        );
        Ok(ClassificationResult::from_probabilities(probs, epochs.epoch_dur()))
    }
}
