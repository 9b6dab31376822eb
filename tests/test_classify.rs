mod common;
use common::{FixedModel, StubModel};

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use ezscore::classify::{ModelLoader, N_STAGES};
use ezscore::error::ArtifactUnavailable;
use ezscore::{
    ArtifactProvider, EpochArray, InferenceError, ModelCache, ModelVariant, SleepStage,
    StageClassifier,
};
use ndarray::{array, Array2};

fn epochs(n_epochs: usize, channels: usize) -> EpochArray {
    let data = Array2::from_shape_fn((channels, n_epochs * 1920 + 17), |(c, t)| {
        ((t as f32) * 0.01 + c as f32).sin()
    });
    EpochArray::from_signal(data.view(), 64.0, 30.0)
}

// ── Probabilities & labels ────────────────────────────────────────────────────

#[test]
fn logits_become_probabilities() {
    let clf = StageClassifier::new(ModelVariant::Normalized, vec![StubModel::new(2, 1920)]).unwrap();
    let result = clf.classify(&epochs(10, 2)).unwrap();

    assert_eq!(result.len(), 10);
    assert_eq!(result.probabilities().dim(), (10, N_STAGES));
    for row in result.probabilities().rows() {
        approx::assert_abs_diff_eq!(row.sum(), 1.0, epsilon = 1e-4);
        assert!(row.iter().all(|&p| (0.0..=1.0).contains(&p)));
    }
    for (i, stage) in result.stages().iter().enumerate() {
        assert_eq!(stage.index(), i % N_STAGES);
    }
    assert_eq!(result.hypnogram_codes()[..6], [1, 2, 3, 4, 5, 6]);
}

#[test]
fn selected_label_is_argmax_with_lowest_index_ties() {
    let rows = array![
        [0.10_f32, 0.30, 0.30, 0.10, 0.10, 0.10],
        [0.05, 0.05, 0.05, 0.05, 0.75, 0.05],
        [0.25, 0.0, 0.25, 0.25, 0.25, 0.0]
    ];
    let clf = StageClassifier::new(ModelVariant::Raw, vec![FixedModel { rows }]).unwrap();
    let result = clf.classify(&epochs(3, 2)).unwrap();
    assert_eq!(result.stages(), &[SleepStage::N2, SleepStage::Wake, SleepStage::N1]);
}

#[test]
fn one_logit_row_does_not_rescale_the_others() {
    let rows = array![
        [0.05_f32, 0.05, 0.6, 0.1, 0.1, 0.1],
        [4.0, 0.0, 0.0, 0.0, 0.0, 0.0]
    ];
    let clf = StageClassifier::new(ModelVariant::Raw, vec![FixedModel { rows: rows.clone() }]).unwrap();
    let result = clf.classify(&epochs(2, 2)).unwrap();

    for (got, want) in result.probabilities().row(0).iter().zip(rows.row(0)) {
        approx::assert_abs_diff_eq!(got, want, epsilon = 1e-7);
    }
    approx::assert_abs_diff_eq!(result.probabilities().row(1).sum(), 1.0, epsilon = 1e-5);
    assert_eq!(result.stages(), &[SleepStage::N3, SleepStage::N1]);
}

#[test]
fn mixture_is_arithmetic_mean_of_members() {
    let a = array![[0.7_f32, 0.1, 0.05, 0.05, 0.05, 0.05], [0.1, 0.1, 0.1, 0.1, 0.5, 0.1]];
    let b = array![[0.1_f32, 0.6, 0.1, 0.1, 0.05, 0.05], [0.2, 0.2, 0.2, 0.2, 0.1, 0.1]];
    let c = array![[0.3_f32, 0.3, 0.1, 0.1, 0.1, 0.1], [0.0, 0.0, 0.0, 0.0, 0.0, 1.0]];
    let members = vec![
        FixedModel { rows: a.clone() },
        FixedModel { rows: b.clone() },
        FixedModel { rows: c.clone() },
    ];
    let clf = StageClassifier::new(ModelVariant::Mixture, members).unwrap();
    let result = clf.classify(&epochs(2, 2)).unwrap();

    let expected = (&a + &b + &c) / 3.0;
    for (got, want) in result.probabilities().iter().zip(expected.iter()) {
        approx::assert_abs_diff_eq!(got, want, epsilon = 1e-6);
    }
    // Epoch 0: mean favours N1 (0.367) over N2 (0.333); no hard-label vote.
    assert_eq!(result.stages()[0], SleepStage::N1);
    assert_eq!(result.stages()[1], SleepStage::Artifact);
}

// ── Edge cases ────────────────────────────────────────────────────────────────

#[test]
fn zero_epochs_skip_the_model() {
    let clf = StageClassifier::new(ModelVariant::Normalized, vec![StubModel::new(2, 1920)]).unwrap();
    let result = clf.classify(&epochs(0, 2)).unwrap();
    assert!(result.is_empty());
    assert_eq!(clf.members()[0].calls(), 0);
}

#[test]
fn channel_mismatch_is_rejected() {
    let clf = StageClassifier::new(ModelVariant::Normalized, vec![StubModel::new(2, 1920)]).unwrap();
    let err = clf.classify(&epochs(3, 1)).unwrap_err();
    assert!(matches!(
        err,
        InferenceError::ShapeMismatch { channels: 1, expected_channels: 2, .. }
    ));
}

#[test]
fn epoch_length_mismatch_is_rejected() {
    let clf = StageClassifier::new(ModelVariant::Raw, vec![StubModel::new(2, 3000)]).unwrap();
    let err = clf.classify(&epochs(3, 2)).unwrap_err();
    assert!(matches!(err, InferenceError::ShapeMismatch { samples: 1920, expected_samples: 3000, .. }));
}

#[test]
fn member_count_enforced() {
    let two = vec![StubModel::new(2, 1920), StubModel::new(2, 1920)];
    assert!(matches!(
        StageClassifier::new(ModelVariant::Normalized, two),
        Err(InferenceError::MemberCount { found: 2, .. })
    ));
    let none: Vec<StubModel> = Vec::new();
    assert!(StageClassifier::new(ModelVariant::Mixture, none).is_err());
}

#[test]
fn classifier_is_reusable_and_shareable() {
    let clf = StageClassifier::new(ModelVariant::Normalized, vec![StubModel::new(2, 1920)]).unwrap();
    let inputs: Vec<EpochArray> = (1..=4).map(|n| epochs(n, 2)).collect();
    std::thread::scope(|s| {
        for e in &inputs {
            let clf = &clf;
            s.spawn(move || assert_eq!(clf.classify(e).unwrap().len(), e.len()));
        }
    });
    assert_eq!(clf.members()[0].calls(), 4);
}

// ── Model cache ───────────────────────────────────────────────────────────────

/// Unavailable until `acquire` is called, if `acquirable`.
struct FlakyProvider {
    dir: PathBuf,
    acquirable: bool,
    acquired: AtomicBool,
    resolves: AtomicUsize,
    acquires: AtomicUsize,
}

impl FlakyProvider {
    fn new(available: bool, acquirable: bool) -> Self {
        Self {
            dir: PathBuf::from("/models/ez6"),
            acquirable,
            acquired: AtomicBool::new(available),
            resolves: AtomicUsize::new(0),
            acquires: AtomicUsize::new(0),
        }
    }
}

impl ArtifactProvider for FlakyProvider {
    fn resolve(&self, variant: ModelVariant) -> Result<PathBuf, ArtifactUnavailable> {
        self.resolves.fetch_add(1, Ordering::SeqCst);
        if self.acquired.load(Ordering::SeqCst) {
            Ok(self.dir.clone())
        } else {
            Err(ArtifactUnavailable { variant, reason: "not downloaded".into() })
        }
    }

    fn acquire(&self, _variant: ModelVariant) -> Result<(), ArtifactUnavailable> {
        self.acquires.fetch_add(1, Ordering::SeqCst);
        self.acquired.store(self.acquirable, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct StubLoader {
    loads: AtomicUsize,
}

impl ModelLoader for StubLoader {
    type Model = StubModel;

    fn load(&self, variant: ModelVariant, dir: &Path) -> Result<Vec<StubModel>, InferenceError> {
        assert_eq!(dir, Path::new("/models/ez6"));
        self.loads.fetch_add(1, Ordering::SeqCst);
        let n = if variant.is_ensemble() { 3 } else { 1 };
        Ok((0..n).map(|_| StubModel::new(2, 1920)).collect())
    }
}

#[test]
fn cache_loads_each_variant_once() {
    let loader = StubLoader::default();
    let mut cache = ModelCache::with_loader(FlakyProvider::new(true, true), loader);

    let first = cache.get_or_load(ModelVariant::Normalized).unwrap();
    let second = cache.get_or_load(ModelVariant::Normalized).unwrap();
    assert!(std::sync::Arc::ptr_eq(&first, &second));
    let moe = cache.get_or_load(ModelVariant::Mixture).unwrap();
    assert_eq!(moe.members().len(), 3);

    assert_eq!(cache.len(), 2);
    assert!(cache.is_loaded(ModelVariant::Normalized));
    assert!(!cache.is_loaded(ModelVariant::Raw));
    assert_eq!(cache.provider().resolves.load(Ordering::SeqCst), 2);
}

#[test]
fn unavailable_artifact_is_acquired_then_resolved_once_more() {
    let mut cache = ModelCache::with_loader(FlakyProvider::new(false, true), StubLoader::default());
    assert!(cache.get_or_load(ModelVariant::Normalized).is_ok());
    assert_eq!(cache.provider().resolves.load(Ordering::SeqCst), 2);
    assert_eq!(cache.provider().acquires.load(Ordering::SeqCst), 1);
}

#[test]
fn retry_happens_only_once() {
    let mut cache = ModelCache::with_loader(FlakyProvider::new(false, false), StubLoader::default());
    let err = cache.get_or_load(ModelVariant::Raw).unwrap_err();
    assert!(matches!(err, InferenceError::ArtifactUnavailable { variant: ModelVariant::Raw, .. }));
    assert_eq!(cache.provider().resolves.load(Ordering::SeqCst), 2);
    assert_eq!(cache.provider().acquires.load(Ordering::SeqCst), 1);
    assert!(cache.is_empty());
}
