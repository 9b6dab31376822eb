mod common;
use common::{row_moments, sine, synthetic_recording, trace};
use ezscore::{preprocess, ModelVariant, PipelineConfig, PreprocessError, RawRecording};

// ── Rates & epoching ──────────────────────────────────────────────────────────

#[test]
fn cleaned_signal_is_at_target_rate() {
    for src in [64.0_f32, 128.0, 200.0, 256.0, 512.0] {
        let raw = synthetic_recording(src, 90.0);
        let (cleaned, epochs) = preprocess(&raw, &PipelineConfig::default()).unwrap();
        assert_eq!(cleaned.sfreq(), 64.0, "src {src} Hz");
        assert_eq!(cleaned.n_times(), 90 * 64, "src {src} Hz");
        assert_eq!(epochs.len(), 3);
        assert_eq!(epochs.epoch_samples(), 1920);
        assert_eq!(epochs.n_channels(), 2);
    }
}

#[test]
fn epoch_count_is_floor_of_duration() {
    let cfg = PipelineConfig::default();
    for (seconds, expected) in [(29.0, 0), (30.0, 1), (59.9, 1), (95.0, 3), (300.0, 10), (304.0, 10)] {
        let raw = synthetic_recording(256.0, seconds);
        let (cleaned, epochs) = preprocess(&raw, &cfg).unwrap();
        let floor = (cleaned.duration_secs() / cfg.epoch_dur).floor() as usize;
        assert_eq!(epochs.len(), expected, "{seconds} s");
        assert_eq!(epochs.len(), floor, "{seconds} s");
    }
}

#[test]
fn epochs_are_cut_from_cleaned_samples() {
    let raw = synthetic_recording(256.0, 65.0);
    let (cleaned, epochs) = preprocess(&raw, &PipelineConfig::default()).unwrap();
    let e = epochs.view();
    for ch in 0..2 {
        for t in [0, 1000, 1919] {
            assert_eq!(e[[1, ch, t]], cleaned.data()[[ch, 1920 + t]]);
        }
    }
}

#[test]
fn shorter_than_one_epoch_yields_no_epochs() {
    let raw = synthetic_recording(256.0, 20.0);
    let (cleaned, epochs) = preprocess(&raw, &PipelineConfig::default()).unwrap();
    assert!(epochs.is_empty());
    assert_eq!(cleaned.n_times(), 20 * 64);
}

// ── Normalisation ─────────────────────────────────────────────────────────────

#[test]
fn normalized_channels_have_zero_mean_unit_variance() {
    let raw = synthetic_recording(256.0, 120.0);
    let (cleaned, _) = preprocess(&raw, &PipelineConfig::for_variant(ModelVariant::Normalized)).unwrap();
    assert!(cleaned.is_normalized());
    for (mean, var) in row_moments(cleaned.data()) {
        approx::assert_abs_diff_eq!(mean, 0.0, epsilon = 1e-4);
        approx::assert_abs_diff_eq!(var, 1.0, epsilon = 1e-3);
    }
    assert_eq!(cleaned.channel_stats().unwrap().len(), 2);
}

#[test]
fn raw_variant_stays_in_microvolts() {
    let n = 256 * 60;
    let left = trace(sine(8.0, 50.0, 256.0, n), 256.0, "L");
    let right = trace(sine(8.0, 5.0, 256.0, n), 256.0, "R");
    let raw = RawRecording::from_traces(left, right, 0).unwrap();

    let (cleaned, _) = preprocess(&raw, &PipelineConfig::for_variant(ModelVariant::Raw)).unwrap();
    assert!(!cleaned.is_normalized());
    let m = row_moments(cleaned.data());
    // 8 Hz sine of amplitude A has variance A² / 2.
    approx::assert_relative_eq!(m[0].1, 1250.0, max_relative = 0.05);
    approx::assert_relative_eq!(m[1].1, 12.5, max_relative = 0.05);
}

#[test]
fn highpass_removes_offset_and_drift() {
    // Already at 64 Hz, so only the highpass touches the samples.
    let n = 64 * 120;
    let drift: Vec<f32> = (0..n).map(|i| 500.0 + 0.04 * i as f32).collect();
    let raw = RawRecording::from_traces(trace(drift.clone(), 64.0, "L"), trace(drift, 64.0, "R"), 0)
        .unwrap();
    let cfg = PipelineConfig { normalize: false, ..PipelineConfig::default() };
    let (cleaned, _) = preprocess(&raw, &cfg).unwrap();
    // Interior only: the edges carry the filter's reflect-padding transient.
    let row = cleaned.data().row(0);
    let interior = &row.as_slice().unwrap()[1000..row.len() - 1000];
    let max = interior.iter().fold(0.0_f32, |a, v| a.max(v.abs()));
    assert!(max < 1.0, "offset survived the highpass: {max}");
}

#[test]
fn unusable_highpass_cutoff_is_an_error() {
    let raw = synthetic_recording(256.0, 60.0);
    for hp_freq in [0.0_f32, -1.0, f32::NAN, 32.0, 100.0] {
        let cfg = PipelineConfig { hp_freq, ..PipelineConfig::default() };
        let err = preprocess(&raw, &cfg).unwrap_err();
        assert!(
            matches!(err, PreprocessError::InvalidCutoff { nyquist, .. } if nyquist == 32.0),
            "hp_freq {hp_freq}: {err}"
        );
    }
}
