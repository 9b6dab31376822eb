mod common;
use common::{max_abs_diff, sine};
use ezscore::filter::{apply_fir_zero_phase, filter_1d, FirHighpass};
use ndarray::Array2;

fn rms(x: &[f32]) -> f32 {
    (x.iter().map(|v| v * v).sum::<f32>() / x.len() as f32).sqrt()
}

fn interior(x: &[f32], margin: usize) -> &[f32] {
    &x[margin..x.len() - margin]
}

// ── Coefficients ──────────────────────────────────────────────────────────────

#[test]
fn tap_count_at_target_rate() {
    // trans_bw = 0.5 Hz, N = ceil(3.3 / 0.5 · 64) = 423.
    let hp = FirHighpass::design(0.5, 64.0).unwrap();
    assert_eq!(hp.len(), 423);
    assert_eq!(hp.trans_bw, 0.5);
}

#[test]
fn taps_are_symmetric_with_zero_dc_gain() {
    let hp = FirHighpass::design(0.5, 64.0).unwrap();
    let h = hp.taps();
    let n = h.len();
    for i in 0..n / 2 {
        approx::assert_abs_diff_eq!(h[i], h[n - 1 - i], epsilon = 1e-7);
    }
    let s: f32 = h.iter().sum();
    approx::assert_abs_diff_eq!(s, 0.0, epsilon = 1e-4);
}

// ── Frequency response ────────────────────────────────────────────────────────

#[test]
fn constant_offset_is_removed() {
    let hp = FirHighpass::design(0.5, 64.0).unwrap();
    let y = filter_1d(&vec![250.0_f32; 64 * 60], hp.taps());
    let max = interior(&y, 500).iter().fold(0.0_f32, |a, v| a.max(v.abs()));
    assert!(max < 0.5, "residual offset {max}");
}

#[test]
fn passband_tone_survives() {
    let hp = FirHighpass::design(0.5, 64.0).unwrap();
    let x = sine(5.0, 10.0, 64.0, 64 * 60);
    let y = filter_1d(&x, hp.taps());
    approx::assert_relative_eq!(rms(interior(&y, 500)), rms(interior(&x, 500)), max_relative = 0.02);
}

#[test]
fn slow_drift_is_attenuated() {
    let hp = FirHighpass::design(0.5, 64.0).unwrap();
    let x = sine(0.05, 100.0, 64.0, 64 * 400);
    let y = filter_1d(&x, hp.taps());
    let ratio = rms(interior(&y, 1000)) / rms(interior(&x, 1000));
    assert!(ratio < 0.1, "0.05 Hz gain {ratio}");
}

#[test]
fn multichannel_matches_single_channel() {
    let hp = FirHighpass::design(0.5, 64.0).unwrap();
    let a = sine(3.0, 20.0, 64.0, 3000);
    let b: Vec<f32> = sine(0.1, 50.0, 64.0, 3000).iter().map(|v| v + 30.0).collect();

    let mut data = Array2::from_shape_vec((2, 3000), [a.clone(), b.clone()].concat()).unwrap();
    apply_fir_zero_phase(&mut data, hp.taps());

    for (row, x) in data.rows().into_iter().zip([a, b]) {
        assert!(max_abs_diff(&row.to_vec(), &filter_1d(&x, hp.taps())) < 1e-5);
    }
}

#[test]
fn filter_preserves_length() {
    let hp = FirHighpass::design(0.5, 64.0).unwrap();
    for n in [1, 100, 423, 5000] {
        assert_eq!(filter_1d(&vec![1.0; n], hp.taps()).len(), n);
    }
}
