//! Overlap-add zero-phase FIR convolution.
//!
//! Matches MNE's `_overlap_add_filter` + `_1d_overlap_filter`.
//!
//! Zero phase comes from shifting the output left by `(N-1)/2` samples, not
//! from filtfilt. Edge transients are suppressed by reflect-limited padding
//! of `N-1` samples on each side.
use std::sync::Arc;

use ndarray::{Array2, ArrayView1};
use rustfft::{num_complex::Complex, Fft, FftPlanner};

/// Apply a zero-phase FIR filter to each channel of `data` ([C, T]) in place.
///
/// `h` must have odd length. The FFT plan and the kernel spectrum are
/// computed once and shared by all channels.
pub fn apply_fir_zero_phase(data: &mut Array2<f32>, h: &[f32]) {
    let n_x = data.ncols();
    if n_x == 0 || h.is_empty() {
        return;
    }
    let ola = OverlapAdd::new(h, n_x);
    for mut row in data.rows_mut() {
        let filtered = ola.filter(&row.to_vec());
        row.assign(&ArrayView1::from(&filtered));
    }
}

/// Filter a single 1-D signal; output has the same length as `x`.
pub fn filter_1d(x: &[f32], h: &[f32]) -> Vec<f32> {
    if x.is_empty() || h.is_empty() {
        return x.to_vec();
    }
    OverlapAdd::new(h, x.len()).filter(x)
}

/// Precomputed overlap-add state for one kernel and one signal length.
struct OverlapAdd {
    n_h: usize,
    n_fft: usize,
    h_fft: Vec<Complex<f32>>,
    fwd: Arc<dyn Fft<f32>>,
    inv: Arc<dyn Fft<f32>>,
}

impl OverlapAdd {
    fn new(h: &[f32], n_x: usize) -> Self {
        let n_h = h.len();
        let n_ext = n_x + 2 * (n_h - 1);
        let n_fft = choose_fft_len(n_h, n_ext);

        let mut planner = FftPlanner::<f32>::new();
        let fwd = planner.plan_fft_forward(n_fft);
        let inv = planner.plan_fft_inverse(n_fft);

        let mut h_fft = zero_padded(h, n_fft);
        fwd.process(&mut h_fft);

        Self { n_h, n_fft, h_fft, fwd, inv }
    }

    fn filter(&self, x: &[f32]) -> Vec<f32> {
        let n_x = x.len();
        let shift = (self.n_h - 1) / 2;
        let n_edge = self.n_h - 1;

        let x_ext = reflect_limited_pad(x, n_edge, n_edge);
        let n_ext = x_ext.len();

        let n_seg = self.n_fft - self.n_h + 1;
        let mut x_filtered = vec![0.0_f32; n_ext];
        let inv_scale = 1.0 / self.n_fft as f32;

        for start in (0..n_ext).step_by(n_seg) {
            let stop = (start + n_seg).min(n_ext);
            let mut buf = zero_padded(&x_ext[start..stop], self.n_fft);

            self.fwd.process(&mut buf);
            for (b, &hf) in buf.iter_mut().zip(&self.h_fft) {
                *b *= hf;
            }
            self.inv.process(&mut buf);

            // Accumulate, shifted left by the group delay.
            let out_start = start.saturating_sub(shift);
            let out_end = (out_start + self.n_fft).min(n_ext);
            let prod_start = shift.saturating_sub(start);
            for (o, p) in (out_start..out_end).zip(prod_start..self.n_fft) {
                x_filtered[o] += buf[p].re * inv_scale;
            }
        }

        x_filtered[n_edge..n_edge + n_x].to_vec()
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn zero_padded(x: &[f32], n: usize) -> Vec<Complex<f32>> {
    x.iter()
        .map(|&v| Complex { re: v, im: 0.0 })
        .chain(std::iter::repeat(Complex::default()))
        .take(n)
        .collect()
}

/// Reflect-limited padding (MNE's `_smart_pad`).
///
/// Left:  `pad[i] = 2*x[0] - x[n_l-i]`  for i in 1..=n_l
/// Right: `pad[i] = 2*x[-1] - x[-(i+1)]` for i in 1..=n_r
///
/// Padding beyond `len(x) - 1` samples is filled with zeros.
fn reflect_limited_pad(x: &[f32], n_l: usize, n_r: usize) -> Vec<f32> {
    let n = x.len();
    let actual_l = n_l.min(n - 1);
    let actual_r = n_r.min(n - 1);

    let mut out = Vec::with_capacity(n_l + n + n_r);
    out.extend(std::iter::repeat(0.0).take(n_l - actual_l));
    for i in (1..=actual_l).rev() {
        out.push(2.0 * x[0] - x[i]);
    }
    out.extend_from_slice(x);
    let last = x[n - 1];
    for i in 1..=actual_r {
        out.push(2.0 * last - x[n - 1 - i]);
    }
    out.extend(std::iter::repeat(0.0).take(n_r - actual_r));
    out
}

/// Power-of-two FFT block size minimising MNE's cost function:
///   `cost = ceil(n_x / (N - n_h + 1)) * N * (log2(N) + 1) + 4e-5 * N * n_x`
fn choose_fft_len(n_h: usize, n_x: usize) -> usize {
    let min_fft = 2 * n_h - 1;
    let max_pow = (n_x as f64).log2().ceil() as u32 + 1;
    let min_pow = (min_fft as f64).log2().ceil() as u32;

    let mut best_n = 1_usize << max_pow.max(min_pow);
    let mut best_cost = f64::INFINITY;
    for pow in min_pow..=max_pow {
        let n = 1_usize << pow;
        if n < min_fft {
            continue;
        }
        let n_seg = (n - n_h + 1) as f64;
        let cost = (n_x as f64 / n_seg).ceil() * n as f64 * (pow as f64 + 1.0)
            + 4e-5 * n as f64 * n_x as f64;
        if cost < best_cost {
            best_cost = cost;
            best_n = n;
        }
    }
    best_n
}
