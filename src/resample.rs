//! FFT-based rational resampler (MNE `resample(..., method='fft')` semantics).
//!
//! Algorithm:
//!   1. Pad with reflect-limited samples on each side (next power of two).
//!   2. Forward FFT of the padded signal, keep the half-spectrum.
//!   3. Downsampling doubles the Nyquist bin, upsampling halves it.
//!   4. Scale all bins by `new_len_padded / old_len_padded`.
//!   5. Inverse FFT at the new length; the spectrum is truncated (anti-alias)
//!      or zero-padded automatically.
//!   6. Strip the resampled padding edges.
use ndarray::{Array2, ArrayView1};
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use crate::error::PreprocessError;

/// Padding on each side: pad the signal to the next power of two.
///
/// ```text
/// min_add = min(n // 8, 100) * 2
/// total   = 2^ceil(log2(n + min_add)) - n
/// npads   = [total // 2, total - total // 2]
/// ```
pub fn auto_npad(n: usize) -> (usize, usize) {
    let min_add = (n / 8).min(100) * 2;
    let sum = n + min_add;
    let next_pow2 = 1usize << ((sum as f64).log2().ceil() as u32);
    let total = next_pow2 - n;
    (total / 2, total - total / 2)
}

/// Output length for `n` input samples: `round(n · dst / src)`.
pub fn resampled_len(n: usize, src_sfreq: f32, dst_sfreq: f32) -> usize {
    (n as f64 * dst_sfreq as f64 / src_sfreq as f64).round() as usize
}

/// Resample `data` ([C, T]) from `src_sfreq` to `dst_sfreq`.
///
/// Returns a copy unchanged when the rates already match.
pub fn resample(
    data: &Array2<f32>,
    src_sfreq: f32,
    dst_sfreq: f32,
) -> Result<Array2<f32>, PreprocessError> {
    for rate in [src_sfreq, dst_sfreq] {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(PreprocessError::InvalidRate(rate));
        }
    }
    if (src_sfreq - dst_sfreq).abs() < 1e-6 {
        return Ok(data.clone());
    }
    let ratio = dst_sfreq as f64 / src_sfreq as f64;
    let n_in = data.ncols();
    let final_len = resampled_len(n_in, src_sfreq, dst_sfreq);

    let (npad_l, npad_r) = auto_npad(n_in);
    let mut planner = FftPlanner::<f64>::new();
    let mut out = Array2::<f32>::zeros((data.nrows(), final_len));
    for (row, mut dst) in data.rows().into_iter().zip(out.rows_mut()) {
        let resampled = resample_1d(&mut planner, &row.to_vec(), ratio, npad_l, npad_r);
        dst.assign(&ArrayView1::from(&resampled));
    }
    Ok(out)
}

/// Resample one channel with explicit (possibly asymmetric) padding.
///
/// `planner` is shared across channels so FFT plans are built once.
pub fn resample_1d(
    planner: &mut FftPlanner<f64>,
    x: &[f32],
    ratio: f64,
    npad_l: usize,
    npad_r: usize,
) -> Vec<f32> {
    let n_in = x.len();
    if n_in == 0 {
        return vec![];
    }
    let final_len = (ratio * n_in as f64).round() as usize;

    // 1. Reflect-limited padding, clamped to n_in - 1 on each side.
    let pad_l = npad_l.min(n_in - 1);
    let pad_r = npad_r.min(n_in - 1);
    let old_len = n_in + pad_l + pad_r;

    let mut x_ext = Vec::with_capacity(old_len);
    for i in (1..=pad_l).rev() {
        x_ext.push(2.0 * x[0] - x[i]);
    }
    x_ext.extend_from_slice(x);
    let last = x[n_in - 1];
    for i in 1..=pad_r {
        x_ext.push(2.0 * last - x[n_in - 1 - i]);
    }

    // 2. Padded output length.
    let new_len_padded = ((ratio * old_len as f64).round() as usize).max(1);
    let shorter = new_len_padded < old_len;
    let use_len = if shorter { new_len_padded } else { old_len };

    // 3. Half-spectrum of the padded signal.
    let mut buf: Vec<Complex<f64>> = x_ext
        .iter()
        .map(|&v| Complex { re: v as f64, im: 0.0 })
        .collect();
    planner.plan_fft_forward(old_len).process(&mut buf);
    let mut x_fft: Vec<Complex<f64>> = buf[..old_len / 2 + 1].to_vec();

    // 4. Nyquist bin.
    if use_len % 2 == 0 {
        let nyq = use_len / 2;
        if nyq < x_fft.len() {
            x_fft[nyq] *= if shorter { 2.0 } else { 0.5 };
        }
    }

    // 5. Length scaling.
    let scale = new_len_padded as f64 / old_len as f64;
    for v in &mut x_fft {
        *v *= scale;
    }

    // 6. Inverse FFT at the new length from the Hermitian half-spectrum.
    let new_rfft_len = new_len_padded / 2 + 1;
    let mut spectrum = vec![Complex::<f64>::default(); new_len_padded];
    let n_copy = x_fft.len().min(new_rfft_len);
    spectrum[..n_copy].copy_from_slice(&x_fft[..n_copy]);
    for i in 1..new_rfft_len {
        let idx = new_len_padded - i;
        if idx >= new_rfft_len {
            spectrum[idx] = spectrum[i].conj();
        }
    }
    planner.plan_fft_inverse(new_len_padded).process(&mut spectrum);
    let inv_scale = 1.0 / new_len_padded as f64;

    // 7. Strip padding.
    let to_remove_l = ((ratio * npad_l.min(n_in - 1) as f64).round() as usize).min(new_len_padded);
    let strip_end = (to_remove_l + final_len).min(new_len_padded);

    let mut result: Vec<f32> = spectrum[to_remove_l..strip_end]
        .iter()
        .map(|c| (c.re * inv_scale) as f32)
        .collect();
    result.resize(final_len, 0.0);
    result
}
