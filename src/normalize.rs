//! Per-channel z-score normalisation.
//!
//! For each channel independently, over the whole recording:
//!   μ = mean(x),  σ = std(x) (ddof = 0)
//!   x = (x − μ) / σ
use log::warn;
use ndarray::Array2;

/// Statistics a channel was normalised with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelStats {
    pub mean: f32,
    pub std: f32,
}

/// Z-score every row of `data` ([C, T]) in place.
///
/// Returns the pre-normalisation statistics per channel. A channel with
/// zero variance is left unscaled (only logged).
pub fn zscore_channels_inplace(data: &mut Array2<f32>) -> Vec<ChannelStats> {
    data.rows_mut()
        .into_iter()
        .enumerate()
        .map(|(ch, mut row)| {
            let n = row.len().max(1) as f64;
            let mean = row.iter().map(|&v| v as f64).sum::<f64>() / n;
            let var = row
                .iter()
                .map(|&v| {
                    let d = v as f64 - mean;
                    d * d
                })
                .sum::<f64>()
                / n;
            let std = var.sqrt() as f32;
            let mean = mean as f32;

            if std > 0.0 {
                row.mapv_inplace(|v| (v - mean) / std);
            } else {
                warn!("channel {ch} has zero variance, leaving it unscaled");
            }
            ChannelStats { mean, std }
        })
        .collect()
}
