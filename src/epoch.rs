//! Fixed-length epoching.
//!
//! Splits continuous [C, T] data into non-overlapping windows of
//! `epoch_samples` samples, dropping any trailing incomplete window.
use ndarray::{s, Array3, ArrayView2, ArrayView3};

/// Epoch `data` ([C, T]) into a 3-D array [E, C, epoch_samples].
///
/// `E = floor(T / epoch_samples)`; `epoch_samples == 0` yields no epochs.
pub fn epoch(data: ArrayView2<'_, f32>, epoch_samples: usize) -> Array3<f32> {
    let (n_ch, n_t) = data.dim();
    let n_epochs = n_t.checked_div(epoch_samples).unwrap_or(0);

    let mut out = Array3::<f32>::zeros((n_epochs, n_ch, epoch_samples));
    for (e, mut dst) in out.outer_iter_mut().enumerate() {
        let start = e * epoch_samples;
        dst.assign(&data.slice(s![.., start..start + epoch_samples]));
    }
    out
}

/// Classifier input: channel-first epochs cut from a cleaned signal.
#[derive(Debug, Clone)]
pub struct EpochArray {
    data: Array3<f32>,
    sfreq: f32,
    epoch_dur: f32,
}

impl EpochArray {
    /// Cut `data` ([C, T] at `sfreq`) into `epoch_dur`-second windows.
    pub fn from_signal(data: ArrayView2<'_, f32>, sfreq: f32, epoch_dur: f32) -> Self {
        let epoch_samples = (epoch_dur * sfreq).round() as usize;
        Self { data: epoch(data, epoch_samples), sfreq, epoch_dur }
    }

    /// `[E, C, S]` samples.
    pub fn view(&self) -> ArrayView3<'_, f32> {
        self.data.view()
    }

    /// Number of epochs.
    pub fn len(&self) -> usize {
        self.data.shape()[0]
    }

    /// True when the recording was shorter than one epoch.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn n_channels(&self) -> usize {
        self.data.shape()[1]
    }

    pub fn epoch_samples(&self) -> usize {
        self.data.shape()[2]
    }

    pub fn sfreq(&self) -> f32 {
        self.sfreq
    }

    /// Epoch duration in seconds.
    pub fn epoch_dur(&self) -> f32 {
        self.epoch_dur
    }
}
