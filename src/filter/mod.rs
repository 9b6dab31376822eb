//! FIR highpass design and application.
//!
//! - [`design`]: Hamming-windowed sinc highpass ([`FirHighpass`]).
//! - [`apply`]: overlap-add zero-phase convolution.

pub mod apply;
pub mod design;

pub use apply::{apply_fir_zero_phase, filter_1d};
pub use design::{auto_filter_length, auto_trans_bandwidth, firwin_lowpass, hamming, FirHighpass};
