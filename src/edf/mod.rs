//! EDF / EDF+ recording reader and single-channel writer.
//!
//! The ZMax headband stores each forehead channel in its own EDF file.
//!
//! # Quick start
//! ```no_run
//! use ezscore::edf::open_edf;
//!
//! let edf = open_edf("data/zmax/night1/EEG L.edf").unwrap();
//! let idx = edf.single_signal().unwrap();
//! println!("{} @ {} Hz", edf.signal(idx).label, edf.sfreq(idx));
//! let samples = edf.read_signal(idx);  // µV
//! ```
pub mod reader;
pub mod writer;

pub use reader::{microvolt_scale, open_edf, EdfFile, EdfSignal, ANNOTATION_LABEL};
pub use writer::EdfWriter;
