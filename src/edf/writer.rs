//! Single-channel EDF writer.
//!
//! Produces files in the layout the ZMax headband exports (one signal per
//! file, 16-bit samples). Used to export synthetic or re-processed traces.
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::LoadError;

const FIXED_HEADER_BYTES: usize = 256;
const SIGNAL_HEADER_BYTES: usize = 256;

const DIGITAL_MIN: i32 = -32768;
const DIGITAL_MAX: i32 = 32767;

/// Builder for a single-signal EDF file.
///
/// ```no_run
/// use ezscore::edf::EdfWriter;
///
/// let samples = vec![0.0_f32; 256 * 60];
/// EdfWriter::new("EEG L", 256.0)
///     .write("EEG L.edf", &samples)
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct EdfWriter {
    label: String,
    physical_dimension: String,
    sfreq: f64,
    record_duration: f64,
}

impl EdfWriter {
    /// Microvolt signal with one-second data records.
    pub fn new(label: &str, sfreq: f64) -> Self {
        Self {
            label: label.to_string(),
            physical_dimension: "uV".to_string(),
            sfreq,
            record_duration: 1.0,
        }
    }

    pub fn physical_dimension(mut self, dim: &str) -> Self {
        self.physical_dimension = dim.to_string();
        self
    }

    pub fn record_duration(mut self, secs: f64) -> Self {
        self.record_duration = secs;
        self
    }

    /// Write `samples` (in the configured physical unit) to `path`.
    ///
    /// The final data record is padded by repeating the last sample, so the
    /// stored length is rounded up to a whole number of records.
    pub fn write<P: AsRef<Path>>(&self, path: P, samples: &[f32]) -> Result<(), LoadError> {
        let path = path.as_ref();
        let bad = |reason: String| LoadError::Header { path: path.to_path_buf(), reason };
        let io = |source| LoadError::Io { path: path.to_path_buf(), source };

        if samples.is_empty() {
            return Err(LoadError::Empty(path.to_path_buf()));
        }
        let spr = (self.sfreq * self.record_duration).round() as usize;
        if spr == 0 || ((spr as f64) / self.record_duration - self.sfreq).abs() > 1e-6 {
            return Err(bad(format!(
                "{} Hz cannot be stored in {} s records",
                self.sfreq, self.record_duration
            )));
        }
        let n_records = samples.len().div_ceil(spr);

        let (lo, hi) = samples
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        let (lo, hi) = if hi - lo < 1e-6 { (lo - 1.0, hi + 1.0) } else { (lo, hi) };

        // Calibrate with the values as printed so the reader sees the same range.
        let phys_min_s = fit_number(lo as f64, 8, Rounding::Down);
        let phys_max_s = fit_number(hi as f64, 8, Rounding::Up);
        let phys_min: f64 = phys_min_s.parse().map_err(|_| bad(phys_min_s.clone()))?;
        let phys_max: f64 = phys_max_s.parse().map_err(|_| bad(phys_max_s.clone()))?;
        let gain = (phys_max - phys_min) / (DIGITAL_MAX - DIGITAL_MIN) as f64;

        let mut header = Vec::with_capacity(FIXED_HEADER_BYTES + SIGNAL_HEADER_BYTES);
        push_field(&mut header, "0", 8);
        push_field(&mut header, "X X X X", 80);
        push_field(&mut header, "Startdate X X X X", 80);
        push_field(&mut header, "01.01.25", 8);
        push_field(&mut header, "00.00.00", 8);
        push_field(&mut header, &(FIXED_HEADER_BYTES + SIGNAL_HEADER_BYTES).to_string(), 8);
        push_field(&mut header, "", 44);
        push_field(&mut header, &n_records.to_string(), 8);
        push_field(&mut header, &fit_number(self.record_duration, 8, Rounding::Nearest), 8);
        push_field(&mut header, "1", 4);

        push_field(&mut header, &self.label, 16);
        push_field(&mut header, "", 80);
        push_field(&mut header, &self.physical_dimension, 8);
        push_field(&mut header, &phys_min_s, 8);
        push_field(&mut header, &phys_max_s, 8);
        push_field(&mut header, &DIGITAL_MIN.to_string(), 8);
        push_field(&mut header, &DIGITAL_MAX.to_string(), 8);
        push_field(&mut header, "", 80);
        push_field(&mut header, &spr.to_string(), 8);
        push_field(&mut header, "", 32);

        let file = File::create(path).map_err(io)?;
        let mut w = BufWriter::new(file);
        w.write_all(&header).map_err(io)?;

        let last = samples[samples.len() - 1];
        let padded = samples
            .iter()
            .copied()
            .chain(std::iter::repeat(last))
            .take(n_records * spr);
        for v in padded {
            let d = ((v as f64 - phys_min) / gain + DIGITAL_MIN as f64)
                .round()
                .clamp(DIGITAL_MIN as f64, DIGITAL_MAX as f64) as i16;
            w.write_all(&d.to_le_bytes()).map_err(io)?;
        }
        w.flush().map_err(io)?;
        Ok(())
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────

#[derive(Clone, Copy)]
enum Rounding {
    Down,
    Up,
    Nearest,
}

/// Format `v` in at most `width` characters, dropping decimals as needed.
fn fit_number(v: f64, width: usize, rounding: Rounding) -> String {
    for decimals in (0..=6).rev() {
        let scale = 10f64.powi(decimals);
        let r = match rounding {
            Rounding::Down => (v * scale).floor() / scale,
            Rounding::Up => (v * scale).ceil() / scale,
            Rounding::Nearest => (v * scale).round() / scale,
        };
        let s = format!("{r:.prec$}", prec = decimals as usize);
        let s = if s.contains('.') {
            s.trim_end_matches('0').trim_end_matches('.').to_string()
        } else {
            s
        };
        if s.len() <= width {
            return s;
        }
    }
    format!("{v:.0}")
}

/// Append `s` as an ASCII field of exactly `width` bytes.
fn push_field(buf: &mut Vec<u8>, s: &str, width: usize) {
    let bytes: Vec<u8> = s.bytes().take(width).collect();
    let n = bytes.len();
    buf.extend(bytes);
    buf.extend(std::iter::repeat(b' ').take(width - n));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_fit_their_field() {
        assert_eq!(fit_number(-1234.56789, 8, Rounding::Down), "-1234.57");
        assert_eq!(fit_number(1.0, 8, Rounding::Nearest), "1");
        assert_eq!(fit_number(0.5, 8, Rounding::Nearest), "0.5");
        assert!(fit_number(-98765.4321, 8, Rounding::Down).len() <= 8);
    }

    #[test]
    fn rounding_direction_brackets_value() {
        let lo: f64 = fit_number(-12.3456789, 8, Rounding::Down).parse().unwrap();
        let hi: f64 = fit_number(12.3456789, 8, Rounding::Up).parse().unwrap();
        assert!(lo <= -12.3456789);
        assert!(hi >= 12.3456789);
    }

    #[test]
    fn fields_are_padded() {
        let mut buf = Vec::new();
        push_field(&mut buf, "ab", 5);
        assert_eq!(buf, b"ab   ");
    }
}
