//! Classification + spectrogram bundle with timeline validation.
use crate::classify::ClassificationResult;
use crate::config::ModelVariant;
use crate::error::ConsistencyError;
use crate::spectral::SpectrogramResult;

/// Slack on duration comparisons, seconds.
pub const TIMELINE_SLACK_S: f32 = 1e-3;

/// Everything a renderer needs for one recording.
#[derive(Debug, Clone)]
pub struct SummaryBundle {
    classification: ClassificationResult,
    spectrogram: SpectrogramResult,
    variant: ModelVariant,
}

impl SummaryBundle {
    pub fn classification(&self) -> &ClassificationResult {
        &self.classification
    }

    pub fn spectrogram(&self) -> &SpectrogramResult {
        &self.spectrogram
    }

    pub fn variant(&self) -> ModelVariant {
        self.variant
    }

    /// Recording duration the bundle was validated against.
    pub fn duration_s(&self) -> f32 {
        self.spectrogram.duration_s()
    }
}

/// Bundle the two results after checking that they describe one timeline.
///
/// With signal duration `D`, epoch length `e` and `E` epochs:
///
/// ```text
///   0 ≤ D − E·e < e              epochs tile the signal, remainder dropped
///   |span − D| ≤ step            spectrogram covers the signal
///   power[c].dim() == [F, W]     for every channel c
/// ```
///
/// All comparisons allow [`TIMELINE_SLACK_S`].
pub fn assemble(
    classification: ClassificationResult,
    spectrogram: SpectrogramResult,
    variant: ModelVariant,
) -> Result<SummaryBundle, ConsistencyError> {
    let duration_s = spectrogram.duration_s();
    let epoch_s = classification.epoch_dur();
    let remainder = duration_s - classification.duration_s();
    if remainder < -TIMELINE_SLACK_S || remainder >= epoch_s + TIMELINE_SLACK_S {
        return Err(ConsistencyError::EpochTimeline {
            epochs: classification.len(),
            epoch_s,
            duration_s,
        });
    }

    let span_s = spectrogram.span_s();
    if (span_s - duration_s).abs() > spectrogram.step_s() + TIMELINE_SLACK_S {
        return Err(ConsistencyError::SpectrogramSpan { span_s, duration_s });
    }

    let expected = [spectrogram.freqs().len(), spectrogram.times().len()];
    for (channel, p) in spectrogram.power().iter().enumerate() {
        let got = [p.nrows(), p.ncols()];
        if got != expected {
            return Err(ConsistencyError::ChannelShape { channel, got, expected });
        }
    }

    Ok(SummaryBundle { classification, spectrogram, variant })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::N_STAGES;
    use ndarray::Array2;

    fn classification(epochs: usize) -> ClassificationResult {
        ClassificationResult::from_probabilities(Array2::from_elem((epochs, N_STAGES), 1.0 / 6.0), 30.0)
    }

    fn spectrogram(duration_s: f32, n_win: usize, n_freq: usize) -> SpectrogramResult {
        let times = (0..n_win).map(|w| w as f32 + 2.0).collect();
        let freqs = (0..n_freq).map(|f| f as f32 * 0.25).collect();
        let power = vec![Array2::zeros((n_freq, n_win)), Array2::zeros((n_freq, n_win))];
        SpectrogramResult::from_parts(power, vec!["L".into(), "R".into()], freqs, times, 4.0, 1.0, duration_s)
    }

    #[test]
    fn consistent_timelines_assemble() {
        let bundle = assemble(classification(10), spectrogram(305.0, 302, 101), ModelVariant::Raw).unwrap();
        assert_eq!(bundle.variant(), ModelVariant::Raw);
        assert_eq!(bundle.classification().len(), 10);
    }

    #[test]
    fn too_many_epochs_rejected() {
        let err = assemble(classification(11), spectrogram(305.0, 302, 101), ModelVariant::Raw).unwrap_err();
        assert!(matches!(err, ConsistencyError::EpochTimeline { epochs: 11, .. }));
    }

    #[test]
    fn missing_epoch_rejected() {
        let err = assemble(classification(9), spectrogram(305.0, 302, 101), ModelVariant::Raw).unwrap_err();
        assert!(matches!(err, ConsistencyError::EpochTimeline { epochs: 9, .. }));
    }

    #[test]
    fn short_spectrogram_rejected() {
        let err = assemble(classification(10), spectrogram(305.0, 250, 101), ModelVariant::Raw).unwrap_err();
        assert!(matches!(err, ConsistencyError::SpectrogramSpan { .. }));
    }

    #[test]
    fn channel_shape_checked() {
        let ok = spectrogram(305.0, 302, 101);
        let mut power = ok.power().to_vec();
        power[1] = Array2::zeros((100, 302));
        let bad = SpectrogramResult::from_parts(
            power,
            ok.ch_names().to_vec(),
            ok.freqs().to_vec(),
            ok.times().to_vec(),
            4.0,
            1.0,
            305.0,
        );
        let err = assemble(classification(10), bad, ModelVariant::Raw).unwrap_err();
        assert!(matches!(err, ConsistencyError::ChannelShape { channel: 1, .. }));
    }
}
