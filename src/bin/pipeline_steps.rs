/// pipeline_steps: read one left/right EDF pair, run each preprocessing
/// step, write every intermediate array to a safetensors file.
///
/// Output keys:
///   raw             [2, T_orig]   f32  paired EDF data, µV
///   resample        [2, T]        f32  after resampling to --sfreq
///   hp              [2, T]        f32  after highpass FIR
///   zscore          [2, T]        f32  after per-channel z-score (if enabled)
///   epochs          [E, 2, S]     f32  classifier input
///   freqs           [F]           f32  multitaper frequency axis
///   times           [W]           f32  multitaper window centres
///   spectrogram_N   [F, W]        f32  per channel (N = 0, 1)
///   n_epochs        [1]           i32
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use ezscore::{
    epoch::epoch,
    filter::FirHighpass,
    io::TensorWriter,
    normalize::zscore_channels_inplace,
    recording::{load_pair, RecordingPair},
    resample::resample,
    spectral::MultitaperAnalyzer,
    PipelineConfig,
};

#[derive(Parser, Debug)]
#[command(name = "pipeline_steps")]
struct Args {
    /// Left-channel EDF; the right channel is derived from its name.
    #[arg(long)]
    left: PathBuf,

    /// Output safetensors path.
    #[arg(long)]
    output: PathBuf,

    /// Target sampling rate (Hz).
    #[arg(long, default_value_t = 64.0_f32)]
    sfreq: f32,

    /// Highpass cutoff (Hz).
    #[arg(long, default_value_t = 0.5_f32)]
    hp: f32,

    /// Epoch duration (s).
    #[arg(long, default_value_t = 30.0_f32)]
    epoch_dur: f32,

    /// Keep raw µV instead of z-scoring (the ez6rt input).
    #[arg(long)]
    raw: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let cfg = PipelineConfig {
        target_sfreq: args.sfreq,
        hp_freq: args.hp,
        epoch_dur: args.epoch_dur,
        normalize: !args.raw,
        ..PipelineConfig::default()
    };

    // ── 1. Read EDF pair ───────────────────────────────────────────────────
    let t_edf = now();
    let pair = RecordingPair::from_left(&args.left)?;
    let raw = load_pair(&pair, &cfg)?;
    let ms_edf = t_edf.elapsed().as_secs_f64() * 1000.0;

    // ── 2. Resample ────────────────────────────────────────────────────────
    let t_rs = now();
    let data_rs = resample(raw.data(), raw.sfreq() as f32, args.sfreq)?;
    let ms_rs = t_rs.elapsed().as_secs_f64() * 1000.0;

    // ── 3. Highpass filter ─────────────────────────────────────────────────
    let t_hp = now();
    let mut data_hp = data_rs.clone();
    let hp = FirHighpass::design(args.hp, args.sfreq)?;
    hp.apply(&mut data_hp);
    let ms_hp = t_hp.elapsed().as_secs_f64() * 1000.0;

    // ── 4. Z-score ─────────────────────────────────────────────────────────
    let t_z = now();
    let mut data_z = data_hp.clone();
    if cfg.normalize {
        zscore_channels_inplace(&mut data_z);
    }
    let ms_z = t_z.elapsed().as_secs_f64() * 1000.0;

    // ── 5. Epoch ───────────────────────────────────────────────────────────
    let t_ep = now();
    let epochs = epoch(data_z.view(), cfg.epoch_samples());
    let n_epochs = epochs.shape()[0];
    let ms_ep = t_ep.elapsed().as_secs_f64() * 1000.0;

    // ── 6. Multitaper ──────────────────────────────────────────────────────
    let t_mt = now();
    let mt = MultitaperAnalyzer::new(&cfg.spectral, args.sfreq)?;
    let spectrograms = data_z
        .rows()
        .into_iter()
        .map(|row| mt.channel_spectrogram(&row.to_vec()))
        .collect::<Result<Vec<_>, _>>()?;
    let ms_mt = t_mt.elapsed().as_secs_f64() * 1000.0;

    eprintln!(
        "TIMING edf={ms_edf:.4}ms resample={ms_rs:.4}ms hp={ms_hp:.4}ms \
         zscore={ms_z:.4}ms epoch={ms_ep:.4}ms multitaper={ms_mt:.4}ms",
    );
    eprintln!(
        "  {} @ {} Hz  {} taps  {n_epochs} epochs",
        pair.id(),
        raw.sfreq(),
        hp.len()
    );

    // ── 7. Write output ────────────────────────────────────────────────────
    eprintln!("Writing → {}", args.output.display());
    let mut w = TensorWriter::new();
    w.add_f32_arr2("raw", raw.data());
    w.add_f32_arr2("resample", &data_rs);
    w.add_f32_arr2("hp", &data_hp);
    if cfg.normalize {
        w.add_f32_arr2("zscore", &data_z);
    }
    let ep: Vec<f32> = epochs.iter().copied().collect();
    w.add_f32("epochs", &ep, epochs.shape());
    let freqs = mt.freqs();
    let times = mt.times(data_z.ncols());
    w.add_f32("freqs", &freqs, &[freqs.len()]);
    w.add_f32("times", &times, &[times.len()]);
    for (i, s) in spectrograms.iter().enumerate() {
        w.add_f32_arr2(&format!("spectrogram_{i}"), s);
    }
    w.add_i32("n_epochs", &[n_epochs as i32], &[1]);
    w.add_metadata("source_sfreq", raw.sfreq().to_string());
    w.write(&args.output)?;

    eprintln!("Done.");
    Ok(())
}

/// Return `std::time::Instant::now()` (used for internal timing).
#[inline(always)]
fn now() -> std::time::Instant {
    std::time::Instant::now()
}
