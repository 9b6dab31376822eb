//! ezscore: score every `*L.edf` / `*R.edf` pair below a data directory.
//!
//! Writes one `hypnos_<id>_<artifact>.safetensors` per recording next to
//! its EDF files (or under `--output`) and a `report.json` summarising the
//! batch. Failed recordings are reported, never fatal.
use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{error, info};
use std::path::PathBuf;

use ezscore::{
    discover_pairs,
    io::{summary_file_name, write_report, write_summary, BatchReport, ReportEntry},
    LocalArtifacts, ModelCache, ModelVariant, Pipeline, PipelineConfig,
};

#[derive(Parser, Debug)]
#[command(name = "ezscore", about = "Sleep-stage scoring for paired ZMax EDF recordings")]
struct Args {
    /// Directory searched recursively for `*L.edf` files.
    #[arg(long, env = "EZSCORE_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Root holding one directory per model artifact (ez6, ez6rt, ez6moe).
    #[arg(long, env = "EZSCORE_MODEL_DIR", default_value = "model")]
    model_dir: PathBuf,

    /// normalized | raw | mixture (aliases: ez6, ez6rt, ez6moe).
    #[arg(long, default_value = "normalized")]
    variant: ModelVariant,

    /// Output directory; defaults to each recording's own directory.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Target sampling rate (Hz).
    #[arg(long, default_value_t = 64.0_f32)]
    target_sfreq: f32,

    /// Highpass cutoff (Hz).
    #[arg(long, default_value_t = 0.5_f32)]
    hp_freq: f32,

    /// Epoch duration (s).
    #[arg(long, default_value_t = 30.0_f32)]
    epoch_dur: f32,

    /// Worker threads (0 = one per core).
    #[arg(long, short = 'j', default_value_t = 0)]
    jobs: usize,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let pairs = discover_pairs(&args.data_dir)
        .with_context(|| format!("scanning {}", args.data_dir.display()))?;
    if pairs.is_empty() {
        bail!("no *L.edf recordings found under {}", args.data_dir.display());
    }
    info!("found {} recording pair(s) under {}", pairs.len(), args.data_dir.display());

    let mut models = ModelCache::new(LocalArtifacts::new(&args.model_dir));
    let classifier = models
        .get_or_load(args.variant)
        .with_context(|| format!("loading {} from {}", args.variant, args.model_dir.display()))?;

    let cfg = PipelineConfig {
        target_sfreq: args.target_sfreq,
        hp_freq: args.hp_freq,
        epoch_dur: args.epoch_dur,
        ..PipelineConfig::for_variant(args.variant)
    };
    let pipeline = Pipeline::new(&classifier, cfg)?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(args.jobs)
        .thread_name(|i| format!("ezscore-worker-{i}"))
        .build()
        .context("building thread pool")?;
    let outcomes = pool.install(|| pipeline.score_batch(&pairs));

    if let Some(dir) = &args.output {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let mut entries = Vec::with_capacity(outcomes.len());
    for outcome in &outcomes {
        let Ok(bundle) = &outcome.result else {
            entries.push(ReportEntry::from_outcome(outcome, None));
            continue;
        };
        let dir = match &args.output {
            Some(dir) => dir.clone(),
            None => outcome.pair.left.parent().map(PathBuf::from).unwrap_or_default(),
        };
        let path = dir.join(summary_file_name(&outcome.pair.id(), args.variant));
        let entry = match write_summary(bundle, &path) {
            Ok(()) => {
                info!("wrote {}", path.display());
                ReportEntry::from_outcome(outcome, Some(path))
            }
            Err(e) => {
                error!("{}: {e}", outcome.pair.id());
                ReportEntry::from_outcome(outcome, None).with_export_error(&e)
            }
        };
        entries.push(entry);
    }

    let report = BatchReport::new(args.variant, entries);
    let report_path = args.output.clone().unwrap_or_else(|| args.data_dir.clone()).join("report.json");
    write_report(&report, &report_path)?;
    info!(
        "{} succeeded, {} failed; report → {}",
        report.succeeded,
        report.failed,
        report_path.display()
    );
    Ok(())
}
