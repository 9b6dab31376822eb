//! Stage model seam and the ONNX runtime behind it.
//!
//! A model directory holds one or more `*.onnx` graphs and an optional
//! `model.json` manifest:
//!
//! ```text
//! <root>/ez6moe/
//!   ├─ model.json        {"channels": 2, "epoch_samples": 1920,
//!   │                     "layout": "channels_last", "batch_size": 64}
//!   ├─ expert_0.onnx
//!   ├─ expert_1.onnx
//!   └─ …
//! ```
//!
//! Graphs are loaded with a fixed batch dimension; the final partial batch
//! is zero-padded and the padding rows are dropped from the output.
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use ndarray::{s, Array2, ArrayView1, ArrayView3};
use serde::{Deserialize, Serialize};
use tract_onnx::prelude::*;

use super::{check_member_count, N_STAGES};
use crate::config::ModelVariant;
use crate::error::InferenceError;

pub const MANIFEST_FILE: &str = "model.json";

// ── Trait ────────────────────────────────────────────────────────────────────

/// Anything that maps `[B, C, S]` epochs to `[B, 6]` scores.
///
/// Scores may be logits or probabilities; the classifier normalises them.
pub trait StageModel: Send + Sync {
    /// `(channels, samples per epoch)`.
    fn input_shape(&self) -> (usize, usize);

    fn predict(&self, epochs: ArrayView3<'_, f32>) -> Result<Array2<f32>, InferenceError>;
}

impl<M: StageModel + ?Sized> StageModel for Box<M> {
    fn input_shape(&self) -> (usize, usize) {
        (**self).input_shape()
    }

    fn predict(&self, epochs: ArrayView3<'_, f32>) -> Result<Array2<f32>, InferenceError> {
        (**self).predict(epochs)
    }
}

/// Produces the members of a variant from its artifact directory.
pub trait ModelLoader {
    type Model: StageModel;

    fn load(&self, variant: ModelVariant, dir: &Path) -> Result<Vec<Self::Model>, InferenceError>;
}

// ── Manifest ─────────────────────────────────────────────────────────────────

/// Axis order of the graph input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputLayout {
    /// `[B, C, S]`
    ChannelsFirst,
    /// `[B, S, C]`
    ChannelsLast,
}

/// `model.json`; every field is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelManifest {
    pub channels: usize,
    pub epoch_samples: usize,
    pub layout: InputLayout,
    pub batch_size: usize,
}

impl Default for ModelManifest {
    fn default() -> Self {
        Self {
            channels: 2,
            epoch_samples: 1920,
            layout: InputLayout::ChannelsLast,
            batch_size: 64,
        }
    }
}

impl ModelManifest {
    /// Read `<dir>/model.json`, or the defaults if it is absent.
    pub fn read(dir: &Path) -> Result<Self, InferenceError> {
        let path = dir.join(MANIFEST_FILE);
        if !path.is_file() {
            return Ok(Self::default());
        }
        let load_err = |reason: String| InferenceError::ModelLoad { path: path.clone(), reason };
        let text = fs::read_to_string(&path).map_err(|e| load_err(e.to_string()))?;
        let manifest: Self = serde_json::from_str(&text).map_err(|e| load_err(e.to_string()))?;
        if manifest.batch_size == 0 || manifest.channels == 0 || manifest.epoch_samples == 0 {
            return Err(load_err("channels, epoch_samples and batch_size must be positive".into()));
        }
        Ok(manifest)
    }

    /// Graph input shape for one batch.
    pub fn graph_input_shape(&self) -> [usize; 3] {
        match self.layout {
            InputLayout::ChannelsFirst => [self.batch_size, self.channels, self.epoch_samples],
            InputLayout::ChannelsLast => [self.batch_size, self.epoch_samples, self.channels],
        }
    }
}

/// `*.onnx` files directly inside `dir`, sorted by file name.
pub fn list_graphs(dir: &Path) -> Result<Vec<PathBuf>, InferenceError> {
    let entries = fs::read_dir(dir).map_err(|e| InferenceError::ModelLoad {
        path: dir.to_path_buf(),
        reason: e.to_string(),
    })?;
    let mut graphs: Vec<PathBuf> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("onnx")))
        .collect();
    graphs.sort();
    Ok(graphs)
}

// ── ONNX ─────────────────────────────────────────────────────────────────────

type Plan = TypedRunnableModel<TypedModel>;

/// One optimised ONNX graph with a fixed input shape.
pub struct OnnxModel {
    plan: Plan,
    manifest: ModelManifest,
    path: PathBuf,
}

impl std::fmt::Debug for OnnxModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxModel")
            .field("path", &self.path)
            .field("manifest", &self.manifest)
            .finish_non_exhaustive()
    }
}

impl OnnxModel {
    pub fn load(path: impl AsRef<Path>, manifest: &ModelManifest) -> Result<Self, InferenceError> {
        let path = path.as_ref();
        let plan = build_plan(path, manifest.graph_input_shape()).map_err(|e| {
            InferenceError::ModelLoad { path: path.to_path_buf(), reason: format!("{e:#}") }
        })?;
        debug!("loaded {} with input {:?}", path.display(), manifest.graph_input_shape());
        Ok(Self { plan, manifest: manifest.clone(), path: path.to_path_buf() })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn manifest(&self) -> &ModelManifest {
        &self.manifest
    }

    /// Run one full batch; `buf` is laid out as the graph input.
    fn run_batch(&self, buf: &[f32]) -> Result<Vec<f32>, InferenceError> {
        let batch = self.manifest.batch_size;
        let input = Tensor::from_shape(&self.manifest.graph_input_shape(), buf).map_err(runtime)?;
        let outputs = self.plan.run(tvec!(input.into())).map_err(runtime)?;
        let out = outputs
            .first()
            .ok_or_else(|| InferenceError::Runtime("graph produced no output".into()))?;

        let shape = out.shape();
        if shape.last() != Some(&N_STAGES) || shape.iter().product::<usize>() != batch * N_STAGES {
            return Err(InferenceError::OutputShape {
                got: shape.to_vec(),
                epochs: batch,
                classes: N_STAGES,
            });
        }
        Ok(out.as_slice::<f32>().map_err(runtime)?.to_vec())
    }
}

impl StageModel for OnnxModel {
    fn input_shape(&self) -> (usize, usize) {
        (self.manifest.channels, self.manifest.epoch_samples)
    }

    fn predict(&self, epochs: ArrayView3<'_, f32>) -> Result<Array2<f32>, InferenceError> {
        let (n, n_ch, n_samp) = epochs.dim();
        let batch = self.manifest.batch_size;
        let mut out = Array2::<f32>::zeros((n, N_STAGES));
        let mut buf = vec![0.0_f32; batch * n_ch * n_samp];

        for start in (0..n).step_by(batch) {
            let stop = (start + batch).min(n);
            let chunk = epochs.slice(s![start..stop, .., ..]);
            buf.fill(0.0);
            match self.manifest.layout {
                InputLayout::ChannelsFirst => {
                    buf.iter_mut().zip(chunk.iter()).for_each(|(d, &v)| *d = v);
                }
                InputLayout::ChannelsLast => {
                    let chunk = chunk.permuted_axes([0, 2, 1]);
                    buf.iter_mut().zip(chunk.iter()).for_each(|(d, &v)| *d = v);
                }
            }

            let scores = self.run_batch(&buf)?;
            for (r, row) in (start..stop).enumerate() {
                let x = &scores[r * N_STAGES..(r + 1) * N_STAGES];
                out.row_mut(row).assign(&ArrayView1::from(x));
            }
        }
        Ok(out)
    }
}

fn build_plan(path: &Path, shape: [usize; 3]) -> TractResult<Plan> {
    tract_onnx::onnx()
        .model_for_path(path)?
        .with_input_fact(0, f32::fact(shape).into())?
        .into_optimized()?
        .into_runnable()
}

fn runtime(e: TractError) -> InferenceError {
    InferenceError::Runtime(format!("{e:#}"))
}

/// Loads a variant directory into [`OnnxModel`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct OnnxLoader;

impl ModelLoader for OnnxLoader {
    type Model = OnnxModel;

    fn load(&self, variant: ModelVariant, dir: &Path) -> Result<Vec<OnnxModel>, InferenceError> {
        let manifest = ModelManifest::read(dir)?;
        let graphs = list_graphs(dir)?;
        check_member_count(variant, graphs.len())?;
        info!("loading {variant} from {} ({} graph(s))", dir.display(), graphs.len());
        graphs.iter().map(|p| OnnxModel::load(p, &manifest)).collect()
    }
}
