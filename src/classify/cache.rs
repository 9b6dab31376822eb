//! Artifact resolution and the per-run model cache.
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{info, warn};

use super::model::{ModelLoader, OnnxLoader};
use super::StageClassifier;
use crate::config::ModelVariant;
use crate::error::{ArtifactUnavailable, InferenceError};

/// Maps a variant to a local model directory.
pub trait ArtifactProvider {
    fn resolve(&self, variant: ModelVariant) -> Result<PathBuf, ArtifactUnavailable>;

    /// Try to materialise the artifact (download, unpack, …).
    ///
    /// The default provider cannot fetch anything.
    fn acquire(&self, variant: ModelVariant) -> Result<(), ArtifactUnavailable> {
        Err(ArtifactUnavailable {
            variant,
            reason: "no acquisition mechanism configured".into(),
        })
    }
}

/// Artifacts already unpacked under `<root>/<artifact name>`.
#[derive(Debug, Clone)]
pub struct LocalArtifacts {
    root: PathBuf,
}

impl LocalArtifacts {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dir_for(&self, variant: ModelVariant) -> PathBuf {
        self.root.join(variant.artifact_name())
    }
}

impl ArtifactProvider for LocalArtifacts {
    fn resolve(&self, variant: ModelVariant) -> Result<PathBuf, ArtifactUnavailable> {
        let dir = self.dir_for(variant);
        if dir.is_dir() {
            Ok(dir)
        } else {
            Err(ArtifactUnavailable {
                variant,
                reason: format!("{} is not a directory", dir.display()),
            })
        }
    }
}

/// Loaded classifiers keyed by variant.
///
/// Created once per run and owned by the caller; each variant is loaded at
/// most once and handed out as a shared `Arc`.
pub struct ModelCache<P, L: ModelLoader = OnnxLoader> {
    provider: P,
    loader: L,
    loaded: HashMap<ModelVariant, Arc<StageClassifier<L::Model>>>,
}

impl<P: ArtifactProvider> ModelCache<P> {
    pub fn new(provider: P) -> Self {
        Self::with_loader(provider, OnnxLoader)
    }
}

impl<P: ArtifactProvider, L: ModelLoader> ModelCache<P, L> {
    pub fn with_loader(provider: P, loader: L) -> Self {
        Self { provider, loader, loaded: HashMap::new() }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Resolve the artifact directory.
    ///
    /// On [`ArtifactUnavailable`] the provider's `acquire` is called and
    /// resolution is retried exactly once. An `acquire` failure is returned
    /// as is.
    pub fn resolve(&self, variant: ModelVariant) -> Result<PathBuf, ArtifactUnavailable> {
        match self.provider.resolve(variant) {
            Ok(dir) => Ok(dir),
            Err(first) => {
                warn!("{first}; attempting acquisition");
                self.provider.acquire(variant)?;
                self.provider.resolve(variant)
            }
        }
    }

    /// The classifier for `variant`, loading it on first use.
    pub fn get_or_load(
        &mut self,
        variant: ModelVariant,
    ) -> Result<Arc<StageClassifier<L::Model>>, InferenceError> {
        if let Some(clf) = self.loaded.get(&variant) {
            return Ok(Arc::clone(clf));
        }
        let dir = self.resolve(variant)?;
        let members = self.loader.load(variant, &dir)?;
        let clf = Arc::new(StageClassifier::new(variant, members)?);
        info!("{variant} ready ({} member(s))", clf.members().len());
        self.loaded.insert(variant, Arc::clone(&clf));
        Ok(clf)
    }

    pub fn is_loaded(&self, variant: ModelVariant) -> bool {
        self.loaded.contains_key(&variant)
    }

    pub fn len(&self) -> usize {
        self.loaded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_artifacts_resolve_existing_dir() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("ez6rt")).unwrap();
        let provider = LocalArtifacts::new(root.path());
        assert_eq!(provider.resolve(ModelVariant::Raw).unwrap(), root.path().join("ez6rt"));
        let err = provider.resolve(ModelVariant::Mixture).unwrap_err();
        assert_eq!(err.variant, ModelVariant::Mixture);
    }

    #[test]
    fn default_acquire_fails() {
        let provider = LocalArtifacts::new("/nonexistent");
        assert!(provider.acquire(ModelVariant::Normalized).is_err());
        let cache = ModelCache::new(provider);
        assert!(cache.resolve(ModelVariant::Normalized).is_err());
    }
}
