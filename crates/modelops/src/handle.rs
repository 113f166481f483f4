use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use tracing::{info, warn};

use crate::{
    artifact_fingerprint, Engine, EngineLoader, HandleStatus, ModelArtifact, ModelConfig,
    ModelError, Result,
};

/// Thin fail-fast wrapper around one loaded engine.
///
/// No retries happen here. `generate` only reaches the engine while the
/// status is `Ready`, and `close` releases the engine at most once.
pub struct ModelHandle {
    path: PathBuf,
    config: ModelConfig,
    status: HandleStatus,
    artifact: Option<ModelArtifact>,
    engine: Option<Box<dyn Engine>>,
}

impl ModelHandle {
    /// A handle that has never been opened.
    pub fn new(path: impl Into<PathBuf>, config: ModelConfig) -> Self {
        Self {
            path: path.into(),
            config,
            status: HandleStatus::Unloaded,
            artifact: None,
            engine: None,
        }
    }

    pub async fn open(
        path: impl Into<PathBuf>,
        config: ModelConfig,
        loader: &dyn EngineLoader,
    ) -> Result<Self> {
        let mut handle = Self::new(path, config);
        handle.load(loader).await?;
        Ok(handle)
    }

    async fn load(&mut self, loader: &dyn EngineLoader) -> Result<()> {
        self.status = HandleStatus::Loading;

        let artifact = match inspect_artifact(&self.path).await {
            Ok(a) => a,
            Err(e) => {
                self.status = HandleStatus::Unloaded;
                return Err(e);
            }
        };

        let engine = match loader.load(&artifact, &self.config).await {
            Ok(engine) => engine,
            Err(e) => {
                self.status = HandleStatus::Unloaded;
                return Err(ModelError::Load(format!("{e:#}")));
            }
        };

        info!(
            path = %artifact.path.display(),
            size = artifact.size,
            fingerprint = %artifact.fingerprint_hex(),
            engine = %loader.info().name,
            "model handle ready"
        );

        self.engine = Some(engine);
        self.artifact = Some(artifact);
        self.status = HandleStatus::Ready;
        Ok(())
    }

    pub async fn generate(&mut self, question: &str) -> Result<String> {
        if self.status != HandleStatus::Ready {
            return Err(ModelError::InvalidState(format!(
                "generate called on a {:?} handle",
                self.status
            )));
        }
        let engine = self
            .engine
            .as_mut()
            .ok_or_else(|| ModelError::InvalidState("handle has no engine".into()))?;

        engine
            .generate(question)
            .await
            .map_err(|e| ModelError::Inference(format!("{e:#}")))
    }

    /// Idempotent. Safe on a handle that was never opened. A failing engine
    /// close is logged; the handle is closed either way.
    pub fn close(&mut self) {
        self.status = HandleStatus::Closed;
        if let Some(mut engine) = self.engine.take() {
            if let Err(e) = engine.close() {
                warn!(path = %self.path.display(), "engine close failed: {e:#}");
            }
        }
    }

    pub fn status(&self) -> HandleStatus {
        self.status
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn artifact(&self) -> Option<&ModelArtifact> {
        self.artifact.as_ref()
    }
}

impl Drop for ModelHandle {
    fn drop(&mut self) {
        self.close();
    }
}

async fn inspect_artifact(path: &Path) -> Result<ModelArtifact> {
    let meta = match tokio::fs::metadata(path).await {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ModelError::NotFound(path.to_path_buf()))
        }
        Err(e) => {
            return Err(ModelError::Load(format!(
                "cannot stat {}: {e}",
                path.display()
            )))
        }
    };

    if !meta.is_file() {
        return Err(ModelError::Load(format!(
            "{} is not a regular file",
            path.display()
        )));
    }
    if meta.len() == 0 {
        return Err(ModelError::Load(format!("{} is empty", path.display())));
    }

    let modified_at = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0);

    Ok(ModelArtifact {
        path: path.to_path_buf(),
        size: meta.len(),
        modified_at,
        fingerprint: artifact_fingerprint(path, meta.len(), modified_at),
    })
}
