use async_trait::async_trait;

use crate::{ModelArtifact, ModelConfig};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EngineInfo {
    pub name: String,
    pub location: String,
}

/// A loaded inference engine. Only ever driven by one caller at a time.
#[async_trait]
pub trait Engine: Send {
    async fn generate(&mut self, prompt: &str) -> anyhow::Result<String>;
    fn close(&mut self) -> anyhow::Result<()>;
}

/// Turns a model artifact on disk into a running [`Engine`].
#[async_trait]
pub trait EngineLoader: Send + Sync {
    async fn load(
        &self,
        artifact: &ModelArtifact,
        config: &ModelConfig,
    ) -> anyhow::Result<Box<dyn Engine>>;
    fn info(&self) -> EngineInfo;
}
