use anyhow::{bail, Context};
use async_trait::async_trait;
use modelops::{Engine, EngineInfo, EngineLoader, ModelArtifact, ModelConfig};
use serde::Deserialize;
use tracing::debug;

/// Engine backed by an OpenAI-compatible server on this machine
/// (LM Studio, llama.cpp server). The artifact's file stem is the model id
/// the server must be serving.
pub struct LocalServerLoader {
    base_url: String,
    client: reqwest::Client,
}

impl LocalServerLoader {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ModelList {
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

impl ModelList {
    fn serves(&self, model: &str) -> bool {
        self.data.iter().any(|m| m.id == model)
    }
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl ChatReply {
    fn into_text(self) -> Option<String> {
        self.choices.into_iter().next().and_then(|c| c.message.content)
    }
}

#[async_trait]
impl EngineLoader for LocalServerLoader {
    async fn load(
        &self,
        artifact: &ModelArtifact,
        config: &ModelConfig,
    ) -> anyhow::Result<Box<dyn Engine>> {
        let model = artifact.model_id();
        if model.is_empty() {
            bail!("artifact {} has no usable file name", artifact.path.display());
        }

        let url = format!("{}/v1/models", self.base_url);
        let listing: ModelList = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("engine server unreachable at {}", self.base_url))?
            .error_for_status()?
            .json()
            .await
            .context("malformed model listing from engine server")?;

        if !listing.serves(&model) {
            bail!("engine server at {} does not serve model {model:?}", self.base_url);
        }

        debug!(%model, "local server: model available");
        Ok(Box::new(LocalServerEngine {
            base_url: self.base_url.clone(),
            model,
            config: *config,
            client: Some(self.client.clone()),
        }))
    }

    fn info(&self) -> EngineInfo {
        EngineInfo {
            name: "local-server".to_string(),
            location: self.base_url.clone(),
        }
    }
}

struct LocalServerEngine {
    base_url: String,
    model: String,
    config: ModelConfig,
    client: Option<reqwest::Client>,
}

#[async_trait]
impl Engine for LocalServerEngine {
    async fn generate(&mut self, prompt: &str) -> anyhow::Result<String> {
        let client = self.client.as_ref().context("engine is closed")?;

        let body = serde_json::json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "max_tokens": self.config.max_tokens,
            "top_k": self.config.top_k,
        });

        let url = format!("{}/v1/chat/completions", self.base_url);
        let reply: ChatReply = client
            .post(url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("malformed completion from engine server")?;

        reply.into_text().context("engine server reply carried no text")
    }

    fn close(&mut self) -> anyhow::Result<()> {
        self.client = None;
        Ok(())
    }
}
