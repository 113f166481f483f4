use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub type Hash32 = [u8; 32];

pub const DEFAULT_MAX_TOKENS: u32 = 512;
pub const DEFAULT_TOP_K: u32 = 40;

/// Engine options applied at load time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub max_tokens: u32,
    pub top_k: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            top_k: DEFAULT_TOP_K,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandleStatus {
    Unloaded,
    Loading,
    Ready,
    Closed,
}

/// What a successful open saw on disk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub path: PathBuf,
    pub size: u64,
    pub modified_at: u64,             // unix secs, 0 when the fs does not report it
    pub fingerprint: Hash32,          // blake3 over name/size/mtime
}

impl ModelArtifact {
    /// Model id a serving engine knows this artifact by: the file stem.
    pub fn model_id(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn fingerprint_hex(&self) -> String {
        hex::encode(self.fingerprint)
    }
}
