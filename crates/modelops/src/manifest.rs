use crate::Hash32;
use std::path::Path;

/// Deterministic artifact fingerprint:
/// - hash bytes: "<file_name>\n<size>\n<modified_at>\n"
/// - metadata only, the artifact itself is never read here
pub fn artifact_fingerprint(path: &Path, size: u64, modified_at: u64) -> Hash32 {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut hasher = blake3::Hasher::new();
    hasher.update(name.as_bytes());
    hasher.update(b"\n");
    hasher.update(size.to_string().as_bytes());
    hasher.update(b"\n");
    hasher.update(modified_at.to_string().as_bytes());
    hasher.update(b"\n");
    hasher.finalize().into()
}
