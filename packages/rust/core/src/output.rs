//! Final artifact writer.
//!
//! The post is written to a hidden, per-call temp sibling and renamed into
//! place, so a failed run never leaves a half-written file at the output path
//! and concurrent writers never share a temp file.

use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use blogwright_shared::{BlogwrightError, Result};

/// What was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputMeta {
    pub size_bytes: usize,
    pub sha256: String,
}

/// Write `content` to `path` as UTF-8, replacing any existing file.
#[instrument(skip_all, fields(path = %path.display(), len = content.len()))]
pub fn write_output(path: &Path, content: &str) -> Result<OutputMeta> {
    let file_name = path
        .file_name()
        .ok_or_else(|| {
            BlogwrightError::validation(format!("output path has no file name: {}", path.display()))
        })?
        .to_string_lossy()
        .into_owned();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| BlogwrightError::io(parent, e))?;
    }

    let temp = path.with_file_name(format!(".{file_name}.{}.tmp", uuid::Uuid::now_v7()));
    std::fs::write(&temp, content).map_err(|e| BlogwrightError::io(&temp, e))?;
    debug!(temp = %temp.display(), "wrote temp file");

    if let Err(e) = std::fs::rename(&temp, path) {
        let _ = std::fs::remove_file(&temp);
        return Err(BlogwrightError::io(path, e));
    }

    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let meta = OutputMeta {
        size_bytes: content.len(),
        sha256: format!("{:x}", hasher.finalize()),
    };

    info!(size = meta.size_bytes, "blog post written");
    Ok(meta)
}
