//! Output file writer
//!
//! The file is watched by Prometheus, so it is always replaced in one step:
//! content goes to a temporary file in the same directory which is then
//! renamed over the destination. A failed write leaves the old file as it was.

use crate::error::WriteError;
use crate::targets::TargetGroup;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct TargetWriter {
    path: PathBuf,
}

impl TargetWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// [`write`](Self::write) on the blocking pool, keeping fsync off the runtime workers
    pub async fn persist(&self, groups: Vec<TargetGroup>) -> Result<(), WriteError> {
        let writer = self.clone();
        tokio::task::spawn_blocking(move || writer.write(&groups)).await?
    }

    /// Replace the output file with `groups` as pretty JSON
    pub fn write(&self, groups: &[TargetGroup]) -> Result<(), WriteError> {
        let data = render(groups)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| self.io_error(e))?;
        tmp.write_all(&data).map_err(|e| self.io_error(e))?;
        tmp.as_file().sync_all().map_err(|e| self.io_error(e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o644);
            std::fs::set_permissions(tmp.path(), perms).map_err(|e| self.io_error(e))?;
        }

        tmp.persist(&self.path).map_err(|e| self.io_error(e.error))?;
        debug!("Wrote {} bytes to {}", data.len(), self.path.display());
        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> WriteError {
        WriteError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

/// Serialize groups with 2-space indentation and a trailing newline
pub fn render(groups: &[TargetGroup]) -> Result<Vec<u8>, WriteError> {
    let mut data = serde_json::to_vec_pretty(groups)?;
    data.push(b'\n');
    Ok(data)
}
