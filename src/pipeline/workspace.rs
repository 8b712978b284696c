use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use super::types::RunId;

/// Scratch directory owned by one run; removed when dropped, on success and failure alike.
pub struct RunWorkspace {
    dir: TempDir,
}

impl RunWorkspace {
    /// Create a fresh directory under `parent`, or under the system temp dir.
    pub fn create(parent: Option<&Path>, run_id: RunId) -> io::Result<Self> {
        let prefix = format!("lexsum-{run_id}-");
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix);
        let dir = match parent {
            Some(parent) => {
                std::fs::create_dir_all(parent)?;
                builder.tempdir_in(parent)?
            }
            None => builder.tempdir()?,
        };
        Ok(Self { dir })
    }

    /// Directory path.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `contents` to `name` inside the workspace.
    pub async fn stage(&self, name: &str, contents: &[u8]) -> io::Result<PathBuf> {
        let path = self.dir.path().join(name);
        tokio::fs::write(&path, contents).await?;
        Ok(path)
    }
}
