//! Markdown artifact files.

use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::roles::AgentRole;

/// Writes each role's finished document under one output directory.
#[derive(Debug, Clone)]
pub struct MarkdownSink {
    dir: PathBuf,
}

impl MarkdownSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path the role's artifact is written to.
    pub fn path_for(&self, role: AgentRole) -> PathBuf {
        self.dir.join(role.artifact_file())
    }

    /// Write `text` for `role`. Failures are logged; the caller's task goes on.
    pub fn write(&self, role: AgentRole, text: &str) -> Option<PathBuf> {
        let path = self.path_for(role);
        let result = std::fs::create_dir_all(&self.dir).and_then(|_| std::fs::write(&path, text));
        match result {
            Ok(()) => {
                info!(role = %role, path = %path.display(), "Artifact written");
                Some(path)
            }
            Err(e) => {
                error!(role = %role, path = %path.display(), "Failed to write artifact: {}", e);
                None
            }
        }
    }
}
