use anyhow::{Context, Result};
use std::path::Path;
use std::process::Command;

/// Shows a finished project folder to the user.
pub trait FolderOpener: Send + Sync {
    fn open(&self, path: &Path) -> Result<()>;
}

/// Hands the folder to the desktop's file manager.
pub struct SystemOpener;

impl FolderOpener for SystemOpener {
    fn open(&self, path: &Path) -> Result<()> {
        let program = if cfg!(target_os = "windows") {
            "explorer"
        } else if cfg!(target_os = "macos") {
            "open"
        } else {
            "xdg-open"
        };

        Command::new(program)
            .arg(path)
            .spawn()
            .with_context(|| format!("Failed to run {} for {}", program, path.display()))?;
        Ok(())
    }
}

/// Leaves folders alone, for headless runs.
pub struct NoopOpener;

impl FolderOpener for NoopOpener {
    fn open(&self, _path: &Path) -> Result<()> {
        Ok(())
    }
}
