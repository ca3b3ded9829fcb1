//! Package compiled classes into a runnable jar.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};

use super::Packager;
use crate::error::{Diagnostic, ErrorKind};

#[derive(Debug, Clone)]
pub struct JarPackager {
    program: PathBuf,
}

impl JarPackager {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Packager for JarPackager {
    fn package(&self, artifact_path: &Path, entry_unit: &str, compiled_dir: &Path) -> Result<()> {
        tracing::debug!(artifact = %artifact_path.display(), entry = entry_unit, "packaging");
        let output = Command::new(&self.program)
            .arg("--create")
            .arg("--file")
            .arg(artifact_path)
            .arg("--main-class")
            .arg(entry_unit)
            .arg("-C")
            .arg(compiled_dir)
            .arg(".")
            .output()
            .with_context(|| format!("Running {}", self.program.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Diagnostic::error(
                ErrorKind::PackagingError,
                0,
                format!("{} failed ({}): {}", self.program.display(), output.status, stderr.trim()),
            ))
            .with_context(|| format!("Packaging {}", artifact_path.display()));
        }

        mark_executable(artifact_path)
    }
}

#[cfg(unix)]
fn mark_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = std::fs::metadata(path)
        .with_context(|| format!("Reading {}", path.display()))?
        .permissions();
    permissions.set_mode(permissions.mode() | 0o111);
    std::fs::set_permissions(path, permissions)
        .with_context(|| format!("Marking {} executable", path.display()))
}

#[cfg(not(unix))]
fn mark_executable(_path: &Path) -> Result<()> {
    Ok(())
}
