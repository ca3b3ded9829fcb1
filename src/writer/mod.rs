//! Everything that leaves the process as files.
pub mod jar;
pub mod java;

use std::path::Path;

use anyhow::Result;

pub use jar::JarPackager;

pub trait Packager {
    /// Bundle the compiled units in `compiled_dir` into `artifact_path`,
    /// launching `entry_unit` when run.
    fn package(&self, artifact_path: &Path, entry_unit: &str, compiled_dir: &Path) -> Result<()>;
}
