//! Native compile step for generated units.

pub mod javac;

use std::path::Path;

use anyhow::Result;

use crate::error::Severity;

pub use javac::JavacBackend;

/// One message from the compiler, positioned in the unit it compiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendDiagnostic {
    /// Byte offset into the unit's source, `None` when the compiler gave no
    /// position.
    pub position: Option<usize>,
    pub severity: Severity,
    pub message: String,
}

impl BackendDiagnostic {
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

pub trait Backend {
    /// Compile `source` as unit `unit_name` into `out_dir`, with
    /// `classpath_dir` visible to it. Success when no entry is an error.
    fn compile(
        &self,
        unit_name: &str,
        source: &str,
        out_dir: &Path,
        classpath_dir: &Path,
    ) -> Result<Vec<BackendDiagnostic>>;
}
