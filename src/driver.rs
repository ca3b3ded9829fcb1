//! One script from `.auto` file to runnable jar.
//!
//! Layout under the output directory (the script's own directory unless
//! `out_dir` is set):
//!
//! ```text
//! <Class>.jar
//! <Class>/            .<Class>/ when nothing is kept (hidden, removed after)
//!     gen/<Unit>.java
//!     class/<Unit>.class
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use crate::catalog::Catalog;
use crate::compiler::{Backend, JavacBackend};
use crate::config::Config;
use crate::model::{SCRIPT_EXTENSION, TranspiledProgram};
use crate::processor::relocate::Relocator;
use crate::processor::{Transpiler, class_name_of};
use crate::report::Reporter;
use crate::writer::{JarPackager, Packager, java};

/// How a script's build ended when nothing unexpected went wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Built(PathBuf),
    /// Diagnostics were printed; no jar was produced.
    Rejected,
}

/// Directories and artifact path for one script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildLayout {
    pub root: PathBuf,
    pub gen_dir: PathBuf,
    pub class_dir: PathBuf,
    pub artifact: PathBuf,
    /// Whether `root` is removed once the jar exists.
    pub temporary: bool,
}

impl BuildLayout {
    pub fn new(base: &Path, class_name: &str, keep: bool) -> Self {
        let root = if keep {
            base.join(class_name)
        } else {
            base.join(format!(".{class_name}"))
        };
        Self {
            gen_dir: root.join("gen"),
            class_dir: root.join("class"),
            artifact: base.join(format!("{class_name}.jar")),
            temporary: !keep,
            root,
        }
    }
}

pub struct Driver<'a> {
    config: &'a Config,
    catalog: &'a dyn Catalog,
    reporter: Reporter,
}

impl<'a> Driver<'a> {
    pub fn new(config: &'a Config, catalog: &'a dyn Catalog) -> Self {
        Self {
            config,
            catalog,
            reporter: Reporter::new(config.colors),
        }
    }

    /// Build `script` with `javac` and `jar`.
    pub fn build(&self, script: &Path) -> Result<Outcome> {
        let class_name = check_script_path(script)?;
        let layout = BuildLayout::new(&self.base_dir(script), &class_name, self.config.keeps_output());
        let backend = JavacBackend::new(&self.config.javac, &layout.gen_dir);
        let packager = JarPackager::new(&self.config.jar);
        self.build_with(script, &layout, &backend, &packager)
    }

    /// Build `script` into `layout` with the given tools.
    pub fn build_with(
        &self,
        script: &Path,
        layout: &BuildLayout,
        backend: &dyn Backend,
        packager: &dyn Packager,
    ) -> Result<Outcome> {
        let file_name = script
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let _span = tracing::info_span!("build", script = %file_name).entered();

        // 1. ── Read ───────────────────────────────────────────────────────
        let text = std::fs::read_to_string(script)
            .with_context(|| format!("Reading {}", script.display()))?;

        // 2. ── Transpile ──────────────────────────────────────────────────
        let program = match Transpiler::new(self.catalog).transpile(&text, &file_name) {
            Ok(program) => program,
            Err(diagnostics) => {
                tracing::debug!(count = diagnostics.len(), "script rejected");
                self.reporter.diagnostics(&file_name, &text, &diagnostics);
                return Ok(Outcome::Rejected);
            }
        };

        // 3. ── Prepare the build directory ────────────────────────────────
        prepare(layout)?;
        if self.config.keep_java {
            java::emit(&program, &layout.gen_dir).with_context(|| "Writing generated sources")?;
        }

        // 4. ── Compile ────────────────────────────────────────────────────
        let compiled = self.compile(&file_name, &text, &program, layout, backend);
        let clean = match compiled {
            Ok(clean) => clean,
            Err(err) => {
                self.clean_up(layout);
                return Err(err);
            }
        };
        if !clean {
            self.clean_up(layout);
            return Ok(Outcome::Rejected);
        }

        // 5. ── Package ────────────────────────────────────────────────────
        let packaged = packager.package(&layout.artifact, &program.class_name, &layout.class_dir);
        self.clean_up(layout);
        packaged?;

        self.reporter.success(&layout.artifact);
        Ok(Outcome::Built(layout.artifact.clone()))
    }

    /// Auxiliary units first so the main unit sees them on the classpath.
    /// `Ok(false)` once any unit had an error; the rest are not compiled.
    fn compile(
        &self,
        file_name: &str,
        text: &str,
        program: &TranspiledProgram,
        layout: &BuildLayout,
        backend: &dyn Backend,
    ) -> Result<bool> {
        let relocator = Relocator::new(file_name, text, &program.class_name);
        let units = program
            .auxiliary
            .iter()
            .map(|aux| (aux.name.as_str(), aux.source.as_str()))
            .chain(std::iter::once((program.class_name.as_str(), program.source.as_str())));

        for (name, source) in units {
            let diagnostics = backend
                .compile(name, source, &layout.class_dir, &layout.class_dir)
                .with_context(|| format!("Compiling {name}"))?;

            let mut failed = false;
            for diagnostic in &diagnostics {
                failed |= diagnostic.is_error();
                self.reporter.relocated(&relocator.relocate(name, source, diagnostic));
            }
            if failed {
                tracing::debug!(unit = name, "unit failed to compile");
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn base_dir(&self, script: &Path) -> PathBuf {
        match &self.config.out_dir {
            Some(dir) => dir.clone(),
            None => script
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map_or_else(|| PathBuf::from("."), Path::to_path_buf),
        }
    }

    fn clean_up(&self, layout: &BuildLayout) {
        if layout.temporary {
            remove_quietly(&layout.root);
            return;
        }
        if !self.config.keep_java {
            remove_quietly(&layout.gen_dir);
        }
        if !self.config.keep_classes {
            remove_quietly(&layout.class_dir);
        }
    }
}

/// Class name of a buildable script.
pub fn check_script_path(script: &Path) -> Result<String> {
    if script.extension().and_then(|e| e.to_str()) != Some(SCRIPT_EXTENSION) {
        bail!("{} is not a .{SCRIPT_EXTENSION} script", script.display());
    }
    let file_name = script
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let class_name = class_name_of(&file_name);

    if !class_name.chars().next().is_some_and(char::is_alphabetic) {
        bail!("Script name \"{class_name}\" must start with a letter");
    }
    if class_name.chars().any(char::is_whitespace) {
        bail!("Script name \"{class_name}\" cannot contain whitespace");
    }
    Ok(class_name)
}

/// Fresh build directory; stale output from an earlier run is removed.
fn prepare(layout: &BuildLayout) -> Result<()> {
    if layout.root.exists() {
        std::fs::remove_dir_all(&layout.root)
            .with_context(|| format!("Clearing {}", layout.root.display()))?;
    }
    std::fs::create_dir_all(&layout.class_dir)
        .with_context(|| format!("Creating {}", layout.class_dir.display()))?;
    if layout.temporary {
        hide(&layout.root);
    }
    tracing::debug!(root = %layout.root.display(), "build directory ready");
    Ok(())
}

fn remove_quietly(path: &Path) {
    if !path.exists() {
        return;
    }
    if let Err(err) = std::fs::remove_dir_all(path) {
        tracing::warn!(path = %path.display(), error = %err, "could not remove build directory");
    }
}

#[cfg(windows)]
fn hide(path: &Path) {
    let status = std::process::Command::new("attrib").arg("+h").arg(path).status();
    if !status.is_ok_and(|s| s.success()) {
        tracing::warn!(path = %path.display(), "could not hide build directory");
    }
}

// Dot-prefixed names are already hidden.
#[cfg(not(windows))]
fn hide(_path: &Path) {}
