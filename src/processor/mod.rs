//! The functional core: script text in, Java units out.
//!
//! Passes run in a fixed order and each one either hands its result to the
//! next or stops with diagnostics. Nothing in here touches the file system.
pub mod assemble;
pub mod decompose;
pub mod format;
pub mod lexer;
pub mod relocate;
pub mod structs;
pub mod verifier;

use std::path::Path;

use crate::catalog::Catalog;
use crate::error::{Diagnostic, Diagnostics};
use crate::model::{GeneratedUnit, TranspiledProgram};

/// State of one script's run: which file, and what went wrong so far.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    pub file_name: String,
    pub diagnostics: Diagnostics,
}

impl RunContext {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Runs every pass against a read-only catalog.
pub struct Transpiler<'c> {
    catalog: &'c dyn Catalog,
}

impl<'c> Transpiler<'c> {
    pub fn new(catalog: &'c dyn Catalog) -> Self {
        Self { catalog }
    }

    pub fn transpile(&self, text: &str, file_name: &str) -> Result<TranspiledProgram, Diagnostics> {
        let _span = tracing::info_span!("transpile", file = file_name).entered();
        let mut context = RunContext::new(file_name);
        let class_name = class_name_of(file_name);

        // 1. ── Verify ─────────────────────────────────────────────────────
        context.diagnostics.extend(verifier::verify(text, self.catalog));
        if !context.is_clean() {
            return Err(context.diagnostics);
        }

        // 2. ── Rewrite format calls ───────────────────────────────────────
        let rewritten = match format::rewrite_all(text) {
            Ok(rewritten) => rewritten,
            Err(diagnostic) => {
                context.report(diagnostic);
                return Err(context.diagnostics);
            }
        };

        // 3. ── Decompose ──────────────────────────────────────────────────
        let script = match decompose::decompose(&rewritten, self.catalog) {
            Ok(script) => script,
            Err(diagnostic) => {
                context.report(diagnostic);
                return Err(context.diagnostics);
            }
        };

        // 4. ── Assemble with the library closure ──────────────────────────
        let mut assembly = assemble::assemble(&script, &class_name, self.catalog);

        // 5. ── Split structs into their own units ─────────────────────────
        let records = match structs::split_structs(&mut assembly.unit, &class_name, text) {
            Ok(records) => records,
            Err(diagnostic) => {
                context.report(diagnostic);
                return Err(context.diagnostics);
            }
        };
        let import_pool: Vec<String> = self
            .catalog
            .imports()
            .iter()
            .cloned()
            .chain(script.imports.iter().map(|i| i.text.clone()))
            .collect();
        let auxiliary = records
            .iter()
            .map(|record| structs::render_struct(record, &import_pool))
            .collect();

        tracing::info!(class = %class_name, structs = records.len(), "transpiled");
        Ok(TranspiledProgram {
            source: render_compact(&assembly.unit),
            class_name,
            auxiliary,
        })
    }
}

/// Class a script compiles to: its file stem.
pub fn class_name_of(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string())
}

/// Final text of a unit, whitespace-only lines dropped.
pub fn render_compact(unit: &GeneratedUnit) -> String {
    let mut out = String::new();
    for line in unit.render().lines().filter(|l| !l.trim().is_empty()) {
        out.push_str(line);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::LibraryCatalog;
    use crate::error::ErrorKind;

    #[test]
    fn test_class_name_of() {
        let test_cases = vec![
            ("demo.auto", "demo".to_string()),
            ("scripts/Clicker.auto", "Clicker".to_string()),
            ("noext", "noext".to_string()),
        ];
        for (file, expected) in test_cases {
            assert_eq!(class_name_of(file), expected);
        }
    }

    #[test]
    fn test_verifier_stops_the_pipeline() {
        let catalog = LibraryCatalog::default();
        let err = Transpiler::new(&catalog)
            .transpile("func void f() {\nprint(1);\n", "Broken.auto")
            .unwrap_err();
        assert_eq!(err.count_of(ErrorKind::StructuralImbalance), 1);
    }

    #[test]
    fn test_minimal_program() {
        let catalog = LibraryCatalog::default();
        let program = Transpiler::new(&catalog)
            .transpile("int a = 1;\n\n// done\n", "Tiny.auto")
            .unwrap();
        assert_eq!(program.class_name, "Tiny");
        assert_eq!(
            program.source,
            "public class Tiny {\n\tpublic static void main(String[] args) {\n\t\tint a = 1;\n\t}\n}\n"
        );
        assert!(program.auxiliary.is_empty());
    }
}
