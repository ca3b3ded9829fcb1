//! Read access to the automation standard library.
//!
//! The transpiler never calls the library; it only copies pieces of its
//! source text into generated programs. A catalog is built once per run,
//! either by mining a Java library class or from a JSON description, and is
//! read-only afterwards.

pub mod library;

use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use indexmap::IndexMap;
use serde::Deserialize;

use crate::model::{CatalogEntry, DeclarationItem, DeclarationKind};

/// Library source embedded in the binary, used when no catalog is configured.
pub const BUNDLED_LIBRARY: &str = include_str!("../../assets/Automation.java");

pub trait Catalog {
    /// Builtin functions, overloads already merged under one name.
    fn functions(&self) -> &[CatalogEntry];
    /// Library-level constants and fields.
    fn declarations(&self) -> &[DeclarationItem];
    /// Full import lines, e.g. `import java.awt.Robot;`.
    fn imports(&self) -> &[String];

    fn has_import(&self, line: &str) -> bool {
        self.imports().iter().any(|import| import == line)
    }

    /// Every name a script could refer to: functions then declarations.
    fn names(&self) -> Vec<&str> {
        self.functions()
            .iter()
            .map(|f| f.name.as_str())
            .chain(self.declarations().iter().map(|d| d.name.as_str()))
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibraryCatalog {
    functions: Vec<CatalogEntry>,
    declarations: Vec<DeclarationItem>,
    imports: Vec<String>,
}

impl Catalog for LibraryCatalog {
    fn functions(&self) -> &[CatalogEntry] {
        &self.functions
    }

    fn declarations(&self) -> &[DeclarationItem] {
        &self.declarations
    }

    fn imports(&self) -> &[String] {
        &self.imports
    }
}

impl LibraryCatalog {
    /// Build a catalog, merging functions that share a name in
    /// first-appearance order.
    pub fn new(
        functions: impl IntoIterator<Item = CatalogEntry>,
        declarations: Vec<DeclarationItem>,
        imports: Vec<String>,
    ) -> Self {
        let mut merged: IndexMap<String, String> = IndexMap::new();
        for entry in functions {
            let body = merged.entry(entry.name).or_default();
            body.push_str(&entry.body);
            body.push_str("\n\n");
        }
        let functions = merged
            .into_iter()
            .map(|(name, body)| CatalogEntry {
                name,
                body: body.trim_end().to_string(),
            })
            .collect();
        Self {
            functions,
            declarations,
            imports,
        }
    }

    pub fn from_library_source(source: &str) -> Result<Self> {
        library::mine(source)
    }

    pub fn bundled() -> Result<Self> {
        Self::from_library_source(BUNDLED_LIBRARY).context("Mining the bundled library")
    }

    pub fn from_json(json: &str) -> Result<Self> {
        load_from_json(json)
    }
}

/// Pick the catalog source: a JSON catalog wins over a library file, which
/// wins over the bundled library.
pub fn load(catalog: Option<&Path>, library: Option<&Path>) -> Result<LibraryCatalog> {
    let loaded = match (catalog, library) {
        (Some(path), _) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Reading {}", path.display()))?;
            load_from_json(&json).with_context(|| format!("Parsing catalog {}", path.display()))?
        }
        (None, Some(path)) => {
            let source = std::fs::read_to_string(path)
                .with_context(|| format!("Reading {}", path.display()))?;
            library::mine(&source).with_context(|| format!("Mining library {}", path.display()))?
        }
        (None, None) => LibraryCatalog::bundled()?,
    };
    tracing::debug!(
        functions = loaded.functions.len(),
        declarations = loaded.declarations.len(),
        imports = loaded.imports.len(),
        "catalog loaded"
    );
    Ok(loaded)
}

// ─────────────────────────────────────────────────────
// JSON catalog
// ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawCatalog {
    #[serde(default)]
    functions: Vec<CatalogEntry>,
    #[serde(default)]
    declarations: Vec<RawDeclaration>,
    #[serde(default)]
    imports: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawDeclaration {
    name: Option<String>,
    text: String,
}

/// Parse a catalog of the form
/// `{"functions": [{"name", "body"}], "declarations": [{"name"?, "text"}], "imports": [line]}`.
///
/// A declaration without a `name` gets the one written in its text.
pub fn load_from_json(json: &str) -> Result<LibraryCatalog> {
    let raw: RawCatalog = serde_json::from_str(json)?;

    for (i, function) in raw.functions.iter().enumerate() {
        if function.name.trim().is_empty() {
            bail!("function {i} has an empty `name`");
        }
    }

    let mut declarations = Vec::with_capacity(raw.declarations.len());
    for (i, declaration) in raw.declarations.into_iter().enumerate() {
        let name = match declaration.name {
            Some(name) => name,
            None => declaration_name(&declaration.text)
                .ok_or_else(|| anyhow!("declaration {i} has no name: `{}`", declaration.text))?
                .to_string(),
        };
        declarations.push(DeclarationItem::new(
            name,
            declaration.text.trim(),
            DeclarationKind::GlobalVar,
        ));
    }

    for import in &raw.imports {
        if !import.trim_start().starts_with("import ") || !import.trim_end().ends_with(';') {
            bail!("not an import line: `{import}`");
        }
    }
    let imports = raw.imports.iter().map(|i| i.trim().to_string()).collect();

    Ok(LibraryCatalog::new(raw.functions, declarations, imports))
}

// ─────────────────────────────────────────────────────
// Text helpers shared with the assembler
// ─────────────────────────────────────────────────────

/// Name declared by a field line such as `public final int DELAY = 5;`.
pub fn declaration_name(text: &str) -> Option<&str> {
    let declarator = text.split('=').next()?;
    let name = declarator
        .trim()
        .trim_end_matches(';')
        .split_whitespace()
        .last()?
        .trim_end_matches("[]");
    let valid = name
        .bytes()
        .next()
        .is_some_and(|b| b.is_ascii_alphabetic() || b == b'_' || b == b'$');
    valid.then_some(name)
}

/// Turn the first line of a member into a static one, one tab deep:
/// `public void f() {` becomes `\tpublic static void f() {`.
pub fn make_static(line: &str) -> String {
    let trimmed = line.trim();
    for visibility in ["public ", "private ", "protected "] {
        if let Some(rest) = trimmed.strip_prefix(visibility) {
            if rest.starts_with("static ") {
                return format!("\t{trimmed}");
            }
            return format!("\t{visibility}static {rest}");
        }
    }
    if trimmed.starts_with("static ") {
        format!("\t{trimmed}")
    } else {
        format!("\tstatic {trimmed}")
    }
}

/// Class name brought in by an import line; `*` for wildcard imports.
pub fn imported_class(line: &str) -> Option<&str> {
    let line = line.trim();
    let end = line.rfind(';')?;
    let start = line[..end].rfind('.')? + 1;
    Some(line[start..end].trim())
}
