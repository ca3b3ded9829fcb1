//! Carve a flat script into imports, globals, functions and the entry body.
//!
//! Works line by line on comment-free, trimmed, non-blank text. The only
//! construct spanning lines is a `func`, whose end is found by brace
//! matching on that same text.

use indexmap::IndexMap;

use super::lexer::{self, IgnoreIndex};
use crate::catalog::{Catalog, imported_class};
use crate::error::Diagnostic;
use crate::model::{
    DecomposedScript, DeclarationItem, DeclarationKind, FUNCTION_KEYWORD, FunctionRecord,
    GLOBAL_KEYWORD, IMPORT_KEYWORD,
};

pub fn decompose(text: &str, catalog: &dyn Catalog) -> Result<DecomposedScript, Diagnostic> {
    let mut decomposer = Decomposer::new(text, catalog);
    decomposer.run()?;
    let script = decomposer.finish();
    tracing::debug!(
        imports = script.imports.len(),
        globals = script.globals.len(),
        functions = script.functions.len(),
        "script decomposed"
    );
    Ok(script)
}

/// Prefix every line of `text` with `depth` tabs.
pub fn indent(text: &str, depth: usize) -> String {
    let tabs = "\t".repeat(depth);
    text.lines()
        .map(|line| format!("{tabs}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

struct Decomposer<'c> {
    /// Trimmed, non-blank lines joined with `\n`.
    code: String,
    /// Line of the original script each line of `code` came from.
    origin: Vec<usize>,
    index: IgnoreIndex,
    catalog: &'c dyn Catalog,

    imports: Vec<DeclarationItem>,
    globals: Vec<PendingGlobal>,
    functions: IndexMap<String, String>,
    statements: Vec<String>,
}

/// A `global` line, kept only if something else mentions its name.
struct PendingGlobal {
    item: DeclarationItem,
    /// Index into `statements` of the `name = init;` it left behind.
    statement: Option<usize>,
    /// `T name = init;`, what that statement becomes when the global is unused.
    local: Option<String>,
}

impl<'c> Decomposer<'c> {
    fn new(text: &str, catalog: &'c dyn Catalog) -> Self {
        let stripped = lexer::strip_comments(text);
        let mut lines = Vec::new();
        let mut origin = Vec::new();
        for (n, line) in stripped.lines().enumerate() {
            let line = line.trim();
            if !line.is_empty() {
                lines.push(line);
                origin.push(n + 1);
            }
        }
        let code = lines.join("\n");
        let index = IgnoreIndex::scan(&code);
        Self {
            code,
            origin,
            index,
            catalog,
            imports: Vec::new(),
            globals: Vec::new(),
            functions: IndexMap::new(),
            statements: Vec::new(),
        }
    }

    fn run(&mut self) -> Result<(), Diagnostic> {
        let mut at = 0;
        while at < self.code.len() {
            let end = self.code[at..].find('\n').map_or(self.code.len(), |n| at + n);
            let line = self.code[at..end].to_string();

            if line.starts_with(IMPORT_KEYWORD) {
                self.parse_import(&line);
            } else if line.starts_with(GLOBAL_KEYWORD) {
                self.parse_global(&line);
            } else if line.starts_with(FUNCTION_KEYWORD) {
                at = self.parse_function(at)?;
                continue;
            } else {
                self.statements.push(line);
            }
            at = end + 1;
        }
        Ok(())
    }

    fn finish(mut self) -> DecomposedScript {
        let pending = std::mem::take(&mut self.globals);
        let mut globals = Vec::with_capacity(pending.len());
        let mut localized = Vec::new();
        for global in pending {
            if self.is_mentioned(&global.item.name, global.statement) {
                globals.push(global.item);
                continue;
            }
            tracing::debug!(name = %global.item.name, "global never used, no static field");
            if let (Some(at), Some(local)) = (global.statement, global.local) {
                localized.push((at, local));
            }
        }
        for (at, local) in localized {
            self.statements[at] = local;
        }

        DecomposedScript {
            imports: self.imports,
            globals,
            functions: self
                .functions
                .into_iter()
                .map(|(name, body)| FunctionRecord { name, body })
                .collect(),
            entry_body: indent(&self.statements.join("\n"), 2),
        }
    }

    /// Whether `name` appears in any statement other than `own` or in any
    /// user function.
    fn is_mentioned(&self, name: &str, own: Option<usize>) -> bool {
        let in_statements = self
            .statements
            .iter()
            .enumerate()
            .filter(|&(at, _)| Some(at) != own)
            .any(|(_, statement)| mentions(statement, name));
        in_statements || self.functions.values().any(|body| mentions(body, name))
    }

    fn parse_import(&mut self, line: &str) {
        if self.catalog.has_import(line) {
            tracing::trace!(import = line, "already provided by the library");
            return;
        }
        let name = imported_class(line).unwrap_or(line);
        self.imports
            .push(DeclarationItem::new(name, line, DeclarationKind::Import));
    }

    /// `global T name = init;` declares `public static T name;` and leaves
    /// `name = init;` behind as a statement.
    fn parse_global(&mut self, line: &str) {
        let (ty, name, initializer) = split_global(line);
        let item = DeclarationItem::new(
            name,
            format!("public static {ty} {name};"),
            DeclarationKind::GlobalVar,
        );
        let Some(init) = initializer else {
            self.globals.push(PendingGlobal {
                item,
                statement: None,
                local: None,
            });
            return;
        };

        // a bare array initializer is only legal in a declaration
        let assignment = if init.starts_with('{') {
            format!("{name} = new {ty} {init}")
        } else {
            format!("{name} = {init}")
        };
        self.statements.push(assignment);
        self.globals.push(PendingGlobal {
            item,
            statement: Some(self.statements.len() - 1),
            local: (!ty.is_empty()).then(|| format!("{ty} {name} = {init}")),
        });
    }

    /// Consume a `func` starting at `at`; returns the offset just past it.
    fn parse_function(&mut self, at: usize) -> Result<usize, Diagnostic> {
        let line = self.line_number(at);
        let close = lexer::find_unignored(&self.code, &self.index, at, b'{')
            .and_then(|open| lexer::find_matching(&self.code, &self.index, open, b'{', b'}'))
            .ok_or_else(|| Diagnostic::imbalance(line, "Expected corresponding '}'"))?;

        let text = &self.code[at + FUNCTION_KEYWORD.len()..=close];
        let mut lines = text.lines();
        let header = format!("public static {}", lines.next().unwrap_or_default().trim());
        let rest: Vec<&str> = lines.collect();

        let mut body = header;
        for (i, l) in rest.iter().enumerate() {
            body.push('\n');
            // the closing brace stays level with the header
            if i + 1 < rest.len() {
                body.push('\t');
            }
            body.push_str(l);
        }

        let name = function_name(&body).unwrap_or_default().to_string();
        tracing::trace!(name = %name, line, "user function");
        let merged = self.functions.entry(name).or_default();
        if !merged.is_empty() {
            merged.push_str("\n\n");
        }
        merged.push_str(&body);

        // whatever follows the closing brace on its line is a statement
        let after = close + 1;
        let end = self.code[after..].find('\n').map_or(self.code.len(), |n| after + n);
        let trailing = self.code[after..end].trim();
        if !trailing.is_empty() {
            self.statements.push(trailing.to_string());
        }
        Ok(end + 1)
    }

    fn line_number(&self, at: usize) -> usize {
        let compact = lexer::line_of(&self.code, at);
        self.origin.get(compact - 1).copied().unwrap_or(compact)
    }
}

/// `global T name = init;` as `(T, name, Some("init;"))`; the initializer
/// keeps its `;`.
pub fn split_global(line: &str) -> (&str, &str, Option<&str>) {
    let line = line.trim();
    let rest = line.strip_prefix(GLOBAL_KEYWORD).unwrap_or(line).trim();
    let (declarator, initializer) = match rest.split_once('=') {
        Some((declarator, initializer)) => (declarator.trim(), Some(initializer.trim())),
        None => (rest.trim_end_matches(';').trim(), None),
    };
    match declarator.rsplit_once(char::is_whitespace) {
        Some((ty, name)) => (ty.trim(), name.trim(), initializer),
        None => ("", declarator, initializer),
    }
}

fn mentions(text: &str, name: &str) -> bool {
    let index = IgnoreIndex::scan(text);
    lexer::identifiers(text, &index)
        .iter()
        .any(|&(_, ident)| ident == name)
}

/// Name of a function from its header, the identifier before the first `(`.
pub fn function_name(header: &str) -> Option<&str> {
    let before = header[..header.find('(')?].trim_end();
    let start = before
        .bytes()
        .rposition(|b| !lexer::is_ident_byte(b))
        .map_or(0, |p| p + 1);
    let name = &before[start..];
    (!name.is_empty()).then_some(name)
}
