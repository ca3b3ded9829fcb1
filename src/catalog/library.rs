//! Mine a catalog out of a Java library class.
//!
//! Only class-level members are considered (brace depth 1):
//!
//!   * `public|private ... name(...) {`  → builtin function
//!   * `public|private ... name [= ...];` → declaration
//!   * `import ...;` at depth 0           → import
//!
//! Constructors and `run` (the body of helper threads) are never builtins.

use anyhow::{Result, anyhow};

use super::{LibraryCatalog, declaration_name, make_static};
use crate::model::{CatalogEntry, DeclarationItem, DeclarationKind};
use crate::processor::decompose::function_name;
use crate::processor::lexer::{self, IgnoreIndex};

pub fn mine(source: &str) -> Result<LibraryCatalog> {
    let index = IgnoreIndex::scan(source);
    let depths = depth_at_line_starts(source, &index);
    let class_name = class_name(source);

    let mut functions = Vec::new();
    let mut declarations = Vec::new();
    let mut imports = Vec::new();

    let starts = lexer::line_starts(source);
    for (line_no, (&start, line)) in starts.iter().zip(source.lines()).enumerate() {
        let trimmed = line.trim();
        let depth = depths.get(line_no).copied().unwrap_or_default();
        if depth == 0 && trimmed.starts_with("import ") && trimmed.ends_with(';') {
            imports.push(trimmed.to_string());
            continue;
        }
        if depth != 1 || !is_member(trimmed) || index.is_ignored(start + leading(line)) {
            continue;
        }

        if trimmed.ends_with('{') {
            if is_type_declaration(trimmed) {
                continue;
            }
            let Some(name) = function_name(trimmed) else {
                continue;
            };
            if name.eq_ignore_ascii_case("run") || Some(name) == class_name {
                continue;
            }
            let body = function_body(source, &index, start)
                .ok_or_else(|| anyhow!("function `{name}` on line {} is never closed", line_no + 1))?;
            functions.push(CatalogEntry {
                name: name.to_string(),
                body,
            });
        } else if trimmed.ends_with(';') {
            if let Some(name) = declaration_name(trimmed) {
                declarations.push(DeclarationItem::new(
                    name,
                    trimmed,
                    DeclarationKind::GlobalVar,
                ));
            }
        }
    }

    tracing::trace!(
        functions = functions.len(),
        declarations = declarations.len(),
        imports = imports.len(),
        "mined library source"
    );
    Ok(LibraryCatalog::new(functions, declarations, imports))
}

fn is_member(trimmed: &str) -> bool {
    trimmed.starts_with("public ") || trimmed.starts_with("private ")
}

fn is_type_declaration(trimmed: &str) -> bool {
    trimmed
        .split_whitespace()
        .any(|word| matches!(word, "class" | "interface" | "enum" | "record"))
}

fn leading(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

fn class_name(source: &str) -> Option<&str> {
    source.lines().find_map(|line| {
        let mut words = line.split_whitespace();
        words.position(|w| w == "class")?;
        words.next().map(|name| name.trim_end_matches('{'))
    })
}

/// Full member text from its header line through the matching `}`, header
/// rewritten as static, comments removed and indentation redone in tabs.
fn function_body(source: &str, index: &IgnoreIndex, line_start: usize) -> Option<String> {
    let open = lexer::find_unignored(source, index, line_start, b'{')?;
    let close = lexer::find_matching(source, index, open, b'{', b'}')?;
    let text = lexer::strip_comments(&source[line_start..=close]);
    let mut lines = text.lines();
    let first = lines.next()?;
    let header = make_static(first);
    let rest: Vec<&str> = lines.filter(|l| !l.trim().is_empty()).collect();
    if rest.is_empty() {
        return Some(header);
    }
    let body = reindent(&rest, indent_width(first));
    Some(format!("{header}\n{}", body.join("\n")))
}

/// Lines of a member body one tab deeper than its header per level of
/// source indentation beyond `base`. The smallest indentation step found
/// counts as one level.
fn reindent(lines: &[&str], base: usize) -> Vec<String> {
    let relative = |line: &str| indent_width(line).saturating_sub(base);
    let step = lines
        .iter()
        .map(|line| relative(line))
        .filter(|&width| width > 0)
        .min()
        .unwrap_or(4);
    lines
        .iter()
        .map(|line| {
            let width = relative(line);
            format!(
                "\t{}{}{}",
                "\t".repeat(width / step),
                " ".repeat(width % step),
                line.trim_start()
            )
        })
        .collect()
}

/// Leading whitespace width, a tab counting as four spaces.
fn indent_width(line: &str) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

/// Brace depth in effect at the start of every line.
fn depth_at_line_starts(source: &str, index: &IgnoreIndex) -> Vec<usize> {
    let mut depths = vec![0];
    let mut depth = 0usize;
    for (at, b) in source.bytes().enumerate() {
        match b {
            b'{' if !index.is_ignored(at) => depth += 1,
            b'}' if !index.is_ignored(at) => depth = depth.saturating_sub(1),
            b'\n' => depths.push(depth),
            _ => {}
        }
    }
    depths
}
