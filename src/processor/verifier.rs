//! Pre-compilation checks on a raw script.
//!
//! Nothing here rewrites the script. Every check appends to one
//! `Diagnostics` set so the user sees all problems at once, and any entry in
//! it stops the pipeline for that script.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use crate::catalog::{Catalog, imported_class};
use crate::error::{Diagnostic, Diagnostics, ErrorKind};
use crate::model::GLOBAL_KEYWORD;
use crate::processor::decompose::split_global;
use crate::processor::format::skip_whitespace;
use crate::processor::lexer::{self, IgnoreIndex, SpanKind};

static FUNC_DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*func\s+[^(]*?\b([A-Za-z_$][\w$]*)\s*\(").expect("func regex must compile")
});

/// Name the entry point gives its parameter; scripts cannot assign it.
const ENTRY_PARAMETER: &str = "args";

const FORMAT_HINT: &str = "Expected a ( after the %.\nLike \"Hello %s\" % (\"John\")";

pub fn verify(text: &str, catalog: &dyn Catalog) -> Diagnostics {
    let mut diagnostics = Diagnostics::new();
    check_unterminated(text, &mut diagnostics);

    let code = lexer::strip_comments(text);
    let index = IgnoreIndex::scan(&code);

    check_braces(&code, &index, &mut diagnostics);
    check_parens(&code, &mut diagnostics);
    check_format_shape(&code, &index, &mut diagnostics);
    check_case(&code, &index, catalog, &mut diagnostics);
    check_function_declarations(&code, catalog, &mut diagnostics);
    check_global_declarations(&code, catalog, &mut diagnostics);
    check_assignments(&code, &index, catalog, &mut diagnostics);

    tracing::debug!(found = diagnostics.len(), "verifier done");
    diagnostics
}

fn check_unterminated(text: &str, diagnostics: &mut Diagnostics) {
    let index = IgnoreIndex::scan(text);
    for span in index.unterminated() {
        let message = match span.kind {
            SpanKind::Comment => "Unclosed comment.",
            SpanKind::StringLiteral => "Unclosed string literal.",
            SpanKind::CharLiteral => "Unclosed character literal.",
        };
        diagnostics.push(Diagnostic::error(
            ErrorKind::UnterminatedIgnoreRegion,
            lexer::line_of(text, span.start),
            message,
        ));
    }
}

/// Every `{` needs a later `}` and every `}` an earlier `{`.
fn check_braces(code: &str, index: &IgnoreIndex, diagnostics: &mut Diagnostics) {
    let mut open = Vec::new();
    for (at, b) in code.bytes().enumerate() {
        if (b != b'{' && b != b'}') || index.is_ignored(at) {
            continue;
        }
        if b == b'{' {
            open.push(at);
        } else if open.pop().is_none() {
            diagnostics.push(Diagnostic::imbalance(lexer::line_of(code, at), "Unexpected '}'"));
        }
    }
    for at in open {
        diagnostics.push(Diagnostic::imbalance(
            lexer::line_of(code, at),
            "Expected corresponding '}'",
        ));
    }
}

/// Parens never span lines in the dialect, so each line is checked on its
/// own with its own literal regions.
fn check_parens(code: &str, diagnostics: &mut Diagnostics) {
    for (n, line) in code.lines().enumerate() {
        let index = IgnoreIndex::scan(line);
        let mut open = 0usize;
        let mut unexpected = false;
        for (at, b) in line.bytes().enumerate() {
            if index.is_ignored(at) {
                continue;
            }
            match b {
                b'(' => open += 1,
                b')' => match open.checked_sub(1) {
                    Some(left) => open = left,
                    None => unexpected = true,
                },
                _ => {}
            }
        }
        if open > 0 {
            diagnostics.push(Diagnostic::imbalance(
                n + 1,
                "Unclosed '(', expected corresponding ')'",
            ));
        }
        if unexpected {
            diagnostics.push(Diagnostic::imbalance(n + 1, "Unexpected ')'"));
        }
    }
}

/// `"text" % args` without the parens.
fn check_format_shape(code: &str, index: &IgnoreIndex, diagnostics: &mut Diagnostics) {
    let bytes = code.as_bytes();
    for span in index.literals() {
        if span.kind != SpanKind::StringLiteral || !span.terminated {
            continue;
        }
        let percent = skip_whitespace(code, span.end);
        if bytes.get(percent) != Some(&b'%') {
            continue;
        }
        let next = skip_whitespace(code, percent + 1);
        if bytes.get(next) != Some(&b'(') {
            diagnostics.push(Diagnostic::format_shape(lexer::line_of(code, percent), FORMAT_HINT));
        }
    }
}

/// Library names written with the wrong case, e.g. `MouseMove` for
/// `mouseMove`. Member accesses, `new` expressions and classes the library
/// imports (`Random` next to `random`) are host names and never flagged.
fn check_case(code: &str, index: &IgnoreIndex, catalog: &dyn Catalog, diagnostics: &mut Diagnostics) {
    let names = catalog.names();
    let exact: HashSet<&str> = names
        .iter()
        .copied()
        .chain(catalog.imports().iter().filter_map(|line| imported_class(line)))
        .collect();
    let mut folded: HashMap<String, &str> = HashMap::new();
    for &name in &names {
        folded.entry(name.to_lowercase()).or_insert(name);
    }

    let mut previous: Option<&str> = None;
    for (at, ident) in lexer::identifiers(code, index) {
        let after_new = previous == Some("new");
        previous = Some(ident);
        if exact.contains(ident) || after_new || preceded_by_dot(code, at) {
            continue;
        }
        if let Some(expected) = folded.get(&ident.to_lowercase()) {
            diagnostics.push(Diagnostic::error(
                ErrorKind::IdentifierCaseMismatch,
                lexer::line_of(code, at),
                format!("Case of \"{ident}\" is incorrect, it should be \"{expected}\"."),
            ));
        }
    }
}

fn preceded_by_dot(code: &str, at: usize) -> bool {
    code[..at].trim_end().ends_with('.')
}

/// `func` declarations may not reuse a builtin name in any case.
fn check_function_declarations(code: &str, catalog: &dyn Catalog, diagnostics: &mut Diagnostics) {
    let builtins: HashSet<String> = catalog
        .functions()
        .iter()
        .map(|f| f.name.to_lowercase())
        .collect();
    for (n, line) in code.lines().enumerate() {
        let Some(found) = FUNC_DECLARATION.captures(line).and_then(|c| c.get(1)) else {
            continue;
        };
        if builtins.contains(&found.as_str().to_lowercase()) {
            diagnostics.push(Diagnostic::collision(
                n + 1,
                format!("Cannot override \"{}\", use a different name.", found.as_str()),
            ));
        }
    }
}

/// A `global` may not reuse any library name, function or declaration, in
/// any case, with or without an initializer.
fn check_global_declarations(code: &str, catalog: &dyn Catalog, diagnostics: &mut Diagnostics) {
    let names: HashSet<String> = catalog.names().iter().map(|n| n.to_lowercase()).collect();
    for (n, line) in code.lines().enumerate() {
        if !line.trim_start().starts_with(GLOBAL_KEYWORD) {
            continue;
        }
        let (_, name, _) = split_global(line);
        if names.contains(&name.to_lowercase()) || name == ENTRY_PARAMETER {
            diagnostics.push(Diagnostic::collision(
                n + 1,
                format!("Cannot override \"{name}\", use a different name."),
            ));
        }
    }
}

/// Assignments may not target a library declaration or the entry parameter.
fn check_assignments(
    code: &str,
    index: &IgnoreIndex,
    catalog: &dyn Catalog,
    diagnostics: &mut Diagnostics,
) {
    let mut reserved: HashSet<String> = catalog
        .declarations()
        .iter()
        .map(|d| d.name.to_lowercase())
        .collect();
    reserved.insert(ENTRY_PARAMETER.to_string());

    for at in assignment_operators(code, index) {
        let Some(target) = assigned_name(code, at) else {
            continue;
        };
        if reserved.contains(&target.to_lowercase()) {
            diagnostics.push(Diagnostic::collision(
                lexer::line_of(code, at),
                format!("Cannot override \"{target}\", use a different name."),
            ));
        }
    }
}

/// Offsets of every assignment operator: `=` plus compound forms such as
/// `+=`. The offset is that of the first byte of the operator.
fn assignment_operators(code: &str, index: &IgnoreIndex) -> Vec<usize> {
    let bytes = code.as_bytes();
    let mut found = Vec::new();
    let mut at = 0;
    while at < bytes.len() {
        if bytes[at] != b'=' || index.is_ignored(at) {
            at += 1;
            continue;
        }
        if bytes.get(at + 1) == Some(&b'=') {
            at += 2;
            continue;
        }
        let before = at.checked_sub(1).map(|p| bytes[p]);
        match before {
            Some(b'!' | b'<' | b'>' | b'=') => {}
            Some(b'+' | b'-' | b'*' | b'/' | b'%' | b'&' | b'|' | b'^') => found.push(at - 1),
            _ => found.push(at),
        }
        at += 1;
    }
    found
}

/// Identifier written right before an assignment operator.
fn assigned_name(code: &str, operator_at: usize) -> Option<&str> {
    let before = code[..operator_at].trim_end();
    let start = before
        .bytes()
        .rposition(|b| !lexer::is_ident_byte(b))
        .map_or(0, |p| p + 1);
    let name = &before[start..];
    name.bytes()
        .next()
        .filter(|b| !b.is_ascii_digit())
        .map(|_| name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::LibraryCatalog;
    use crate::model::{CatalogEntry, DeclarationItem, DeclarationKind};

    fn catalog() -> LibraryCatalog {
        LibraryCatalog::new(
            vec![
                CatalogEntry {
                    name: "mouseMove".into(),
                    body: "\tpublic static void mouseMove(int x, int y) {\n\t}".into(),
                },
                CatalogEntry {
                    name: "sleep".into(),
                    body: "\tpublic static void sleep(int ms) {\n\t}".into(),
                },
                CatalogEntry {
                    name: "random".into(),
                    body: "\tpublic static int random(int min, int max) {\n\t}".into(),
                },
            ],
            vec![DeclarationItem::new(
                "clickDelay",
                "private int clickDelay = 10;",
                DeclarationKind::GlobalVar,
            )],
            vec!["import java.util.Random;".into()],
        )
    }

    fn kinds(src: &str) -> Vec<(usize, ErrorKind)> {
        verify(src, &catalog()).iter().map(|d| (d.line, d.kind)).collect()
    }

    #[test]
    fn test_balanced_script_is_clean() {
        let src = r#"
import java.util.List;
global int count = 0;
func void twice(int x) {
    // a stray { in a comment
    print("{ not a brace (");
    mouseMove(x, x);
}
twice(3);
String s = "a %s" % (count);
"#;
        assert!(verify(src, &catalog()).is_empty(), "{}", verify(src, &catalog()));
    }

    #[test]
    fn test_single_unmatched_brace() {
        let src = "func void f() {\n    sleep(1);\n\nf();\n";
        let diagnostics = verify(src, &catalog());
        assert_eq!(diagnostics.count_of(ErrorKind::StructuralImbalance), 1);
        assert_eq!(diagnostics.lines().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_structural_errors() {
        let test_cases = vec![
            ("sleep(1);\n}\n", vec![(2, ErrorKind::StructuralImbalance)]),
            ("sleep(1;\n", vec![(1, ErrorKind::StructuralImbalance)]),
            ("x = 1;\nsleep(1));\n", vec![(2, ErrorKind::StructuralImbalance)]),
            ("s = \"unclosed;\n", vec![(1, ErrorKind::UnterminatedIgnoreRegion)]),
            ("/* never\nclosed\n", vec![(1, ErrorKind::UnterminatedIgnoreRegion)]),
            ("s = \"%s\" % count;\n", vec![(1, ErrorKind::FormatCallShape)]),
        ];
        for (src, expected) in test_cases {
            assert_eq!(kinds(src), expected, "verifying {src:?}");
        }
    }

    #[test]
    fn test_case_mismatch() {
        let diagnostics = verify(
            "Sleep(10);\nx.Sleep();\nnew MouseMove();\nRandom r = null;\nint n = random(1, 6);\n",
            &catalog(),
        );
        assert_eq!(diagnostics.len(), 1);
        let d = diagnostics.iter().next().unwrap();
        assert_eq!(d.kind, ErrorKind::IdentifierCaseMismatch);
        assert_eq!(d.message, "Case of \"Sleep\" is incorrect, it should be \"sleep\".");
    }

    #[test]
    fn test_name_collisions() {
        let test_cases = vec![
            ("func void SLEEP(int s) {\n}\n", vec![(1, ErrorKind::NameCollision), (1, ErrorKind::IdentifierCaseMismatch)]),
            ("int clickDelay = 3;\n", vec![(1, ErrorKind::NameCollision)]),
            ("args = null;\n", vec![(1, ErrorKind::NameCollision)]),
            ("clickDelay += 3;\n", vec![(1, ErrorKind::NameCollision)]),
            ("if (clickDelay == 3) {\n}\n", vec![]),
            ("func int twice(int x) {\n}\n", vec![]),
            ("global int clickDelay;\n", vec![(1, ErrorKind::NameCollision)]),
            ("global int clickDelay = 3;\n", vec![(1, ErrorKind::NameCollision)]),
            ("print(1);\nglobal int sleep = 1;\n", vec![(2, ErrorKind::NameCollision)]),
            ("global String MouseMove;\n", vec![(1, ErrorKind::NameCollision), (1, ErrorKind::IdentifierCaseMismatch)]),
            ("global int args;\n", vec![(1, ErrorKind::NameCollision)]),
            ("global int delay = clickDelay;\n", vec![]),
        ];
        for (src, expected) in test_cases {
            let mut got = kinds(src);
            got.sort_by_key(|&(line, kind)| (line, kind.label()));
            let mut expected = expected;
            expected.sort_by_key(|&(line, kind)| (line, kind.label()));
            assert_eq!(got, expected, "verifying {src:?}");
        }
    }

    #[test]
    fn test_repeated_message_on_one_line_is_collapsed() {
        let diagnostics = verify("sleep(1; sleep(2;\n", &catalog());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics.summary(), "1 error.");
    }
}
