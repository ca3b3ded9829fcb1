//! `"text %s" % (a, b)` sugar.
//!
//! Each argument becomes one chained substitution call on the literal, in
//! order, so the example reads
//! `"text %s".replaceFirst("%s", ...a...).replaceFirst("%s", ...b...)`.
//! A rewrite moves every later offset, so only one rewrite happens per scan
//! and the ignore regions are rebuilt from scratch before the next one.

use crate::error::Diagnostic;
use crate::processor::lexer::{self, IgnoreIndex, SpanKind};

/// One `literal % (args)` occurrence: where the literal ends and where the
/// argument list opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FormatCall {
    literal_end: usize,
    open_paren: usize,
}

/// Rewrite every format call until none is left.
pub fn rewrite_all(text: &str) -> Result<String, Diagnostic> {
    let mut current = text.to_string();
    let mut rewrites = 0usize;
    while let Some(next) = rewrite_first(&current)? {
        current = next;
        rewrites += 1;
    }
    tracing::debug!(rewrites, "format calls rewritten");
    Ok(current)
}

/// Rewrite the first format call. `Ok(None)` when there is none.
pub fn rewrite_first(text: &str) -> Result<Option<String>, Diagnostic> {
    let index = IgnoreIndex::scan(text);
    let Some(call) = find_call(text, &index) else {
        return Ok(None);
    };

    let close = lexer::find_matching(text, &index, call.open_paren, b'(', b')').ok_or_else(|| {
        Diagnostic::format_shape(
            lexer::line_of(text, call.open_paren),
            "expected a matching ')' to close the format arguments",
        )
    })?;

    let mut rewritten = String::with_capacity(text.len() + 64);
    rewritten.push_str(&text[..call.literal_end]);
    for argument in split_arguments(text, &index, call.open_paren, close) {
        rewritten.push_str(&substitution_call(argument));
    }
    rewritten.push_str(&text[close + 1..]);
    Ok(Some(rewritten))
}

/// `.replaceFirst(...)` consuming one argument.
pub fn substitution_call(argument: &str) -> String {
    format!(
        ".replaceFirst(\"%s\", java.util.regex.Matcher.quoteReplacement(String.valueOf({argument})))"
    )
}

/// First terminated string literal followed by `%` and `(`, whitespace
/// allowed around the `%`.
fn find_call(text: &str, index: &IgnoreIndex) -> Option<FormatCall> {
    index
        .literals()
        .iter()
        .filter(|span| span.kind == SpanKind::StringLiteral && span.terminated)
        .find_map(|span| {
            let percent = skip_whitespace(text, span.end);
            if text.as_bytes().get(percent) != Some(&b'%') {
                return None;
            }
            let open_paren = skip_whitespace(text, percent + 1);
            (text.as_bytes().get(open_paren) == Some(&b'(')).then_some(FormatCall {
                literal_end: span.end,
                open_paren,
            })
        })
}

/// Offset of the first non-whitespace byte at or after `from`.
pub fn skip_whitespace(text: &str, from: usize) -> usize {
    text.as_bytes()
        .iter()
        .skip(from)
        .position(|b| !b.is_ascii_whitespace())
        .map_or(text.len(), |n| from + n)
}

/// Split the text between `open` and `close` on commas that are not nested
/// inside brackets or literals. Empty argument lists yield nothing.
fn split_arguments<'t>(text: &'t str, index: &IgnoreIndex, open: usize, close: usize) -> Vec<&'t str> {
    let mut arguments = Vec::new();
    let mut depth = 0usize;
    let mut start = open + 1;
    for at in open + 1..close {
        if index.is_ignored(at) {
            continue;
        }
        match text.as_bytes()[at] {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => {
                arguments.push(text[start..at].trim());
                start = at + 1;
            }
            _ => {}
        }
    }
    let last = text[start..close].trim();
    if !last.is_empty() || !arguments.is_empty() {
        arguments.push(last);
    }
    arguments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(arg: &str) -> String {
        substitution_call(arg)
    }

    #[test]
    fn test_single_argument() {
        let src = r#"print("Hello %s" % ("World"));"#;
        let out = rewrite_all(src).unwrap();
        assert_eq!(out, format!(r#"print("Hello %s"{});"#, call(r#""World""#)));
    }

    #[test]
    fn test_nested_arguments() {
        let test_cases = vec![
            (
                r#"s = "%s %s %s" % ("John", middle("a, b"), last(x, y));"#,
                format!(
                    r#"s = "%s %s %s"{}{}{};"#,
                    call(r#""John""#),
                    call(r#"middle("a, b")"#),
                    call("last(x, y)")
                ),
            ),
            (
                r#"s = "%s"%(a[1, 2]);"#,
                format!(r#"s = "%s"{};"#, call("a[1, 2]")),
            ),
            (
                r#"s = "none" % ();"#,
                r#"s = "none";"#.to_string(),
            ),
        ];
        for (src, expected) in test_cases {
            assert_eq!(rewrite_all(src).unwrap(), expected, "rewriting {src}");
        }
    }

    #[test]
    fn test_skips_comments_and_literals() {
        let test_cases = vec![
            r#"// print("a %s" % (b));"#,
            r#"s = "\"x\" % (y)";"#,
            "n = 10 % (3);",
        ];
        for src in test_cases {
            assert_eq!(rewrite_all(src).unwrap(), src);
        }
    }

    #[test]
    fn test_nested_format_calls() {
        let src = r#"s = "a %s" % ("b %s" % (c));"#;
        let inner = format!(r#""b %s"{}"#, call("c"));
        let expected = format!(r#"s = "a %s"{};"#, call(&inner));
        assert_eq!(rewrite_all(src).unwrap(), expected);
    }

    #[test]
    fn test_rewrite_is_a_fixpoint() {
        let src = "x = \"%s and %s\" % (1, 2);\ny = \"%s\" % (x);";
        let once = rewrite_all(src).unwrap();
        assert_eq!(rewrite_all(&once).unwrap(), once);
        assert_eq!(rewrite_first(&once).unwrap(), None);
    }

    #[test]
    fn test_unclosed_arguments() {
        let src = "a = 1;\ns = \"%s\" % (x;";
        let err = rewrite_all(src).unwrap_err();
        assert_eq!(err.line, 2);
    }
}
