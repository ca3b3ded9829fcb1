//! Ignore-region scanner.
//!
//! The script dialect is never tokenised in full. Every pass only needs to
//! know which bytes belong to a comment or a literal so it can step over
//! them while looking for braces, parens, keywords or names. This module
//! produces those regions in a single left-to-right scan and offers the
//! helpers the other passes share.
//
//  Lexical items recognised:
//
//      LineComment   ::= '//' .*? ( '\n' | EOF )      ('\n' not included)
//      BlockComment  ::= '/*' .*? '*/'
//      StringLiteral ::= '"' ( '\' any | [^"\n] )* '"'
//      CharLiteral   ::= ''' ( '\' any | [^'\n] )* '''
//
//  An unterminated block comment runs to EOF; an unterminated literal stops
//  at the end of its line. Both are flagged with `terminated == false`.

use std::iter::Peekable;
use std::str::CharIndices;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    Comment,
    StringLiteral,
    CharLiteral,
}

/// Half-open byte range `[start, end)` of one comment or literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IgnoreSpan {
    pub start: usize,
    pub end: usize,
    pub kind: SpanKind,
    pub terminated: bool,
}

impl IgnoreSpan {
    pub fn contains(&self, index: usize) -> bool {
        self.start <= index && index < self.end
    }
}

struct Lexer<'a> {
    src: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            chars: src.char_indices().peekable(),
        }
    }

    fn next_char(&mut self) -> Option<(usize, char)> {
        self.chars.next()
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn read_line_comment(&mut self, start: usize) -> IgnoreSpan {
        while let Some(&(at, c)) = self.chars.peek() {
            if c == '\n' {
                return IgnoreSpan {
                    start,
                    end: at,
                    kind: SpanKind::Comment,
                    terminated: true,
                };
            }
            self.next_char();
        }
        IgnoreSpan {
            start,
            end: self.src.len(),
            kind: SpanKind::Comment,
            terminated: true,
        }
    }

    fn read_block_comment(&mut self, start: usize) -> IgnoreSpan {
        while let Some((at, c)) = self.next_char() {
            if c == '*' && self.peek_char() == Some('/') {
                self.next_char();
                return IgnoreSpan {
                    start,
                    end: at + 2,
                    kind: SpanKind::Comment,
                    terminated: true,
                };
            }
        }
        IgnoreSpan {
            start,
            end: self.src.len(),
            kind: SpanKind::Comment,
            terminated: false,
        }
    }

    fn read_literal(&mut self, start: usize, quote: char) -> IgnoreSpan {
        let kind = if quote == '"' {
            SpanKind::StringLiteral
        } else {
            SpanKind::CharLiteral
        };
        while let Some(&(at, c)) = self.chars.peek() {
            if c == '\n' {
                return IgnoreSpan {
                    start,
                    end: at,
                    kind,
                    terminated: false,
                };
            }
            self.next_char();
            if c == '\\' {
                // the escaped character can be the quote itself
                if self.peek_char().is_some_and(|n| n != '\n') {
                    self.next_char();
                }
            } else if c == quote {
                return IgnoreSpan {
                    start,
                    end: at + c.len_utf8(),
                    kind,
                    terminated: true,
                };
            }
        }
        IgnoreSpan {
            start,
            end: self.src.len(),
            kind,
            terminated: false,
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = IgnoreSpan;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (at, ch) = self.next_char()?;
            let span = match ch {
                '/' => match self.peek_char() {
                    Some('/') => {
                        self.next_char();
                        self.read_line_comment(at)
                    }
                    Some('*') => {
                        self.next_char();
                        self.read_block_comment(at)
                    }
                    _ => continue,
                },
                '"' | '\'' => self.read_literal(at, ch),
                _ => continue,
            };
            return Some(span);
        }
    }
}

/// Comment and literal spans of one exact text.
///
/// Offsets are only meaningful for the text the index was built from; any
/// rewrite of that text needs a fresh `IgnoreIndex::scan`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreIndex {
    comments: Vec<IgnoreSpan>,
    literals: Vec<IgnoreSpan>,
    merged: Vec<IgnoreSpan>,
}

impl IgnoreIndex {
    pub fn scan(text: &str) -> Self {
        let merged: Vec<IgnoreSpan> = Lexer::new(text).collect();
        let (comments, literals) = merged
            .iter()
            .partition(|span| span.kind == SpanKind::Comment);
        Self {
            comments,
            literals,
            merged,
        }
    }

    pub fn comments(&self) -> &[IgnoreSpan] {
        &self.comments
    }

    pub fn literals(&self) -> &[IgnoreSpan] {
        &self.literals
    }

    /// The one membership test every pass uses.
    pub fn is_ignored(&self, index: usize) -> bool {
        self.span_at(index).is_some()
    }

    pub fn span_at(&self, index: usize) -> Option<&IgnoreSpan> {
        let after = self.merged.partition_point(|span| span.start <= index);
        let candidate = self.merged.get(after.checked_sub(1)?)?;
        candidate.contains(index).then_some(candidate)
    }

    pub fn unterminated(&self) -> impl Iterator<Item = &IgnoreSpan> {
        self.merged.iter().filter(|span| !span.terminated)
    }
}

// ─────────────────────────────────────────────────────
// Shared helpers
// ─────────────────────────────────────────────────────

/// Remove every comment. Newlines inside block comments are kept so the
/// result has the same line numbering as the input.
pub fn strip_comments(text: &str) -> String {
    let index = IgnoreIndex::scan(text);
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for span in index.comments() {
        out.push_str(&text[cursor..span.start]);
        out.extend(text[span.start..span.end].chars().filter(|&c| c == '\n'));
        cursor = span.end;
    }
    out.push_str(&text[cursor..]);
    out
}

/// Given the offset of an `open` byte, find its matching `close`, skipping
/// ignored regions and nested pairs. `None` when EOF comes first.
pub fn find_matching(
    text: &str,
    index: &IgnoreIndex,
    open_at: usize,
    open: u8,
    close: u8,
) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    for (at, &b) in bytes.iter().enumerate().skip(open_at) {
        if b != open && b != close {
            continue;
        }
        if index.is_ignored(at) {
            continue;
        }
        if b == open {
            depth += 1;
        } else {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(at);
            }
        }
    }
    None
}

/// First offset `>= from` holding `byte` outside ignored regions.
pub fn find_unignored(text: &str, index: &IgnoreIndex, from: usize, byte: u8) -> Option<usize> {
    text.as_bytes()
        .iter()
        .enumerate()
        .skip(from)
        .find(|&(at, &b)| b == byte && !index.is_ignored(at))
        .map(|(at, _)| at)
}

pub fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

/// Identifier tokens outside ignored regions, with their byte offsets.
/// Runs that start with a digit are numbers, not identifiers.
pub fn identifiers<'t>(text: &'t str, index: &IgnoreIndex) -> Vec<(usize, &'t str)> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut at = 0;
    while at < bytes.len() {
        if !is_ident_byte(bytes[at]) {
            at += 1;
            continue;
        }
        let start = at;
        while at < bytes.len() && is_ident_byte(bytes[at]) {
            at += 1;
        }
        if !bytes[start].is_ascii_digit() && !index.is_ignored(start) {
            out.push((start, &text[start..at]));
        }
    }
    out
}

/// 1-based line number of a byte offset.
pub fn line_of(text: &str, offset: usize) -> usize {
    let end = offset.min(text.len());
    1 + text.as_bytes()[..end].iter().filter(|&&b| b == b'\n').count()
}

/// Byte bounds `[start, end)` of the line holding `offset`, newline excluded.
pub fn line_bounds(text: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(text.len());
    let bytes = text.as_bytes();
    let start = bytes[..offset]
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |nl| nl + 1);
    let end = bytes[offset..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(text.len(), |nl| offset + nl);
    (start, end)
}

/// Byte offset at which every line starts.
pub fn line_starts(text: &str) -> Vec<usize> {
    std::iter::once(0)
        .chain(
            text.bytes()
                .enumerate()
                .filter(|&(_, b)| b == b'\n')
                .map(|(at, _)| at + 1),
        )
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans(src: &str) -> Vec<(usize, usize, SpanKind, bool)> {
        Lexer::new(src)
            .map(|s| (s.start, s.end, s.kind, s.terminated))
            .collect()
    }

    #[test]
    fn test_scan_regions() {
        let test_cases = vec![
            (
                "a = 1; // note\nb = 2;",
                vec![(7, 14, SpanKind::Comment, true)],
            ),
            (
                "x /* one\ntwo */ y",
                vec![(2, 15, SpanKind::Comment, true)],
            ),
            (
                r#"print("a \" b");"#,
                vec![(6, 14, SpanKind::StringLiteral, true)],
            ),
            (
                r"c = '\'';",
                vec![(4, 8, SpanKind::CharLiteral, true)],
            ),
            (
                r#"s = "// not a comment";"#,
                vec![(4, 22, SpanKind::StringLiteral, true)],
            ),
            ("a / b", vec![]),
            ("// tail", vec![(0, 7, SpanKind::Comment, true)]),
        ];

        for (src, expected) in test_cases {
            assert_eq!(spans(src), expected, "scanning {src:?}");
        }
    }

    #[test]
    fn test_unterminated_regions() {
        let src = "a = \"open\nb = 1; /* never closed";
        let index = IgnoreIndex::scan(src);
        let open: Vec<_> = index.unterminated().collect();
        assert_eq!(open.len(), 2);
        assert_eq!(open[0].kind, SpanKind::StringLiteral);
        assert_eq!(open[0].end, 9);
        assert_eq!(open[1].kind, SpanKind::Comment);
        assert_eq!(open[1].end, src.len());
        // the literal stops at its line, so the next line is still code
        assert!(!index.is_ignored(10));
    }

    #[test]
    fn test_scan_is_idempotent() {
        let src = "func int f() { return 1; } // c\nprint(\"}\");";
        assert_eq!(IgnoreIndex::scan(src), IgnoreIndex::scan(src));
    }

    #[test]
    fn test_is_ignored() {
        let src = "ab \"cd\" ef /* gh */";
        let index = IgnoreIndex::scan(src);
        let ignored: Vec<bool> = (0..src.len()).map(|i| index.is_ignored(i)).collect();
        let expected: Vec<bool> = src
            .char_indices()
            .map(|(i, _)| (3..7).contains(&i) || (11..19).contains(&i))
            .collect();
        assert_eq!(ignored, expected);
        assert_eq!(index.comments().len(), 1);
        assert_eq!(index.literals().len(), 1);
    }

    #[test]
    fn test_strip_comments_keeps_lines() {
        let test_cases = vec![
            ("a; // x\nb;", "a; \nb;"),
            ("a; /* x\ny */ b;", "a; \n b;"),
            ("s = \"/* no */\";", "s = \"/* no */\";"),
        ];
        for (src, expected) in test_cases {
            assert_eq!(strip_comments(src), expected);
        }
    }

    #[test]
    fn test_find_matching() {
        let src = "f() { if (a) { s = \"}\"; } } tail";
        let index = IgnoreIndex::scan(src);
        let open = src.find('{').unwrap();
        assert_eq!(find_matching(src, &index, open, b'{', b'}'), Some(26));

        let unbalanced = "{ {";
        let index = IgnoreIndex::scan(unbalanced);
        assert_eq!(find_matching(unbalanced, &index, 0, b'{', b'}'), None);
    }

    #[test]
    fn test_identifiers() {
        let src = "mouseClick(\"left\", 10); x2 = 3abc; // sleep";
        let index = IgnoreIndex::scan(src);
        let names: Vec<&str> = identifiers(src, &index).into_iter().map(|(_, n)| n).collect();
        assert_eq!(names, vec!["mouseClick", "x2"]);
    }

    #[test]
    fn test_lines() {
        let src = "one\ntwo\nthree";
        assert_eq!(line_of(src, 0), 1);
        assert_eq!(line_of(src, 5), 2);
        assert_eq!(line_of(src, src.len()), 3);
        assert_eq!(line_bounds(src, 5), (4, 7));
        assert_eq!(line_bounds(src, 9), (8, 13));
        assert_eq!(line_starts(src), vec![0, 4, 8]);
    }
}
