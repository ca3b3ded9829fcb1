//! Diagnostics shared by every pass.
//!
//! Passes never print or abort on their own: they hand back `Diagnostic`s
//! which the driver renders together once the pass is done.

use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UnterminatedIgnoreRegion,
    StructuralImbalance,
    FormatCallShape,
    IdentifierCaseMismatch,
    NameCollision,
    AmbiguousRelocation,
    BackendCompileError,
    PackagingError,
}

impl ErrorKind {
    pub fn label(self) -> &'static str {
        match self {
            ErrorKind::UnterminatedIgnoreRegion => "unterminated",
            ErrorKind::StructuralImbalance => "imbalance",
            ErrorKind::FormatCallShape => "format",
            ErrorKind::IdentifierCaseMismatch => "case",
            ErrorKind::NameCollision => "collision",
            ErrorKind::AmbiguousRelocation => "relocation",
            ErrorKind::BackendCompileError => "compile",
            ErrorKind::PackagingError => "packaging",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
        }
    }
}

/// One problem found in a script, anchored to a 1-based line.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("[{}] line {line}: {message}", .kind.label())]
pub struct Diagnostic {
    pub line: usize,
    pub kind: ErrorKind,
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn error(kind: ErrorKind, line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            kind,
            severity: Severity::Error,
            message: message.into(),
        }
    }

    pub fn imbalance(line: usize, message: impl Into<String>) -> Self {
        Self::error(ErrorKind::StructuralImbalance, line, message)
    }

    pub fn format_shape(line: usize, message: impl Into<String>) -> Self {
        Self::error(ErrorKind::FormatCallShape, line, message)
    }

    pub fn collision(line: usize, message: impl Into<String>) -> Self {
        Self::error(ErrorKind::NameCollision, line, message)
    }

    /// Render the diagnostic the way it is shown to the user, echoing the
    /// offending source line underneath the location.
    pub fn format_with_source(&self, file_name: &str, source: &str) -> String {
        let echoed = source
            .lines()
            .nth(self.line.saturating_sub(1))
            .unwrap_or_default();
        format!(
            "{} in {} line {}\n\t{}\n{}",
            capitalize(&self.severity.to_string()),
            file_name,
            self.line,
            echoed,
            self.message
        )
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Ordered collection of diagnostics for one pipeline run.
///
/// Entries are keyed by line, so iteration is always in line order, and a
/// message repeated on the same line is only kept once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    by_line: BTreeMap<usize, Vec<Diagnostic>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        let entries = self.by_line.entry(diagnostic.line).or_default();
        if !entries.iter().any(|d| d.message == diagnostic.message) {
            entries.push(diagnostic);
        }
    }

    pub fn extend(&mut self, other: Diagnostics) {
        for diagnostic in other.into_iter() {
            self.push(diagnostic);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.by_line.is_empty()
    }

    pub fn len(&self) -> usize {
        self.by_line.values().map(Vec::len).sum()
    }

    /// Distinct lines that carry at least one diagnostic, ascending.
    pub fn lines(&self) -> impl Iterator<Item = usize> + '_ {
        self.by_line.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.by_line.values().flatten()
    }

    pub fn count_of(&self, kind: ErrorKind) -> usize {
        self.iter().filter(|d| d.kind == kind).count()
    }

    /// The trailing summary line, e.g. `1 error.` or `3 errors.`
    pub fn summary(&self) -> String {
        match self.len() {
            1 => "1 error.".to_string(),
            n => format!("{n} errors."),
        }
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::iter::Flatten<std::collections::btree_map::IntoValues<usize, Vec<Diagnostic>>>;

    fn into_iter(self) -> Self::IntoIter {
        self.by_line.into_values().flatten()
    }
}

impl From<Diagnostic> for Diagnostics {
    fn from(diagnostic: Diagnostic) -> Self {
        let mut set = Diagnostics::new();
        set.push(diagnostic);
        set
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for diagnostic in self.iter() {
            writeln!(f, "{diagnostic}")?;
        }
        write!(f, "{}", self.summary())
    }
}

impl std::error::Error for Diagnostics {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_and_order() {
        let mut set = Diagnostics::new();
        set.push(Diagnostic::imbalance(7, "unexpected '}'"));
        set.push(Diagnostic::imbalance(2, "expected a matching '}'"));
        set.push(Diagnostic::imbalance(7, "unexpected '}'"));
        set.push(Diagnostic::format_shape(7, "expected a ( after the %"));

        assert_eq!(set.len(), 3);
        assert_eq!(set.lines().collect::<Vec<_>>(), vec![2, 7]);
        assert_eq!(set.iter().next().map(|d| d.line), Some(2));
        assert_eq!(set.summary(), "3 errors.");
    }

    #[test]
    fn test_format_with_source() {
        let src = "sleep(10);\nclick(;\n";
        let d = Diagnostic::imbalance(2, "expected a matching ')'");
        assert_eq!(
            d.format_with_source("demo.auto", src),
            "Error in demo.auto line 2\n\tclick(;\nexpected a matching ')'"
        );
    }

    #[test]
    fn test_single_summary() {
        let set: Diagnostics = Diagnostic::collision(1, "cannot override").into();
        assert_eq!(set.summary(), "1 error.");
    }
}
