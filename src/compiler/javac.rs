//! `javac` as an external process.
//
//  Output shape parsed here:
//
//      /tmp/x/gen/Demo.java:5: error: cannot find symbol
//              foo();
//              ^
//        symbol:   method foo()
//        location: class Demo
//      1 error
//
//  The echoed line and the caret line are dropped; the caret column plus the
//  line number give the byte offset. Indented lines after that belong to the
//  message.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;

use super::{Backend, BackendDiagnostic};
use crate::error::Severity;
use crate::processor::lexer;
use crate::writer::java::write_unit;

static HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+\.java):(\d+): (error|warning|note): (.*)$").expect("header regex must compile")
});
static BARE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(error|warning|Note|note): (.*)$").expect("bare regex must compile")
});
static COUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d+ (errors?|warnings?)$").expect("count regex must compile")
});

#[derive(Debug, Clone)]
pub struct JavacBackend {
    program: PathBuf,
    /// Where each unit's `.java` file is written before compiling it.
    source_dir: PathBuf,
}

impl JavacBackend {
    pub fn new(program: impl Into<PathBuf>, source_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            source_dir: source_dir.into(),
        }
    }
}

impl Backend for JavacBackend {
    fn compile(
        &self,
        unit_name: &str,
        source: &str,
        out_dir: &Path,
        classpath_dir: &Path,
    ) -> Result<Vec<BackendDiagnostic>> {
        std::fs::create_dir_all(&self.source_dir)
            .with_context(|| format!("Creating {}", self.source_dir.display()))?;
        std::fs::create_dir_all(out_dir).with_context(|| format!("Creating {}", out_dir.display()))?;
        let file = write_unit(&self.source_dir, unit_name, source)
            .with_context(|| format!("Writing {unit_name}.java"))?;

        tracing::debug!(unit = unit_name, program = %self.program.display(), "compiling");
        let output = Command::new(&self.program)
            .arg("-d")
            .arg(out_dir)
            .arg("-cp")
            .arg(classpath_dir)
            .args(["-encoding", "UTF-8"])
            .arg(&file)
            .output()
            .with_context(|| format!("Running {}", self.program.display()))?;

        let text = String::from_utf8_lossy(&output.stderr);
        let mut diagnostics = parse_javac_output(&text, source);
        if !output.status.success() && !diagnostics.iter().any(BackendDiagnostic::is_error) {
            diagnostics.push(BackendDiagnostic {
                position: None,
                severity: Severity::Error,
                message: format!("{} failed ({}): {}", self.program.display(), output.status, text.trim()),
            });
        }
        tracing::debug!(unit = unit_name, diagnostics = diagnostics.len(), "compiled");
        Ok(diagnostics)
    }
}

/// Turn `javac` stderr into positioned diagnostics against `source`.
pub fn parse_javac_output(output: &str, source: &str) -> Vec<BackendDiagnostic> {
    let starts = lexer::line_starts(source);
    let mut diagnostics = Vec::new();
    let mut lines = output.lines().peekable();

    while let Some(line) = lines.next() {
        if let Some(caps) = HEADER.captures(line) {
            let line_no: usize = caps[2].parse().unwrap_or(0);
            let mut message = caps[4].to_string();

            // echoed source line, then the caret line
            let mut column = None;
            if lines.peek().is_some_and(|l| !is_header(l)) {
                lines.next();
                if let Some(caret) = lines.peek().and_then(|l| caret_column(l)) {
                    column = Some(caret);
                    lines.next();
                }
            }
            while let Some(more) = lines.peek() {
                if is_header(more) || COUNT.is_match(more.trim()) || !more.starts_with(char::is_whitespace) {
                    break;
                }
                message.push('\n');
                message.push_str(more.trim());
                lines.next();
            }

            diagnostics.push(BackendDiagnostic {
                position: offset(source, &starts, line_no, column.unwrap_or(0)),
                severity: severity(&caps[3]),
                message,
            });
        } else if let Some(caps) = BARE.captures(line) {
            diagnostics.push(BackendDiagnostic {
                position: None,
                severity: severity(&caps[1]),
                message: caps[2].to_string(),
            });
        }
    }
    diagnostics
}

fn is_header(line: &str) -> bool {
    HEADER.is_match(line)
}

fn severity(word: &str) -> Severity {
    match word {
        "error" => Severity::Error,
        "warning" => Severity::Warning,
        _ => Severity::Note,
    }
}

/// Character column of the `^` in a caret line.
fn caret_column(line: &str) -> Option<usize> {
    let trimmed = line.trim();
    if trimmed != "^" {
        return None;
    }
    line.chars().position(|c| c == '^')
}

/// Byte offset of `column` (in chars) on 1-based line `line_no`, clamped to
/// the end of that line.
fn offset(source: &str, starts: &[usize], line_no: usize, column: usize) -> Option<usize> {
    let start = *starts.get(line_no.checked_sub(1)?)?;
    let (_, end) = lexer::line_bounds(source, start);
    let within = source[start..end]
        .char_indices()
        .nth(column)
        .map_or(end - start, |(at, _)| at);
    Some(start + within)
}
