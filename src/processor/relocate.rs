//! Point compiler messages back at the user's script.
//!
//! The generated program is made of the user's lines (trimmed and
//! re-indented) plus library code. A compiler message is moved back to the
//! script when the offending generated line matches exactly one script line;
//! otherwise it stays on the generated file and the user is told how to keep
//! that file around.

use std::fmt;

use super::lexer;
use super::structs::declaration_lines;
use crate::compiler::BackendDiagnostic;
use crate::error::{Diagnostic, ErrorKind};

/// A compiler message after relocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relocated {
    /// Script name, or `<Unit>.java` when the message stays on generated code.
    pub file: String,
    /// The offending line as the user would recognise it.
    pub code_line: String,
    pub diagnostic: Diagnostic,
    /// Class whose `gen/` directory holds the generated sources.
    pub class_name: String,
}

impl Relocated {
    pub fn in_generated_code(&self) -> bool {
        self.diagnostic.kind == ErrorKind::AmbiguousRelocation
    }
}

impl fmt::Display for Relocated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = if self.in_generated_code() {
            "Generated file: "
        } else {
            ""
        };
        write!(
            f,
            "{prefix}{} line {}\n{}\n{}: {}",
            self.file,
            self.diagnostic.line,
            self.code_line,
            self.diagnostic.severity,
            self.diagnostic.message
        )?;
        if self.in_generated_code() {
            write!(
                f,
                "\nThis was an error in generated code. To see what caused it, build again with \
                 --generate: a directory called \"{class}/gen/\" will be kept, holding the \
                 generated {file}.",
                class = self.class_name,
                file = self.file,
            )?;
        }
        Ok(())
    }
}

/// Per-script relocation context.
pub struct Relocator<'a> {
    user_file: &'a str,
    user_source: &'a str,
    class_name: &'a str,
}

impl<'a> Relocator<'a> {
    pub fn new(user_file: &'a str, user_source: &'a str, class_name: &'a str) -> Self {
        Self {
            user_file,
            user_source,
            class_name,
        }
    }

    /// Relocate one message reported against unit `unit_name`, whose source
    /// is `generated`.
    pub fn relocate(
        &self,
        unit_name: &str,
        generated: &str,
        diagnostic: &BackendDiagnostic,
    ) -> Relocated {
        let message = diagnostic.message.replace("java.lang.", "");
        let Some(position) = diagnostic.position else {
            return self.on_generated(unit_name, 0, String::new(), diagnostic, message);
        };

        let (start, end) = lexer::line_bounds(generated, position);
        let line = &generated[start..end];

        let matches = if unit_name == self.class_name {
            self.matching_lines(line)
        } else {
            declaration_lines(self.user_source, unit_name)
        };

        match matches.as_slice() {
            [only] => {
                let code_line = self
                    .user_source
                    .lines()
                    .nth(only - 1)
                    .unwrap_or_default()
                    .to_string();
                Relocated {
                    file: self.user_file.to_string(),
                    code_line,
                    diagnostic: Diagnostic {
                        line: *only,
                        kind: ErrorKind::BackendCompileError,
                        severity: diagnostic.severity,
                        message,
                    },
                    class_name: self.class_name.to_string(),
                }
            }
            _ => {
                let line_no = lexer::line_of(generated, position);
                self.on_generated(unit_name, line_no, line.to_string(), diagnostic, message)
            }
        }
    }

    /// 1-based script lines equal to `line` once both are trimmed, with or
    /// without the script line's comments.
    fn matching_lines(&self, line: &str) -> Vec<usize> {
        let wanted = line.trim();
        if wanted.is_empty() {
            return Vec::new();
        }
        self.user_source
            .lines()
            .enumerate()
            .filter(|(_, user)| {
                user.trim() == wanted || lexer::strip_comments(user).trim() == wanted
            })
            .map(|(n, _)| n + 1)
            .collect()
    }

    fn on_generated(
        &self,
        unit_name: &str,
        line: usize,
        code_line: String,
        diagnostic: &BackendDiagnostic,
        message: String,
    ) -> Relocated {
        Relocated {
            file: format!("{unit_name}.java"),
            code_line,
            diagnostic: Diagnostic {
                line,
                kind: ErrorKind::AmbiguousRelocation,
                severity: diagnostic.severity,
                message,
            },
            class_name: self.class_name.to_string(),
        }
    }
}
