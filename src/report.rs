//! What the user sees on stdout.

use std::path::Path;

use crate::error::{Diagnostics, Severity};
use crate::processor::relocate::Relocated;

const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const GREEN: &str = "\x1b[32m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, Copy)]
pub struct Reporter {
    colors: bool,
}

impl Reporter {
    pub fn new(colors: bool) -> Self {
        Self { colors }
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.colors {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn severity_color(severity: Severity) -> &'static str {
        match severity {
            Severity::Error => RED,
            Severity::Warning => YELLOW,
            Severity::Note => BOLD,
        }
    }

    /// Every verifier diagnostic with its source line, then the count.
    pub fn render_diagnostics(&self, file_name: &str, source: &str, diagnostics: &Diagnostics) -> String {
        let mut out = String::new();
        for diagnostic in diagnostics.iter() {
            let block = diagnostic.format_with_source(file_name, source);
            let (location, rest) = block.split_once('\n').unwrap_or((block.as_str(), ""));
            out.push_str(&self.paint(Self::severity_color(diagnostic.severity), location));
            out.push('\n');
            out.push_str(rest);
            out.push_str("\n\n");
        }
        out.push_str(&self.paint(BOLD, &diagnostics.summary()));
        out
    }

    pub fn render_relocated(&self, relocated: &Relocated) -> String {
        let text = relocated.to_string();
        let (location, rest) = text.split_once('\n').unwrap_or((text.as_str(), ""));
        let color = Self::severity_color(relocated.diagnostic.severity);
        format!("{}\n{rest}\n", self.paint(color, location))
    }

    pub fn render_success(&self, artifact: &Path) -> String {
        format!("{} {}", self.paint(GREEN, "Built"), artifact.display())
    }

    pub fn diagnostics(&self, file_name: &str, source: &str, diagnostics: &Diagnostics) {
        println!("{}", self.render_diagnostics(file_name, source, diagnostics));
    }

    pub fn relocated(&self, relocated: &Relocated) {
        println!("{}", self.render_relocated(relocated));
    }

    pub fn success(&self, artifact: &Path) {
        println!("{}", self.render_success(artifact));
    }
}
