//! Optional `autoscript.json` settings, overridden by command-line flags.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::cli::Cli;

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "autoscript.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Color diagnostics with ANSI escapes
    pub colors: bool,

    /// Filter directive used when `RUST_LOG` is unset
    pub log_level: String,

    /// Compiler executable
    pub javac: PathBuf,

    /// Archiver executable
    pub jar: PathBuf,

    /// JSON catalog file
    pub catalog: Option<PathBuf>,

    /// Java library source to mine
    pub library: Option<PathBuf>,

    /// Where jars and build directories go
    pub out_dir: Option<PathBuf>,

    pub verbose: bool,
    pub keep_java: bool,
    pub keep_classes: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            colors: true,
            log_level: "warn".to_string(),
            javac: PathBuf::from("javac"),
            jar: PathBuf::from("jar"),
            catalog: None,
            library: None,
            out_dir: None,
            verbose: false,
            keep_java: false,
            keep_classes: false,
        }
    }
}

impl Config {
    /// Settings for this run: the config file (if any) with the flags of
    /// `cli` applied on top.
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply(cli);
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Reading {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("Parsing config {}", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Flags only ever switch things on or replace paths.
    pub fn apply(&mut self, cli: &Cli) {
        if cli.no_colors {
            self.colors = false;
        }
        if let Some(catalog) = &cli.catalog {
            self.catalog = Some(catalog.clone());
        }
        if let Some(library) = &cli.library {
            self.library = Some(library.clone());
        }
        if let Some(out_dir) = &cli.out_dir {
            self.out_dir = Some(out_dir.clone());
        }
        self.verbose |= cli.verbose;
        self.keep_java |= cli.keep_java();
        self.keep_classes |= cli.keep_classes();
    }

    fn validate(&self) -> Result<()> {
        if self.javac.as_os_str().is_empty() {
            bail!("`javac` must name an executable");
        }
        if self.jar.as_os_str().is_empty() {
            bail!("`jar` must name an executable");
        }
        Ok(())
    }

    /// Settings that are legal but probably not what was meant. Logged once
    /// logging is up.
    pub fn warnings(&self) -> Vec<&'static str> {
        let mut warnings = Vec::new();
        if self.catalog.is_some() && self.library.is_some() {
            warnings.push("both a catalog and a library are configured; the catalog wins");
        }
        warnings
    }

    /// Whether the build directory outlives the build.
    pub fn keeps_output(&self) -> bool {
        self.keep_java || self.keep_classes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.colors);
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.javac, PathBuf::from("javac"));
        assert!(!config.keeps_output());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::from_json(r#"{"colors": false, "javac": "/opt/jdk/bin/javac"}"#).unwrap();
        assert!(!config.colors);
        assert_eq!(config.javac, PathBuf::from("/opt/jdk/bin/javac"));
        assert_eq!(config.jar, PathBuf::from("jar"));
    }

    #[test]
    fn test_warnings() {
        let test_cases = vec![
            (r#"{}"#, 0),
            (r#"{"library": "Lib.java"}"#, 0),
            (r#"{"catalog": "lib.json", "library": "Lib.java"}"#, 1),
        ];
        for (json, expected) in test_cases {
            let config = Config::from_json(json).unwrap();
            assert_eq!(config.warnings().len(), expected, "config {json}");
        }
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        assert!(Config::from_json(r#"{"colour": false}"#).is_err());
    }

    #[test]
    fn test_flags_override_file() {
        let mut config = Config::from_json(r#"{"library": "Lib.java", "out_dir": "build"}"#).unwrap();
        let cli = Cli::parse_from(["autoscript", "--no-colors", "--out-dir", "dist", "-g", "x.auto"]);
        config.apply(&cli);
        assert!(!config.colors);
        assert_eq!(config.library, Some(PathBuf::from("Lib.java")));
        assert_eq!(config.out_dir, Some(PathBuf::from("dist")));
        assert!(config.keep_java && config.keep_classes);
    }

    #[test]
    fn test_validate() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());
        config.jar = PathBuf::new();
        assert!(config.validate().is_err());
    }
}
