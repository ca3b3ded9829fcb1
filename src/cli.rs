use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Compile .auto automation scripts into runnable jars")]
pub struct Cli {
    /// Scripts to build, one jar each
    #[arg(required = true)]
    pub scripts: Vec<PathBuf>,

    /// Log every pipeline phase
    #[arg(short, long)]
    pub verbose: bool,

    /// Keep the generated .java and .class files
    #[arg(short, long)]
    pub generate: bool,

    /// Keep the generated .java files
    #[arg(long)]
    pub generate_java: bool,

    /// Keep the compiled .class files
    #[arg(long)]
    pub generate_class: bool,

    /// Print diagnostics without ANSI colors
    #[arg(long)]
    pub no_colors: bool,

    /// JSON catalog of library functions, declarations and imports
    #[arg(long, value_name = "JSON")]
    pub catalog: Option<PathBuf>,

    /// Java library class to mine for builtins
    #[arg(long, value_name = "JAVA")]
    pub library: Option<PathBuf>,

    /// Configuration file (defaults to ./autoscript.json when present)
    #[arg(long, value_name = "JSON")]
    pub config: Option<PathBuf>,

    /// Directory receiving jars and build directories (defaults to each script's directory)
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,
}

impl Cli {
    pub fn keep_java(&self) -> bool {
        self.generate || self.generate_java
    }

    pub fn keep_classes(&self) -> bool {
        self.generate || self.generate_class
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let cli = Cli::parse_from(["autoscript", "-v", "--generate-java", "a.auto", "b.auto"]);
        assert!(cli.verbose);
        assert!(cli.keep_java());
        assert!(!cli.keep_classes());
        assert_eq!(cli.scripts, vec![PathBuf::from("a.auto"), PathBuf::from("b.auto")]);

        let cli = Cli::parse_from(["autoscript", "-g", "--no-colors", "c.auto"]);
        assert!(cli.keep_java() && cli.keep_classes() && cli.no_colors);
    }

    #[test]
    fn test_scripts_are_required() {
        assert!(Cli::try_parse_from(["autoscript", "-v"]).is_err());
    }
}
