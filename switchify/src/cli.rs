//! CLI argument parsing using clap

use std::path::PathBuf;

use clap::Parser;

/// Rewrites Java if-chains and switch statements into modern switches
#[derive(Parser, Debug)]
#[command(name = "switchify")]
#[command(author, about, long_about = None, disable_version_flag = true)]
#[command(after_help = r#"EXAMPLES:
    # Report if-chains that can become switches
    switchify "src/**/*.java" --flag IfChainToSwitch:EnableMain

    # Preview every rewrite as a patch
    switchify "src/**/*.java" --enable-all --format patch

    # Rewrite files in place, dropping redundant defaults
    switchify "src/**/*.java" --enable-all --secondary --apply

    # Read source from stdin, print the rewritten source
    cat Shape.java | switchify --enable-all --apply

FLAGS:
    IfChainToSwitch:              EnableMain, EnableSafe, EnableReturnSwitch,
                                  EnableAssignmentSwitch, MaxChainLength=<n>
    StatementSwitchToExpressionSwitch:
                                  EnableDirectConversion, EnableReturnSwitchConversion,
                                  EnableAssignmentSwitchConversion
    RefactorSwitch:               EnableReturnSwitch, EnableAssignmentSwitch,
                                  EnableSimplifySwitch
"#)]
pub struct Args {
    /// Files to process (supports glob patterns like "src/**/*.java")
    #[arg()]
    pub files: Vec<String>,

    /// Rule flag override, e.g. IfChainToSwitch:EnableMain or RefactorSwitch:EnableSimplifySwitch=false
    #[arg(short = 'f', long = "flag")]
    pub flags: Vec<String>,

    /// TOML configuration file with one section per rule
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// Turn on every rule flag
    #[arg(long = "enable-all")]
    pub enable_all: bool,

    /// Write the chosen fixes back to the files
    #[arg(long = "apply")]
    pub apply: bool,

    /// Prefer secondary fixes (e.g. removing a redundant default)
    #[arg(long = "secondary")]
    pub secondary: bool,

    /// Output format: gcc (default), json, patch, count
    #[arg(short = 'o', long = "format", default_value = "gcc")]
    pub format: String,

    /// Color output: auto (default), always, never
    #[arg(long = "color", default_value = "auto")]
    pub color: String,

    /// Number of parallel workers
    #[arg(short = 'c', long = "concurrency")]
    pub concurrency: Option<usize>,

    /// Show verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Print version and build information
    #[arg(short = 'V', long = "version")]
    pub version: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_repeated_flags() {
        let args = Args::try_parse_from([
            "switchify",
            "A.java",
            "--flag",
            "IfChainToSwitch:EnableMain",
            "-f",
            "RefactorSwitch:EnableSimplifySwitch=true",
            "--format",
            "json",
        ])
        .expect("Should parse arguments");
        assert_eq!(args.files, vec!["A.java"]);
        assert_eq!(args.flags.len(), 2);
        assert_eq!(args.format, "json");
        assert!(!args.apply);
    }

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["switchify"]).expect("Should parse arguments");
        assert!(args.files.is_empty());
        assert_eq!(args.format, "gcc");
        assert_eq!(args.color, "auto");
        assert_eq!(args.concurrency, None);
    }
}
