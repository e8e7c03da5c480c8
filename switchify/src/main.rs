//! switchify - Java switch modernization tool
//!
//! This is the main CLI entry point that orchestrates analysis, reporting
//! and applying fixes.

mod cli;
mod version;

use std::io::{self, Read};
use std::process::ExitCode;

use anyhow::{anyhow, bail, Context};
use clap::Parser;
use switchify_core::{
    analyze_files_parallel, analyze_source, apply_edits, apply_fixes_to_files, expand_globs,
    filter_supported_files, format_reports, merge_fixes, should_use_color, FileFixes, FileReport,
    OutputFormat, OutputOptions, RefactorConfig,
};
use tracing_subscriber::EnvFilter;

use cli::Args;

const STDIN_PATH: &str = "<stdin>";

fn main() -> ExitCode {
    let args = Args::parse();

    if args.version {
        version::print_version(args.verbose);
        return ExitCode::SUCCESS;
    }

    init_logging(args.verbose);

    if let Err(e) = run(args) {
        eprintln!("error: {:#}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Install the stderr subscriber; `SWITCHIFY_LOG` wins over `RUST_LOG`.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = std::env::var("SWITCHIFY_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Defaults, then the TOML file, then `--flag` overrides, then `--enable-all`.
fn build_config(args: &Args) -> anyhow::Result<RefactorConfig> {
    let mut config = match &args.config {
        Some(path) => RefactorConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => RefactorConfig::default(),
    };
    for flag in &args.flags {
        config
            .apply_flag(flag)
            .with_context(|| format!("invalid --flag '{}'", flag))?;
    }
    if args.enable_all {
        config.enable_all();
    }
    Ok(config)
}

fn run(args: Args) -> anyhow::Result<()> {
    let format = OutputFormat::from_str(&args.format).ok_or_else(|| {
        anyhow!(
            "invalid format '{}'. Valid formats: {}",
            args.format,
            OutputFormat::valid_formats().join(", ")
        )
    })?;
    let config = build_config(&args)?;
    tracing::debug!(?config, "configuration");

    let options = OutputOptions {
        use_color: should_use_color(&args.color),
        prefer_secondary: args.secondary,
    };

    let files = filter_supported_files(expand_globs(&args.files));

    if files.is_empty() {
        if !args.files.is_empty() {
            bail!("no Java files matched");
        }
        if atty::is(atty::Stream::Stdin) {
            eprintln!("Usage: switchify <files...> [OPTIONS]");
            eprintln!("   or: cat Source.java | switchify --enable-all");
            eprintln!("\nUse --help for more information.");
            bail!("no input files");
        }
        let mut source = String::new();
        io::stdin()
            .read_to_string(&mut source)
            .context("failed to read stdin")?;
        let report = analyze_source(source, STDIN_PATH.to_string(), &config)?;
        if args.apply {
            print!("{}", rewrite_stdin(&report, args.secondary)?);
        } else {
            print!("{}", format_reports(std::slice::from_ref(&report), format, &options));
        }
        return Ok(());
    }

    let concurrency = args.concurrency.unwrap_or_else(num_cpus::get);
    rayon::ThreadPoolBuilder::new()
        .num_threads(concurrency)
        .build_global()
        .ok();

    let mut reports: Vec<FileReport> = Vec::with_capacity(files.len());
    let mut failed = 0usize;
    for (path, result) in files.iter().zip(analyze_files_parallel(&files, &config, None)) {
        match result {
            Ok(report) => reports.push(report),
            Err(e) => {
                tracing::warn!(file = %path, error = %e, "skipping file");
                failed += 1;
            }
        }
    }

    print!("{}", format_reports(&reports, format, &options));

    if args.apply {
        let file_fixes: Vec<FileFixes> = reports
            .iter()
            .map(|r| FileFixes {
                path: &r.file,
                source: &r.source,
                fixes: r.chosen_fixes(args.secondary),
            })
            .collect();
        let summary = apply_fixes_to_files(&file_fixes)?;
        eprintln!(
            "applied {} fixes to {} files ({} skipped as overlapping)",
            summary.fixes_applied, summary.files_modified, summary.fixes_skipped
        );
    }

    if failed > 0 {
        bail!("{} of {} files could not be read", failed, files.len());
    }
    Ok(())
}

/// The stdin source with the chosen fixes applied.
fn rewrite_stdin(report: &FileReport, prefer_secondary: bool) -> anyhow::Result<String> {
    let fixes = report.chosen_fixes(prefer_secondary);
    let (edits, skipped) = merge_fixes(&fixes);
    if skipped > 0 {
        tracing::warn!(skipped, "overlapping fixes skipped");
    }
    Ok(apply_edits(&report.source, &edits)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["switchify"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).expect("Should parse arguments")
    }

    #[test]
    fn test_config_layering() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let path = dir.path().join("switchify.toml");
        fs::write(&path, "[IfChainToSwitch]\nEnableMain = true\nEnableSafe = true\n").expect("Should write config");
        let path = path.to_string_lossy().to_string();
        let path = path.as_str();

        let config = build_config(&args(&["--config", path, "--flag", "IfChainToSwitch:EnableSafe=false"]))
            .expect("Should build config");
        assert!(config.if_chain.enable_main);
        assert!(!config.if_chain.enable_safe);

        let config = build_config(&args(&["--config", path, "--flag", "IfChainToSwitch:EnableSafe=false", "--enable-all"]))
            .expect("Should build config");
        assert!(config.if_chain.enable_safe);
    }

    #[test]
    fn test_invalid_flag_is_error() {
        assert!(build_config(&args(&["--flag", "NoSuchRule:EnableMain"])).is_err());
    }

    #[test]
    fn test_rewrite_stdin() {
        let source = "class A {\n  int f(int x) {\n    switch (x) {\n      case 1 -> { return 1; }\n      default -> { return 0; }\n    }\n  }\n}\n";
        let config = RefactorConfig::all_enabled();
        let report = analyze_source(source.to_string(), STDIN_PATH.to_string(), &config).expect("Should analyze");
        let rewritten = rewrite_stdin(&report, false).expect("Should rewrite");
        assert!(rewritten.contains("return switch (x) {"));
    }
}
