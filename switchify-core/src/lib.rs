//! switchify-core: Java switch modernization library
//!
//! This library provides:
//! - TreeSitter-based parsing of Java into a typed syntax model
//! - Three rewrite rules over `if` chains and `switch` statements
//! - Text edits with primary and secondary fix candidates
//! - Multiple report formats

pub mod comments;
pub mod config;
pub mod edit;
pub mod error;
pub mod parser;
pub mod refactor;
pub mod report;
pub mod semantics;
pub mod source_utils;
pub mod tree;
#[cfg(feature = "native")]
pub mod parallel;

use std::path::Path;

pub use config::{ConfigError, RefactorConfig, Rule};
pub use edit::{
    apply_edits, apply_fixes_to_files, merge_fixes, ApplySummary, EditError, FileFixes, Finding, Fix, FixKind, TextEdit,
};
pub use error::{RefactorError, RejectReason};
pub use parser::{detect_language, parse_file, parse_string, ParseError, ParsedFile, SUPPORTED_LANGUAGES};
pub use refactor::run_rules;
pub use report::{format_reports, should_use_color, FileReport, OutputFormat, OutputOptions};
#[cfg(feature = "native")]
pub use parallel::{analyze_files_parallel, expand_globs, filter_supported_files};

/// Parse `source` and run the enabled rules over it.
pub fn analyze_source(source: String, file: String, config: &RefactorConfig) -> Result<FileReport, ParseError> {
    let parsed = parse_string(source, file)?;
    Ok(report_for(parsed, config))
}

/// Read, parse and analyze one file.
pub fn analyze_file(path: &Path, config: &RefactorConfig) -> Result<FileReport, ParseError> {
    let parsed = parse_file(path)?;
    Ok(report_for(parsed, config))
}

fn report_for(parsed: ParsedFile, config: &RefactorConfig) -> FileReport {
    let findings = run_rules(&parsed, config);
    tracing::debug!(file = %parsed.file_path, findings = findings.len(), "analyzed");
    FileReport {
        file: parsed.file_path,
        source: parsed.source,
        findings,
    }
}
