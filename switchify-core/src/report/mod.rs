//! Finding reports
//!
//! Supports multiple output formats:
//! - gcc: GCC-style file:line:col: warning with a source excerpt
//! - json: JSON array of findings with their candidate fixes
//! - patch: unified diff of the chosen fixes
//! - count: Number of findings

mod colors;
mod formatter;

pub use colors::should_use_color;
pub use formatter::{format_reports, OutputFormat, OutputOptions};

use crate::edit::{Finding, Fix};

/// Findings of one file together with the text their spans refer to.
#[derive(Debug, Clone)]
pub struct FileReport {
    pub file: String,
    pub source: String,
    pub findings: Vec<Finding>,
}

impl FileReport {
    /// One fix per finding, in finding order.
    pub fn chosen_fixes(&self, prefer_secondary: bool) -> Vec<&Fix> {
        self.findings.iter().filter_map(|f| f.chosen_fix(prefer_secondary)).collect()
    }
}
