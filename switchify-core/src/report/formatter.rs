//! Output formatters for different output modes

use serde::Serialize;

use crate::config::Rule;
use crate::edit::{apply_edits, select_fixes, Fix, FixKind, TextEdit};
use crate::source_utils::{line_end, line_start, offset_to_position};
use crate::tree::Span;

use super::colors::{ansi, paint};
use super::FileReport;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// GCC-style file:line:col: warning: [Rule] message
    Gcc,
    /// JSON array with findings and their fixes
    Json,
    /// Unified diff of the chosen fixes
    Patch,
    /// Number of findings
    Count,
}

impl OutputFormat {
    /// Parse format from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "gcc" => Some(OutputFormat::Gcc),
            "json" => Some(OutputFormat::Json),
            "patch" | "diff" => Some(OutputFormat::Patch),
            "count" => Some(OutputFormat::Count),
            _ => None,
        }
    }

    /// Get list of all valid format names
    pub fn valid_formats() -> &'static [&'static str] {
        &["gcc", "json", "patch", "count"]
    }
}

/// Options for output formatting
#[derive(Debug, Clone, Default)]
pub struct OutputOptions {
    /// Whether to use color in output
    pub use_color: bool,
    /// Show the secondary fix of a finding when it has one
    pub prefer_secondary: bool,
}

#[derive(Serialize)]
struct JsonFinding<'a> {
    file: &'a str,
    line: u32,
    column: u32,
    end_line: u32,
    end_column: u32,
    rule: Rule,
    message: &'a str,
    fixes: Vec<JsonFix<'a>>,
}

#[derive(Serialize)]
struct JsonFix<'a> {
    kind: FixKind,
    description: &'a str,
    edits: Vec<JsonEdit<'a>>,
}

#[derive(Serialize)]
struct JsonEdit<'a> {
    line: u32,
    column: u32,
    end_line: u32,
    end_column: u32,
    replacement: &'a str,
}

/// Format reports according to the specified format
pub fn format_reports(reports: &[FileReport], format: OutputFormat, options: &OutputOptions) -> String {
    match format {
        OutputFormat::Gcc => format_gcc(reports, options),
        OutputFormat::Json => format_json(reports),
        OutputFormat::Patch => format_patch(reports, options),
        OutputFormat::Count => format_count(reports),
    }
}

fn format_gcc(reports: &[FileReport], options: &OutputOptions) -> String {
    let color = options.use_color;
    let mut output = String::new();
    for report in reports {
        let lines: Vec<&str> = report.source.lines().collect();
        for finding in &report.findings {
            let (line, column) = offset_to_position(&report.source, finding.span.start);
            let (end_line, end_column) = offset_to_position(&report.source, finding.span.end);
            let location = format!("{}:{}:{}:", report.file, line, column);
            output.push_str(&format!(
                "{} {} [{}] {}\n",
                paint(&location, ansi::BOLD, color),
                paint("warning:", ansi::YELLOW, color),
                paint(&finding.rule.to_string(), ansi::CYAN, color),
                finding.message
            ));
            push_excerpt(&mut output, &lines, (line, column), (end_line, end_column));
            if let Some(fix) = finding.chosen_fix(options.prefer_secondary) {
                output.push_str(&paint(&format!("  = fix: {}", fix.description), ansi::DIM, color));
                output.push('\n');
            }
            output.push('\n');
        }
    }
    output
}

/// Source lines of a finding: one line gets a caret underline, up to six
/// are listed, longer ranges show their first and last two lines.
fn push_excerpt(output: &mut String, lines: &[&str], start: (u32, u32), end: (u32, u32)) {
    let start_line = start.0 as usize;
    let end_line = (end.0 as usize).min(lines.len());
    if start_line == 0 || start_line > end_line {
        return;
    }
    let line_count = end_line - start_line + 1;
    let width = end_line.to_string().len();
    let source_line = |i: usize| lines[i - 1].trim_end_matches('\r');

    if line_count == 1 {
        output.push_str(&format!("{:>width$} | {}\n", start_line, source_line(start_line), width = width));
        let caret_col = (start.1 as usize).saturating_sub(1);
        let underline_len = (end.1 as usize).saturating_sub(start.1 as usize).max(1);
        let padding = " ".repeat(width + 3 + caret_col);
        output.push_str(&format!("{}^{}\n", padding, "~".repeat(underline_len - 1)));
    } else if line_count <= 6 {
        for i in start_line..=end_line {
            let marker = if i == start_line || i == end_line { ">" } else { " " };
            output.push_str(&format!("{:>width$} {}| {}\n", i, marker, source_line(i), width = width));
        }
    } else {
        for i in start_line..start_line + 2 {
            output.push_str(&format!("{:>width$} >| {}\n", i, source_line(i), width = width));
        }
        output.push_str(&format!("{:>width$}  | ... ({} more lines)\n", "...", line_count - 4, width = width));
        for i in end_line - 1..=end_line {
            output.push_str(&format!("{:>width$} >| {}\n", i, source_line(i), width = width));
        }
    }
}

fn format_json(reports: &[FileReport]) -> String {
    let findings: Vec<JsonFinding> = reports
        .iter()
        .flat_map(|report| {
            let source = report.source.as_str();
            report.findings.iter().map(move |finding| {
                let (line, column) = offset_to_position(source, finding.span.start);
                let (end_line, end_column) = offset_to_position(source, finding.span.end);
                JsonFinding {
                    file: &report.file,
                    line,
                    column,
                    end_line,
                    end_column,
                    rule: finding.rule,
                    message: &finding.message,
                    fixes: finding.fixes.iter().map(|fix| json_fix(source, fix)).collect(),
                }
            })
        })
        .collect();

    let mut output = serde_json::to_string_pretty(&findings).unwrap_or_else(|_| "[]".to_string());
    output.push('\n');
    output
}

fn json_fix<'a>(source: &str, fix: &'a Fix) -> JsonFix<'a> {
    let edits = fix
        .edits
        .iter()
        .map(|edit| {
            let (line, column) = offset_to_position(source, edit.span.start);
            let (end_line, end_column) = offset_to_position(source, edit.span.end);
            JsonEdit { line, column, end_line, end_column, replacement: &edit.replacement }
        })
        .collect();
    JsonFix { kind: fix.kind, description: &fix.description, edits }
}

/// Whole lines touched by a run of edits.
#[derive(Debug)]
struct Hunk {
    region: Span,
    edits: Vec<TextEdit>,
}

/// Group edits into hunks; edits on shared lines land in one hunk.
fn hunks(source: &str, fixes: &[&Fix]) -> Vec<Hunk> {
    let mut edits: Vec<&TextEdit> = fixes.iter().flat_map(|f| &f.edits).collect();
    edits.sort_by_key(|e| (e.span.start, e.span.end));

    let mut out: Vec<Hunk> = Vec::new();
    for edit in edits {
        let region = Span::new(line_start(source, edit.span.start), line_end(source, edit.span.end));
        match out.last_mut() {
            Some(last) if region.start <= last.region.end => {
                last.region = last.region.union(region);
                last.edits.push(edit.clone());
            }
            _ => out.push(Hunk { region, edits: vec![edit.clone()] }),
        }
    }
    out
}

fn format_patch(reports: &[FileReport], options: &OutputOptions) -> String {
    let color = options.use_color;
    let mut output = String::new();
    for report in reports {
        let chosen = report.chosen_fixes(options.prefer_secondary);
        let (accepted, _) = select_fixes(&chosen);
        let hunks = hunks(&report.source, &accepted);
        if hunks.is_empty() {
            continue;
        }
        output.push_str(&paint(&format!("--- a/{}", report.file), ansi::BOLD, color));
        output.push('\n');
        output.push_str(&paint(&format!("+++ b/{}", report.file), ansi::BOLD, color));
        output.push('\n');

        let mut delta: i64 = 0;
        for hunk in hunks {
            let old = hunk.region.text(&report.source);
            let shifted: Vec<TextEdit> = hunk
                .edits
                .iter()
                .map(|e| {
                    let span = Span::new(e.span.start - hunk.region.start, e.span.end - hunk.region.start);
                    TextEdit::replace(span, e.replacement.clone())
                })
                .collect();
            let new = match apply_edits(old, &shifted) {
                Ok(text) => text,
                Err(err) => {
                    tracing::warn!(file = %report.file, error = %err, "cannot render hunk");
                    continue;
                }
            };
            let old_lines: Vec<&str> = old.lines().collect();
            let new_lines: Vec<&str> = new.lines().collect();
            let (old_start, _) = offset_to_position(&report.source, hunk.region.start);
            let new_start = old_start as i64 + delta;

            let header = format!("@@ -{},{} +{},{} @@", old_start, old_lines.len(), new_start, new_lines.len());
            output.push_str(&paint(&header, ansi::CYAN, color));
            output.push('\n');
            for line in &old_lines {
                output.push_str(&paint(&format!("-{}", line), ansi::RED, color));
                output.push('\n');
            }
            for line in &new_lines {
                output.push_str(&paint(&format!("+{}", line), ansi::GREEN, color));
                output.push('\n');
            }
            delta += new_lines.len() as i64 - old_lines.len() as i64;
        }
    }
    output
}

fn format_count(reports: &[FileReport]) -> String {
    format!("{}\n", reports.iter().map(|r| r.findings.len()).sum::<usize>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::Finding;

    const SOURCE: &str = "class A {\n  int b;\n  int c;\n}\n";

    fn report() -> FileReport {
        let start = SOURCE.find("int b;").expect("Should find b");
        let span = Span::new(start, start + "int b;".len());
        let fix = Fix::new(FixKind::Primary, "Widen", vec![TextEdit::replace(Span::new(start, start + 3), "long")]);
        FileReport {
            file: "A.java".to_string(),
            source: SOURCE.to_string(),
            findings: vec![Finding {
                rule: Rule::RefactorSwitch,
                file: "A.java".to_string(),
                span,
                message: "This switch can be refactored to be more readable".to_string(),
                fixes: vec![fix],
            }],
        }
    }

    #[test]
    fn test_format_gcc() {
        let output = format_reports(&[report()], OutputFormat::Gcc, &OutputOptions::default());
        assert_eq!(
            output,
            "A.java:2:3: warning: [RefactorSwitch] This switch can be refactored to be more readable\n\
             2 |   int b;\n      ^~~~~~\n  = fix: Widen\n\n"
        );
    }

    #[test]
    fn test_format_json() {
        let output = format_reports(&[report()], OutputFormat::Json, &OutputOptions::default());
        let value: serde_json::Value = serde_json::from_str(&output).expect("Should be valid JSON");
        assert_eq!(value[0]["rule"], "RefactorSwitch");
        assert_eq!(value[0]["line"], 2);
        assert_eq!(value[0]["fixes"][0]["kind"], "Primary");
        assert_eq!(value[0]["fixes"][0]["edits"][0]["replacement"], "long");
    }

    #[test]
    fn test_format_patch() {
        let output = format_reports(&[report()], OutputFormat::Patch, &OutputOptions::default());
        assert_eq!(output, "--- a/A.java\n+++ b/A.java\n@@ -2,1 +2,1 @@\n-  int b;\n+  long b;\n");
    }

    #[test]
    fn test_patch_line_offsets() {
        let source = "a\nb\nc\nd\n";
        let grow = Fix::new(FixKind::Primary, "grow", vec![TextEdit::replace(Span::new(2, 3), "x\ny")]);
        let shrink = Fix::new(FixKind::Primary, "shrink", vec![TextEdit::replace(Span::new(6, 7), "z")]);
        let found = hunks(source, &[&grow, &shrink]);
        assert_eq!(found.len(), 2);
        let report = FileReport {
            file: "f".to_string(),
            source: source.to_string(),
            findings: vec![
                Finding { rule: Rule::RefactorSwitch, file: "f".into(), span: Span::new(2, 3), message: String::new(), fixes: vec![grow] },
                Finding { rule: Rule::RefactorSwitch, file: "f".into(), span: Span::new(6, 7), message: String::new(), fixes: vec![shrink] },
            ],
        };
        let output = format_patch(&[report], &OutputOptions::default());
        assert!(output.contains("@@ -2,1 +2,2 @@\n-b\n+x\n+y\n"));
        assert!(output.contains("@@ -4,1 +5,1 @@\n-d\n+z\n"));
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_reports(&[report(), report()], OutputFormat::Count, &OutputOptions::default()), "2\n");
        assert_eq!(OutputFormat::from_str("DIFF"), Some(OutputFormat::Patch));
        assert_eq!(OutputFormat::from_str("xml"), None);
    }
}
