//! Edit descriptions and their application
//!
//! Rules never touch files. They describe fixes as lists of byte-range
//! replacements; this module splices them into source text and, for the
//! CLI's `--apply`, writes the result back.

use std::fmt;
use std::fs;
use std::io;

use serde::Serialize;
use strum_macros::Display;

use crate::config::Rule;
use crate::tree::Span;

/// Replace `span` of the original source with `replacement`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextEdit {
    pub span: Span,
    pub replacement: String,
}

impl TextEdit {
    pub fn replace(span: Span, replacement: impl Into<String>) -> Self {
        TextEdit { span, replacement: replacement.into() }
    }

    pub fn delete(span: Span) -> Self {
        TextEdit { span, replacement: String::new() }
    }

    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        TextEdit { span: Span::at(offset), replacement: text.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
pub enum FixKind {
    /// Direct translation.
    Primary,
    /// Alternative that relies on exhaustiveness, e.g. dropping a default.
    Secondary,
}

/// One candidate rewrite of a finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fix {
    pub kind: FixKind,
    pub description: String,
    pub edits: Vec<TextEdit>,
}

impl Fix {
    pub fn new(kind: FixKind, description: impl Into<String>, edits: Vec<TextEdit>) -> Self {
        Fix { kind, description: description.into(), edits }
    }

    /// Smallest span covering every edit.
    pub fn span(&self) -> Option<Span> {
        self.edits.iter().map(|e| e.span).reduce(|a, b| a.union(b))
    }
}

/// A rewrite opportunity found by one rule.
#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    pub rule: Rule,
    pub file: String,
    pub span: Span,
    pub message: String,
    /// Ordered candidates; callers pick one.
    pub fixes: Vec<Fix>,
}

impl Finding {
    /// First fix, or the first secondary one when `prefer_secondary`.
    pub fn chosen_fix(&self, prefer_secondary: bool) -> Option<&Fix> {
        if prefer_secondary {
            if let Some(fix) = self.fixes.iter().find(|f| f.kind == FixKind::Secondary) {
                return Some(fix);
            }
        }
        self.fixes.first()
    }
}

/// Errors that can occur while applying edits.
#[derive(Debug)]
pub enum EditError {
    /// Two edits touch the same bytes.
    Overlapping { first: Span, second: Span },
    /// An edit lies outside the source or splits a character.
    OutOfBounds { span: Span, len: usize },
    /// I/O error reading or writing a file.
    Io { path: String, source: io::Error },
}

impl fmt::Display for EditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditError::Overlapping { first, second } => write!(
                f,
                "overlapping edits at {}..{} and {}..{}",
                first.start, first.end, second.start, second.end
            ),
            EditError::OutOfBounds { span, len } => {
                write!(f, "edit {}..{} outside source of length {}", span.start, span.end, len)
            }
            EditError::Io { path, source } => write!(f, "{}: {}", path, source),
        }
    }
}

impl std::error::Error for EditError {}

/// Sort, deduplicate and splice edits in a single pass.
///
/// Two insertions at the same offset are kept in input order. An insertion
/// at the boundary of a replacement does not overlap it.
pub fn apply_edits(source: &str, edits: &[TextEdit]) -> Result<String, EditError> {
    let mut sorted: Vec<&TextEdit> = edits.iter().collect();
    sorted.sort_by_key(|e| (e.span.start, e.span.end));
    sorted.dedup_by(|a, b| a == b);

    for edit in &sorted {
        let Span { start, end } = edit.span;
        if start > end || end > source.len() || !source.is_char_boundary(start) || !source.is_char_boundary(end) {
            return Err(EditError::OutOfBounds { span: edit.span, len: source.len() });
        }
    }
    for pair in sorted.windows(2) {
        if pair[0].span.end > pair[1].span.start {
            return Err(EditError::Overlapping { first: pair[0].span, second: pair[1].span });
        }
    }

    let mut result = String::with_capacity(source.len());
    let mut last_end = 0;
    for edit in sorted {
        result.push_str(&source[last_end..edit.span.start]);
        result.push_str(&edit.replacement);
        last_end = edit.span.end;
    }
    result.push_str(&source[last_end..]);
    Ok(result)
}

/// Summary of fixes written to disk.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub files_modified: usize,
    pub fixes_applied: usize,
    /// Fixes dropped because they overlapped an earlier accepted fix.
    pub fixes_skipped: usize,
}

/// Fixes chosen for one file, in finding order.
#[derive(Debug)]
pub struct FileFixes<'a> {
    pub path: &'a str,
    pub source: &'a str,
    pub fixes: Vec<&'a Fix>,
}

/// Pick fixes greedily: a fix whose edits overlap an already accepted fix
/// is skipped. Returns the accepted fixes and the number skipped.
pub fn select_fixes<'f>(fixes: &[&'f Fix]) -> (Vec<&'f Fix>, usize) {
    let mut accepted: Vec<&'f Fix> = Vec::new();
    let mut skipped = 0;
    for &fix in fixes {
        let Some(hull) = fix.span() else {
            accepted.push(fix);
            continue;
        };
        // only fixes whose hulls meet can have clashing edits
        let clashes = accepted
            .iter()
            .filter(|a| a.span().is_some_and(|h| h.is_connected(hull)))
            .flat_map(|a| &a.edits)
            .any(|a| fix.edits.iter().any(|e| a.span.overlaps(e.span) || a.span.contains(e.span) || e.span.contains(a.span)));
        if clashes {
            tracing::warn!(fix = %fix.description, "skipping fix that overlaps an earlier one");
            skipped += 1;
        } else {
            accepted.push(fix);
        }
    }
    (accepted, skipped)
}

/// The edits of [`select_fixes`], flattened.
pub fn merge_fixes(fixes: &[&Fix]) -> (Vec<TextEdit>, usize) {
    let (accepted, skipped) = select_fixes(fixes);
    (accepted.iter().flat_map(|f| f.edits.iter().cloned()).collect(), skipped)
}

/// Apply each file's fixes and write changed files back.
pub fn apply_fixes_to_files(files: &[FileFixes<'_>]) -> Result<ApplySummary, EditError> {
    let mut summary = ApplySummary::default();
    for file in files {
        if file.fixes.is_empty() {
            continue;
        }
        if file.path == "<stdin>" {
            return Err(EditError::Io {
                path: file.path.to_string(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "cannot write fixes to stdin"),
            });
        }
        let (edits, skipped) = merge_fixes(&file.fixes);
        summary.fixes_skipped += skipped;
        summary.fixes_applied += file.fixes.len() - skipped;

        let result = apply_edits(file.source, &edits)?;
        if result != file.source {
            fs::write(file.path, &result).map_err(|e| EditError::Io {
                path: file.path.to_string(),
                source: e,
            })?;
            summary.files_modified += 1;
        }
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_edits_single_pass() {
        let source = "aaa bbb aaa";
        let edits = vec![
            TextEdit::replace(Span::new(8, 11), "zzz"),
            TextEdit::replace(Span::new(0, 3), "xxx"),
        ];
        assert_eq!(apply_edits(source, &edits).expect("Should apply"), "xxx bbb zzz");
    }

    #[test]
    fn test_apply_edits_dedup_and_insert() {
        let source = "hello";
        let edits = vec![
            TextEdit::replace(Span::new(0, 5), "world"),
            TextEdit::replace(Span::new(0, 5), "world"),
            TextEdit::insert(5, "!"),
        ];
        assert_eq!(apply_edits(source, &edits).expect("Should apply"), "world!");
    }

    #[test]
    fn test_apply_edits_overlap_error() {
        let edits = vec![TextEdit::delete(Span::new(0, 4)), TextEdit::delete(Span::new(2, 6))];
        let err = apply_edits("abcdefgh", &edits).unwrap_err();
        assert!(matches!(err, EditError::Overlapping { .. }));
        assert!(err.to_string().contains("overlapping edits"));
    }

    #[test]
    fn test_apply_edits_out_of_bounds() {
        let err = apply_edits("ab", &[TextEdit::delete(Span::new(1, 9))]).unwrap_err();
        assert!(matches!(err, EditError::OutOfBounds { len: 2, .. }));
    }

    #[test]
    fn test_chosen_fix() {
        let finding = Finding {
            rule: Rule::RefactorSwitch,
            file: "A.java".into(),
            span: Span::new(0, 1),
            message: "m".into(),
            fixes: vec![
                Fix::new(FixKind::Primary, "p", vec![]),
                Fix::new(FixKind::Secondary, "s", vec![]),
            ],
        };
        assert_eq!(finding.chosen_fix(false).map(|f| f.description.as_str()), Some("p"));
        assert_eq!(finding.chosen_fix(true).map(|f| f.description.as_str()), Some("s"));
    }

    #[test]
    fn test_apply_fixes_to_files_skips_overlap() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("A.java");
        let source = "int a; int b;";
        fs::write(&file, source).unwrap();
        let path = file.to_str().unwrap().to_string();

        let first = Fix::new(FixKind::Primary, "first", vec![TextEdit::replace(Span::new(0, 6), "long a;")]);
        let clash = Fix::new(FixKind::Primary, "clash", vec![TextEdit::delete(Span::new(4, 9))]);
        let second = Fix::new(FixKind::Primary, "second", vec![TextEdit::replace(Span::new(7, 13), "long b;")]);

        let summary = apply_fixes_to_files(&[FileFixes { path: &path, source, fixes: vec![&first, &clash, &second] }])
            .expect("Should apply");
        assert_eq!(summary, ApplySummary { files_modified: 1, fixes_applied: 2, fixes_skipped: 1 });
        assert_eq!(fs::read_to_string(&file).unwrap(), "long a; long b;");
    }

    #[test]
    fn test_select_fixes_interleaved_edits() {
        let outer = Fix::new(
            FixKind::Primary,
            "outer",
            vec![TextEdit::insert(0, "return "), TextEdit::replace(Span::new(20, 21), "};")],
        );
        let inner = Fix::new(FixKind::Primary, "inner", vec![TextEdit::replace(Span::new(8, 12), "x")]);
        let touching = Fix::new(FixKind::Primary, "touching", vec![TextEdit::insert(21, ";")]);
        assert_eq!(outer.span(), Some(Span::new(0, 21)));

        let (accepted, skipped) = select_fixes(&[&outer, &inner, &touching]);
        let names: Vec<_> = accepted.iter().map(|f| f.description.as_str()).collect();
        assert_eq!(names, vec!["outer", "inner"]);
        assert_eq!(skipped, 1);
    }

    #[test]
    fn test_apply_fixes_to_stdin_rejected() {
        let fix = Fix::new(FixKind::Primary, "f", vec![TextEdit::delete(Span::new(0, 1))]);
        let result = apply_fixes_to_files(&[FileFixes { path: "<stdin>", source: "x", fixes: vec![&fix] }]);
        assert!(matches!(result, Err(EditError::Io { .. })));
    }
}
