//! Comment selection for rewritten constructs
//!
//! Comments are opaque tokens. A rewrite either copies a source range that
//! contains them, or picks them up here and re-emits their text next to the
//! arm they belonged to.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::tree::{Comment, Span};

static FALL_THROUGH: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bfalls?.?(through|out)\b").unwrap());

/// Regions containing this marker hold lint directives and keep their comments.
pub const LINT_MARKER: &str = "LINT.";

/// Comments lying entirely inside `range`, in source order.
pub fn comments_in(comments: &[Comment], range: Span) -> Vec<&Comment> {
    comments.iter().filter(|c| range.contains(c.span)).collect()
}

/// Comments inside `range` that none of the copied `printed` spans carry.
pub fn orphans<'c>(comments: &'c [Comment], range: Span, printed: &[Span]) -> Vec<&'c Comment> {
    comments
        .iter()
        .filter(|c| range.contains(c.span))
        .filter(|c| !printed.iter().any(|p| p.contains(c.span)))
        .collect()
}

pub fn is_fall_through(text: &str) -> bool {
    FALL_THROUGH.is_match(text)
}

/// Drop the lines of a comment that only say the case falls through.
/// Returns an empty string when nothing is left.
pub fn strip_fall_through_lines(text: &str) -> String {
    let kept: Vec<&str> = text.lines().filter(|line| !is_fall_through(line)).collect();
    let joined = kept.join("\n");
    match joined.trim() {
        "" | "//" | "/*" | "*/" | "/* */" | "/**/" => String::new(),
        _ => joined,
    }
}

/// Text of each comment with fall-through lines removed, empty ones skipped.
pub fn render_filtered(comments: &[&Comment]) -> Vec<String> {
    comments
        .iter()
        .map(|c| strip_fall_through_lines(&c.text))
        .filter(|t| !t.is_empty())
        .collect()
}

pub fn render(comments: &[&Comment]) -> Vec<String> {
    comments.iter().map(|c| c.text.clone()).collect()
}

pub fn has_lint_marker(text: &str) -> bool {
    text.contains(LINT_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::CommentKind;

    fn comment(start: usize, text: &str) -> Comment {
        Comment { span: Span::new(start, start + text.len()), kind: CommentKind::Line, text: text.to_string() }
    }

    #[test]
    fn test_fall_through_detection() {
        assert!(is_fall_through("// fall through"));
        assert!(is_fall_through("// Falls-through"));
        assert!(is_fall_through("// FALL_OUT"));
        assert!(is_fall_through("/* fallthrough */"));
        assert!(is_fall_through("// falls out of the case"));
        assert!(!is_fall_through("// fallback value"));
        assert!(!is_fall_through("// fall thru"));
        assert!(!is_fall_through("// falling through"));
    }

    #[test]
    fn test_strip_fall_through_lines() {
        assert_eq!(strip_fall_through_lines("// fall through"), "");
        assert_eq!(strip_fall_through_lines("/* keep\n   falls through\n*/"), "/* keep\n*/");
    }

    #[test]
    fn test_orphans_excludes_printed() {
        let comments = vec![comment(0, "// a"), comment(10, "// b"), comment(30, "// c")];
        let found = orphans(&comments, Span::new(0, 40), &[Span::new(8, 20)]);
        let texts: Vec<&str> = found.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["// a", "// c"]);
    }

    #[test]
    fn test_comments_in_range() {
        let comments = vec![comment(0, "// a"), comment(10, "// b")];
        assert_eq!(comments_in(&comments, Span::new(5, 20)).len(), 1);
        assert!(has_lint_marker("// LINT.IfChange"));
    }
}
