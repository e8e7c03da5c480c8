//! Source text utilities
//!
//! Offset/position conversion, line lookup and indentation helpers shared
//! by the rewrite emitter and the reporters.

/// Convert a byte offset to a 1-based (line, column) pair. Columns count
/// bytes, matching tree-sitter positions + 1.
pub fn offset_to_position(source: &str, offset: usize) -> (u32, u32) {
    let offset = offset.min(source.len());
    let before = &source.as_bytes()[..offset];
    let line = before.iter().filter(|b| **b == b'\n').count() as u32 + 1;
    let line_start = before.iter().rposition(|b| *b == b'\n').map(|i| i + 1).unwrap_or(0);
    (line, (offset - line_start) as u32 + 1)
}

/// Convert line and column (1-based) to byte offset in source
pub fn position_to_offset(source: &str, line: u32, column: u32) -> usize {
    let mut current_line = 1u32;
    let mut line_start = 0usize;
    if line > 1 {
        for (i, byte) in source.bytes().enumerate() {
            if byte == b'\n' {
                current_line += 1;
                if current_line == line {
                    line_start = i + 1;
                    break;
                }
            }
        }
        if current_line != line {
            return source.len();
        }
    }
    (line_start + (column as usize).saturating_sub(1)).min(source.len())
}

/// Offset of the first byte of the line containing `offset`.
pub fn line_start(source: &str, offset: usize) -> usize {
    let offset = offset.min(source.len());
    source.as_bytes()[..offset]
        .iter()
        .rposition(|b| *b == b'\n')
        .map(|i| i + 1)
        .unwrap_or(0)
}

/// Offset of the `\n` ending the line containing `offset` (or the end of
/// the source).
pub fn line_end(source: &str, offset: usize) -> usize {
    let offset = offset.min(source.len());
    source[offset..].find('\n').map(|i| offset + i).unwrap_or(source.len())
}

/// Leading whitespace of the line containing `offset`.
pub fn indent_at(source: &str, offset: usize) -> &str {
    let start = line_start(source, offset);
    let rest = &source[start..];
    let len = rest.len() - rest.trim_start_matches([' ', '\t']).len();
    &rest[..len]
}

/// True if only whitespace precedes `offset` on its line.
pub fn is_first_on_line(source: &str, offset: usize) -> bool {
    let start = line_start(source, offset);
    source[start..offset.min(source.len())].trim().is_empty()
}

/// The indentation step used by a file: a tab, or the smallest positive
/// run of leading spaces clamped to 2..=8. Defaults to four spaces.
pub fn detect_indent_unit(source: &str) -> String {
    let mut smallest: Option<usize> = None;
    for line in source.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if line.starts_with('\t') {
            return "\t".to_string();
        }
        let spaces = line.len() - line.trim_start_matches(' ').len();
        if spaces > 0 && !line.trim_start().starts_with('*') {
            smallest = Some(smallest.map_or(spaces, |s| s.min(spaces)));
        }
    }
    " ".repeat(smallest.unwrap_or(4).clamp(2, 8))
}

/// Re-indent a multi-line snippet: the first line is kept as is, later
/// lines have the `from` prefix replaced by `to`. Lines not starting with
/// `from` keep their text with leading whitespace stripped and `to` added.
pub fn reindent(text: &str, from: &str, to: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
            if line.trim().is_empty() {
                continue;
            }
            match line.strip_prefix(from) {
                Some(rest) => {
                    out.push_str(to);
                    out.push_str(rest);
                }
                None => {
                    out.push_str(to);
                    out.push_str(line.trim_start());
                }
            }
        } else {
            out.push_str(line);
        }
    }
    out
}

/// Get full source lines for a range (inclusive of start and end lines)
pub fn get_source_lines(source: &str, start_line: u32, end_line: u32) -> Vec<String> {
    if start_line == 0 || end_line == 0 || start_line > end_line {
        return Vec::new();
    }

    let lines: Vec<&str> = source.lines().collect();
    let start_idx = (start_line as usize).saturating_sub(1);
    let end_idx = (end_line as usize).min(lines.len());

    if start_idx >= lines.len() {
        return Vec::new();
    }

    lines[start_idx..end_idx].iter().map(|s| s.to_string()).collect()
}

/// Source text with comments and whitespace removed, for token-level
/// comparison of expressions.
pub fn strip_trivia(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                let quote = bytes[i];
                let start = i;
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
                i = (i + 1).min(bytes.len());
                out.push_str(&text[start..i]);
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                i = (i + 2).min(bytes.len());
            }
            b if b.is_ascii_whitespace() => i += 1,
            _ => {
                let start = i;
                i += 1;
                while i < bytes.len() && !text.is_char_boundary(i) {
                    i += 1;
                }
                out.push_str(&text[start..i]);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_position_round_trip_points() {
        let source = "hello\nworld\ntest";
        assert_eq!(offset_to_position(source, 0), (1, 1));
        assert_eq!(offset_to_position(source, 5), (1, 6));
        assert_eq!(offset_to_position(source, 6), (2, 1));
        assert_eq!(offset_to_position(source, 12), (3, 1));
        assert_eq!(position_to_offset(source, 2, 6), 11);
        assert_eq!(position_to_offset(source, 3, 1), 12);
        assert_eq!(position_to_offset(source, 9, 1), source.len());
    }

    #[test]
    fn test_line_helpers() {
        let source = "class A {\n    int x;\n}";
        let x = source.find("int").expect("Should find int");
        assert_eq!(line_start(source, x), 10);
        assert_eq!(indent_at(source, x), "    ");
        assert!(is_first_on_line(source, x));
        assert!(!is_first_on_line(source, x + 4));
        assert_eq!(&source[x..line_end(source, x)], "int x;");
    }

    #[test]
    fn test_detect_indent_unit() {
        assert_eq!(detect_indent_unit("class A {\n  int x;\n    int y;\n}"), "  ");
        assert_eq!(detect_indent_unit("class A {\n\tint x;\n}"), "\t");
        assert_eq!(detect_indent_unit("class A {}"), "    ");
    }

    #[test]
    fn test_reindent() {
        let text = "{\n        a();\n    }";
        assert_eq!(reindent(text, "    ", "      "), "{\n          a();\n      }");
    }

    #[test]
    fn test_strip_trivia() {
        assert_eq!(strip_trivia("a . b ( /* c */ x )"), "a.b(x)");
        assert_eq!(strip_trivia("s.equals(\"a b\") // tail"), "s.equals(\"a b\")");
    }

    #[test]
    fn test_get_source_lines() {
        let source = "line1\nline2\nline3\nline4";
        assert_eq!(get_source_lines(source, 2, 3), vec!["line2", "line3"]);
        assert_eq!(get_source_lines(source, 0, 2), Vec::<String>::new());
    }
}
