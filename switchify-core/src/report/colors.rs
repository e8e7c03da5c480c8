//! ANSI color support for terminal output

/// ANSI color codes
pub mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const CYAN: &str = "\x1b[36m";
}

/// Determine if color should be used based on mode and environment
pub fn should_use_color(mode: &str) -> bool {
    match mode {
        "always" => true,
        "never" => false,
        _ => stdout_is_tty() && std::env::var("NO_COLOR").is_err(),
    }
}

#[cfg(feature = "native")]
fn stdout_is_tty() -> bool {
    atty::is(atty::Stream::Stdout)
}

#[cfg(not(feature = "native"))]
fn stdout_is_tty() -> bool {
    false
}

/// Wrap `text` in `code` when color is on.
pub fn paint(text: &str, code: &str, use_color: bool) -> String {
    if use_color {
        format!("{}{}{}", code, text, ansi::RESET)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_modes() {
        assert!(should_use_color("always"));
        assert!(!should_use_color("never"));
    }

    #[test]
    fn test_paint() {
        assert_eq!(paint("x", ansi::RED, false), "x");
        assert_eq!(paint("x", ansi::RED, true), "\x1b[31mx\x1b[0m");
    }
}
