//! Markup formatter for explanations.
//!
//! The agent answers in a light markdown dialect. Only three constructs are
//! rendered: `**bold**` spans, lines starting with `* ` (bullets) and line
//! breaks. Everything else passes through untouched.

use regex::Regex;
use std::sync::OnceLock;

fn bold_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*\*(.*?)\*\*").expect("valid bold regex"))
}

fn bullet_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\* (.*)$").expect("valid bullet regex"))
}

/// Format an explanation for display.
pub fn format_explanation(text: &str) -> String {
    let bolded = bold_re().replace_all(text, "<strong>$1</strong>");
    let bulleted = bullet_re().replace_all(&bolded, "• $1");
    bulleted.replace('\n', "<br>")
}

/// Escape text that is shown verbatim rather than as markup.
pub(crate) fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bold_bullet_and_breaks() {
        let out = format_explanation("**Paris** is the capital.\n* It is in France.");
        assert!(out.contains("<strong>Paris</strong> is the capital.<br>• It is in France."));
    }

    #[test]
    fn test_plain_text_unchanged() {
        assert_eq!(format_explanation("no markers here"), "no markers here");
        assert_eq!(format_explanation("line one\nline two"), "line one<br>line two");
    }

    #[test]
    fn test_bold_does_not_span_lines() {
        assert_eq!(format_explanation("**a\nb**"), "**a<br>b**");
    }

    #[test]
    fn test_bullet_only_at_line_start() {
        assert_eq!(format_explanation("a * b"), "a * b");
        assert_eq!(format_explanation("x\n* one\n* two"), "x<br>• one<br>• two");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<a href=\"x\">&</a>"), "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;");
    }

    #[test]
    fn test_non_greedy_bold() {
        assert_eq!(
            format_explanation("**a** and **b**"),
            "<strong>a</strong> and <strong>b</strong>"
        );
    }
}
