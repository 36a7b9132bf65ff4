//! Plain-text rendering of the markdown stored on task fields.

use std::sync::LazyLock;

use regex::Regex;

struct Rule {
    pattern: Regex,
    replacement: &'static str,
}

fn rule(pattern: &str, replacement: &'static str) -> Rule {
    Rule {
        pattern: Regex::new(pattern).expect("markdown pattern is valid"),
        replacement,
    }
}

/// Applied in order. Line markers go first so list bullets are not read as emphasis.
/// Emphasised text must touch its markers, as in `*word*`; `2 * 3 * 4` stays.
static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        rule(r"(?m)^[ \t]*(?:#{1,6}[ \t]+|>[ \t]?|[-*+][ \t]+|\d+\.[ \t]+)", ""),
        rule(r"!\[([^\]]*)\]\([^)]*\)", "$1"),
        rule(r"\[([^\]]*)\]\([^)]*\)", "$1"),
        rule(r"`([^`]*)`", "$1"),
        rule(r"\*\*(\S(?:.*?\S)?)\*\*", "$1"),
        rule(r"__(\S(?:.*?\S)?)__", "$1"),
        rule(r"\*(\S(?:.*?\S)?)\*", "$1"),
        rule(r"~~(\S(?:.*?\S)?)~~", "$1"),
        rule(r"(?m)[ \t]+$", ""),
    ]
});

/// Strips markdown syntax, keeping the visible text.
/// Single underscores are left alone since they are common in identifiers.
pub fn clear(markdown: &str) -> String {
    let mut text = markdown.to_string();
    for rule in RULES.iter() {
        text = rule
            .pattern
            .replace_all(&text, rule.replacement)
            .into_owned();
    }
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_keep_their_text() {
        assert_eq!(clear("[report.pdf](https://cdn/report.pdf)"), "report.pdf");
        assert_eq!(clear("see ![logo](https://cdn/logo.png) here"), "see logo here");
    }

    #[test]
    fn emphasis_and_code_markers_are_removed() {
        assert_eq!(
            clear("**bold** and *italic* with `code` and ~~gone~~"),
            "bold and italic with code and gone"
        );
        assert_eq!(clear("*a* and **two words**"), "a and two words");
    }

    #[test]
    fn line_markers_are_removed() {
        assert_eq!(clear("# Title\n> quote\n- one\n2. two  "), "Title\nquote\none\ntwo");
    }

    #[test]
    fn plain_text_is_untouched() {
        assert_eq!(clear("due_date is 5 * 3"), "due_date is 5 * 3");
        assert_eq!(clear("2 * 3 * 4"), "2 * 3 * 4");
        assert_eq!(clear(""), "");
    }
}
