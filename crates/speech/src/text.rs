//! Turning LLM output into something a speech engine can read.

use regex_lite::Regex;
use std::sync::LazyLock;

/// Markup patterns and what to replace them with, applied in order.
static MARKUP: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"(?s)```[a-zA-Z0-9_-]*\n?(.*?)```", "$1"),
        (r"\[([^\]]+)\]\([^)]*\)", "$1"),
        (r"(?m)^\s{0,3}#{1,6}\s*", ""),
        (r"(?m)^\s*(?:[-*+]|\d+[.)])\s+", ""),
        (r"[*`~]+", ""),
        (r"_+", " "),
        (r"<[^>]*>", ""),
    ]
    .into_iter()
    .filter_map(|(pattern, replacement)| Regex::new(pattern).ok().map(|re| (re, replacement)))
    .collect()
});

const SYMBOLS: &[(&str, &str)] = &[
    ("°C", " degrees Celsius"),
    ("°F", " degrees Fahrenheit"),
    ("°", " degrees"),
    ("%", " percent"),
    ("&", " and "),
    ("ft/min", " feet per minute"),
    ("fpm", " feet per minute"),
    ("kts", " knots"),
    ("→", " to "),
    ("≈", " about "),
];

/// Strip markdown and HTML, spell out symbols and collapse whitespace.
pub fn clean_for_speech(text: &str) -> String {
    let mut cleaned = text.to_string();
    for (re, replacement) in MARKUP.iter() {
        cleaned = re.replace_all(&cleaned, *replacement).into_owned();
    }
    for (symbol, words) in SYMBOLS {
        cleaned = cleaned.replace(symbol, words);
    }
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split text into sentences on `.`, `!` or `?` followed by whitespace.
///
/// Decimal points ("12.5") do not split because no whitespace follows them.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        let at_boundary = matches!(c, '.' | '!' | '?')
            && chars.peek().is_none_or(|next| next.is_whitespace());
        if at_boundary {
            push_trimmed(&mut sentences, &current);
            current.clear();
        }
    }
    push_trimmed(&mut sentences, &current);
    sentences
}

fn push_trimmed(out: &mut Vec<String>, s: &str) {
    let s = s.trim();
    if !s.is_empty() {
        out.push(s.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_is_removed() {
        let text = "## Status\n- **Altitude**: 6500 ft\n- see [the chart](http://x.y)\n`code`";
        assert_eq!(
            clean_for_speech(text),
            "Status Altitude: 6500 ft see the chart code"
        );
    }

    #[test]
    fn symbols_are_spelled_out() {
        assert_eq!(
            clean_for_speech("Oil at 152°C, fuel 85% & climbing 700 ft/min"),
            "Oil at 152 degrees Celsius, fuel 85 percent and climbing 700 feet per minute"
        );
    }

    #[test]
    fn html_and_fences_removed() {
        assert_eq!(clean_for_speech("<b>Hold</b> ```\nheading 270\n```"), "Hold heading 270");
    }

    #[test]
    fn sentences_split_on_terminators() {
        let parts = split_sentences("Airspeed is 92.5 knots. Climbing! Need anything else?  ");
        assert_eq!(parts, vec!["Airspeed is 92.5 knots.", "Climbing!", "Need anything else?"]);
    }

    #[test]
    fn unterminated_tail_is_kept() {
        assert_eq!(split_sentences("one. two"), vec!["one.", "two"]);
        assert!(split_sentences("   ").is_empty());
    }
}
