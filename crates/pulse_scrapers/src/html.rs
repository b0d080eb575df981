//! Markup helpers shared by the Telegram scraper and the Hacker News adapter.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref BREAK: Regex = Regex::new(r"(?i)<br\s*/?>|</?p\s*>|<p\s[^>]*>").unwrap();
    static ref TAG: Regex = Regex::new(r"<[^>]+>").unwrap();
    static ref NUMERIC_ENTITY: Regex = Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").unwrap();
    static ref SPACES: Regex = Regex::new(r"[ \t\u{a0}]+").unwrap();
}

/// Turns a fragment of HTML into plain text, one paragraph per line.
pub fn clean_text(html: &str) -> String {
    let text = BREAK.replace_all(html, "\n");
    let text = TAG.replace_all(&text, "");
    let text = decode_entities(&text);
    let text: String = text.chars().filter(|c| !is_pictograph(*c)).collect();

    text.lines()
        .map(|line| SPACES.replace_all(line, " ").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn decode_entities(text: &str) -> String {
    let text = NUMERIC_ENTITY.replace_all(text, |caps: &regex::Captures| {
        let raw = &caps[1];
        let code = match raw.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => raw.parse::<u32>().ok(),
        };
        code.and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });

    // &amp; goes last so "&amp;lt;" stays "&lt;"
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

fn is_pictograph(c: char) -> bool {
    ('\u{1F300}'..='\u{1F9FF}').contains(&c)
}

/// Cuts at a char boundary.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
