//! Markdown helpers for editor input and text previews.
//!
//! # Responsibility
//! - Convert rich-text editor HTML into Markdown before it reaches the store.
//! - Produce short plain previews for list output.
//!
//! # Invariants
//! - Text without HTML tags passes through unchanged apart from trimming.
//! - Conversion never fails; unknown tags are stripped.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static HTML_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"</?[a-zA-Z][^>]*>").expect("valid html tag regex"));
static BREAK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").expect("valid break regex"));
static PRE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<pre[^>]*>(.*?)</pre>").expect("valid pre regex"));
static CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<code[^>]*>(.*?)</code>").expect("valid code regex"));
static HEADING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<h([1-6])[^>]*>(.*?)</h[1-6]>").expect("valid heading regex")
});
static LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<a\s[^>]*href="([^"]*)"[^>]*>(.*?)</a>"#).expect("valid link regex")
});
static STRONG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)</?(?:strong|b)(?:\s[^>]*)?>").expect("valid strong regex")
});
static EMPHASIS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</?(?:em|i)(?:\s[^>]*)?>").expect("valid emphasis regex"));
static LIST_ITEM_OPEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<li(?:\s[^>]*)?>").expect("valid list item regex"));
static LIST_ITEM_CLOSE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</li>").expect("valid list item close regex"));
static PARAGRAPH_CLOSE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</p>").expect("valid paragraph regex"));
static EXCESS_NEWLINES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("valid newline regex"));

/// Returns whether `content` contains at least one HTML tag.
pub fn looks_like_html(content: &str) -> bool {
    HTML_TAG_RE.is_match(content)
}

/// Converts editor HTML to Markdown.
///
/// Handles paragraphs, line breaks, headings, bold/italic, links, list items,
/// inline code and `<pre>` blocks; any other tag is dropped and entities are
/// unescaped. Three or more consecutive newlines collapse to two.
pub fn html_to_markdown(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }

    let text = BREAK_RE.replace_all(html, "\n");
    let text = PRE_RE.replace_all(&text, "```\n$1\n```");
    let text = CODE_RE.replace_all(&text, "`$1`");
    let text = HEADING_RE.replace_all(&text, |caps: &Captures<'_>| {
        let level = caps[1].parse::<usize>().unwrap_or(1);
        format!("{} {}\n\n", "#".repeat(level), caps[2].trim())
    });
    let text = LINK_RE.replace_all(&text, "[$2]($1)");
    let text = STRONG_RE.replace_all(&text, "**");
    let text = EMPHASIS_RE.replace_all(&text, "*");
    let text = LIST_ITEM_OPEN_RE.replace_all(&text, "- ");
    let text = LIST_ITEM_CLOSE_RE.replace_all(&text, "\n");
    let text = PARAGRAPH_CLOSE_RE.replace_all(&text, "\n\n");
    let text = HTML_TAG_RE.replace_all(&text, "");
    let text = unescape_entities(&text);
    let text = EXCESS_NEWLINES_RE.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// Converts `content` only when it contains HTML; otherwise returns it as is.
pub fn normalize_editor_content(content: &str) -> String {
    if looks_like_html(content) {
        html_to_markdown(content)
    } else {
        content.to_string()
    }
}

/// First `max_chars` characters, with `...` appended when truncated.
pub fn preview(content: &str, max_chars: usize) -> String {
    let mut truncated = content.chars().take(max_chars).collect::<String>();
    if content.chars().count() > max_chars {
        truncated.push_str("...");
    }
    truncated
}

fn unescape_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
