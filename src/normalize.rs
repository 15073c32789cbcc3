//! Conversion of posting HTML into clean prose text.
//!
//! HTML is first rendered as markdown without emphasis, images or link
//! targets, then passed through an ordered list of text rules. Each rule is
//! a pure function so it can be exercised on its own.

use std::sync::LazyLock;

use htmd::{Element, HtmlToMarkdown};
use regex::Regex;
use scraper::Html;

static RE_SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+").unwrap());
static RE_LINE_INDENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^ +").unwrap());
static RE_HEADING_MARKERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(?:[#>] *)+").unwrap());
static RE_ESCAPED_SIGN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\\([-+])").unwrap());
static RE_DIVIDER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]*[-_]{2,}[ \t]*").unwrap());
static RE_STRAY_CHAR_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^\S$").unwrap());
static RE_PARAGRAPH_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s+").unwrap());
static RE_ESCAPED_LIST_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\\\.").unwrap());

const BOM: char = '\u{feff}';

type Rule = fn(&str) -> String;

/// Text rules in application order.
const TEXT_RULES: [Rule; 10] = [
    collapse_spaces,
    strip_line_indent,
    strip_heading_markers,
    unescape_signs,
    remove_dividers,
    remove_stray_char_lines,
    normalize_paragraph_breaks,
    unescape_list_numbers,
    strip_bom,
    trim,
];

/// Converts an HTML fragment to clean plain text.
pub fn normalize(html: &str) -> String {
    normalize_text(&to_markdown(html))
}

/// Applies the text rules to already extracted text.
///
/// Sources that assemble their description from DOM text nodes themselves
/// call this directly instead of [`normalize`].
pub fn normalize_text(text: &str) -> String {
    TEXT_RULES
        .iter()
        .fold(text.to_owned(), |acc, rule| rule(&acc))
}

/// Renders HTML as markdown with emphasis markers, images and link targets
/// removed.
pub fn to_markdown(html: &str) -> String {
    let converter = HtmlToMarkdown::builder()
        .skip_tags(vec!["img", "script", "style", "svg"])
        .add_handler(vec!["a", "em", "i", "strong", "b"], |element: Element| {
            Some(element.content.to_owned())
        })
        .build();

    converter.convert(html).unwrap_or_else(|e| {
        log::warn!("markdown conversion failed, falling back to raw text: {}", e);
        let fragment = Html::parse_fragment(html);
        fragment.root_element().text().collect::<String>()
    })
}

pub fn collapse_spaces(text: &str) -> String {
    RE_SPACES.replace_all(text, " ").into_owned()
}

pub fn strip_line_indent(text: &str) -> String {
    RE_LINE_INDENT.replace_all(text, "").into_owned()
}

pub fn strip_heading_markers(text: &str) -> String {
    RE_HEADING_MARKERS.replace_all(text, "").into_owned()
}

pub fn unescape_signs(text: &str) -> String {
    RE_ESCAPED_SIGN.replace_all(text, "$1").into_owned()
}

/// Drops runs of `-`/`_` together with the blanks around them. A run
/// between two words leaves a single space behind.
pub fn remove_dividers(text: &str) -> String {
    RE_DIVIDER
        .replace_all(text, |caps: &regex::Captures| {
            let m = caps.get(0).map_or(0..0, |m| m.range());
            let before = text[..m.start].chars().next_back();
            let after = text[m.end..].chars().next();
            match (before, after) {
                (Some(b), Some(a)) if b != '\n' && a != '\n' => " ",
                _ => "",
            }
        })
        .into_owned()
}

pub fn remove_stray_char_lines(text: &str) -> String {
    RE_STRAY_CHAR_LINE.replace_all(text, "").into_owned()
}

pub fn normalize_paragraph_breaks(text: &str) -> String {
    RE_PARAGRAPH_BREAK.replace_all(text, "\n\n").into_owned()
}

pub fn unescape_list_numbers(text: &str) -> String {
    RE_ESCAPED_LIST_NUMBER.replace_all(text, "$1.").into_owned()
}

pub fn strip_bom(text: &str) -> String {
    text.strip_prefix(BOM).unwrap_or(text).to_owned()
}

pub fn trim(text: &str) -> String {
    text.trim().to_owned()
}
