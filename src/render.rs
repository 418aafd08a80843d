//! Question HTML to terminal text.
//!
//! Contest files carry the question body as HTML with MathJax spans
//! (`<span class="math inline">\(x^2\)</span>`). The terminal has no math
//! renderer, so math is shown as its LaTeX source without delimiters.

use regex::{Captures, Regex};
use std::sync::LazyLock;

static LIST_ITEM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"</?li>").unwrap());
static LINE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>|</p>|</div>|</ol>|</ul>").unwrap());
static MATH_SPAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<span class="math (?:inline|display)">(.*?)</span>"#).unwrap()
});
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static NAMED_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(nbsp|amp|quot|lt|gt);").unwrap());
static NUMERIC_ENTITY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"&#(\d+);").unwrap());
static BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n[ \t]*(\n[ \t]*)+").unwrap());

pub fn decode_entities(text: &str) -> String {
    let named = NAMED_ENTITY.replace_all(text, |caps: &Captures| {
        match &caps[1] {
            "nbsp" => " ",
            "amp" => "&",
            "quot" => "\"",
            "lt" => "<",
            _ => ">",
        }
        .to_string()
    });
    NUMERIC_ENTITY
        .replace_all(&named, |caps: &Captures| {
            caps[1]
                .parse::<u32>()
                .ok()
                .and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_default()
        })
        .into_owned()
}

fn strip_math_delimiters(latex: &str) -> String {
    latex
        .replace("\\(", "")
        .replace("\\)", "")
        .replace("\\[", "")
        .replace("\\]", "")
}

pub fn to_plain_text(html: &str) -> String {
    let html = html.replace("\\mbox", "");
    let html = LIST_ITEM.replace_all(&html, "");
    // Math stays entity-encoded until the tags are gone.
    let html = MATH_SPAN.replace_all(&html, |caps: &Captures| strip_math_delimiters(&caps[1]));
    let html = LINE_BREAK.replace_all(&html, "\n");
    let text = TAG.replace_all(&html, "");
    let text = decode_entities(&text);
    let text = BLANK_LINES.replace_all(&text, "\n\n");
    text.trim().to_string()
}

pub fn answer_text(answer: &str) -> String {
    if answer.contains("img") {
        return "[image]".to_string();
    }
    let answer = answer.replace("\\mbox", "\\text");
    let answer = answer.replace("\\(", "").replace("\\)", "");
    decode_entities(&TAG.replace_all(&answer, "")).trim().to_string()
}
