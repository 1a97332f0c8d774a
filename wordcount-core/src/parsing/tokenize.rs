use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::Result;

/// Splits document content into an ordered sequence of tokens.
///
/// Implementations must be pure: tokenizing the same content twice yields the
/// same tokens. They run on the blocking pool, so they may be CPU heavy.
pub trait Tokenizer: Send + Sync + fmt::Debug {
    fn tokenize(&self, content: &str) -> Result<Vec<String>>;
}

const SEPARATORS: [char; 4] = [' ', '\n', '\r', '\t'];

/// Splits on spaces, newlines, carriage returns and tabs. Case is preserved.
#[derive(Clone, Copy, Debug, Default)]
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn tokenize(&self, content: &str) -> Result<Vec<String>> {
        Ok(split_words(content))
    }
}

fn split_words(content: &str) -> Vec<String> {
    content
        .split(SEPARATORS)
        .filter(|word| !word.is_empty())
        .map(str::to_owned)
        .collect()
}

static SCRIPT_OR_STYLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)\s*>")
        .expect("script/style regex should compile")
});

static COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").expect("comment regex should compile"));

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("tag regex should compile"));

/// Extracts visible text from an HTML page before splitting on whitespace.
///
/// Script and style bodies, comments and tags are dropped; the handful of
/// entities that routinely show up in body text are decoded.
#[derive(Clone, Copy, Debug, Default)]
pub struct HtmlTextTokenizer;

impl HtmlTextTokenizer {
    pub fn visible_text(&self, html: &str) -> String {
        let without_code = SCRIPT_OR_STYLE.replace_all(html, " ");
        let without_comments = COMMENT.replace_all(&without_code, " ");
        let text = TAG.replace_all(&without_comments, " ");
        decode_entities(&text)
    }
}

impl Tokenizer for HtmlTextTokenizer {
    fn tokenize(&self, content: &str) -> Result<Vec<String>> {
        Ok(split_words(&self.visible_text(content)))
    }
}

fn decode_entities(text: &str) -> String {
    // &amp; last so "&amp;lt;" stays "&lt;"
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
