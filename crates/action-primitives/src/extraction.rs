//! Structured extraction collaborator contract

use crate::errors::ActionError;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

/// Turns page markup into text that answers a natural-language goal.
///
/// Implementations may call out to a language model; any failure is reported
/// as [`ActionError::Extraction`] and the caller degrades to a raw excerpt.
#[async_trait]
pub trait StructuredExtractor: Send + Sync {
    async fn extract(&self, goal: &str, page_markup: &str) -> Result<String, ActionError>;
}

static HIDDEN_BLOCKS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(script|style|noscript|template|svg)\b[^>]*>.*?</(script|style|noscript|template|svg)\s*>")
        .expect("valid block regex")
});
static COMMENTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid comment regex"));
static TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]+>").expect("valid tag regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid space regex"));

/// Visible text of a markup document, whitespace-collapsed.
pub fn markup_to_text(markup: &str) -> String {
    let without_blocks = HIDDEN_BLOCKS.replace_all(markup, " ");
    let without_comments = COMMENTS.replace_all(&without_blocks, " ");
    let text = TAGS.replace_all(&without_comments, " ");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}

/// First `max_chars` characters of the page text.
pub fn content_excerpt(markup: &str, max_chars: usize) -> String {
    let text = markup_to_text(markup);
    if text.chars().count() <= max_chars {
        return text;
    }
    let mut excerpt: String = text.chars().take(max_chars).collect();
    excerpt.push('…');
    excerpt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_scripts_and_tags() {
        let html = "<html><head><style>p{}</style><script>var a = '<b>';</script></head>\
                    <body><h1>Orders</h1><!-- hidden --><p>Total:&nbsp;<b>42</b></p></body></html>";
        assert_eq!(markup_to_text(html), "Orders Total: 42");
    }

    #[test]
    fn excerpt_truncates_on_char_boundary() {
        let excerpt = content_excerpt("<p>héllo wörld</p>", 5);
        assert_eq!(excerpt, "héllo…");
    }
}
