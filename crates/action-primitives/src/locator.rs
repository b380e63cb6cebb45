//! Locator expression helpers
//!
//! A locator is either a CSS selector or an XPath expression carrying the
//! `xpath=` prefix. Builders here quote values so they survive any label text.

use once_cell::sync::Lazy;
use regex::Regex;

pub const XPATH_PREFIX: &str = "xpath=";

static CSS_IDENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?[_a-zA-Z][_a-zA-Z0-9-]*$").expect("valid ident regex"));

static CSS_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\[([a-zA-Z_:-][\w:-]*)\s*=\s*(?:"((?:[^"\\]|\\.)*)"|'((?:[^'\\]|\\.)*)'|([^\]\s]+))\]"#)
        .expect("valid attribute regex")
});

pub fn is_xpath(locator: &str) -> bool {
    locator.starts_with(XPATH_PREFIX)
}

pub fn is_css_ident(value: &str) -> bool {
    CSS_IDENT.is_match(value)
}

fn escape_css_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// `[name="value"]` with the value quoted.
pub fn css_attr(name: &str, value: &str) -> String {
    format!("[{}=\"{}\"]", name, escape_css_string(value))
}

/// `#id` when the id is a plain identifier, otherwise an attribute selector.
pub fn css_id(id: &str) -> String {
    if is_css_ident(id) {
        format!("#{}", id)
    } else {
        css_attr("id", id)
    }
}

/// Quote text as an XPath string literal, falling back to `concat()` for mixed quotes.
pub fn xpath_literal(text: &str) -> String {
    if !text.contains('"') {
        return format!("\"{}\"", text);
    }
    if !text.contains('\'') {
        return format!("'{}'", text);
    }
    let parts: Vec<String> = text
        .split('"')
        .map(|part| format!("\"{}\"", part))
        .collect();
    format!("concat({})", parts.join(", '\"', "))
}

/// Elements of `tag` whose normalized text contains `text`.
pub fn text_contains_xpath(tag: &str, text: &str) -> String {
    format!(
        "{}//{}[contains(normalize-space(.), {})]",
        XPATH_PREFIX,
        tag,
        xpath_literal(text)
    )
}

/// Elements of `tag` whose normalized text equals `text`.
pub fn text_equals_xpath(tag: &str, text: &str) -> String {
    format!(
        "{}//{}[normalize-space(.)={}]",
        XPATH_PREFIX,
        tag,
        xpath_literal(text)
    )
}

pub fn attr_xpath(tag: &str, attr: &str, value: &str) -> String {
    format!(
        "{}//{}[@{}={}]",
        XPATH_PREFIX,
        tag,
        attr,
        xpath_literal(value)
    )
}

/// The `<label for=..>` pointing at an element id.
pub fn label_for(id: &str) -> String {
    format!("label{}", css_attr("for", id))
}

/// A specific option within a radio group.
pub fn radio_option(group: &str, value: &str) -> String {
    format!(
        "input[type=\"radio\"]{}{}",
        css_attr("name", group),
        css_attr("value", value)
    )
}

/// First `[attr=value]` in a CSS locator.
pub fn attr_value(locator: &str, attr: &str) -> Option<String> {
    if is_xpath(locator) {
        return None;
    }
    CSS_ATTR.captures_iter(locator).find_map(|caps| {
        if &caps[1] != attr {
            return None;
        }
        caps.get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map(|m| m.as_str().replace("\\\"", "\"").replace("\\\\", "\\"))
    })
}

/// `#id` at the start of a CSS locator.
pub fn id_of(locator: &str) -> Option<String> {
    let rest = locator.strip_prefix('#')?;
    let end = rest
        .find(|c: char| !(c.is_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(rest.len());
    (end > 0).then(|| rest[..end].to_string())
}

/// Locator shape suggests a button or submit control.
pub fn looks_like_button(locator: &str) -> bool {
    let lower = locator.to_ascii_lowercase();
    lower.starts_with("button")
        || lower.starts_with("xpath=//button")
        || lower.contains("[role=\"button\"]")
        || matches!(
            attr_value(locator, "type").as_deref(),
            Some("submit") | Some("button") | Some("reset")
        ) && lower.starts_with("input")
}

/// `radio` or `checkbox` when the locator pins the input type.
pub fn toggle_kind(locator: &str) -> Option<&'static str> {
    match attr_value(locator, "type").as_deref() {
        Some("radio") => Some("radio"),
        Some("checkbox") => Some("checkbox"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_fall_back_to_attribute_form() {
        assert_eq!(css_id("email"), "#email");
        assert_eq!(css_id("user.email"), "[id=\"user.email\"]");
        assert_eq!(css_id("2fa"), "[id=\"2fa\"]");
    }

    #[test]
    fn xpath_literal_handles_quotes() {
        assert_eq!(xpath_literal("Save"), "\"Save\"");
        assert_eq!(xpath_literal("Say \"hi\""), "'Say \"hi\"'");
        assert_eq!(
            xpath_literal("it's \"x\""),
            "concat(\"it's \", '\"', \"x\", '\"', \"\")"
        );
    }

    #[test]
    fn attribute_extraction() {
        let loc = "input[name=\"frequency\"][type=\"radio\"][value=\"weekly\"]";
        assert_eq!(attr_value(loc, "name").as_deref(), Some("frequency"));
        assert_eq!(attr_value(loc, "value").as_deref(), Some("weekly"));
        assert_eq!(toggle_kind(loc), Some("radio"));
        assert_eq!(attr_value("xpath=//a[@name=\"x\"]", "name"), None);
        assert_eq!(id_of("#save-btn.primary").as_deref(), Some("save-btn"));
    }

    #[test]
    fn button_shapes() {
        assert!(looks_like_button("button.primary"));
        assert!(looks_like_button("input[type=\"submit\"]"));
        assert!(!looks_like_button("input[type=\"text\"]"));
        assert!(!looks_like_button("#submit"));
    }
}
