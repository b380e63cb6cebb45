//! In-memory page implementing [`BrowserBackend`] for tests.
//!
//! The page holds a flat list of elements. Locators are matched with a small
//! subset of CSS (compound selectors: tag, `#id`, `.class`, `[attr=value]`,
//! comma groups) and the `//tag[...]` XPath forms the indexer emits. Every
//! mutating call is recorded in an operation log so tests can count clicks,
//! toggles and navigations.

use crate::{
    backend::BrowserBackend,
    errors::ActionError,
    locator::XPATH_PREFIX,
    types::{ElementProbe, RawContainer, RawElement},
};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

const INTERACTIVE_ROLES: &[&str] = &[
    "button", "link", "textbox", "combobox", "listbox", "radio", "checkbox",
];

/// Side effect triggered when an element is clicked.
#[derive(Clone, Debug, PartialEq)]
pub enum FakeEffect {
    Navigate { url: String, title: String },
    SetTitle(String),
    RemoveSelf,
    RemoveId(String),
    Insert(FakeElement),
    ShowValidation(String),
    ClearValidation,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FakeElement {
    pub tag: String,
    pub attrs: BTreeMap<String, String>,
    pub text: String,
    pub label: Option<String>,
    pub container: Option<RawContainer>,
    pub visible: bool,
    pub disabled: bool,
    pub checked: bool,
    pub value: String,
    pub options: Vec<String>,
    pub on_click: Vec<FakeEffect>,
    pub on_press: Vec<FakeEffect>,
    pub accepts_input: bool,
    pub removed: bool,
}

impl FakeElement {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: BTreeMap::new(),
            text: String::new(),
            label: None,
            container: None,
            visible: true,
            disabled: false,
            checked: false,
            value: String::new(),
            options: Vec::new(),
            on_click: Vec::new(),
            on_press: Vec::new(),
            accepts_input: true,
            removed: false,
        }
    }

    pub fn button(text: &str) -> Self {
        Self::new("button").text(text)
    }

    pub fn submit(text: &str) -> Self {
        Self::button(text).attr("type", "submit")
    }

    pub fn link(text: &str, href: &str) -> Self {
        Self::new("a").text(text).attr("href", href)
    }

    pub fn text_input(name: &str) -> Self {
        Self::new("input").attr("type", "text").name(name)
    }

    pub fn textarea(name: &str) -> Self {
        Self::new("textarea").name(name)
    }

    pub fn select(name: &str, options: &[&str]) -> Self {
        let mut el = Self::new("select").name(name);
        el.options = options.iter().map(|o| o.to_string()).collect();
        el.value = el.options.first().cloned().unwrap_or_default();
        el
    }

    pub fn radio(name: &str, value: &str) -> Self {
        Self::new("input")
            .attr("type", "radio")
            .name(name)
            .attr("value", value)
    }

    pub fn checkbox(name: &str) -> Self {
        Self::new("input").attr("type", "checkbox").name(name)
    }

    /// A `<label for=..>` element. Labels are never part of the interactive scan.
    pub fn label_for(target_id: &str, text: &str) -> Self {
        Self::new("label").attr("for", target_id).text(text)
    }

    pub fn attr(mut self, key: &str, value: &str) -> Self {
        self.attrs.insert(key.to_string(), value.to_string());
        self
    }

    pub fn id(self, id: &str) -> Self {
        self.attr("id", id)
    }

    pub fn name(self, name: &str) -> Self {
        self.attr("name", name)
    }

    pub fn class(self, class: &str) -> Self {
        self.attr("class", class)
    }

    pub fn placeholder(self, placeholder: &str) -> Self {
        self.attr("placeholder", placeholder)
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn labelled(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn within(mut self, kind: &str, text: Option<&str>, id: Option<&str>) -> Self {
        self.container = Some(RawContainer {
            kind: kind.to_string(),
            text: text.map(str::to_string),
            id: id.map(str::to_string),
        });
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn checked(mut self) -> Self {
        self.checked = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    pub fn on_click(mut self, effect: FakeEffect) -> Self {
        self.on_click.push(effect);
        self
    }

    /// Effect of any key pressed on this element.
    pub fn on_press(mut self, effect: FakeEffect) -> Self {
        self.on_press.push(effect);
        self
    }

    /// Fill calls succeed but leave the value untouched.
    pub fn rejecting_input(mut self) -> Self {
        self.accepts_input = false;
        self
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.attrs
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    fn input_type(&self) -> Option<&str> {
        self.get("type")
    }

    fn is_kind(&self, kind: &str) -> bool {
        self.tag == "input" && self.input_type() == Some(kind)
    }

    fn normalized_text(&self) -> String {
        self.text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn describe(&self) -> String {
        self.get("id")
            .or_else(|| self.get("name"))
            .map(|s| match self.get("value") {
                Some(v) if self.is_kind("radio") => format!("{}={}", s, v),
                _ => s.to_string(),
            })
            .unwrap_or_else(|| self.tag.clone())
    }

    fn is_interactive(&self) -> bool {
        if self.removed || !self.visible {
            return false;
        }
        let by_tag = match self.tag.as_str() {
            "input" => self.input_type() != Some("hidden"),
            "button" | "select" | "textarea" => true,
            "a" => self.get("href").is_some(),
            _ => false,
        };
        by_tag
            || self
                .get("role")
                .map(|r| INTERACTIVE_ROLES.contains(&r))
                .unwrap_or(false)
    }

    fn to_raw(&self) -> RawElement {
        let form_like = matches!(self.tag.as_str(), "input" | "select" | "textarea");
        let text = self.normalized_text();
        RawElement {
            tag: self.tag.clone(),
            input_type: (self.tag == "input")
                .then(|| self.input_type().unwrap_or("text").to_ascii_lowercase()),
            role: self.get("role").map(str::to_string),
            id: self.get("id").map(str::to_string),
            name: self.get("name").map(str::to_string),
            class_name: self.get("class").map(str::to_string),
            text: (!form_like && !text.is_empty()).then_some(text),
            label: self.label.clone(),
            placeholder: self.get("placeholder").map(str::to_string),
            title: self.get("title").map(str::to_string),
            aria_label: self.get("aria-label").map(str::to_string),
            value: matches!(self.tag.as_str(), "input" | "button")
                .then(|| self.get("value").map(str::to_string))
                .flatten(),
            href: (self.tag == "a")
                .then(|| self.get("href").map(str::to_string))
                .flatten(),
            container: self.container.clone(),
        }
    }

    fn matches(&self, locator: &str) -> bool {
        if self.removed {
            return false;
        }
        match locator.strip_prefix(XPATH_PREFIX) {
            Some(xpath) => self.matches_xpath(xpath),
            None => split_groups(locator)
                .iter()
                .any(|group| self.matches_compound(group.trim())),
        }
    }

    fn matches_compound(&self, selector: &str) -> bool {
        if selector.is_empty() {
            return false;
        }
        let tag_end = selector
            .find(|c: char| matches!(c, '#' | '.' | '[' | ':'))
            .unwrap_or(selector.len());
        let tag = &selector[..tag_end];
        if tag.chars().any(|c| c.is_whitespace() || c == '>' || c == '+' || c == '~') {
            return false;
        }
        if !tag.is_empty() && tag != "*" && !tag.eq_ignore_ascii_case(&self.tag) {
            return false;
        }

        let mut rest = &selector[tag_end..];
        while let Some(first) = rest.chars().next() {
            match first {
                '#' | '.' => {
                    let body = &rest[1..];
                    let end = body
                        .find(|c: char| matches!(c, '#' | '.' | '[' | ':') || c.is_whitespace())
                        .unwrap_or(body.len());
                    let ident = &body[..end];
                    let ok = if first == '#' {
                        self.get("id") == Some(ident)
                    } else {
                        self.get("class")
                            .map(|classes| classes.split_whitespace().any(|c| c == ident))
                            .unwrap_or(false)
                    };
                    if !ok {
                        return false;
                    }
                    rest = &body[end..];
                }
                '[' => {
                    let Some(close) = closing_bracket(rest) else {
                        return false;
                    };
                    if !self.matches_attribute(&rest[1..close]) {
                        return false;
                    }
                    rest = &rest[close + 1..];
                }
                _ => return false,
            }
        }
        true
    }

    fn matches_attribute(&self, inner: &str) -> bool {
        let Some(caps) = ATTRIBUTE.captures(inner) else {
            return false;
        };
        let actual = self.attrs.get(&caps[1]);
        match caps.get(2).or_else(|| caps.get(3)).or_else(|| caps.get(4)) {
            Some(expected) => {
                let expected = expected.as_str().replace("\\\"", "\"").replace("\\\\", "\\");
                actual.map(|v| v == &expected).unwrap_or(false)
            }
            None => actual.is_some(),
        }
    }

    fn matches_xpath(&self, xpath: &str) -> bool {
        let Some(caps) = XPATH_STEP.captures(xpath) else {
            return false;
        };
        let tag = &caps[1];
        if tag != "*" && !tag.eq_ignore_ascii_case(&self.tag) {
            return false;
        }
        let predicate = caps[2].trim();
        if let Some(p) = XPATH_CONTAINS.captures(predicate) {
            return literal(&p[1]).map_or(false, |t| self.normalized_text().contains(&t));
        }
        if let Some(p) = XPATH_EQUALS.captures(predicate) {
            return literal(&p[1]).map_or(false, |t| self.normalized_text() == t);
        }
        if let Some(p) = XPATH_ATTR.captures(predicate) {
            return literal(&p[2]).map_or(false, |t| self.get(&p[1]) == Some(t.as_str()));
        }
        false
    }
}

static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*([\w:-]+)\s*(?:=\s*(?:"((?:[^"\\]|\\.)*)"|'((?:[^'\\]|\\.)*)'|([^\s\]]+)))?\s*$"#)
        .expect("valid attribute regex")
});
static XPATH_STEP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^//([\w*-]+)\[(.+)\]$").expect("valid xpath regex"));
static XPATH_CONTAINS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^contains\(\s*(?:normalize-space\(\.\)|text\(\)|\.)\s*,\s*(.+)\)$")
        .expect("valid contains regex")
});
static XPATH_EQUALS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:normalize-space\(\.\)|text\(\)|\.)\s*=\s*(.+)$").expect("valid equals regex")
});
static XPATH_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^@([\w:-]+)\s*=\s*(.+)$").expect("valid attr regex"));

fn literal(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let quoted = (raw.starts_with('"') && raw.ends_with('"'))
        || (raw.starts_with('\'') && raw.ends_with('\''));
    (quoted && raw.len() >= 2).then(|| raw[1..raw.len() - 1].to_string())
}

fn closing_bracket(selector: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (pos, c) in selector.char_indices().skip(1) {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, c) {
            (_, '\\') => escaped = true,
            (Some(q), c) if c == q => quote = None,
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, ']') => return Some(pos),
            _ => {}
        }
    }
    None
}

fn split_groups(selector: &str) -> Vec<&str> {
    let mut groups = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (pos, c) in selector.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, '[') | (None, '(') => depth += 1,
            (None, ']') | (None, ')') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                groups.push(&selector[start..pos]);
                start = pos + 1;
            }
            _ => {}
        }
    }
    groups.push(&selector[start..]);
    groups
}

#[derive(Debug, Default)]
struct FakeState {
    url: String,
    title: String,
    elements: Vec<FakeElement>,
    validation: Vec<String>,
    content: Option<String>,
    ops: Vec<String>,
    idle_waits: usize,
}

impl FakeState {
    fn first_match(&self, locator: &str) -> Option<usize> {
        self.elements.iter().position(|el| el.matches(locator))
    }

    fn live_by_id(&self, id: &str) -> Option<usize> {
        self.elements
            .iter()
            .position(|el| !el.removed && el.get("id") == Some(id))
    }

    fn set_radio(&mut self, idx: usize) {
        let group = self.elements[idx].get("name").map(str::to_string);
        for (pos, el) in self.elements.iter_mut().enumerate() {
            if pos != idx && el.is_kind("radio") && el.get("name").map(str::to_string) == group {
                el.checked = false;
            }
        }
        if !self.elements[idx].checked {
            self.elements[idx].checked = true;
            let name = self.elements[idx].describe();
            self.ops.push(format!("toggle:{}", name));
        }
    }

    fn toggle_from_click(&mut self, idx: usize) {
        if self.elements[idx].is_kind("checkbox") {
            self.elements[idx].checked = !self.elements[idx].checked;
            let name = self.elements[idx].describe();
            self.ops.push(format!("toggle:{}", name));
        } else if self.elements[idx].is_kind("radio") {
            self.set_radio(idx);
        }
    }

    fn click(&mut self, idx: usize) {
        let target = if self.elements[idx].tag == "label" {
            self.elements[idx]
                .get("for")
                .map(str::to_string)
                .and_then(|id| self.live_by_id(&id))
        } else {
            Some(idx)
        };
        if let Some(target) = target {
            self.toggle_from_click(target);
        }
        let effects = self.elements[idx].on_click.clone();
        for effect in effects {
            self.apply(idx, effect);
        }
    }

    fn apply(&mut self, idx: usize, effect: FakeEffect) {
        match effect {
            FakeEffect::Navigate { url, title } => {
                self.url = url;
                self.title = title;
            }
            FakeEffect::SetTitle(title) => self.title = title,
            FakeEffect::RemoveSelf => self.elements[idx].removed = true,
            FakeEffect::RemoveId(id) => {
                if let Some(pos) = self.live_by_id(&id) {
                    self.elements[pos].removed = true;
                }
            }
            FakeEffect::Insert(element) => self.elements.push(element),
            FakeEffect::ShowValidation(message) => self.validation.push(message),
            FakeEffect::ClearValidation => self.validation.clear(),
        }
    }
}

/// Shared in-memory page; cheap to wrap in an `Arc` and hand to the engine.
#[derive(Debug, Default)]
pub struct FakePage {
    state: Mutex<FakeState>,
}

impl FakePage {
    pub fn new(url: &str) -> Self {
        Self {
            state: Mutex::new(FakeState {
                url: url.to_string(),
                ..FakeState::default()
            }),
        }
    }

    pub fn with_title(self, title: &str) -> Self {
        self.state.lock().title = title.to_string();
        self
    }

    pub fn with(self, element: FakeElement) -> Self {
        self.add(element);
        self
    }

    pub fn add(&self, element: FakeElement) {
        self.state.lock().elements.push(element);
    }

    pub fn set_url(&self, url: &str) {
        self.state.lock().url = url.to_string();
    }

    pub fn set_title(&self, title: &str) {
        self.state.lock().title = title.to_string();
    }

    pub fn set_content(&self, markup: &str) {
        self.state.lock().content = Some(markup.to_string());
    }

    pub fn push_validation(&self, message: &str) {
        self.state.lock().validation.push(message.to_string());
    }

    pub fn remove_id(&self, id: &str) {
        let mut state = self.state.lock();
        if let Some(pos) = state.live_by_id(id) {
            state.elements[pos].removed = true;
        }
    }

    pub fn ops(&self) -> Vec<String> {
        self.state.lock().ops.clone()
    }

    pub fn count_ops(&self, prefix: &str) -> usize {
        self.state
            .lock()
            .ops
            .iter()
            .filter(|op| op.starts_with(prefix))
            .count()
    }

    /// Network-idle waits seen so far; kept out of `ops`.
    pub fn idle_waits(&self) -> usize {
        self.state.lock().idle_waits
    }

    pub fn clear_ops(&self) {
        self.state.lock().ops.clear();
    }

    pub fn element_by_id(&self, id: &str) -> Option<FakeElement> {
        let state = self.state.lock();
        state.live_by_id(id).map(|pos| state.elements[pos].clone())
    }

    /// Live elements whose `name` attribute equals `name`, in page order.
    pub fn elements_named(&self, name: &str) -> Vec<FakeElement> {
        self.state
            .lock()
            .elements
            .iter()
            .filter(|el| !el.removed && el.get("name") == Some(name))
            .cloned()
            .collect()
    }

    fn with_match<T>(
        &self,
        locator: &str,
        op: String,
        action: impl FnOnce(&mut FakeState, usize) -> Result<T, ActionError>,
    ) -> Result<T, ActionError> {
        let mut state = self.state.lock();
        state.ops.push(op);
        let Some(idx) = state.first_match(locator) else {
            return Err(ActionError::AnchorNotFound(format!(
                "No element matches '{}'",
                locator
            )));
        };
        action(&mut *state, idx)
    }
}

#[async_trait]
impl BrowserBackend for FakePage {
    async fn navigate(&self, url: &str) -> Result<(), ActionError> {
        let mut state = self.state.lock();
        state.ops.push(format!("navigate:{}", url));
        state.url = url.to_string();
        Ok(())
    }

    async fn current_url(&self) -> Result<String, ActionError> {
        Ok(self.state.lock().url.clone())
    }

    async fn current_title(&self) -> Result<String, ActionError> {
        Ok(self.state.lock().title.clone())
    }

    async fn wait_for_selector(
        &self,
        locator: &str,
        timeout: Duration,
        visible: bool,
    ) -> Result<(), ActionError> {
        let state = self.state.lock();
        let found = state
            .elements
            .iter()
            .any(|el| el.matches(locator) && (!visible || el.visible));
        if found {
            Ok(())
        } else {
            Err(ActionError::WaitTimeout(format!(
                "'{}' not visible within {}ms",
                locator,
                timeout.as_millis()
            )))
        }
    }

    async fn query_all(&self, locator: &str) -> Result<usize, ActionError> {
        let state = self.state.lock();
        Ok(state.elements.iter().filter(|el| el.matches(locator)).count())
    }

    async fn click(&self, locator: &str) -> Result<(), ActionError> {
        self.with_match(locator, format!("click:{}", locator), |state, idx| {
            if state.elements[idx].disabled {
                return Err(ActionError::NotEnabled(locator.to_string()));
            }
            state.click(idx);
            Ok(())
        })
    }

    async fn check(&self, locator: &str) -> Result<(), ActionError> {
        self.with_match(locator, format!("check:{}", locator), |state, idx| {
            let el = &state.elements[idx];
            if el.is_kind("radio") {
                state.set_radio(idx);
                Ok(())
            } else if el.is_kind("checkbox") {
                if !el.checked {
                    state.toggle_from_click(idx);
                }
                Ok(())
            } else {
                Err(ActionError::NotClickable(format!(
                    "'{}' has no checked state",
                    locator
                )))
            }
        })
    }

    async fn uncheck(&self, locator: &str) -> Result<(), ActionError> {
        self.with_match(locator, format!("uncheck:{}", locator), |state, idx| {
            let el = &state.elements[idx];
            if el.is_kind("checkbox") {
                if el.checked {
                    state.toggle_from_click(idx);
                }
                Ok(())
            } else {
                Err(ActionError::NotClickable(format!(
                    "'{}' cannot be unchecked",
                    locator
                )))
            }
        })
    }

    async fn fill(&self, locator: &str, value: &str) -> Result<(), ActionError> {
        self.with_match(
            locator,
            format!("fill:{}={}", locator, value),
            |state, idx| {
                let el = &mut state.elements[idx];
                if el.disabled {
                    return Err(ActionError::NotEnabled(locator.to_string()));
                }
                if el.accepts_input {
                    el.value = value.to_string();
                }
                Ok(())
            },
        )
    }

    async fn select_option(&self, locator: &str, label: &str) -> Result<(), ActionError> {
        self.with_match(
            locator,
            format!("select:{}={}", locator, label),
            |state, idx| {
                let el = &mut state.elements[idx];
                if !el.options.iter().any(|o| o.trim() == label.trim()) {
                    return Err(ActionError::OptionNotFound(label.to_string()));
                }
                el.value = label.trim().to_string();
                Ok(())
            },
        )
    }

    async fn press(&self, locator: &str, key: &str) -> Result<(), ActionError> {
        self.with_match(locator, format!("press:{}={}", locator, key), |state, idx| {
            let effects = state.elements[idx].on_press.clone();
            for effect in effects {
                state.apply(idx, effect);
            }
            Ok(())
        })
    }

    async fn scroll_by(&self, dx: i64, dy: i64) -> Result<(), ActionError> {
        self.state.lock().ops.push(format!("scroll:{},{}", dx, dy));
        Ok(())
    }

    async fn wait_for_network_idle(&self, _timeout: Duration) -> Result<(), ActionError> {
        self.state.lock().idle_waits += 1;
        Ok(())
    }

    async fn evaluate(&self, _script: &str) -> Result<Value, ActionError> {
        self.state.lock().ops.push("evaluate".to_string());
        Ok(Value::Null)
    }

    async fn rendered_content(&self) -> Result<String, ActionError> {
        let state = self.state.lock();
        if let Some(content) = &state.content {
            return Ok(content.clone());
        }
        let mut markup = format!("<html><head><title>{}</title></head><body>", state.title);
        for el in state.elements.iter().filter(|el| !el.removed) {
            markup.push_str(&format!("<{tag}>{}</{tag}>", el.text, tag = el.tag));
        }
        markup.push_str("</body></html>");
        Ok(markup)
    }

    async fn probe(&self, locator: &str) -> Result<Option<ElementProbe>, ActionError> {
        let state = self.state.lock();
        Ok(state.first_match(locator).map(|idx| {
            let el = &state.elements[idx];
            let toggle = el.is_kind("radio") || el.is_kind("checkbox");
            ElementProbe {
                tag: el.tag.clone(),
                input_type: el.input_type().map(str::to_string),
                value: Some(el.value.clone()),
                selected_text: (el.tag == "select").then(|| el.value.clone()),
                checked: toggle.then_some(el.checked),
                visible: el.visible,
                disabled: el.disabled,
                text: el.normalized_text(),
            }
        }))
    }

    async fn scan_interactive(&self) -> Result<Vec<RawElement>, ActionError> {
        let state = self.state.lock();
        Ok(state
            .elements
            .iter()
            .filter(|el| el.is_interactive())
            .map(FakeElement::to_raw)
            .collect())
    }

    async fn scan_validation_messages(&self) -> Result<Vec<String>, ActionError> {
        Ok(self.state.lock().validation.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compound_css_matching() {
        let el = FakeElement::radio("frequency", "weekly")
            .id("freq-weekly")
            .class("choice big");
        assert!(el.matches("#freq-weekly"));
        assert!(el.matches("input[type=\"radio\"][name=\"frequency\"][value=\"weekly\"]"));
        assert!(el.matches("input.choice.big"));
        assert!(el.matches("select, input[name='frequency']"));
        assert!(!el.matches("input[value=\"daily\"]"));
        assert!(!el.matches("form input"));
    }

    #[test]
    fn xpath_forms() {
        let el = FakeElement::button("  Save   draft ");
        assert!(el.matches("xpath=//button[contains(normalize-space(.), \"Save\")]"));
        assert!(el.matches("xpath=//button[normalize-space(.)='Save draft']"));
        assert!(!el.matches("xpath=//a[contains(normalize-space(.), \"Save\")]"));
        let input = FakeElement::text_input("q").placeholder("Search");
        assert!(input.matches("xpath=//input[@placeholder=\"Search\"]"));
    }

    #[tokio::test]
    async fn label_click_toggles_target() {
        let page = FakePage::new("https://example.test/")
            .with(FakeElement::checkbox("terms").id("terms"))
            .with(FakeElement::label_for("terms", "I agree"));
        page.click("label[for=\"terms\"]").await.unwrap();
        assert!(page.element_by_id("terms").unwrap().checked);
        assert_eq!(page.count_ops("toggle:"), 1);
    }

    #[tokio::test]
    async fn radio_group_is_exclusive() {
        let page = FakePage::new("https://example.test/")
            .with(FakeElement::radio("size", "s").checked())
            .with(FakeElement::radio("size", "m"));
        page.check("input[name=\"size\"][value=\"m\"]").await.unwrap();
        let states: Vec<bool> = page
            .elements_named("size")
            .iter()
            .map(|el| el.checked)
            .collect();
        assert_eq!(states, vec![false, true]);
    }

    #[test]
    fn scan_skips_hidden_and_labels() {
        let page = FakePage::new("about:blank")
            .with(FakeElement::button("Go"))
            .with(FakeElement::button("Ghost").hidden())
            .with(FakeElement::label_for("x", "Label"));
        let raw = tokio_test::block_on(page.scan_interactive()).unwrap();
        assert_eq!(raw.len(), 1);
        assert_eq!(raw[0].text.as_deref(), Some("Go"));
    }
}
