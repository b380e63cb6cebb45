//! Shared primitives for the semantic replay engine.
//!
//! The types here describe what one index build saw on the page. They carry no
//! browser handles, so a snapshot can be inspected, logged, or serialized after
//! the page has moved on.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;
use uuid::Uuid;

/// Errors raised while assembling shared structures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("duplicate display key in snapshot: {0}")]
    DuplicateKey(String),
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct SnapshotId(pub String);

impl SnapshotId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for SnapshotId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of interactable element.
#[cfg_attr(
    feature = "serde-full",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ElementType {
    Input,
    Button,
    Select,
    Textarea,
    Link,
    Radio,
    Checkbox,
}

impl ElementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementType::Input => "input",
            ElementType::Button => "button",
            ElementType::Select => "select",
            ElementType::Textarea => "textarea",
            ElementType::Link => "link",
            ElementType::Radio => "radio",
            ElementType::Checkbox => "checkbox",
        }
    }

    /// Radio buttons and checkboxes carry a checked state.
    pub fn is_toggle(&self) -> bool {
        matches!(self, ElementType::Radio | ElementType::Checkbox)
    }

    /// Elements that accept typed text.
    pub fn is_text_entry(&self) -> bool {
        matches!(self, ElementType::Input | ElementType::Textarea)
    }

    /// Placeholder text used when an element exposes no readable text at all.
    pub fn placeholder_text(&self, input_type: Option<&str>) -> String {
        match self {
            ElementType::Button => "[Button]".to_string(),
            ElementType::Input => format!("[Input Field - {}]", input_type.unwrap_or("text")),
            ElementType::Select => "[Dropdown]".to_string(),
            ElementType::Textarea => "[Text Area]".to_string(),
            ElementType::Link => "[Link]".to_string(),
            ElementType::Radio => "[Radio Button]".to_string(),
            ElementType::Checkbox => "[Checkbox]".to_string(),
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Nearest meaningful ancestor of an element (form, section, fieldset, row...).
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ContainerContext {
    #[cfg_attr(feature = "serde-full", serde(rename = "type"))]
    pub kind: String,
    pub text: Option<String>,
    pub id: Option<String>,
}

/// Container text longer than this is treated as content, not a label.
pub const MAX_CONTAINER_LABEL_CHARS: usize = 50;

impl ContainerContext {
    /// Human label for the container: short heading text first, then a formatted id.
    pub fn label(&self) -> Option<String> {
        if let Some(text) = self.text.as_deref().map(str::trim) {
            if !text.is_empty() && text.chars().count() < MAX_CONTAINER_LABEL_CHARS {
                return Some(text.to_string());
            }
        }
        self.id
            .as_deref()
            .map(format_container_id)
            .filter(|label| !label.is_empty())
    }
}

/// Turns `billing-info_form` into `Billing Info Form`.
pub fn format_container_id(id: &str) -> String {
    id.split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// One-based position among elements sharing the same text.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SiblingContext {
    pub position: usize,
    pub total: usize,
}

impl SiblingContext {
    /// Matches the recorder's `item N of M` hint format.
    pub fn describe(&self) -> String {
        format!("item {} of {}", self.position, self.total)
    }
}

/// Raw attributes kept alongside a descriptor for strategy checks.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ElementAttributes {
    pub tag: String,
    pub id: Option<String>,
    pub name: Option<String>,
    pub input_type: Option<String>,
    pub value: Option<String>,
}

/// One interactable element as seen during a single index build.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct ElementDescriptor {
    pub display_key: String,
    pub raw_text: String,
    pub element_type: ElementType,
    pub primary_locator: String,
    pub fallback_locator: String,
    pub text_locator: String,
    pub container_context: Option<ContainerContext>,
    pub sibling_context: Option<SiblingContext>,
    pub interaction_hints: Vec<String>,
    pub attributes: ElementAttributes,
}

impl ElementDescriptor {
    pub fn has_hint(&self, hint: &str) -> bool {
        self.interaction_hints.iter().any(|h| h == hint)
    }

    /// Locators in the order they should be tried, without duplicates or blanks.
    pub fn locator_chain(&self) -> Vec<String> {
        let mut chain: Vec<String> = Vec::with_capacity(3);
        for locator in [
            &self.primary_locator,
            &self.fallback_locator,
            &self.text_locator,
        ] {
            if !locator.is_empty() && !chain.iter().any(|existing| existing == locator) {
                chain.push(locator.clone());
            }
        }
        chain
    }
}

/// Display-key → descriptor mapping produced by one index build.
///
/// Entries keep page order so that iteration, and therefore tie-breaking, is stable.
#[derive(Clone, Debug, Default)]
pub struct SemanticIndex {
    snapshot: SnapshotId,
    url: String,
    entries: Vec<ElementDescriptor>,
    by_key: HashMap<String, usize>,
}

impl SemanticIndex {
    pub fn new(url: impl Into<String>, entries: Vec<ElementDescriptor>) -> Result<Self, IndexError> {
        let mut by_key = HashMap::with_capacity(entries.len());
        for (position, descriptor) in entries.iter().enumerate() {
            if by_key
                .insert(descriptor.display_key.clone(), position)
                .is_some()
            {
                return Err(IndexError::DuplicateKey(descriptor.display_key.clone()));
            }
        }
        Ok(Self {
            snapshot: SnapshotId::new(),
            url: url.into(),
            entries,
            by_key,
        })
    }

    pub fn empty(url: impl Into<String>) -> Self {
        Self {
            snapshot: SnapshotId::new(),
            url: url.into(),
            entries: Vec::new(),
            by_key: HashMap::new(),
        }
    }

    pub fn snapshot_id(&self) -> &SnapshotId {
        &self.snapshot
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn get(&self, display_key: &str) -> Option<&ElementDescriptor> {
        self.by_key
            .get(display_key)
            .and_then(|position| self.entries.get(*position))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ElementDescriptor> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|d| d.display_key.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(key: &str) -> ElementDescriptor {
        ElementDescriptor {
            display_key: key.to_string(),
            raw_text: key.to_string(),
            element_type: ElementType::Button,
            primary_locator: "#a".to_string(),
            fallback_locator: "#a".to_string(),
            text_locator: String::new(),
            container_context: None,
            sibling_context: None,
            interaction_hints: Vec::new(),
            attributes: ElementAttributes::default(),
        }
    }

    #[test]
    fn index_rejects_duplicate_keys() {
        let err = SemanticIndex::new("about:blank", vec![descriptor("Go"), descriptor("Go")])
            .unwrap_err();
        assert_eq!(err, IndexError::DuplicateKey("Go".to_string()));
    }

    #[test]
    fn index_preserves_page_order() {
        let index = SemanticIndex::new(
            "about:blank",
            vec![descriptor("b"), descriptor("a"), descriptor("c")],
        )
        .unwrap();
        assert_eq!(index.keys().collect::<Vec<_>>(), vec!["b", "a", "c"]);
        assert_eq!(index.get("a").unwrap().display_key, "a");
    }

    #[test]
    fn locator_chain_skips_duplicates() {
        let chain = descriptor("x").locator_chain();
        assert_eq!(chain, vec!["#a".to_string()]);
    }

    #[test]
    fn container_label_prefers_short_text() {
        let ctx = ContainerContext {
            kind: "form".into(),
            text: Some("Billing Information".into()),
            id: Some("billing-form".into()),
        };
        assert_eq!(ctx.label().as_deref(), Some("Billing Information"));

        let long = ContainerContext {
            kind: "section".into(),
            text: Some("x".repeat(80)),
            id: Some("shipping_address".into()),
        };
        assert_eq!(long.label().as_deref(), Some("Shipping Address"));
    }
}
