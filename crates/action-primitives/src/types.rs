//! Data returned by page reads

use serde::{Deserialize, Serialize};

/// Ancestor grouping reported by the interactive-element scan.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawContainer {
    pub kind: String,
    pub text: Option<String>,
    pub id: Option<String>,
}

/// One interactive element exactly as the page scan saw it.
///
/// Fields mirror DOM attributes; empty attributes come back as `None`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawElement {
    pub tag: String,
    pub input_type: Option<String>,
    pub role: Option<String>,
    pub id: Option<String>,
    pub name: Option<String>,
    pub class_name: Option<String>,
    pub text: Option<String>,
    pub label: Option<String>,
    pub placeholder: Option<String>,
    pub title: Option<String>,
    pub aria_label: Option<String>,
    pub value: Option<String>,
    pub href: Option<String>,
    pub container: Option<RawContainer>,
}

/// Lightweight read of the first element matching a locator.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ElementProbe {
    pub tag: String,
    pub input_type: Option<String>,
    pub value: Option<String>,
    pub selected_text: Option<String>,
    pub checked: Option<bool>,
    pub visible: bool,
    pub disabled: bool,
    pub text: String,
}

impl ElementProbe {
    pub fn is_select(&self) -> bool {
        self.tag == "select"
    }

    pub fn is_radio(&self) -> bool {
        self.tag == "input" && self.input_type.as_deref() == Some("radio")
    }

    pub fn is_checkbox(&self) -> bool {
        self.tag == "input" && self.input_type.as_deref() == Some("checkbox")
    }
}

/// URL and title pair captured around an action.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageState {
    pub url: String,
    pub title: String,
}
