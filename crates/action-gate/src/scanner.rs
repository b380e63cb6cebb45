//! Form validation-error detection

use crate::errors::GateError;
use action_primitives::BrowserBackend;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use tracing::debug;

/// Longer text is page content, not a field error.
pub const MAX_MESSAGE_CHARS: usize = 200;

static TECHNICAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)(\bfunction\s*\(|=>|\b[a-z]\w*Error:|\bat\s+\S+:\d+|^\s*[\[{]|"\w+"\s*:|\{[^}]*;|https?://|\.(js|css)\b|webpack|__\w+__|\bstack\s*trace\b)"#,
    )
    .expect("valid technical-content regex")
});

/// Filters the raw error-indicator scan down to human-facing messages.
#[derive(Debug, Clone)]
pub struct ValidationScanner {
    max_chars: usize,
}

impl Default for ValidationScanner {
    fn default() -> Self {
        Self {
            max_chars: MAX_MESSAGE_CHARS,
        }
    }
}

impl ValidationScanner {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    /// Visible validation messages, filtered and de-duplicated in page order.
    pub async fn scan(&self, backend: &dyn BrowserBackend) -> Result<Vec<String>, GateError> {
        let raw = backend.scan_validation_messages().await?;
        Ok(self.filter(raw))
    }

    pub fn filter(&self, raw: Vec<String>) -> Vec<String> {
        let mut seen = HashSet::new();
        raw.into_iter()
            .map(|m| m.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|m| self.looks_like_message(m))
            .filter(|m| seen.insert(m.to_lowercase()))
            .collect()
    }

    fn looks_like_message(&self, message: &str) -> bool {
        if message.is_empty() || message.chars().count() > self.max_chars {
            return false;
        }
        if !message.chars().any(char::is_alphabetic) {
            return false;
        }
        if TECHNICAL.is_match(message) {
            debug!(message, "Ignoring technical text in error scan");
            return false;
        }
        true
    }
}

/// Messages in `current` that were not already showing in `baseline`.
pub fn newly_appeared(baseline: &[String], current: &[String]) -> Vec<String> {
    let before: HashSet<String> = baseline.iter().map(|m| m.to_lowercase()).collect();
    current
        .iter()
        .filter(|m| !before.contains(&m.to_lowercase()))
        .cloned()
        .collect()
}
