use action_primitives::ActionError;
use chromiumoxide::error::CdpError;
use std::fmt;
use thiserror::Error;

/// High-level error categories surfaced by the adapter.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum AdapterErrorKind {
    #[error("browser launch failed")]
    Launch,
    #[error("navigation timed out")]
    NavTimeout,
    #[error("cdp i/o failure")]
    CdpIo,
    #[error("page script failed")]
    Script,
    #[error("browser is closed")]
    Closed,
    #[error("internal error")]
    Internal,
}

#[derive(Clone, Debug)]
pub struct AdapterError {
    pub kind: AdapterErrorKind,
    pub hint: Option<String>,
}

impl fmt::Display for AdapterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(hint) = &self.hint {
            write!(f, ": {}", hint)?;
        }
        Ok(())
    }
}

impl std::error::Error for AdapterError {}

impl AdapterError {
    pub fn new(kind: AdapterErrorKind) -> Self {
        Self { kind, hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Classify a chromiumoxide failure raised while doing `what`.
    pub fn from_cdp(err: CdpError, what: &str) -> Self {
        let kind = match &err {
            CdpError::Timeout => AdapterErrorKind::NavTimeout,
            CdpError::JavascriptException(_) => AdapterErrorKind::Script,
            _ => AdapterErrorKind::CdpIo,
        };
        Self::new(kind).with_hint(format!("{what}: {err}"))
    }
}

impl From<AdapterError> for ActionError {
    fn from(err: AdapterError) -> Self {
        let message = err.to_string();
        match err.kind {
            AdapterErrorKind::NavTimeout => ActionError::NavTimeout(message),
            AdapterErrorKind::Script => ActionError::Script(message),
            AdapterErrorKind::Internal => ActionError::Internal(message),
            AdapterErrorKind::Launch | AdapterErrorKind::CdpIo | AdapterErrorKind::Closed => {
                ActionError::Backend(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_hint() {
        let err = AdapterError::new(AdapterErrorKind::Launch).with_hint("no chromium found");
        assert_eq!(err.to_string(), "browser launch failed: no chromium found");
        assert_eq!(
            AdapterError::new(AdapterErrorKind::Closed).to_string(),
            "browser is closed"
        );
    }

    #[test]
    fn launch_failures_surface_as_backend_errors() {
        let err: ActionError = AdapterError::new(AdapterErrorKind::Launch).into();
        assert!(matches!(err, ActionError::Backend(_)));
        let err: ActionError = AdapterError::new(AdapterErrorKind::NavTimeout).into();
        assert!(matches!(err, ActionError::NavTimeout(_)));
    }

    #[test]
    fn classifies_cdp_timeouts() {
        let err = AdapterError::from_cdp(CdpError::Timeout, "goto https://a.test");
        assert_eq!(err.kind, AdapterErrorKind::NavTimeout);
        assert!(err.to_string().contains("goto https://a.test"));
    }
}
