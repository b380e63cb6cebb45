//! Chromium DevTools Protocol backend.
//!
//! [`CdpBackend`] launches Chromium through chromiumoxide, keeps one page and
//! implements [`action_primitives::BrowserBackend`] on top of it. DOM reads and
//! element actions run the shared page scripts; navigation and markup go
//! through the protocol directly.

mod backend;
pub mod config;
pub mod error;

pub use backend::CdpBackend;
pub use config::{detect_chrome_executable, CdpConfig};
pub use error::{AdapterError, AdapterErrorKind};
