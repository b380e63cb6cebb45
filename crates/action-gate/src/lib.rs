//! Post-action verification gate
//!
//! After every action this crate decides whether the intended effect happened:
//! - Newly-appeared form validation messages (filtered for technical noise)
//! - Toggle state, field value and URL checks
//! - Progression clicks confirmed by next-target resolvability or an observable effect

pub mod errors;
pub mod scanner;
pub mod types;
pub mod urls;
pub mod verifier;

pub use errors::*;
pub use scanner::*;
pub use types::*;
pub use urls::*;
pub use verifier::*;
