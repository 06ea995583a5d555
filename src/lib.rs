//! Automatic display layout switching.
//!
//! Connected monitors are fingerprinted by their EDID, matched against
//! saved profiles, and the matching profile's layout is applied through
//! the display tool.

pub mod apply;
pub mod backends;
pub mod equality;
pub mod error;
pub mod fingerprint;
pub mod hooks;
pub mod lock;
pub mod orchestrator;
pub mod orientation;
pub mod output;
pub mod profile;
pub mod query;
pub mod settings;
pub mod synth;

#[cfg(test)]
mod test_support;

pub use error::{Error, Result};
pub use orchestrator::{Autorandr, Detection, ProfileState, Switch};
