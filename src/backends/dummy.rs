//! Dummy backend.
//!
//! This is purely for testing or debugging.
//! It logs changes instead of making them, and remembers them.

use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::info;

use super::{AlternateTool, DisplayTool};
use crate::error::{Error, Result};

#[derive(Default)]
struct DisplayState {
    report: String,
    applied: Vec<Vec<String>>,
    fail: bool,
}

/// Clones share their state, so a test can keep one and hand the other out.
#[derive(Clone, Default)]
pub struct DummyDisplay {
    state: Arc<Mutex<DisplayState>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn rejected(program: &str) -> Error {
    Error::ToolFailed {
        program: PathBuf::from(program),
        status: ExitStatus::from_raw(1 << 8),
        stderr: "rejected by dummy backend".into(),
    }
}

impl DummyDisplay {
    pub fn new(report: &str) -> Self {
        let dummy = DummyDisplay::default();
        dummy.set_report(report);
        dummy
    }

    pub fn set_report(&self, report: &str) {
        lock(&self.state).report = report.to_owned();
    }

    /// Make every following `apply` fail as if the tool rejected it.
    pub fn set_failing(&self, fail: bool) {
        lock(&self.state).fail = fail;
    }

    /// Argument lists of every `apply` so far, in order.
    pub fn applied(&self) -> Vec<Vec<String>> {
        lock(&self.state).applied.clone()
    }
}

impl DisplayTool for DummyDisplay {
    fn query(&mut self) -> Result<String> {
        Ok(lock(&self.state).report.clone())
    }

    fn apply(&mut self, args: &[String]) -> Result<()> {
        info!("dummy: apply {}", args.join(" "));
        let mut state = lock(&self.state);
        state.applied.push(args.to_vec());
        if state.fail {
            return Err(rejected("dummy-xrandr"));
        }
        Ok(())
    }
}

#[derive(Default)]
struct AlternateState {
    listing: String,
    config: String,
    imported: Vec<String>,
}

#[derive(Clone, Default)]
pub struct DummyAlternate {
    state: Arc<Mutex<AlternateState>>,
}

impl DummyAlternate {
    pub fn new(listing: &str, config: &str) -> Self {
        let dummy = DummyAlternate::default();
        {
            let mut state = lock(&dummy.state);
            state.listing = listing.to_owned();
            state.config = config.to_owned();
        }
        dummy
    }

    pub fn imported(&self) -> Vec<String> {
        lock(&self.state).imported.clone()
    }
}

impl AlternateTool for DummyAlternate {
    fn list(&mut self) -> Result<String> {
        Ok(lock(&self.state).listing.clone())
    }

    fn print(&mut self) -> Result<String> {
        Ok(lock(&self.state).config.clone())
    }

    fn import(&mut self, config: &str) -> Result<()> {
        info!("dummy: import {} bytes", config.len());
        let mut state = lock(&self.state);
        state.imported.push(config.to_owned());
        state.config = config.to_owned();
        Ok(())
    }
}
