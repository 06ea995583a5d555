//! Helpers shared by tests that run hook scripts.

use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

static EXEC: Mutex<()> = Mutex::new(());

/// Serializes tests that write and then execute scripts. Executing a file
/// while another thread's fork still holds it open for writing fails with
/// "text file busy".
pub(crate) fn exec_guard() -> MutexGuard<'static, ()> {
    EXEC.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub(crate) fn write_script(path: &Path, body: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, format!("#!/bin/sh\n{}\n", body))?;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
}

/// A script that appends `<label> <first argument>` to `log`.
pub(crate) fn logging_script(path: &Path, log: &Path, label: &str) -> io::Result<()> {
    write_script(path, &format!("echo \"{} $1\" >> '{}'", label, log.display()))
}
