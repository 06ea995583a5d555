//! Hook scripts
//!
//! Hooks are optional executables found by convention under the profiles
//! root. They get the profile name as their only argument. Their output is
//! not interpreted and only `block` cares about the exit status.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use tracing::{debug, warn};

pub struct HookRunner {
    root: PathBuf,
}

fn is_executable(path: &Path) -> bool {
    fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

impl HookRunner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        HookRunner { root: root.into() }
    }

    fn run(&self, script: &Path, profile: &str) -> Option<ExitStatus> {
        if !is_executable(script) {
            return None;
        }
        debug!("running hook {} {}", script.display(), profile);
        match Command::new(script).arg(profile).status() {
            Ok(status) => {
                if !status.success() {
                    debug!("hook {} exited with {}", script.display(), status);
                }
                Some(status)
            }
            Err(e) => {
                warn!("failed to run hook {}: {}", script.display(), e);
                None
            }
        }
    }

    /// Whether the profile's `block` script exists and exits successfully.
    pub fn blocked(&self, profile: &str) -> bool {
        let script = self.root.join(profile).join("block");
        self.run(&script, profile)
            .map_or(false, |status| status.success())
    }

    /// Global `preswitch`, then the profile's own.
    pub fn run_pre(&self, profile: &str) {
        self.run_pair("preswitch", profile);
    }

    /// Global `postswitch`, then the profile's own.
    pub fn run_post(&self, profile: &str) {
        self.run_pair("postswitch", profile);
    }

    fn run_pair(&self, hook: &str, profile: &str) {
        self.run(&self.root.join(hook), profile);
        self.run(&self.root.join(profile).join(hook), profile);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{exec_guard, logging_script, write_script};

    #[test]
    fn block_needs_executable_success() -> std::io::Result<()> {
        let _guard = exec_guard();
        let root = tempfile::tempdir()?;
        let hooks = HookRunner::new(root.path());

        assert!(!hooks.blocked("missing"));

        write_script(&root.path().join("blocked/block"), "exit 0")?;
        assert!(hooks.blocked("blocked"));

        write_script(&root.path().join("open/block"), "exit 3")?;
        assert!(!hooks.blocked("open"));

        write_script(&root.path().join("plain/block"), "exit 0")?;
        fs::set_permissions(
            root.path().join("plain/block"),
            fs::Permissions::from_mode(0o644),
        )?;
        assert!(!hooks.blocked("plain"));
        Ok(())
    }

    #[test]
    fn global_hook_runs_before_profile_hook() -> std::io::Result<()> {
        let _guard = exec_guard();
        let root = tempfile::tempdir()?;
        let log = root.path().join("log");
        logging_script(&root.path().join("preswitch"), &log, "global-pre")?;
        logging_script(&root.path().join("docked/preswitch"), &log, "docked-pre")?;
        logging_script(&root.path().join("postswitch"), &log, "global-post")?;
        write_script(&root.path().join("docked/postswitch"), "exit 1")?;

        let hooks = HookRunner::new(root.path());
        hooks.run_pre("docked");
        hooks.run_post("docked");
        // Profiles without hooks of their own still get the global ones.
        hooks.run_pre("mobile");

        assert_eq!(
            fs::read_to_string(&log)?,
            "global-pre docked\ndocked-pre docked\nglobal-post docked\nglobal-pre mobile\n"
        );
        Ok(())
    }
}
