//! External display tools.
//!
//! Everything that touches the live display state goes through one of
//! these traits, so the rest of the crate can be driven by the dummy
//! backend in tests.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::{Error, Result};

pub mod disper;
pub mod dummy;
pub mod xrandr;

pub trait DisplayTool {
    /// Full per-connector report, including mode lists and EDID.
    fn query(&mut self) -> Result<String>;

    /// Change the live configuration with one invocation of the tool.
    fn apply(&mut self, args: &[String]) -> Result<()>;
}

pub trait AlternateTool {
    /// List of attached displays.
    fn list(&mut self) -> Result<String>;

    /// The live configuration in the tool's own format.
    fn print(&mut self) -> Result<String>;

    /// Apply a configuration previously returned by `print`.
    fn import(&mut self, config: &str) -> Result<()>;
}

/// Run `program` to completion and return its stdout.
///
/// A spawn failure and a nonzero exit are reported as different errors.
fn run(program: &Path, args: &[String], stdin: Option<&str>) -> Result<String> {
    debug!("running {} {}", program.display(), args.join(" "));
    let missing = |source| Error::ToolMissing {
        program: program.to_owned(),
        source,
    };

    let mut child = Command::new(program)
        .args(args)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(missing)?;

    // The pipe is closed before waiting so the child sees EOF.
    let written = match (stdin, child.stdin.take()) {
        (Some(input), Some(mut pipe)) => pipe.write_all(input.as_bytes()),
        _ => Ok(()),
    };

    let output = child.wait_with_output()?;
    if !output.status.success() {
        return Err(Error::ToolFailed {
            program: program.to_owned(),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        });
    }
    written?;
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::exec_guard;
    use std::path::PathBuf;

    #[test]
    fn missing_and_failing_tools_are_distinct() {
        let _guard = exec_guard();
        let absent = PathBuf::from("/nonexistent/autorandr-test-tool");
        assert!(matches!(
            run(&absent, &[], None),
            Err(Error::ToolMissing { .. })
        ));
        assert!(matches!(
            run(Path::new("false"), &[], None),
            Err(Error::ToolFailed { .. })
        ));
    }

    #[test]
    fn captures_stdout_and_feeds_stdin() -> Result<()> {
        let _guard = exec_guard();
        let echoed = run(Path::new("echo"), &["hello".to_owned()], None)?;
        assert_eq!(echoed, "hello\n");
        assert_eq!(run(Path::new("cat"), &[], Some("piped\n"))?, "piped\n");
        Ok(())
    }

    #[test]
    fn early_exit_keeps_status_and_stderr() {
        let _guard = exec_guard();
        // Larger than a pipe buffer, so the write outlives the child.
        let input = "x".repeat(1 << 20);
        let args = ["-c".to_owned(), "echo refused >&2; exit 3".to_owned()];
        match run(Path::new("sh"), &args, Some(&input)) {
            Err(Error::ToolFailed { status, stderr, .. }) => {
                assert_eq!(status.code(), Some(3));
                assert_eq!(stderr, "refused");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
