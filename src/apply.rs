//! Turning directives into invocations of the display tool.
//!
//! Outputs are never switched one at a time. Every `off` goes into a
//! first invocation and everything else into a second one, so the tool
//! never sees a half-applied layout with overlapping outputs.

use tracing::info;

use crate::backends::DisplayTool;
use crate::error::Result;
use crate::output::OutputConfig;

fn enable_args(output: &OutputConfig, args: &mut Vec<String>) {
    args.push("--output".into());
    args.push(output.name.clone());
    if let Some(mode) = &output.mode {
        args.push("--mode".into());
        args.push(mode.name.clone());
    }
    if let Some(position) = &output.position {
        args.push("--pos".into());
        args.push(position.to_string());
    }
    if let Some(rotation) = &output.rotation {
        args.push("--rotate".into());
        args.push(rotation.to_string());
    }
    if let Some(reflection) = &output.reflection {
        args.push("--reflect".into());
        args.push(reflection.to_string());
    }
    if let Some(rate) = &output.rate {
        args.push("--rate".into());
        args.push(rate.clone());
    }
    if output.primary {
        args.push("--primary".into());
    }
    if let Some(other) = &output.same_as {
        args.push("--same-as".into());
        args.push(other.clone());
    }
}

/// The disable batch, then the enable batch. Empty batches are left out.
pub fn batches(directives: &[OutputConfig]) -> Vec<Vec<String>> {
    let mut disable = Vec::new();
    let mut enable = Vec::new();

    for output in directives {
        if !output.enabled {
            disable.extend(["--output".to_owned(), output.name.clone(), "--off".to_owned()]);
        } else if output.has_settings() {
            enable_args(output, &mut enable);
        }
    }

    [disable, enable].into_iter().filter(|b| !b.is_empty()).collect()
}

/// Apply `directives`, returning how many times the tool was invoked.
/// A failed batch stops the batches after it.
pub fn apply(tool: &mut dyn DisplayTool, directives: &[OutputConfig]) -> Result<usize> {
    let batches = batches(directives);
    if batches.is_empty() {
        info!("nothing to apply");
    }
    for batch in &batches {
        tool.apply(batch)?;
    }
    Ok(batches.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::dummy::DummyDisplay;
    use crate::error::Error;
    use crate::output::parse_directives;

    fn split(line: &str) -> Vec<String> {
        line.split(' ').map(String::from).collect()
    }

    #[test]
    fn off_outputs_go_first_in_one_batch() -> Result<()> {
        let directives = parse_directives(
            "output eDP1
primary
mode 1920x1080
pos 0x0
rotate normal
output HDMI1
off
output DP1
mode 1280x1024
pos 1920x0
rotate left
output VGA1
off
",
        )?;
        assert_eq!(
            batches(&directives),
            [
                split("--output HDMI1 --off --output VGA1 --off"),
                split("--output eDP1 --mode 1920x1080 --pos 0x0 --rotate normal --primary --output DP1 --mode 1280x1024 --pos 1920x0 --rotate left"),
            ]
        );
        Ok(())
    }

    #[test]
    fn clone_relation_and_extras() -> Result<()> {
        let directives = parse_directives("output VGA1\nmode 1280x720\npos 0x0\nrate 60\nreflect x\nsame-as LVDS1\n")?;
        assert_eq!(
            batches(&directives),
            [split("--output VGA1 --mode 1280x720 --pos 0x0 --reflect x --rate 60 --same-as LVDS1")]
        );
        Ok(())
    }

    #[test]
    fn single_kind_yields_single_batch() -> Result<()> {
        assert_eq!(batches(&parse_directives("output A\noff\noutput B\noff\n")?).len(), 1);
        assert_eq!(batches(&parse_directives("output A\nmode 800x600\n")?).len(), 1);
        Ok(())
    }

    #[test]
    fn empty_directives_invoke_nothing() -> Result<()> {
        let dummy = DummyDisplay::default();
        assert_eq!(apply(&mut dummy.clone(), &[])?, 0);
        // An enabled output without settings is not a change.
        assert_eq!(apply(&mut dummy.clone(), &parse_directives("output A\n")?)?, 0);
        assert!(dummy.applied().is_empty());
        Ok(())
    }

    #[test]
    fn apply_invokes_in_batch_order() -> Result<()> {
        let dummy = DummyDisplay::default();
        let directives = parse_directives("output A\nmode 800x600\noutput B\noff\n")?;
        assert_eq!(apply(&mut dummy.clone(), &directives)?, 2);
        assert_eq!(
            dummy.applied(),
            [split("--output B --off"), split("--output A --mode 800x600")]
        );
        Ok(())
    }

    #[test]
    fn failed_disable_stops_enable() -> Result<()> {
        let dummy = DummyDisplay::default();
        dummy.set_failing(true);
        let directives = parse_directives("output A\nmode 800x600\noutput B\noff\n")?;
        assert!(matches!(
            apply(&mut dummy.clone(), &directives),
            Err(Error::ToolFailed { .. })
        ));
        assert_eq!(dummy.applied(), [split("--output B --off")]);
        Ok(())
    }
}
