use std::path::PathBuf;

use super::{run, DisplayTool};
use crate::error::Result;

pub struct Xrandr {
    program: PathBuf,
}

impl Xrandr {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Xrandr {
            program: program.into(),
        }
    }
}

impl DisplayTool for Xrandr {
    fn query(&mut self) -> Result<String> {
        run(
            &self.program,
            &["--query".to_owned(), "--verbose".to_owned()],
            None,
        )
    }

    fn apply(&mut self, args: &[String]) -> Result<()> {
        run(&self.program, args, None).map(drop)
    }
}
