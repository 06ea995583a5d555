use std::path::PathBuf;

use super::{run, AlternateTool};
use crate::error::Result;

pub struct Disper {
    program: PathBuf,
}

impl Disper {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Disper {
            program: program.into(),
        }
    }
}

impl AlternateTool for Disper {
    fn list(&mut self) -> Result<String> {
        run(&self.program, &["-l".to_owned()], None)
    }

    fn print(&mut self) -> Result<String> {
        run(&self.program, &["-p".to_owned()], None)
    }

    fn import(&mut self, config: &str) -> Result<()> {
        run(&self.program, &["-i".to_owned()], Some(config)).map(drop)
    }
}
