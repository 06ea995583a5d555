//! Per-output configuration and the line oriented directive format
//! profiles store it in.
//!
//! ```text
//! output eDP1
//! primary
//! mode 1920x1080
//! pos 0x0
//! rotate normal
//! output HDMI1
//! off
//! ```

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{Error, Result};
use crate::orientation::{Reflection, Rotation};

lazy_static! {
    static ref MODE_SIZE: Regex = Regex::new(r"^(\d+)x(\d+)").unwrap();
}

/// A mode name as the query tool reports it, e.g. `1920x1080` or `1920x1080i`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mode {
    pub name: String,
    pub width: u32,
    pub height: u32,
}

impl Mode {
    pub fn parse(name: &str) -> Option<Self> {
        let caps = MODE_SIZE.captures(name)?;
        Some(Mode {
            name: name.to_owned(),
            width: caps[1].parse().ok()?,
            height: caps[2].parse().ok()?,
        })
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Position { x, y }
    }

    /// Parse the `XxY` form used by `pos`.
    pub fn parse(s: &str) -> Option<Self> {
        let (x, y) = s.split_once('x')?;
        Some(Position {
            x: x.parse().ok()?,
            y: y.parse().ok()?,
        })
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.x, self.y)
    }
}

/// Desired state of one connector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputConfig {
    pub name: String,
    pub enabled: bool,
    pub primary: bool,
    pub mode: Option<Mode>,
    pub position: Option<Position>,
    pub rotation: Option<Rotation>,
    pub reflection: Option<Reflection>,
    pub rate: Option<String>,
    /// Mirror the geometry of another output.
    pub same_as: Option<String>,
}

impl OutputConfig {
    pub fn new(name: &str) -> Self {
        OutputConfig {
            name: name.into(),
            enabled: true,
            primary: false,
            mode: None,
            position: None,
            rotation: None,
            reflection: None,
            rate: None,
            same_as: None,
        }
    }

    pub fn off(name: &str) -> Self {
        OutputConfig {
            enabled: false,
            ..OutputConfig::new(name)
        }
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_same_as(mut self, other: &str) -> Self {
        self.same_as = Some(other.into());
        self
    }

    /// Whether an enabled output carries anything the apply tool could act on.
    pub fn has_settings(&self) -> bool {
        self.primary
            || self.mode.is_some()
            || self.position.is_some()
            || self.rotation.is_some()
            || self.reflection.is_some()
            || self.rate.is_some()
            || self.same_as.is_some()
    }

    fn apply_directive(&mut self, keyword: &str, value: Option<&str>) -> std::result::Result<(), String> {
        let required = || value.ok_or_else(|| format!("'{}' needs a value", keyword));
        match keyword {
            "off" => self.enabled = false,
            "primary" => self.primary = true,
            "mode" => {
                let value = required()?;
                self.mode = Some(Mode::parse(value).ok_or_else(|| format!("invalid mode '{}'", value))?);
            }
            "pos" => {
                let value = required()?;
                self.position =
                    Some(Position::parse(value).ok_or_else(|| format!("invalid position '{}'", value))?);
            }
            "rotate" => self.rotation = Some(required()?.parse()?),
            "reflect" => self.reflection = Some(required()?.parse()?),
            "rate" => self.rate = Some(required()?.to_owned()),
            "same-as" => self.same_as = Some(required()?.to_owned()),
            other => return Err(format!("unknown directive '{}'", other)),
        }
        Ok(())
    }
}

impl fmt::Display for OutputConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "output {}", self.name)?;
        if !self.enabled {
            return writeln!(f, "off");
        }
        if self.primary {
            writeln!(f, "primary")?;
        }
        if let Some(mode) = &self.mode {
            writeln!(f, "mode {}", mode)?;
        }
        if let Some(position) = &self.position {
            writeln!(f, "pos {}", position)?;
        }
        if let Some(rotation) = &self.rotation {
            writeln!(f, "rotate {}", rotation)?;
        }
        if let Some(reflection) = &self.reflection {
            writeln!(f, "reflect {}", reflection)?;
        }
        if let Some(rate) = &self.rate {
            writeln!(f, "rate {}", rate)?;
        }
        if let Some(other) = &self.same_as {
            writeln!(f, "same-as {}", other)?;
        }
        Ok(())
    }
}

/// Tokenize directive text into per-output records, in first-seen order.
pub fn parse_directives(text: &str) -> Result<Vec<OutputConfig>> {
    let mut outputs: Vec<OutputConfig> = Vec::new();
    let mut current: Option<usize> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut words = line.split_whitespace();
        let keyword = words.next().unwrap_or_default();
        let value = words.next();
        let err = |message: String| Error::Directive {
            line: idx + 1,
            message,
        };
        if words.next().is_some() {
            return Err(err(format!("trailing arguments after '{}'", keyword)));
        }

        if keyword == "output" {
            let name = value.ok_or_else(|| err("'output' needs a name".into()))?;
            current = Some(match outputs.iter().position(|o| o.name == name) {
                Some(existing) => existing,
                None => {
                    outputs.push(OutputConfig::new(name));
                    outputs.len() - 1
                }
            });
            continue;
        }

        let idx_out = current.ok_or_else(|| err(format!("'{}' before any 'output'", keyword)))?;
        outputs[idx_out].apply_directive(keyword, value).map_err(err)?;
    }

    Ok(outputs)
}

pub fn render_directives(outputs: &[OutputConfig]) -> String {
    outputs.iter().map(|o| o.to_string()).collect()
}
