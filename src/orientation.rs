//! # Orientation
//!
//! Rotation and reflection of an output, spelled the way the query tool
//! prints them and the way directives store them.

use std::fmt;
use std::str::FromStr;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Rotation {
    /// Zero degree Rotation; Don't rotate.
    #[default]
    Normal,
    /// 90 degree Counter-Clockwise Rotation; Screen "Up" will be on the left side.
    Left,
    /// 180 degree Rotation; Screen will be flipped.
    Inverted,
    /// 90 degree Clockwise Rotation; Screen "Up" will be on the right.
    Right,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Reflection {
    #[default]
    Normal,
    X,
    Y,
    XY,
}

impl Rotation {
    pub fn as_str(&self) -> &'static str {
        match *self {
            Self::Normal => "normal",
            Self::Left => "left",
            Self::Inverted => "inverted",
            Self::Right => "right",
        }
    }

    /// Whether the reported geometry has width and height swapped
    /// relative to the mode.
    pub fn swaps_axes(&self) -> bool {
        matches!(self, Self::Left | Self::Right)
    }
}

impl FromStr for Rotation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(Self::Normal),
            "left" => Ok(Self::Left),
            "inverted" => Ok(Self::Inverted),
            "right" => Ok(Self::Right),
            other => Err(format!("unknown rotation '{}'", other)),
        }
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Reflection {
    pub fn as_str(&self) -> &'static str {
        match *self {
            Self::Normal => "normal",
            Self::X => "x",
            Self::Y => "y",
            Self::XY => "xy",
        }
    }
}

impl FromStr for Reflection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(Self::Normal),
            "x" => Ok(Self::X),
            "y" => Ok(Self::Y),
            "xy" => Ok(Self::XY),
            other => Err(format!("unknown reflection '{}'", other)),
        }
    }
}

impl fmt::Display for Reflection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
