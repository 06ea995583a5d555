//! Parser for the display-query tool's per-connector report
//! (`xrandr --query --verbose`, the terse form parses too, minus EDID).

use lazy_static::lazy_static;
use regex::Regex;
use tracing::warn;

use crate::error::{Error, Result};
use crate::orientation::Rotation;
use crate::output::{Mode, OutputConfig, Position};

lazy_static! {
    static ref CONNECTOR_LINE: Regex = Regex::new(
        r"^(\S+) (connected|disconnected|unknown connection)(?: (primary))?(?: (\d+)x(\d+)\+(-?\d+)\+(-?\d+))?(?: \(0x[0-9a-fA-F]+\))?(?: (normal|left|inverted|right))?"
    )
    .unwrap();
    static ref MODE_LINE: Regex = Regex::new(r"^ +(\d+x\d+\S*)").unwrap();
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Connection {
    Connected,
    Disconnected,
    Unknown,
}

/// Active geometry as reported, i.e. already rotated.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
    pub x: i32,
    pub y: i32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Connector {
    pub name: String,
    pub connection: Connection,
    pub primary: bool,
    pub geometry: Option<Geometry>,
    pub rotation: Rotation,
    /// Available modes in report order, first is the preferred one.
    pub modes: Vec<String>,
    pub edid: Option<Vec<u8>>,
}

impl Connector {
    pub fn is_connected(&self) -> bool {
        self.connection == Connection::Connected
    }

    /// The live state of this connector as a directive record.
    pub fn live_config(&self) -> OutputConfig {
        let geometry = match (self.is_connected(), self.geometry) {
            (true, Some(geometry)) => geometry,
            _ => return OutputConfig::off(&self.name),
        };
        let (width, height) = if self.rotation.swaps_axes() {
            (geometry.height, geometry.width)
        } else {
            (geometry.width, geometry.height)
        };
        let mut config = OutputConfig::new(&self.name)
            .with_mode(Mode {
                name: format!("{}x{}", width, height),
                width,
                height,
            })
            .with_position(Position::new(geometry.x, geometry.y));
        config.primary = self.primary;
        config.rotation = Some(self.rotation);
        config
    }
}

fn number<T: std::str::FromStr>(field: &str, line: &str) -> Result<T> {
    field
        .parse()
        .map_err(|_| Error::Report(format!("number out of range in '{}'", line)))
}

pub fn parse_report(report: &str) -> Result<Vec<Connector>> {
    let mut connectors: Vec<Connector> = Vec::new();
    let mut edid_hex: Option<String> = None;

    for line in report.lines() {
        if let Some(hex) = edid_hex.as_mut() {
            let trimmed = line.trim();
            if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
                hex.push_str(trimmed);
                continue;
            }
            finish_edid(&mut connectors, edid_hex.take());
        }

        if let Some(caps) = CONNECTOR_LINE.captures(line) {
            let geometry = match (caps.get(4), caps.get(5), caps.get(6), caps.get(7)) {
                (Some(w), Some(h), Some(x), Some(y)) => Some(Geometry {
                    width: number(w.as_str(), line)?,
                    height: number(h.as_str(), line)?,
                    x: number(x.as_str(), line)?,
                    y: number(y.as_str(), line)?,
                }),
                _ => None,
            };
            connectors.push(Connector {
                name: caps[1].to_owned(),
                connection: match &caps[2] {
                    "connected" => Connection::Connected,
                    "disconnected" => Connection::Disconnected,
                    _ => Connection::Unknown,
                },
                primary: caps.get(3).is_some(),
                geometry,
                rotation: caps
                    .get(8)
                    .and_then(|r| r.as_str().parse().ok())
                    .unwrap_or_default(),
                modes: Vec::new(),
                edid: None,
            });
            continue;
        }

        let connector = match connectors.last_mut() {
            Some(connector) => connector,
            None => continue,
        };
        if line.trim() == "EDID:" {
            edid_hex = Some(String::new());
        } else if let Some(caps) = MODE_LINE.captures(line) {
            let mode = &caps[1];
            if !connector.modes.iter().any(|m| m == mode) {
                connector.modes.push(mode.to_owned());
            }
        }
    }
    finish_edid(&mut connectors, edid_hex);

    Ok(connectors)
}

fn finish_edid(connectors: &mut [Connector], hex: Option<String>) {
    let (connector, hex) = match (connectors.last_mut(), hex) {
        (Some(connector), Some(hex)) if !hex.is_empty() => (connector, hex),
        _ => return,
    };
    match hex::decode(&hex) {
        Ok(bytes) => connector.edid = Some(bytes),
        Err(e) => warn!("ignoring malformed EDID of {}: {}", connector.name, e),
    }
}

/// Live configuration of every connector, in report order.
pub fn live_config(connectors: &[Connector]) -> Vec<OutputConfig> {
    connectors.iter().map(Connector::live_config).collect()
}
