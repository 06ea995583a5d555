//! Layouts for the virtual profiles, computed from the live mode lists.

use tracing::{debug, warn};

use crate::output::{Mode, OutputConfig, Position};
use crate::profile::VirtualProfile;
use crate::query::Connector;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

pub fn synthesize(profile: VirtualProfile, connectors: &[Connector]) -> Vec<OutputConfig> {
    match profile {
        VirtualProfile::Common => common(connectors),
        VirtualProfile::Horizontal => stack(connectors, Axis::Horizontal),
        VirtualProfile::Vertical => stack(connectors, Axis::Vertical),
    }
}

/// Largest mode every connected output supports, compared by name.
/// Ties go to the lexically first name.
fn largest_common_mode(connected: &[&Connector]) -> Option<Mode> {
    let (first, rest) = connected.split_first()?;
    let mut candidates: Vec<&String> = first
        .modes
        .iter()
        .filter(|mode| rest.iter().all(|c| c.modes.contains(mode)))
        .collect();
    candidates.sort();

    let mut best: Option<Mode> = None;
    for mode in candidates.into_iter().filter_map(|name| Mode::parse(name)) {
        if best.as_ref().map_or(true, |b| mode.area() > b.area()) {
            best = Some(mode);
        }
    }
    best
}

/// Clone every connected output onto the first one, by connector name.
pub fn common(connectors: &[Connector]) -> Vec<OutputConfig> {
    let mut sorted: Vec<&Connector> = connectors.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));
    let connected: Vec<&Connector> = sorted.iter().copied().filter(|c| c.is_connected()).collect();

    let mode = largest_common_mode(&connected);
    if mode.is_none() {
        warn!("connected outputs share no mode, leaving them untouched");
    }
    let leader = connected.first().map(|c| c.name.as_str());

    let mut outputs = Vec::new();
    for connector in sorted {
        if !connector.is_connected() {
            outputs.push(OutputConfig::off(&connector.name));
            continue;
        }
        let (mode, leader) = match (&mode, leader) {
            (Some(mode), Some(leader)) => (mode, leader),
            _ => continue,
        };
        let mut output = OutputConfig::new(&connector.name)
            .with_mode(mode.clone())
            .with_position(Position::new(0, 0));
        if connector.name != leader {
            output = output.with_same_as(leader);
        }
        outputs.push(output);
    }
    outputs
}

/// Tile connected outputs at their preferred mode, in report order.
pub fn stack(connectors: &[Connector], axis: Axis) -> Vec<OutputConfig> {
    let mut outputs = Vec::new();
    let mut offset: i32 = 0;

    for connector in connectors {
        if !connector.is_connected() {
            outputs.push(OutputConfig::off(&connector.name));
            continue;
        }
        let mode = match connector.modes.first().and_then(|m| Mode::parse(m)) {
            Some(mode) => mode,
            None => {
                warn!("{} is connected but reports no usable mode", connector.name);
                continue;
            }
        };
        let (position, extent) = match axis {
            Axis::Horizontal => (Position::new(offset, 0), mode.width),
            Axis::Vertical => (Position::new(0, offset), mode.height),
        };
        debug!("{} at {} with {}", connector.name, position, mode);
        offset = offset.saturating_add(i32::try_from(extent).unwrap_or(i32::MAX));
        outputs.push(OutputConfig::new(&connector.name).with_mode(mode).with_position(position));
    }
    outputs
}
