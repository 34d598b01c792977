//! Shared domain models for timetables, run state, and snapshots.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;

/// Platform side that opens for passengers at a station.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DockSide {
    /// Doors open on the left side.
    Left,
    /// Doors open on the right side.
    Right,
    /// Doors open on both sides.
    Both,
    /// No dock restriction recorded.
    #[default]
    None,
}

/// Travel direction of the current service.
///
/// `up`/`down` are the conventional values; anything else pushed by a
/// driving application is preserved verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Direction {
    /// Up/outbound service.
    Up,
    /// Down/inbound service.
    Down,
    /// Free-form direction label.
    Other(String),
}

impl Default for Direction {
    fn default() -> Self {
        Direction::Other(String::new())
    }
}

impl From<String> for Direction {
    fn from(value: String) -> Self {
        match value.as_str() {
            "up" => Direction::Up,
            "down" => Direction::Down,
            _ => Direction::Other(value),
        }
    }
}

impl From<Direction> for String {
    fn from(value: Direction) -> Self {
        match value {
            Direction::Up => "up".to_string(),
            Direction::Down => "down".to_string(),
            Direction::Other(value) => value,
        }
    }
}

/// A single stop on the published route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    /// Display name shown to passengers.
    pub name: String,
    /// Optional English/alternate name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub en: Option<String>,
    /// Which platform side opens at this station.
    #[serde(default)]
    pub dock: DockSide,
}

impl Station {
    /// Station with just a display name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            en: None,
            dock: DockSide::None,
        }
    }
}

/// Ordered station sequence plus line identity, replaced wholesale on sync.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timetable {
    /// Stations in physical route order.
    #[serde(default)]
    pub stations: Vec<Station>,
    /// Line name shown on displays.
    #[serde(default)]
    pub line_name: String,
    /// Travel direction of the service.
    #[serde(default)]
    pub direction: Direction,
    /// Free-form train identifier.
    #[serde(default)]
    pub train_number: String,
    /// Opaque passthrough metadata; not interpreted by the core.
    #[serde(default)]
    pub meta: HashMap<String, String>,
}

impl Timetable {
    /// Reject a timetable whose stations are unusable for display.
    ///
    /// An empty station list is valid and means "no line loaded".
    pub fn validate(&self) -> Result<(), CoreError> {
        for (idx, station) in self.stations.iter().enumerate() {
            if station.name.trim().is_empty() {
                return Err(CoreError::Validation(format!(
                    "station {idx} has an empty name"
                )));
            }
        }
        Ok(())
    }

    /// Number of stations on the route.
    pub fn len(&self) -> usize {
        self.stations.len()
    }

    /// True when no line is loaded.
    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}

/// Arrival/departure phase at the current station.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    /// The train is at the platform.
    #[default]
    Arrived,
    /// The train has left the current station.
    Departed,
}

impl Phase {
    /// Wire value of the phase (0 = arrived, 1 = departed).
    pub fn as_u8(self) -> u8 {
        match self {
            Phase::Arrived => 0,
            Phase::Departed => 1,
        }
    }
}

impl TryFrom<i64> for Phase {
    type Error = CoreError;

    fn try_from(value: i64) -> Result<Self, CoreError> {
        match value {
            0 => Ok(Phase::Arrived),
            1 => Ok(Phase::Departed),
            other => Err(CoreError::InvalidPhase(other)),
        }
    }
}

impl Serialize for Phase {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for Phase {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = i64::deserialize(deserializer)?;
        Phase::try_from(raw).map_err(de::Error::custom)
    }
}

/// Cursor over the live timetable: current station index and phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
    /// Index into the live timetable's stations.
    pub idx: usize,
    /// Current arrival/departure phase.
    pub state: Phase,
}

impl RunState {
    /// Replace the cursor, bounds-checked against a timetable of `len`
    /// stations. An empty timetable only accepts index 0.
    pub fn set(&mut self, idx: i64, phase: Phase, len: usize) -> Result<(), CoreError> {
        let max = len.saturating_sub(1) as i64;
        if idx < 0 || idx > max {
            return Err(CoreError::OutOfRange { idx, len });
        }
        self.idx = idx as usize;
        self.state = phase;
        Ok(())
    }

    /// Pull the index back into the bounds of a timetable of `len` stations.
    pub fn clamp(&mut self, len: usize) {
        let max = len.saturating_sub(1);
        if self.idx > max {
            self.idx = max;
        }
    }

    /// Move to the next station, resetting the phase to arrived.
    /// Returns false (no-op) when already at the end of the line.
    pub fn advance(&mut self, len: usize) -> bool {
        if len == 0 || self.idx + 1 >= len {
            return false;
        }
        self.idx += 1;
        self.state = Phase::Arrived;
        true
    }

    /// Move to the previous station, resetting the phase to arrived.
    /// Returns false (no-op) when already at the first station.
    pub fn retreat(&mut self) -> bool {
        if self.idx == 0 {
            return false;
        }
        self.idx -= 1;
        self.state = Phase::Arrived;
        true
    }

    /// Set the phase to arrived, regardless of the current phase.
    pub fn arrive(&mut self) {
        self.state = Phase::Arrived;
    }

    /// Set the phase to departed, regardless of the current phase.
    pub fn depart(&mut self) {
        self.state = Phase::Departed;
    }
}

/// Immutable copy of the published state, captured under the state lock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Timetable live at capture time.
    pub timetable: Timetable,
    /// Run state live at capture time.
    pub run: RunState,
    /// Timestamp of the last successful sync, if any.
    #[serde(default)]
    pub synced_at: Option<DateTime<Utc>>,
}
