//! Operator command dispatch.

use crate::error::CoreError;

/// Closed set of commands accepted by the control surface.
///
/// Wire dispatch uses a free-form `command` tag; [`Command::parse`] turns
/// it into a variant and rejects anything outside the set instead of
/// silently ignoring it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Advance to the next station.
    Next,
    /// Return to the previous station.
    Prev,
    /// Mark the current station as arrived.
    Arrive,
    /// Mark the current station as departed.
    Depart,
    /// Forward a raw key code to the displays, uninterpreted.
    Key(String),
}

impl Command {
    /// Build a command from the wire pair `(command, keyCode)`.
    pub fn parse(tag: &str, key_code: Option<String>) -> Result<Self, CoreError> {
        match tag {
            "next" => Ok(Command::Next),
            "prev" => Ok(Command::Prev),
            "arrive" => Ok(Command::Arrive),
            "depart" => Ok(Command::Depart),
            "key" => {
                let code = key_code
                    .map(|value| value.trim().to_string())
                    .filter(|value| !value.is_empty())
                    .ok_or(CoreError::MissingKeyCode)?;
                Ok(Command::Key(code))
            }
            other => Err(CoreError::UnknownCommand(other.to_string())),
        }
    }

    /// Wire tag of the command, for logging and response messages.
    pub fn tag(&self) -> &'static str {
        match self {
            Command::Next => "next",
            Command::Prev => "prev",
            Command::Arrive => "arrive",
            Command::Depart => "depart",
            Command::Key(_) => "key",
        }
    }
}
