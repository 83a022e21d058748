//! CVM message vocabulary shared with the connection client.
//!
//! The client parses the device's byte stream into [`Message`] values and
//! serialises outbound [`Message`]s back into commands. Nothing in this
//! module knows about the wire format.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Address of a motor on the CVM.
///
/// [`All`](Self::All) is the device-wide broadcast address; `A`..`D` address
/// one physical screen drive each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Motor {
    #[serde(rename = "ALL")]
    All,
    A,
    B,
    C,
    D,
}

impl Motor {
    /// Every address, broadcast first.
    pub const ADDRESSES: [Self; 5] = [Self::All, Self::A, Self::B, Self::C, Self::D];

    /// The individually addressable motors.
    pub const PHYSICAL: [Self; 4] = [Self::A, Self::B, Self::C, Self::D];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
        }
    }
}

impl fmt::Display for Motor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown motor address.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown motor address {0:?}")]
pub struct UnknownMotor(pub String);

impl FromStr for Motor {
    type Err = UnknownMotor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ALL" | "all" => Ok(Self::All),
            "A" | "a" => Ok(Self::A),
            "B" | "b" => Ok(Self::B),
            "C" | "c" => Ok(Self::C),
            "D" | "d" => Ok(Self::D),
            other => Err(UnknownMotor(other.to_string())),
        }
    }
}

/// Whether a message is a command (host → device, or echoed back) or an
/// unsolicited event from the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Command,
    Event,
}

/// What a query command asks the device to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryKind {
    Position,
    Status,
}

/// Command label plus its value, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "command", content = "value")]
pub enum Command {
    Up,
    Down,
    Stop,
    /// Move every motor to a stored preset.
    Recall(u32),
    /// Store the current motor positions under a preset number.
    Store(u32),
    Query(QueryKind),
}

/// Motor status reported by a status event.
///
/// Known values match regardless of case, in text and in serde alike.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Status {
    Stop,
    Retracting,
    Extending,
    Home,
    End,
    /// A status value this integration does not know about.
    Other(String),
}

impl Status {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Stop => "stop",
            Self::Retracting => "retracting",
            Self::Extending => "extending",
            Self::Home => "home",
            Self::End => "end",
            Self::Other(raw) => raw,
        }
    }
}

impl FromStr for Status {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "stop" => Self::Stop,
            "retracting" => Self::Retracting,
            "extending" => Self::Extending,
            "home" => Self::Home,
            "end" => Self::End,
            _ => Self::Other(s.to_string()),
        })
    }
}

impl From<String> for Status {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(status) => status,
            Err(never) => match never {},
        }
    }
}

impl From<Status> for String {
    fn from(status: Status) -> Self {
        match status {
            Status::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event label plus its value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "event", content = "value")]
pub enum Event {
    Status(Status),
    /// Percent extended, exactly as the device reported it (e.g. `"42.5"`).
    Position(String),
}

/// Body of a [`Message`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Command(Command),
    Event(Event),
}

/// One parsed CVM message, addressed to exactly one motor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub motor: Motor,
    #[serde(flatten)]
    pub payload: Payload,
}

impl Message {
    /// Build a command message for `motor`.
    #[must_use]
    pub fn command(motor: Motor, command: Command) -> Self {
        Self {
            motor,
            payload: Payload::Command(command),
        }
    }

    /// Build a query asking `motor` to report its position or status.
    #[must_use]
    pub fn query(motor: Motor, kind: QueryKind) -> Self {
        Self::command(motor, Command::Query(kind))
    }

    /// Build an event message, as the client would after parsing.
    #[must_use]
    pub fn event(motor: Motor, event: Event) -> Self {
        Self {
            motor,
            payload: Payload::Event(event),
        }
    }

    #[must_use]
    pub fn kind(&self) -> MessageKind {
        match self.payload {
            Payload::Command(_) => MessageKind::Command,
            Payload::Event(_) => MessageKind::Event,
        }
    }
}
