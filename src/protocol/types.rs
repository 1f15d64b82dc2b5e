//! Wire-level value types shared between the protocol and the room state machine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque, client-minted session identifier.
///
/// The server never mints one of these; it accepts the first value declared
/// on a connection's `auth` frame and trusts it for that connection's
/// lifetime. Typically a UUID, but the server treats it as an opaque string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Room identity is the room code itself: six characters drawn from an
/// alphabet with visually ambiguous characters removed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RoomId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Colour of a seated player / side to move. Serializes to the single
/// letters the wire protocol and persistence interface use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    White,
    Black,
}

impl Color {
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Color::White => "w",
            Color::Black => "b",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Color {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        match raw.as_str() {
            "w" => Ok(Color::White),
            "b" => Ok(Color::Black),
            other => Err(serde::de::Error::custom(format!(
                "invalid color `{other}`, expected `w` or `b`"
            ))),
        }
    }
}

impl From<shakmaty::Color> for Color {
    fn from(value: shakmaty::Color) -> Self {
        match value {
            shakmaty::Color::White => Color::White,
            shakmaty::Color::Black => Color::Black,
        }
    }
}

impl From<Color> for shakmaty::Color {
    fn from(value: Color) -> Self {
        match value {
            Color::White => shakmaty::Color::White,
            Color::Black => shakmaty::Color::Black,
        }
    }
}

/// A parsed, validated time control: either untimed or minutes+increment.
/// The matchmaker-only wildcard `"any"` is deliberately not representable
/// here — it is normalised to a concrete control before a Room ever sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeControl {
    Untimed,
    Clocked { minutes: u32, increment_secs: u32 },
}

impl TimeControl {
    pub const DEFAULT: TimeControl = TimeControl::Clocked {
        minutes: 5,
        increment_secs: 0,
    };

    #[must_use]
    pub const fn starting_ms(self) -> Option<i64> {
        match self {
            TimeControl::Untimed => None,
            TimeControl::Clocked { minutes, .. } => Some(minutes as i64 * 60_000),
        }
    }

    #[must_use]
    pub const fn increment_ms(self) -> i64 {
        match self {
            TimeControl::Untimed => 0,
            TimeControl::Clocked { increment_secs, .. } => increment_secs as i64 * 1000,
        }
    }
}

impl fmt::Display for TimeControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeControl::Untimed => f.write_str("none"),
            TimeControl::Clocked {
                minutes,
                increment_secs,
            } => write!(f, "{minutes}+{increment_secs}"),
        }
    }
}

impl Serialize for TimeControl {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TimeControl {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        TimeControl::from_str(&raw).map_err(serde::de::Error::custom)
    }
}

/// Error returned when a time-control string doesn't match the grammar
/// `^\d+\+\d+$` or one of the literals `none` / `any`.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid time control `{0}`, expected \"M+S\" or \"none\"")]
pub struct ParseTimeControlError(pub String);

impl FromStr for TimeControl {
    type Err = ParseTimeControlError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if raw == "none" {
            return Ok(TimeControl::Untimed);
        }
        let Some((minutes_str, increment_str)) = raw.split_once('+') else {
            return Err(ParseTimeControlError(raw.to_string()));
        };
        let minutes: u32 = minutes_str
            .parse()
            .map_err(|_| ParseTimeControlError(raw.to_string()))?;
        let increment_secs: u32 = increment_str
            .parse()
            .map_err(|_| ParseTimeControlError(raw.to_string()))?;
        Ok(TimeControl::Clocked {
            minutes,
            increment_secs,
        })
    }
}

/// A matchmaking tag: either a concrete time control or the `"any"`
/// wildcard. Distinct from [`TimeControl`] because `any` is only ever
/// meaningful as a queue key, never as a Room's time control.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TimeControlTag {
    Any,
    Control(TimeControl),
}

impl TimeControlTag {
    #[must_use]
    pub fn as_tag_str(&self) -> String {
        match self {
            TimeControlTag::Any => "any".to_string(),
            TimeControlTag::Control(tc) => tc.to_string(),
        }
    }
}

impl FromStr for TimeControlTag {
    type Err = ParseTimeControlError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if raw == "any" {
            return Ok(TimeControlTag::Any);
        }
        TimeControl::from_str(raw).map(TimeControlTag::Control)
    }
}

impl Serialize for TimeControlTag {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.as_tag_str())
    }
}

impl<'de> Deserialize<'de> for TimeControlTag {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        TimeControlTag::from_str(&raw).map_err(serde::de::Error::custom)
    }
}

/// Live clock values as sent on the wire, milliseconds remaining per side.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClockSnapshot {
    pub w: i64,
    pub b: i64,
}

/// A single recorded ply in a room's move log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveRecord {
    pub ply: u32,
    pub san: String,
    pub fen: String,
    pub timestamp_ms: i64,
    pub side: Color,
}
