//! Parsing of the player's `key: value` status dump (`mocp -i`).

use std::collections::HashMap;

use thiserror::Error;

use crate::PlaybackStatus;

/// One `key: value` line of the status dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry<'a> {
    /// Text before the first colon.
    pub key: &'a str,
    /// Text after the first `": "`.
    pub value: &'a str,
}

/// Why a status line was skipped.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// The line has no colon at all.
    #[error("line has no key")]
    MissingKey,

    /// The line starts with a colon.
    #[error("line has an empty key")]
    EmptyKey,

    /// The first colon is not followed by a space.
    #[error("line has no value")]
    MissingValue,
}

/// Split one status line into its key and value.
///
/// ```rust
/// use moc_mpris::status::{parse_line, Entry, ParseError};
///
/// assert_eq!(
///     parse_line("CurrentTime: 01:23"),
///     Ok(Entry { key: "CurrentTime", value: "01:23" })
/// );
/// assert_eq!(parse_line("garbage"), Err(ParseError::MissingKey));
/// ```
pub fn parse_line(line: &str) -> Result<Entry<'_>, ParseError> {
    let (key, rest) = line.split_once(':').ok_or(ParseError::MissingKey)?;
    if key.is_empty() {
        return Err(ParseError::EmptyKey);
    }
    let value = rest.strip_prefix(' ').ok_or(ParseError::MissingValue)?;
    Ok(Entry { key, value })
}

/// The parsed status dump: status key to raw string value.
///
/// Absent keys mean "unknown". A fresh `RawStatus` is built on every refresh; it is never
/// patched in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawStatus {
    values: HashMap<String, String>,
}

impl RawStatus {
    /// Parse a complete status dump. Lines that do not parse are skipped.
    pub fn parse(raw: &str) -> Self {
        RawStatus {
            values: raw
                .lines()
                .filter_map(|line| parse_line(line).ok())
                .map(|entry| (entry.key.to_owned(), entry.value.to_owned()))
                .collect(),
        }
    }

    /// Returns the raw value of a status key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Returns the value of a status key, treating a blank value as absent.
    pub fn get_nonempty(&self, key: &str) -> Option<&str> {
        self.get(key).map(str::trim).filter(|value| !value.is_empty())
    }

    /// Returns a status key parsed as a whole number of seconds.
    pub fn seconds(&self, key: &str) -> Option<u64> {
        self.get_nonempty(key).and_then(|value| value.parse().ok())
    }

    /// The player's own `State` field.
    pub fn state(&self) -> PlayerState {
        match self.get("State") {
            Some("PLAY") => PlayerState::Play,
            Some("PAUSE") => PlayerState::Pause,
            Some("STOP") => PlayerState::Stop,
            Some(_) | None => PlayerState::Unknown,
        }
    }

    /// `true` when the player is not playing anything: no `State` key, or `State: STOP`.
    pub fn is_idle(&self) -> bool {
        matches!(self.state(), PlayerState::Stop | PlayerState::Unknown)
    }

    /// Number of parsed keys.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// `true` if nothing was parsed.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<HashMap<String, String>> for RawStatus {
    fn from(values: HashMap<String, String>) -> Self {
        RawStatus { values }
    }
}

/// The `State` reported by the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    /// `PLAY`
    Play,
    /// `PAUSE`
    Pause,
    /// `STOP`
    Stop,
    /// Missing or unrecognised.
    Unknown,
}

impl From<PlayerState> for PlaybackStatus {
    fn from(state: PlayerState) -> Self {
        match state {
            PlayerState::Play => PlaybackStatus::Playing,
            PlayerState::Pause => PlaybackStatus::Paused,
            PlayerState::Stop | PlayerState::Unknown => PlaybackStatus::Stopped,
        }
    }
}
