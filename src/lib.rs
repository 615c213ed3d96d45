#![warn(missing_docs)]
#![deny(
    missing_debug_implementations,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications
)]

//!
//! # moc-mpris
//!
//! `moc-mpris` makes a [MOC](https://moc.daper.net/) music player controllable as an
//! MPRIS2-compatible media player over D-Bus.
//!
//! The player is never linked against; its control program (`mocp`) is run locally or on another
//! machine through `ssh`, its `key: value` status dump is parsed, and the result is served as the
//! `org.mpris.MediaPlayer2` object with change notifications computed by diffing snapshots.
//!
//! ## Getting started
//!
//! 1. Build a [`Transport`] for the machine the player runs on (see [`SystemTransport`]).
//! 2. Build a [`Bridge`] with it and [`Bridge::connect`].
//! 3. Hand both a session bus connection and the bridge to [`Server::run`].
//!

mod art;
mod bridge;
mod config;
mod diff;
mod error;
mod interfaces;
mod metadata;
pub mod mixer;
mod property;
mod schedule;
mod server;
pub mod status;
mod target;
mod transport;
mod value;

pub use art::{ArtLookup, CachedArt, MusicBrainzArt, NoArt, DEFAULT_ART_CACHE_CAPACITY};
pub use bridge::{Bridge, BridgeOptions, ConnectionState, Signal};
pub use config::{Args, Config, ConfigError};
pub use diff::{changed, ChangeSet, SnapshotCache, POSITION};
pub use error::{Error, Result, TransportError};
pub use interfaces::table as property_table;
pub use metadata::{Metadata, TRACK_ID};
pub use property::{
    Getter, Interface, InterfaceProperties, PropertyDescriptor, PropertyTable, SetOutcome, Setter,
    Snapshot, PLAYER_INTERFACE, PLAYLISTS_INTERFACE, ROOT_INTERFACE, TRACK_LIST_INTERFACE,
};
pub use schedule::PollScheduler;
pub use server::{dbus_error, introspect, Server};
pub use target::{ConnectionTarget, TargetError};
pub use transport::{argv, shell_quote, SystemTransport, Transport};
pub use value::Value;

/// Well-known bus name claimed by the bridge.
pub const BUS_NAME: &str = "org.mpris.MediaPlayer2.moc_mpris";

/// Object path the MPRIS interfaces are served at.
pub const OBJECT_PATH: &str = "/org/mpris/MediaPlayer2";

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub enum PlaybackStatus {
    Playing,
    Paused,
    Stopped,
}

/// `PlaybackStatus` had an invalid string value.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("PlaybackStatus must be one of Playing, Paused, Stopped, but was {0}")]
pub struct InvalidPlaybackStatus(String);

impl ::std::str::FromStr for PlaybackStatus {
    type Err = InvalidPlaybackStatus;

    fn from_str(string: &str) -> ::std::result::Result<Self, Self::Err> {
        use PlaybackStatus::*;

        match string {
            "Playing" => Ok(Playing),
            "Paused" => Ok(Paused),
            "Stopped" => Ok(Stopped),
            other => Err(InvalidPlaybackStatus(other.to_string())),
        }
    }
}

impl PlaybackStatus {
    /// The MPRIS spelling of the status.
    pub fn as_str(self) -> &'static str {
        match self {
            PlaybackStatus::Playing => "Playing",
            PlaybackStatus::Paused => "Paused",
            PlaybackStatus::Stopped => "Stopped",
        }
    }
}

impl ::std::fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
        f.write_str(self.as_str())
    }
}


#[cfg(all(test, feature = "serde"))]
mod serde_tests {
    use super::*;
    use serde_test::{assert_tokens, Token};

    #[test]
    fn test_playback_status() {
        assert_tokens(
            &PlaybackStatus::Paused,
            &[Token::UnitVariant {
                name: "PlaybackStatus",
                variant: "Paused",
            }],
        );
    }
}
