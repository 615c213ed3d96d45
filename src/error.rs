use std::io;

use thiserror::Error;

use crate::property::Interface;

/// Running a control command against the player failed.
///
/// These are always recovered from inside the bridge: a failed query reads as "no data" and the
/// next poll tick simply tries again.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The program (or the ssh client) could not be started at all.
    #[error("could not start {program}: {source}")]
    Spawn {
        /// The program that failed to start.
        program: String,
        /// Underlying OS error.
        source: io::Error,
    },

    /// The command ran but exited unsuccessfully. The captured output is kept for diagnostics.
    #[error("{program} exited with code {code:?}: {}", .output.trim())]
    Failed {
        /// The program that was run.
        program: String,
        /// Exit code, `None` when the process was killed by a signal.
        code: Option<i32>,
        /// Combined standard output and standard error.
        output: String,
    },

    /// The command did not finish within the configured timeout and was killed.
    #[error("{program} did not finish within {timeout_ms}ms")]
    TimedOut {
        /// The program that was run.
        program: String,
        /// The timeout that expired.
        timeout_ms: u128,
    },

    /// Reading the command output failed.
    #[error("I/O error while talking to {program}: {source}")]
    Io {
        /// The program that was run.
        program: String,
        /// Underlying OS error.
        source: io::Error,
    },

    /// An empty command line was given.
    #[error("empty command line")]
    EmptyCommand,
}

/// Errors surfaced by the bridge's own property and command surface.
#[derive(Error, Debug)]
pub enum Error {
    /// The interface name is not registered on the bridge object.
    #[error("unknown interface {0}")]
    UnknownInterface(String),

    /// The property name is not registered on the given interface.
    #[error("unknown property {name} on {interface}")]
    UnknownProperty {
        /// Interface that was queried.
        interface: Interface,
        /// Property name that was requested.
        name: String,
    },

    /// The property has no setter.
    #[error("property {name} on {interface} is read-only")]
    ReadOnlyProperty {
        /// Interface that was queried.
        interface: Interface,
        /// Property name that was written.
        name: String,
    },

    /// The value given to a setter has the wrong type.
    #[error("invalid value for {name}: expected {expected}")]
    InvalidValue {
        /// Property name that was written.
        name: String,
        /// Human readable description of what the setter accepts.
        expected: &'static str,
    },

    /// The player could not be queried when the bridge started.
    #[error("the player is not reachable: {0}")]
    UnreachablePlayer(#[source] TransportError),

    /// The bridge has not performed its first refresh yet.
    #[error("the bridge is not connected to the player yet")]
    NotConnected,

    /// The bridge was shut down; no operation is valid any more.
    #[error("the bridge has been terminated")]
    Terminated,

    /// A command could not be delivered to the player.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The message bus failed.
    #[error("D-Bus error: {0}")]
    DBus(#[from] zbus::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
