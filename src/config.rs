//! Command line and environment configuration of the `moc-mpris` daemon.

use std::time::Duration;

use clap::Parser;
use thiserror::Error;
use tracing::info;

use crate::bridge::BridgeOptions;
use crate::target::ConnectionTarget;

/// Expose a MOC player (local or over ssh) as an MPRIS media player on the session bus.
#[derive(Parser, Debug, Clone)]
#[command(name = "moc-mpris")]
#[command(version)]
pub struct Args {
    /// Remote player as `[user@]host`. The local player is used when omitted.
    #[arg(env = "MOC_MPRIS_REMOTE")]
    pub remote: Option<ConnectionTarget>,

    /// The player's control program
    #[arg(long, env = "MOC_MPRIS_PLAYER_COMMAND", default_value = "mocp")]
    pub player_command: String,

    /// Mixer control whose level is reported as the volume
    #[arg(long, env = "MOC_MPRIS_MIXER_CONTROL", default_value = "Digital")]
    pub mixer_control: String,

    /// Poll interval in milliseconds
    #[arg(long, env = "MOC_MPRIS_POLL_INTERVAL_MS", default_value = "1000")]
    pub poll_interval_ms: u64,

    /// Time after which a control command is killed, in milliseconds
    #[arg(long, env = "MOC_MPRIS_COMMAND_TIMEOUT_MS", default_value = "5000")]
    pub command_timeout_ms: u64,

    /// Wait after Next and Previous before reading the new track, in milliseconds
    #[arg(long, env = "MOC_MPRIS_SETTLE_DELAY_MS", default_value = "500")]
    pub settle_delay_ms: u64,

    /// Consecutive failed status queries after which the bridge exits
    #[arg(long, env = "MOC_MPRIS_MAX_FAILED_REFRESHES", default_value = "3")]
    pub max_failed_refreshes: u32,

    /// Only report state; refuse every control command
    #[arg(long, env = "MOC_MPRIS_READ_ONLY")]
    pub read_only: bool,

    /// Do not look up album art online
    #[arg(long, env = "MOC_MPRIS_NO_ART")]
    pub no_art: bool,

    /// Terminal emulator used to raise the player's interface
    #[arg(long, env = "MOC_MPRIS_TERMINAL", default_value = "xterm")]
    pub terminal: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, env = "MOC_MPRIS_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// The command line made no sense.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A duration that must be positive was zero.
    #[error("{0} must be positive")]
    ZeroDuration(&'static str),

    /// The failure threshold was zero.
    #[error("max failed refreshes must be at least 1")]
    ZeroFailureThreshold,

    /// An empty program name.
    #[error("{0} must not be empty")]
    EmptyProgram(&'static str),

    /// Unknown log level.
    #[error("invalid log level '{0}'. Valid levels: error, warn, info, debug, trace")]
    InvalidLogLevel(String),
}

impl Args {
    /// Check the values clap could not check on its own.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("poll interval", self.poll_interval_ms),
            ("command timeout", self.command_timeout_ms),
            ("settle delay", self.settle_delay_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroDuration(name));
            }
        }

        if self.max_failed_refreshes == 0 {
            return Err(ConfigError::ZeroFailureThreshold);
        }

        for (name, value) in [
            ("player command", &self.player_command),
            ("mixer control", &self.mixer_control),
            ("terminal", &self.terminal),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::EmptyProgram(name));
            }
        }

        match self.log_level.to_lowercase().as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => Ok(()),
            _ => Err(ConfigError::InvalidLogLevel(self.log_level.clone())),
        }
    }
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Where the player runs.
    pub target: ConnectionTarget,
    /// The player's control program.
    pub player_command: String,
    /// Mixer control read for the volume.
    pub mixer_control: String,
    /// Poll interval.
    pub poll_interval: Duration,
    /// Transport timeout per command.
    pub command_timeout: Duration,
    /// Wait after track changes.
    pub settle_delay: Duration,
    /// Consecutive failures before exiting.
    pub max_failed_refreshes: u32,
    /// `CanControl`.
    pub can_control: bool,
    /// Whether album art is looked up.
    pub lookup_art: bool,
    /// Terminal emulator for `Raise`.
    pub terminal: String,
    /// Log level name.
    pub log_level: String,
}

impl TryFrom<Args> for Config {
    type Error = ConfigError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        args.validate()?;
        Ok(Config {
            target: args.remote.unwrap_or_default(),
            player_command: args.player_command,
            mixer_control: args.mixer_control,
            poll_interval: Duration::from_millis(args.poll_interval_ms),
            command_timeout: Duration::from_millis(args.command_timeout_ms),
            settle_delay: Duration::from_millis(args.settle_delay_ms),
            max_failed_refreshes: args.max_failed_refreshes,
            can_control: !args.read_only,
            lookup_art: !args.no_art,
            terminal: args.terminal,
            log_level: args.log_level.to_lowercase(),
        })
    }
}

impl Config {
    /// Parse the process arguments and environment.
    ///
    /// Exits with a usage message when clap rejects the command line.
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::try_from(Args::parse())
    }

    /// The tunables handed to the bridge.
    pub fn bridge_options(&self) -> BridgeOptions {
        BridgeOptions {
            player_command: self.player_command.clone(),
            mixer_control: self.mixer_control.clone(),
            terminal: self.terminal.clone(),
            poll_interval: self.poll_interval,
            settle_delay: self.settle_delay,
            max_failed_refreshes: self.max_failed_refreshes,
            can_control: self.can_control,
        }
    }

    /// Log the effective configuration.
    pub fn print_summary(&self) {
        info!("Configuration:");
        info!("  Player: {} ({})", self.target, self.player_command);
        info!("  Mixer control: {}", self.mixer_control);
        info!("  Poll interval: {}ms", self.poll_interval.as_millis());
        info!("  Command timeout: {}ms", self.command_timeout.as_millis());
        info!("  Settle delay: {}ms", self.settle_delay.as_millis());
        info!("  Max failed refreshes: {}", self.max_failed_refreshes);
        info!("  Can control: {}", self.can_control);
        info!("  Album art: {}", self.lookup_art);
        info!("  Terminal: {}", self.terminal);
    }
}
