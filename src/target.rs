use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Where the controlled player runs.
///
/// Resolved once at startup from a `user@host` or `host` token. A target without a host means the
/// local machine.
///
/// ```rust
/// use moc_mpris::ConnectionTarget;
///
/// let target: ConnectionTarget = "pi@jukebox".parse().unwrap();
/// assert_eq!(target.user(), Some("pi"));
/// assert_eq!(target.host(), Some("jukebox"));
/// assert_eq!(target.identity(), "MOC (jukebox)");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConnectionTarget {
    user: Option<String>,
    host: Option<String>,
}

/// The remote target token could not be understood.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TargetError {
    /// Nothing was given.
    #[error("remote target must not be empty")]
    Empty,

    /// `@host` without a user name.
    #[error("remote target {0:?} has an empty user name")]
    EmptyUser(String),

    /// `user@` without a host name.
    #[error("remote target {0:?} has an empty host name")]
    EmptyHost(String),

    /// More than one `@`.
    #[error("remote target {0:?} must be of the form user@host or host")]
    Malformed(String),
}

impl ConnectionTarget {
    /// Target the player on this machine.
    pub fn local() -> Self {
        ConnectionTarget::default()
    }

    /// Target the player on `host`, optionally logging in as `user`.
    pub fn remote<S: Into<String>>(user: Option<S>, host: S) -> Self {
        ConnectionTarget {
            user: user.map(Into::into),
            host: Some(host.into()),
        }
    }

    /// Returns the login user for the remote hop, if any.
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Returns the remote host, or `None` for the local machine.
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// `true` when commands run on this machine.
    pub fn is_local(&self) -> bool {
        self.host.is_none()
    }

    /// The ssh destination (`user@host` or `host`), `None` for the local machine.
    pub fn destination(&self) -> Option<String> {
        match (&self.user, &self.host) {
            (_, None) => None,
            (Some(user), Some(host)) => Some(format!("{}@{}", user, host)),
            (None, Some(host)) => Some(host.clone()),
        }
    }

    /// The MPRIS `Identity` of a bridge controlling this target.
    pub fn identity(&self) -> String {
        format!("MOC ({})", self.host().unwrap_or("local"))
    }
}

impl FromStr for ConnectionTarget {
    type Err = TargetError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let token = token.trim();
        if token.is_empty() {
            return Err(TargetError::Empty);
        }

        match token.split_once('@') {
            None => Ok(ConnectionTarget::remote(None, token)),
            Some((_, host)) if host.contains('@') => Err(TargetError::Malformed(token.into())),
            Some(("", _)) => Err(TargetError::EmptyUser(token.into())),
            Some((_, "")) => Err(TargetError::EmptyHost(token.into())),
            Some((user, host)) => Ok(ConnectionTarget::remote(Some(user), host)),
        }
    }
}

impl fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.destination() {
            Some(destination) => f.write_str(&destination),
            None => f.write_str("local"),
        }
    }
}
