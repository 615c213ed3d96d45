use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use async_process::{Child, Command, Stdio};
use async_std::{future, task};
use tracing::{debug, trace};

use crate::error::TransportError;
use crate::target::ConnectionTarget;

/// Runs control commands against the machine the player lives on.
///
/// `argv[0]` is the program. Implementations decide whether that happens locally or through a
/// remote hop; callers never need to know.
pub trait Transport: fmt::Debug {
    /// Run a command to completion and return its combined standard output and error.
    fn execute(&self, argv: &[String]) -> Result<String, TransportError>;

    /// Start a long-running (usually graphical) command without waiting for it.
    fn launch(&self, argv: &[String]) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for Rc<T> {
    fn execute(&self, argv: &[String]) -> Result<String, TransportError> {
        (**self).execute(argv)
    }

    fn launch(&self, argv: &[String]) -> Result<(), TransportError> {
        (**self).launch(argv)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn execute(&self, argv: &[String]) -> Result<String, TransportError> {
        (**self).execute(argv)
    }

    fn launch(&self, argv: &[String]) -> Result<(), TransportError> {
        (**self).launch(argv)
    }
}

/// Runs commands as child processes, hopping through `ssh` when the target is remote.
#[derive(Debug, Clone)]
pub struct SystemTransport {
    target: ConnectionTarget,
    timeout: Duration,
    ssh_program: String,
}

impl SystemTransport {
    /// Create a transport for `target` that kills commands running longer than `timeout`.
    pub fn new(target: ConnectionTarget, timeout: Duration) -> Self {
        SystemTransport {
            target,
            timeout,
            ssh_program: String::from("ssh"),
        }
    }

    /// Returns the target commands are run against.
    pub fn target(&self) -> &ConnectionTarget {
        &self.target
    }

    /// Build the local command line that runs `argv` on the target.
    ///
    /// `forward_display` asks ssh to forward X11 so graphical programs show up locally.
    pub fn command_line(&self, argv: &[String], forward_display: bool) -> Vec<String> {
        match self.target.destination() {
            None => argv.to_vec(),
            Some(destination) => {
                let mut line = vec![self.ssh_program.clone()];
                if forward_display {
                    line.push(String::from("-X"));
                }
                line.push(destination);
                line.push(String::from("--"));
                // ssh joins the remaining words into one remote shell line
                line.extend(argv.iter().map(|arg| shell_quote(arg)));
                line
            }
        }
    }

    fn spawn(&self, line: &[String]) -> Result<Child, TransportError> {
        let (program, args) = line.split_first().ok_or(TransportError::EmptyCommand)?;
        debug!(command = ?line, "running command");

        Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // dropping an unfinished command kills it
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| TransportError::Spawn {
                program: program.clone(),
                source,
            })
    }
}

impl Transport for SystemTransport {
    fn execute(&self, argv: &[String]) -> Result<String, TransportError> {
        let line = self.command_line(argv, false);
        let child = self.spawn(&line)?;
        let program = line[0].clone();

        let finished = task::block_on(future::timeout(self.timeout, child.output()));
        let finished = match finished {
            Ok(finished) => finished,
            Err(_) => {
                return Err(TransportError::TimedOut {
                    program,
                    timeout_ms: self.timeout.as_millis(),
                })
            }
        };
        let finished = finished.map_err(|source| TransportError::Io {
            program: program.clone(),
            source,
        })?;

        let mut output = String::from_utf8_lossy(&finished.stdout).into_owned();
        output.push_str(&String::from_utf8_lossy(&finished.stderr));
        trace!(%program, %output, "command finished");

        if finished.status.success() {
            Ok(output)
        } else {
            Err(TransportError::Failed {
                program,
                code: finished.status.code(),
                output,
            })
        }
    }

    fn launch(&self, argv: &[String]) -> Result<(), TransportError> {
        let line = self.command_line(argv, true);
        let (program, args) = line.split_first().ok_or(TransportError::EmptyCommand)?;
        debug!(command = ?line, "launching command");

        // Detached: not killed on drop, and reaped in the background once it exits.
        Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(drop)
            .map_err(|source| TransportError::Spawn {
                program: program.clone(),
                source,
            })
    }
}

/// Quote a word for a POSIX shell.
///
/// Words made only of safe characters are passed through untouched.
pub fn shell_quote(word: &str) -> String {
    let safe = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:@%+,".contains(c));
    if safe {
        word.to_owned()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

/// Helper to build an owned argv from string slices.
pub fn argv<I, S>(words: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    words.into_iter().map(Into::into).collect()
}
