//! Self-documentation calls against the installed tools.
//!
//! Every call is bounded by a timeout; a failed or timed-out call is a
//! value, never a panic.

use lazy_static::lazy_static;
use regex::Regex;
use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

/// Poll interval while waiting for a help process
const POLL_INTERVAL: Duration = Duration::from_millis(10);

lazy_static! {
    static ref RE_ANSI: Regex = Regex::new(r"\x1b\[[0-9;]*m").unwrap();
    static ref RE_WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Failed to run {program}: {source}")]
    Spawn { program: String, source: io::Error },

    #[error("{program} timed out after {}ms", .timeout.as_millis())]
    Timeout { program: String, timeout: Duration },

    #[error("{program} exited with {}", describe_exit(.code))]
    Failed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Failed to wait for {program}: {source}")]
    Wait { program: String, source: io::Error },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("status {c}"),
        None => "a signal".to_string(),
    }
}

impl ProbeError {
    /// True when the tool never answered, so nothing can be concluded.
    pub fn is_unavailable(&self) -> bool {
        !matches!(self, ProbeError::Failed { .. })
    }
}

/// The one call shape needed from the tools: "print your documentation".
pub trait HelpSource {
    fn help(&self, program: &str, args: &[&str], timeout: Duration) -> Result<String, ProbeError>;
}

/// Runs the real binaries with a C locale and a wide terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessHelpSource;

impl HelpSource for ProcessHelpSource {
    fn help(&self, program: &str, args: &[&str], timeout: Duration) -> Result<String, ProbeError> {
        debug!("Running {} {}", program, args.join(" "));
        let mut child = Command::new(program)
            .args(args)
            .env("LANG", "C")
            .env("LC_ALL", "C")
            .env("COLUMNS", "200")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ProbeError::Spawn {
                program: program.to_string(),
                source: e,
            })?;

        let stdout_thread = child.stdout.take().map(spawn_reader);
        let stderr_thread = child.stderr.take().map(spawn_reader);

        let status = match wait_with_timeout(&mut child, timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ProbeError::Timeout {
                    program: program.to_string(),
                    timeout,
                });
            }
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ProbeError::Wait {
                    program: program.to_string(),
                    source: e,
                });
            }
        };

        let stdout = join_reader(stdout_thread);
        let stderr = join_reader(stderr_thread);

        if !status.success() {
            return Err(ProbeError::Failed {
                program: program.to_string(),
                code: status.code(),
                stderr,
            });
        }
        // Some builds print help on stderr
        Ok(if stdout.trim().is_empty() { stderr } else { stdout })
    }
}

/// A source whose tools are never installed.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableHelpSource;

impl HelpSource for UnavailableHelpSource {
    fn help(&self, program: &str, _args: &[&str], _timeout: Duration) -> Result<String, ProbeError> {
        Err(ProbeError::Spawn {
            program: program.to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "documentation disabled"),
        })
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn join_reader(handle: Option<thread::JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .map(|buf| String::from_utf8_lossy(&buf).into_owned())
        .unwrap_or_default()
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> io::Result<Option<ExitStatus>> {
    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if start.elapsed() >= timeout {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Strip ANSI color codes
pub fn strip_ansi(text: &str) -> String {
    RE_ANSI.replace_all(text, "").into_owned()
}

/// Collapse whitespace runs and trim
pub fn normalize_whitespace(text: &str) -> String {
    RE_WHITESPACE.replace_all(text, " ").trim().to_string()
}
