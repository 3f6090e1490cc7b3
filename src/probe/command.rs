//! External command sources
//!
//! Commands run with stdin closed and both pipes drained on helper
//! threads, so a chatty child cannot fill a pipe and stall. When the
//! deadline passes the child is killed and reaped before returning.

use super::{FactValue, Parser, SourceOutcome, UnavailableReason, ValueSource};
use crossbeam::channel::{bounded, Receiver};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Default deadline for local subprocesses
pub const DEFAULT_SUBPROCESS_TIMEOUT: Duration = Duration::from_secs(1);

/// Default deadline for commands that touch the network
pub const DEFAULT_NETWORK_TIMEOUT: Duration = Duration::from_secs(2);

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// How long to wait for pipe readers once the child has exited
const OUTPUT_GRACE: Duration = Duration::from_millis(200);

/// Captured output of a finished command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit status
    pub status: ExitStatus,
    /// Standard output (lossy UTF-8)
    pub stdout: String,
    /// Standard error (lossy UTF-8)
    pub stderr: String,
}

/// Locate an executable on a search path
///
/// `search_path` overrides `PATH` when given. Programs containing a path
/// separator are checked directly.
pub fn which(program: &str, search_path: Option<&[PathBuf]>) -> Option<PathBuf> {
    if program.contains(std::path::MAIN_SEPARATOR) {
        let path = PathBuf::from(program);
        return is_executable(&path).then_some(path);
    }

    let dirs: Vec<PathBuf> = match search_path {
        Some(dirs) => dirs.to_vec(),
        None => std::env::var_os("PATH")
            .map(|paths| std::env::split_paths(&paths).collect())
            .unwrap_or_default(),
    };

    dirs.into_iter()
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Run a command, killing it if it outlives `timeout`
pub fn run_with_timeout(
    program: &Path,
    args: &[String],
    timeout: Duration,
) -> std::result::Result<CommandOutput, UnavailableReason> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| UnavailableReason::from_io(&e))?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                tracing::debug!(program = %program.display(), ?timeout, "Command timed out, killed");
                return Err(UnavailableReason::Timeout);
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(UnavailableReason::from_io(&e));
            }
        }
    };

    Ok(CommandOutput {
        status,
        stdout: collect(&stdout),
        stderr: collect(&stderr),
    })
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Receiver<Vec<u8>> {
    let (tx, rx) = bounded(1);
    if let Some(mut pipe) = pipe {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            let _ = tx.send(buf);
        });
    }
    rx
}

fn collect(rx: &Receiver<Vec<u8>>) -> String {
    rx.recv_timeout(OUTPUT_GRACE)
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

/// Runs an external program and parses its standard output
pub struct CommandSource {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    search_path: Option<Vec<PathBuf>>,
    label: String,
    parser: Parser,
}

impl CommandSource {
    /// Create a command source with the default subprocess timeout
    pub fn new<F>(program: impl Into<String>, args: &[&str], parser: F) -> Self
    where
        F: Fn(&str) -> Option<FactValue> + Send + Sync + 'static,
    {
        let program = program.into();
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        let label = std::iter::once(program.as_str())
            .chain(args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");

        Self {
            program,
            args,
            timeout: DEFAULT_SUBPROCESS_TIMEOUT,
            search_path: None,
            label,
            parser: Box::new(parser),
        }
    }

    /// Override the deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the directories searched for the program
    pub fn with_search_path(mut self, search_path: Option<Vec<PathBuf>>) -> Self {
        self.search_path = search_path;
        self
    }

}

impl ValueSource for CommandSource {
    fn name(&self) -> &str {
        &self.label
    }

    fn attempt(&self) -> SourceOutcome {
        let program = which(&self.program, self.search_path.as_deref())
            .ok_or(UnavailableReason::NotSupported)?;

        let output = run_with_timeout(&program, &self.args, self.timeout)?;
        if !output.status.success() {
            tracing::debug!(
                command = %self.label,
                status = ?output.status.code(),
                stderr = %output.stderr.trim(),
                "Command exited unsuccessfully"
            );
            return Err(UnavailableReason::NotSupported);
        }

        (self.parser)(&output.stdout).ok_or(UnavailableReason::MalformedOutput)
    }
}

/// Several commands tried in order under one shared deadline
///
/// The first command that exits successfully with parsable output wins.
/// Missing programs are skipped. Once the deadline passes the whole source
/// reports `Timeout`, whichever command was running.
pub struct CommandChain {
    commands: Vec<(String, Vec<String>)>,
    timeout: Duration,
    search_path: Option<Vec<PathBuf>>,
    label: String,
    parser: Parser,
}

impl CommandChain {
    /// Create an empty chain labelled `label`
    pub fn new<F>(label: impl Into<String>, parser: F) -> Self
    where
        F: Fn(&str) -> Option<FactValue> + Send + Sync + 'static,
    {
        Self {
            commands: Vec::new(),
            timeout: DEFAULT_NETWORK_TIMEOUT,
            search_path: None,
            label: label.into(),
            parser: Box::new(parser),
        }
    }

    /// Append a command
    pub fn command(mut self, program: impl Into<String>, args: &[&str]) -> Self {
        self.commands
            .push((program.into(), args.iter().map(|a| a.to_string()).collect()));
        self
    }

    /// Override the shared deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the directories searched for the programs
    pub fn with_search_path(mut self, search_path: Option<Vec<PathBuf>>) -> Self {
        self.search_path = search_path;
        self
    }

    /// Number of commands in the chain
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether the chain has no commands
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl ValueSource for CommandChain {
    fn name(&self) -> &str {
        &self.label
    }

    fn attempt(&self) -> SourceOutcome {
        let deadline = Instant::now() + self.timeout;
        let mut reason = UnavailableReason::NotSupported;

        for (program, args) in &self.commands {
            let Some(path) = which(program, self.search_path.as_deref()) else {
                continue;
            };
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(UnavailableReason::Timeout);
            }

            let output = match run_with_timeout(&path, args, remaining) {
                Ok(output) => output,
                Err(UnavailableReason::Timeout) => return Err(UnavailableReason::Timeout),
                Err(other) => {
                    reason = other;
                    continue;
                }
            };
            if !output.status.success() {
                tracing::debug!(
                    command = %program,
                    status = ?output.status.code(),
                    "Chained command exited unsuccessfully"
                );
                reason = UnavailableReason::NotSupported;
                continue;
            }
            match (self.parser)(&output.stdout) {
                Some(value) => return Ok(value),
                None => reason = UnavailableReason::MalformedOutput,
            }
        }
        Err(reason)
    }
}
