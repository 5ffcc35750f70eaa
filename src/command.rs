//! External command execution with combined output capture and a deadline.

use crate::error::{Error, Result};
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

const SHELL: &str = "/bin/sh";
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Output of a command that exited successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Combined stdout and stderr, trimmed
    pub output: String,

    /// Process exit code
    pub exit_code: i32,
}

/// Builder for running an external command.
#[derive(Debug, Clone)]
#[must_use = "call .run() to execute the command"]
pub struct ExecCommand {
    program: String,
    args: Vec<String>,
    envs: Vec<(String, String)>,
    current_dir: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl ExecCommand {
    /// Creates a command running `program` with `args`.
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            envs: Vec::new(),
            current_dir: None,
            timeout: None,
        }
    }

    /// Creates a command running `line` through `/bin/sh -c`.
    pub fn shell(line: impl Into<String>) -> Self {
        Self::new(SHELL, ["-c".to_string(), line.into()])
    }

    /// Adds an environment variable for the child process.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let (key, value) = (key.into(), value.into());
        debug!("Set command env {}={}", key, value);
        self.envs.push((key, value));
        self
    }

    /// Sets the working directory of the child process.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        debug!("Set command pwd {}", dir.display());
        self.current_dir = Some(dir);
        self
    }

    /// Kills the child if it runs longer than `timeout`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns the command line as a single string, for messages.
    #[must_use]
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Runs the command to completion.
    ///
    /// Stdout and stderr are both captured into one buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Command`] if the process can't start or exits with a
    /// non-zero code, and [`Error::Timeout`] if it was killed at the deadline.
    pub fn run(&self) -> Result<CommandOutput> {
        let command_line = self.command_line();
        debug!("Running command {:?}", command_line);

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .envs(self.envs.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|e| Error::Command {
            command: command_line.clone(),
            exit_code: None,
            message: e.to_string(),
            output: String::new(),
        })?;

        let buffer = Arc::new(Mutex::new(Vec::new()));
        let readers = capture(&mut child, &buffer);

        let waited = self.wait(&mut child);
        // After a kill, grandchildren may still hold the pipes open
        if !matches!(waited, Ok(None)) {
            for reader in readers {
                let _ = reader.join();
            }
        }
        let output = collect(&buffer);
        if !output.is_empty() {
            trace!("Command {:?} produced output: {}", command_line, output);
        }

        match waited {
            Ok(Some(status)) if status.success() => Ok(CommandOutput {
                output,
                exit_code: status.code().unwrap_or_default(),
            }),
            Ok(Some(status)) => {
                let err = Error::Command {
                    command: command_line,
                    exit_code: status.code(),
                    message: status.to_string(),
                    output,
                };
                debug!("Command error: {}", err);
                Err(err)
            }
            Ok(None) => Err(Error::Timeout {
                command: command_line,
                timeout: self.timeout.unwrap_or_default(),
                output,
            }),
            Err(e) => Err(Error::Command {
                command: command_line,
                exit_code: None,
                message: e.to_string(),
                output,
            }),
        }
    }

    /// Waits for the child, polling against the deadline. `Ok(None)` means
    /// the child was killed because the deadline passed.
    fn wait(&self, child: &mut Child) -> std::io::Result<Option<std::process::ExitStatus>> {
        let Some(timeout) = self.timeout else {
            return child.wait().map(Some);
        };

        let start = Instant::now();
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(Some(status));
            }
            if start.elapsed() > timeout {
                debug!("Command timed out after {:?}, terminating", timeout);
                let _ = child.kill();
                let _ = child.wait();
                return Ok(None);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

/// Drains stdout and stderr of the child into one shared buffer.
fn capture(child: &mut Child, buffer: &Arc<Mutex<Vec<u8>>>) -> Vec<JoinHandle<()>> {
    let mut readers = Vec::with_capacity(2);
    let streams: [Option<Box<dyn Read + Send>>; 2] = [
        child.stdout.take().map(|s| Box::new(s) as Box<dyn Read + Send>),
        child.stderr.take().map(|s| Box::new(s) as Box<dyn Read + Send>),
    ];

    for mut stream in streams.into_iter().flatten() {
        let buffer = Arc::clone(buffer);
        readers.push(thread::spawn(move || {
            let mut chunk = [0u8; 4096];
            loop {
                match stream.read(&mut chunk) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if let Ok(mut buf) = buffer.lock() {
                            buf.extend_from_slice(&chunk[..n]);
                        }
                    }
                }
            }
        }));
    }
    readers
}

fn collect(buffer: &Arc<Mutex<Vec<u8>>>) -> String {
    buffer
        .lock()
        .map(|buf| String::from_utf8_lossy(&buf).trim().to_string())
        .unwrap_or_default()
}

/// Quotes `s` for safe use as a single word in a `/bin/sh` command line.
#[must_use]
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_captures_stdout_and_stderr() {
        let out = ExecCommand::shell("echo out; echo err 1>&2").run().unwrap();
        assert_eq!(out.exit_code, 0);
        assert!(out.output.contains("out"));
        assert!(out.output.contains("err"));
    }

    #[test]
    fn test_non_zero_exit() {
        let err = ExecCommand::shell("echo broken; exit 3").run().unwrap_err();
        match err {
            Error::Command {
                exit_code, output, ..
            } => {
                assert_eq!(exit_code, Some(3));
                assert_eq!(output, "broken");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_program() {
        let err = ExecCommand::new("/nonexistent/renderer-binary", ["-x"])
            .run()
            .unwrap_err();
        assert!(matches!(err, Error::Command { exit_code: None, .. }));
        assert!(err.to_string().contains("'unknown'"));
    }

    #[test]
    fn test_timeout_kills_child() {
        let start = Instant::now();
        let err = ExecCommand::new("sleep", ["5"])
            .timeout(Duration::from_millis(200))
            .run()
            .unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_env_and_current_dir() {
        let temp = assert_fs::TempDir::new().unwrap();
        let out = ExecCommand::shell("echo \"$DISPLAY\"; pwd")
            .env("DISPLAY", ":99")
            .current_dir(temp.path())
            .run()
            .unwrap();
        assert!(out.output.starts_with(":99"));
        let name = temp.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(out.output.contains(&name));
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("a b"), "'a b'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        let out = ExecCommand::shell(format!("printf %s {}", shell_quote("x 'y' $z")))
            .run()
            .unwrap();
        assert_eq!(out.output, "x 'y' $z");
    }

    #[test]
    fn test_command_line() {
        let cmd = ExecCommand::shell("echo hi");
        assert_eq!(cmd.command_line(), "/bin/sh -c echo hi");
    }
}
