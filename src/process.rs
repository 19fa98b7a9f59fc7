//! External tool invocation.
//!
//! Module makefiles, git, the platform version tool and the native
//! packagers all go through [`Cmd`]. A non-zero exit becomes an error
//! carrying the command's label and, when output was captured, its stderr.
//! A command that overruns its timeout is killed and reported the same way.

use anyhow::{anyhow, Context, Result};
use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStderr, ChildStdout, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use wait_timeout::ChildExt;

/// Output of a command run with [`Cmd::run`].
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CommandResult {
    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim()
    }
}

/// How the child's stdio is wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Io {
    /// stdout/stderr piped back to us, stdin closed
    Capture,
    /// Inherit the terminal so progress is visible
    Stream,
}

/// A single external command, built up fluently and consumed by
/// [`run`](Cmd::run) or [`run_interactive`](Cmd::run_interactive).
#[derive(Debug, Clone)]
pub struct Cmd {
    program: String,
    args: Vec<OsString>,
    dir: Option<PathBuf>,
    label: Option<String>,
    timeout: Option<Duration>,
}

impl Cmd {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            dir: None,
            label: None,
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn arg_path(self, path: &Path) -> Self {
        self.arg(path.as_os_str())
    }

    pub fn dir(mut self, dir: &Path) -> Self {
        self.dir = Some(dir.to_path_buf());
        self
    }

    /// Text that opens the error when the command fails.
    pub fn error_msg(mut self, msg: impl Into<String>) -> Self {
        self.label = Some(msg.into());
        self
    }

    /// `None` waits forever.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run with captured output. Fails on a non-zero exit, with stderr
    /// appended to the message.
    pub fn run(self) -> Result<CommandResult> {
        let mut child = self.spawn(Io::Capture)?;
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        // Join the readers before propagating a timeout so the pipes close
        let status = self.wait(&mut child);
        let result = CommandResult {
            status: status?,
            stdout: collect(stdout),
            stderr: collect(stderr),
        };

        if result.status.success() {
            return Ok(result);
        }
        let mut msg = format!("{} ({})", self.label(), exit_text(result.status));
        let stderr = result.stderr.trim();
        if !stderr.is_empty() {
            msg.push_str(":\n");
            msg.push_str(stderr);
        }
        Err(anyhow!(msg))
    }

    /// Run attached to the terminal. Used for builds and packagers whose
    /// progress the user should see.
    pub fn run_interactive(self) -> Result<ExitStatus> {
        let mut child = self.spawn(Io::Stream)?;
        let status = self.wait(&mut child)?;
        if !status.success() {
            return Err(anyhow!("{} ({})", self.label(), exit_text(status)));
        }
        Ok(status)
    }

    fn label(&self) -> String {
        match &self.label {
            Some(label) => label.clone(),
            None => format!("'{}' failed", self.program),
        }
    }

    fn spawn(&self, io: Io) -> Result<Child> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.dir {
            cmd.current_dir(dir);
        }
        match io {
            Io::Capture => {
                cmd.stdin(Stdio::null())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped());
            }
            Io::Stream => {
                cmd.stdin(Stdio::inherit())
                    .stdout(Stdio::inherit())
                    .stderr(Stdio::inherit());
            }
        }

        tracing::debug!(program = %self.program, args = ?self.args, dir = ?self.dir, ?io, "exec");
        cmd.spawn()
            .with_context(|| format!("cannot run '{}'; is it installed?", self.program))
    }

    fn wait(&self, child: &mut Child) -> Result<ExitStatus> {
        let Some(limit) = self.timeout else {
            return Ok(child.wait()?);
        };
        if let Some(status) = child.wait_timeout(limit)? {
            return Ok(status);
        }
        let _ = child.kill();
        let _ = child.wait();
        Err(anyhow!(
            "'{}' timed out after {}s",
            self.program,
            limit.as_secs()
        ))
    }
}

trait Pipe: Read + Send + 'static {}
impl Pipe for ChildStdout {}
impl Pipe for ChildStderr {}

/// Read a pipe to the end on its own thread so a chatty child never
/// blocks on a full buffer while we wait for it.
fn drain<P: Pipe>(pipe: Option<P>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    })
}

fn collect(reader: Option<JoinHandle<Vec<u8>>>) -> String {
    let bytes = reader.and_then(|h| h.join().ok()).unwrap_or_default();
    String::from_utf8_lossy(&bytes).into_owned()
}

fn exit_text(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit code {}", code),
        None => "killed by signal".to_string(),
    }
}

/// Full path of `program` if it is on PATH.
pub fn which(program: &str) -> Option<PathBuf> {
    which::which(program).ok()
}

/// Like [`which`], but a missing tool is an error ending in `hint`.
pub fn require(program: &str, hint: &str) -> Result<PathBuf> {
    which(program).with_context(|| format!("'{}' not found in PATH. {}", program, hint))
}
