//! Captured helper-process execution (`image inspect`, `create`, `run -d`,
//! `kachery-cat`). Attached container sessions stream to the terminal and do
//! not go through here.

use std::ffi::OsString;
use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use wait_timeout::ChildExt;

/// Runs requests with a default deadline; zero means wait indefinitely.
#[derive(Debug, Clone)]
pub struct ExecService {
    default_timeout: Duration,
}

#[derive(Debug)]
pub struct ExecRequest {
    program: OsString,
    args: Vec<OsString>,
    timeout: Option<Duration>,
    capture_output: bool,
}

#[derive(Debug)]
pub struct ExecOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ExecRequest {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: None,
            capture_output: false,
        }
    }

    pub fn arg(self, arg: impl Into<OsString>) -> Self {
        self.args([arg])
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Overrides the service default. Zero disables the deadline.
    pub fn timeout(self, timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..self
        }
    }

    pub fn capture_output(self, capture_output: bool) -> Self {
        Self {
            capture_output,
            ..self
        }
    }

    fn describe(&self) -> String {
        let mut parts = vec![self.program.to_string_lossy().into_owned()];
        parts.extend(self.args.iter().map(|a| a.to_string_lossy().into_owned()));
        crate::util::shell_join(&parts)
    }
}

/// Drain a pipe on its own thread so a chatty child cannot block on a full buffer.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<String> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut r) = pipe {
            let _ = r.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn join_drain(handle: JoinHandle<String>) -> String {
    handle.join().unwrap_or_default()
}

impl ExecService {
    pub fn new(default_timeout: Duration) -> Self {
        Self { default_timeout }
    }

    pub fn run(&self, request: ExecRequest) -> Result<ExecOutput> {
        let (out, err) = if request.capture_output {
            (Stdio::piped(), Stdio::piped())
        } else {
            (Stdio::inherit(), Stdio::inherit())
        };
        let mut child = Command::new(&request.program)
            .args(&request.args)
            .stdin(Stdio::null())
            .stdout(out)
            .stderr(err)
            .spawn()
            .with_context(|| format!("failed to spawn `{}`", request.describe()))?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());
        let timeout = request.timeout.unwrap_or(self.default_timeout);
        let status = wait_until(&mut child, timeout)
            .with_context(|| format!("waiting for `{}`", request.describe()))?;
        let Some(status) = status else {
            bail!("`{}` timed out after {:?}", request.describe(), timeout);
        };

        Ok(ExecOutput {
            status,
            stdout: join_drain(stdout),
            stderr: join_drain(stderr),
        })
    }
}

/// None when the deadline passed; the child is killed and reaped in that case.
fn wait_until(child: &mut Child, timeout: Duration) -> std::io::Result<Option<ExitStatus>> {
    if timeout.is_zero() {
        return child.wait().map(Some);
    }
    match child.wait_timeout(timeout)? {
        Some(status) => Ok(Some(status)),
        None => {
            let _ = child.kill();
            let _ = child.wait();
            Ok(None)
        }
    }
}

impl ExecOutput {
    /// Last non-empty stdout line, trimmed.
    pub fn last_stdout_line(&self) -> Option<&str> {
        self.stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .last()
    }

    /// Stderr condensed to a single line for error messages.
    pub fn stderr_message(&self) -> String {
        self.stderr
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join("; ")
    }
}
