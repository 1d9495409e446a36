//! Plan execution against a container runtime.

use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::{ChildStderr, Command, Stdio};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, info, info_span, warn};

use crate::docker::images::{image_exists, pull_image};
use crate::docker::run::{build_run_args, build_start_args, insert_cidfile, RunMode};
use crate::docker::runtime::container_runtime_path;
use crate::errors::{LauncherError, RuntimeError};
use crate::model::{LaunchPlan, LaunchResult};
use crate::signals::{exit_code_of, wait_forwarding};
use crate::util::{ExecRequest, ExecService};

const INSPECT_TIMEOUT: Duration = Duration::from_secs(15);

/// What the runtime reports for a container it created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeOutcome {
    pub container_id: String,
    pub exit_code: i32,
}

/// External container runtime.
pub trait ContainerRuntime {
    /// Create and run the container described by `plan`.
    ///
    /// Attached plans block until the container exits; detached plans return once
    /// it exists (exit code 0).
    fn run(&self, plan: &LaunchPlan) -> Result<RuntimeOutcome, RuntimeError>;
}

impl<T: ContainerRuntime + ?Sized> ContainerRuntime for &T {
    fn run(&self, plan: &LaunchPlan) -> Result<RuntimeOutcome, RuntimeError> {
        (**self).run(plan)
    }
}

impl<T: ContainerRuntime + ?Sized> ContainerRuntime for Box<T> {
    fn run(&self, plan: &LaunchPlan) -> Result<RuntimeOutcome, RuntimeError> {
        (**self).run(plan)
    }
}

pub struct Launcher<R> {
    runtime: R,
}

impl<R: ContainerRuntime> Launcher<R> {
    pub fn new(runtime: R) -> Self {
        Self { runtime }
    }

    /// Run `plan` once. A non-zero container exit is a result, not an error.
    pub fn launch(&self, plan: &LaunchPlan) -> Result<LaunchResult, LauncherError> {
        let span = info_span!(
            "launch",
            image = %plan.image.concrete_reference,
            attached = plan.interactive
        );
        let _enter = span.enter();
        let outcome = self.runtime.run(plan)?;
        info!(
            container_id = %outcome.container_id,
            exit_code = outcome.exit_code,
            "launch finished"
        );
        Ok(LaunchResult {
            exit_code: outcome.exit_code,
            container_id: outcome.container_id,
        })
    }
}

/// Docker-compatible CLI runtime (`docker`, `podman`).
#[derive(Debug, Clone)]
pub struct DockerCli {
    program: PathBuf,
    exec: ExecService,
}

impl DockerCli {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            exec: ExecService::new(Duration::ZERO),
        }
    }

    /// Locate `preferred` (name or path) and wrap it.
    pub fn discover(preferred: &str) -> Result<Self, RuntimeError> {
        container_runtime_path(preferred)
            .map(Self::new)
            .map_err(|e| RuntimeError::new(e.to_string()))
    }

    fn ensure_image(&self, image: &str) -> Result<(), RuntimeError> {
        if image_exists(&self.program, image) {
            return Ok(());
        }
        debug!(image, "image not present locally; pulling");
        let status = pull_image(&self.program, image)
            .map_err(|e| RuntimeError::new(format!("failed to run {} pull: {e}", self.program.display())))?;
        if !status.success() {
            return Err(RuntimeError::new(format!(
                "image {image} could not be pulled ({status})"
            )));
        }
        Ok(())
    }

    /// Run a short captured runtime command; the last stdout line is returned on success.
    fn captured(&self, args: Vec<String>, timeout: Duration) -> Result<String, RuntimeError> {
        let out = self
            .exec
            .run(
                ExecRequest::new(&self.program)
                    .args(args)
                    .timeout(timeout)
                    .capture_output(true),
            )
            .map_err(|e| RuntimeError::new(format!("{e:#}")))?;
        if !out.status.success() {
            let msg = out.stderr_message();
            return Err(RuntimeError::new(if msg.is_empty() {
                format!("{} exited with {}", self.program.display(), out.status)
            } else {
                msg
            }));
        }
        out.last_stdout_line()
            .map(str::to_string)
            .ok_or_else(|| RuntimeError::new("container runtime did not report a container id"))
    }

    fn inspect(&self, id: &str, format: &str) -> Result<String, RuntimeError> {
        let args = vec![
            "inspect".to_string(),
            "-f".to_string(),
            format.to_string(),
            id.to_string(),
        ];
        self.captured(args, INSPECT_TIMEOUT)
    }

    /// False only when the runtime positively reports the container never started.
    fn container_started(&self, id: &str) -> bool {
        match self.inspect(id, "{{.State.StartedAt}}") {
            Ok(started_at) => !started_at.starts_with("0001-01-01"),
            // Auto-removed containers cannot be inspected after they ran.
            Err(_) => true,
        }
    }

    /// Why a container failed to start: the runtime's recorded state error,
    /// else the last line `start` wrote to stderr.
    fn start_failure_reason(&self, id: &str, stderr_tail: &str) -> Option<String> {
        self.inspect(id, "{{.State.Error}}")
            .ok()
            .filter(|e| !e.is_empty() && e != "<no value>")
            .or_else(|| {
                stderr_tail
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .last()
                    .map(str::to_string)
            })
    }

    fn remove_container(&self, id: &str) {
        let args = vec!["rm".to_string(), "-f".to_string(), id.to_string()];
        let result = self.exec.run(
            ExecRequest::new(&self.program)
                .args(args)
                .timeout(INSPECT_TIMEOUT)
                .capture_output(true),
        );
        match result {
            Ok(out) if out.status.success() => {}
            Ok(out) => warn!(
                container_id = id,
                "failed to remove container: {}",
                out.stderr_message()
            ),
            Err(e) => warn!(container_id = id, "failed to remove container: {e:#}"),
        }
    }

    fn run_detached(&self, plan: &LaunchPlan) -> Result<RuntimeOutcome, RuntimeError> {
        let cid_dir = tempfile::tempdir()
            .map_err(|e| RuntimeError::new(format!("cannot create a container id file: {e}")))?;
        let cidfile = cid_dir.path().join("cid");
        let mut args = build_run_args(plan, RunMode::Detached, false);
        insert_cidfile(&mut args, &cidfile);

        match self.captured(args, Duration::ZERO) {
            Ok(container_id) => Ok(RuntimeOutcome {
                container_id,
                exit_code: 0,
            }),
            Err(e) => {
                // `run -d` may have created the container before failing to start it.
                let created = std::fs::read_to_string(&cidfile).unwrap_or_default();
                let created = created.trim();
                if !created.is_empty() {
                    debug!(container_id = created, "removing container left by failed run");
                    self.remove_container(created);
                }
                Err(e)
            }
        }
    }

    fn run_attached(&self, plan: &LaunchPlan) -> Result<RuntimeOutcome, RuntimeError> {
        let tty = atty::is(atty::Stream::Stdin);
        let args = build_run_args(plan, RunMode::Create, tty);
        let container_id = self.captured(args, Duration::ZERO)?;
        debug!(%container_id, tty, "container created; attaching");

        let mut child = Command::new(&self.program)
            .args(build_start_args(&container_id))
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                self.remove_container(&container_id);
                RuntimeError::new(format!("failed to start {}: {e}", self.program.display()))
            })?;
        let stderr_tail = child.stderr.take().map(tee_stderr);
        let status = wait_forwarding(&mut child)
            .map_err(|e| RuntimeError::new(format!("failed to wait for container: {e}")))?;
        let stderr_tail = stderr_tail
            .and_then(|h| h.join().ok())
            .unwrap_or_default();
        let exit_code = exit_code_of(&status);

        if exit_code != 0 && !self.container_started(&container_id) {
            let reason = self
                .start_failure_reason(&container_id, &stderr_tail)
                .unwrap_or_else(|| format!("runtime exited with {exit_code}"));
            self.remove_container(&container_id);
            return Err(RuntimeError::new(format!(
                "container {container_id} failed to start: {reason}"
            )));
        }
        Ok(RuntimeOutcome {
            container_id,
            exit_code,
        })
    }
}

const STDERR_TAIL_BYTES: usize = 8 * 1024;

/// Copy the runtime's stderr through to ours as it arrives, keeping the tail for error reports.
fn tee_stderr(mut pipe: ChildStderr) -> JoinHandle<String> {
    std::thread::spawn(move || {
        let mut out = io::stderr();
        let mut tail = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = match pipe.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            };
            let _ = out.write_all(&buf[..n]);
            let _ = out.flush();
            tail.extend_from_slice(&buf[..n]);
            if tail.len() > STDERR_TAIL_BYTES {
                tail.drain(..tail.len() - STDERR_TAIL_BYTES);
            }
        }
        String::from_utf8_lossy(&tail).into_owned()
    })
}

impl ContainerRuntime for DockerCli {
    fn run(&self, plan: &LaunchPlan) -> Result<RuntimeOutcome, RuntimeError> {
        self.ensure_image(&plan.image.concrete_reference)?;
        if plan.interactive {
            self.run_attached(plan)
        } else {
            self.run_detached(plan)
        }
    }
}
