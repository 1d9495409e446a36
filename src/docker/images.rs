//! Local image presence and pulls.

use std::io;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

fn runtime_cmd(runtime: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::new(runtime);
    cmd.args(args).stdin(Stdio::null());
    cmd
}

/// True when `image` is already in the local store. Never pulls.
pub fn image_exists(runtime: &Path, image: &str) -> bool {
    runtime_cmd(runtime, &["image", "inspect", image])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|s| s.success())
}

/// Pull `image` with the runtime's progress shown on our stderr; stdout stays
/// reserved for container ids.
pub fn pull_image(runtime: &Path, image: &str) -> io::Result<ExitStatus> {
    runtime_cmd(runtime, &["pull", image])
        .stdout(io::stderr())
        .stderr(Stdio::inherit())
        .status()
}
