#![allow(clippy::module_name_repetitions)]
//! Runtime `create`/`run` argument construction and preview rendering.

use std::path::Path;

use crate::docker::env::push_env_map;
use crate::model::{LaunchPlan, MountSpec};
use crate::util::shell_join;

/// How the container is brought up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// `create`, followed by an attached `start`.
    Create,
    /// `run -d`, returning once the container exists.
    Detached,
}

impl RunMode {
    pub fn for_plan(plan: &LaunchPlan) -> Self {
        if plan.interactive {
            RunMode::Create
        } else {
            RunMode::Detached
        }
    }
}

/// Quote one `--mount` CSV field when it carries separators.
fn csv_field(field: String) -> String {
    if field.contains(',') || field.contains('"') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field
    }
}

fn mount_flag_value(m: &MountSpec) -> String {
    let mut parts = vec![
        "type=bind".to_string(),
        csv_field(format!("source={}", m.host.display())),
        csv_field(format!("target={}", m.container)),
    ];
    if m.read_only {
        parts.push("readonly".to_string());
    }
    parts.join(",")
}

/// Runtime arguments (without the program itself) for `plan`.
///
/// `tty` only matters for attached runs and should reflect whether our stdin is a terminal.
pub fn build_run_args(plan: &LaunchPlan, mode: RunMode, tty: bool) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();
    match mode {
        RunMode::Create => {
            args.push("create".to_string());
            args.push("-i".to_string());
            if tty {
                args.push("-t".to_string());
            }
            if plan.auto_remove {
                args.push("--rm".to_string());
            }
        }
        RunMode::Detached => {
            args.push("run".to_string());
            args.push("-d".to_string());
        }
    }

    if let Some(name) = &plan.name {
        args.push("--name".to_string());
        args.push(name.clone());
    }
    for m in &plan.mounts {
        args.push("--mount".to_string());
        args.push(mount_flag_value(m));
    }
    for p in &plan.ports {
        args.push("-p".to_string());
        args.push(p.to_string());
    }
    push_env_map(&mut args, &plan.env);

    args.push(plan.image.concrete_reference.clone());
    args.extend(plan.command.iter().cloned());
    args
}

/// Add `--cidfile PATH` right after the mode flags so the runtime records the
/// container id as soon as the container exists.
pub fn insert_cidfile(args: &mut Vec<String>, path: &Path) {
    let at = match args.first().map(String::as_str) {
        Some("run") => 2,
        Some("create") => 1,
        _ => 0,
    }
    .min(args.len());
    args.splice(
        at..at,
        ["--cidfile".to_string(), path.display().to_string()],
    );
}

/// `start` arguments that attach to a created container.
pub fn build_start_args(container_id: &str) -> Vec<String> {
    vec![
        "start".to_string(),
        "--attach".to_string(),
        "--interactive".to_string(),
        container_id.to_string(),
    ]
}

/// Shell-quoted preview lines of what would be executed for `plan`.
pub fn preview_lines(runtime: &Path, plan: &LaunchPlan, tty: bool) -> Vec<String> {
    let program = runtime.display().to_string();
    let mode = RunMode::for_plan(plan);
    let mut first = vec![program.clone()];
    first.extend(build_run_args(plan, mode, tty));
    let mut lines = vec![shell_join(&first)];
    if mode == RunMode::Create {
        let mut second = vec![program];
        second.extend(build_start_args("<container-id>"));
        lines.push(shell_join(&second));
    }
    lines
}
