//! CLI stages: ParseArgs → CollectConfig → Resolve → Plan → Launch → Report.
//!
//! Every stage returns `LauncherError` on failure; `run_launch` is the single
//! place that reports it and picks the exit code.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use labbox_launcher::docker::run::preview_lines;
use labbox_launcher::docker::runtime::container_runtime_path;
use labbox_launcher::model::parse_env_pair;
use labbox_launcher::{
    store_from_config, AnswerSource, Collector, Config, DockerCli, LaunchPlan, LaunchRequest,
    LaunchResult, Launcher, LauncherError, MountSpec, NoAnswers, PortSpec, Resolver,
    TerminalAnswers,
};
use tracing::debug;

use crate::cli::Cli;

const KACHERY_CONTAINER_DIR: &str = "/kachery-storage";

enum Outcome {
    DryRun,
    Launched(LaunchPlan, LaunchResult),
}

fn env_flag(name: &str) -> bool {
    matches!(
        std::env::var(name).ok().as_deref().map(str::trim),
        Some("1") | Some("true") | Some("yes")
    )
}

fn non_interactive(cli: &Cli) -> bool {
    cli.non_interactive || env_flag("LABBOX_LAUNCHER_NON_INTERACTIVE") || env_flag("CI")
}

fn configuration<E: std::fmt::Display>(e: E) -> LauncherError {
    LauncherError::Configuration(e.to_string())
}

/// ParseArgs: translate flags into a partial request.
fn request_from_cli(cli: &Cli, cfg: &Config, cwd: &Path) -> Result<LaunchRequest, LauncherError> {
    let mut req = LaunchRequest {
        image_identifier: cli
            .image
            .as_ref()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        interactive: cli.detached.then_some(false),
        command: cli.command.clone().filter(|c| !c.is_empty()),
        name: cli.name.clone(),
        auto_remove: !cli.keep,
        env: cfg.default_env.clone(),
        ..LaunchRequest::default()
    };

    if let Some(dir) = &cli.kachery {
        let host = std::fs::canonicalize(cwd.join(dir)).map_err(|e| {
            LauncherError::Configuration(format!(
                "kachery storage directory {}: {e}",
                dir.display()
            ))
        })?;
        if !host.is_dir() {
            return Err(LauncherError::Configuration(format!(
                "kachery storage path is not a directory: {}",
                host.display()
            )));
        }
        req.mounts.push(MountSpec {
            host,
            container: KACHERY_CONTAINER_DIR.to_string(),
            read_only: false,
        });
        req.env.insert(
            "KACHERY_STORAGE_DIR".to_string(),
            KACHERY_CONTAINER_DIR.to_string(),
        );
    }

    for raw in &cli.mounts {
        let mount = raw.parse::<MountSpec>().map_err(configuration)?;
        req.mounts.push(mount.anchored_at(cwd));
    }
    for raw in &cli.ports {
        req.ports.push(raw.parse::<PortSpec>().map_err(configuration)?);
    }
    for raw in &cli.env {
        let (k, v) = parse_env_pair(raw).map_err(configuration)?;
        req.env.insert(k, v);
    }
    Ok(req)
}

fn launch_stages(cli: &Cli, cfg: &Config) -> Result<Outcome, LauncherError> {
    let cwd = std::env::current_dir().map_err(configuration)?;
    let partial = request_from_cli(cli, cfg, &cwd)?;

    // CollectConfig
    let mut terminal = TerminalAnswers;
    let mut none = NoAnswers;
    let source: &mut dyn AnswerSource = if non_interactive(cli) {
        &mut none
    } else {
        &mut terminal
    };
    let request = Collector::new(source)
        .with_max_attempts(cfg.prompt_retries)
        .collect(partial, &cfg.schema)?;
    let identifier = request.image_identifier.clone().ok_or_else(|| {
        LauncherError::Configuration("no image identifier given".to_string())
    })?;

    // Resolve
    let resolver = Resolver::new(store_from_config(cfg));
    let image = resolver.resolve(&identifier)?;
    if cli.verbose {
        eprintln!(
            "labbox-launcher: image: {} ({})",
            image.concrete_reference, image.source
        );
    }

    // Plan
    let plan = labbox_launcher::plan(&request, image)?;
    debug!(?plan, "launch plan ready");

    let tty = atty::is(atty::Stream::Stdin);
    if cli.verbose || cli.dry_run {
        let rt = container_runtime_path(&cfg.runtime).unwrap_or_else(|_| PathBuf::from(&cfg.runtime));
        for line in preview_lines(&rt, &plan, tty) {
            eprintln!("labbox-launcher: runtime: {line}");
        }
    }
    if cli.dry_run {
        eprintln!("labbox-launcher: dry-run requested; not starting a container.");
        return Ok(Outcome::DryRun);
    }

    // Launch
    let runtime = DockerCli::discover(&cfg.runtime)?;
    let result = Launcher::new(runtime).launch(&plan)?;
    Ok(Outcome::Launched(plan, result))
}

/// Report: print the outcome and map it to the process exit code.
pub fn run_launch(cli: &Cli, cfg: &Config) -> ExitCode {
    let use_err = labbox_launcher::color_enabled_stderr();
    match launch_stages(cli, cfg) {
        Ok(Outcome::DryRun) => ExitCode::from(0),
        Ok(Outcome::Launched(plan, result)) => {
            if plan.interactive {
                if result.exit_code != 0 {
                    labbox_launcher::log_warn_stderr(
                        use_err,
                        &format!(
                            "labbox-launcher: container exited with status {}",
                            result.exit_code
                        ),
                    );
                }
            } else {
                println!("{}", result.container_id);
                labbox_launcher::log_info_stderr(
                    use_err,
                    &format!(
                        "labbox-launcher: container {} started in the background ({})",
                        result.container_id, plan.image.concrete_reference
                    ),
                );
            }
            ExitCode::from(0)
        }
        Err(e) => {
            labbox_launcher::log_error_stderr(use_err, &format!("labbox-launcher: {e}"));
            ExitCode::from(e.exit_code())
        }
    }
}

pub fn run_resolve(identifier: &str, cfg: &Config, verbose: bool) -> ExitCode {
    let resolver = Resolver::new(store_from_config(cfg));
    match resolver.resolve(identifier) {
        Ok(image) => {
            if verbose {
                eprintln!("labbox-launcher: source: {}", image.source);
            }
            println!("{}", image.concrete_reference);
            ExitCode::from(0)
        }
        Err(e) => {
            let use_err = labbox_launcher::color_enabled_stderr();
            labbox_launcher::log_error_stderr(use_err, &format!("labbox-launcher: {e}"));
            ExitCode::from(e.exit_code())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["labbox-launcher"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).expect("parse")
    }

    #[test]
    fn test_flags_become_request_fields() {
        let cli = parse(&[
            "ubuntu:20.04",
            "-v",
            "data:/data:ro",
            "-p",
            "8080:80",
            "-e",
            "A=1",
            "-e",
            "A=2",
            "--detached",
            "--command",
            "bash",
            "-lc",
            "echo hi",
        ]);
        let req = request_from_cli(&cli, &Config::default(), Path::new("/work")).unwrap();
        assert_eq!(req.image_identifier.as_deref(), Some("ubuntu:20.04"));
        assert_eq!(req.mounts[0].host, PathBuf::from("/work/data"));
        assert!(req.mounts[0].read_only);
        assert_eq!(req.ports, vec![PortSpec { host: 8080, container: 80 }]);
        assert_eq!(req.env.get("A").map(String::as_str), Some("2"));
        assert_eq!(req.interactive, Some(false));
        assert_eq!(
            req.command,
            Some(vec!["bash".to_string(), "-lc".to_string(), "echo hi".to_string()])
        );
    }

    #[test]
    fn test_absent_flags_leave_fields_unset() {
        let cli = parse(&[]);
        let req = request_from_cli(&cli, &Config::default(), Path::new("/work")).unwrap();
        assert_eq!(req.image_identifier, None);
        assert_eq!(req.interactive, None);
        assert_eq!(req.command, None);
        assert!(req.auto_remove);
    }

    #[test]
    fn test_kachery_flag_mounts_storage_and_sets_env() {
        let dir = tempfile::tempdir().unwrap();
        let dir_s = dir.path().to_string_lossy().to_string();
        let cli = parse(&["img:1", "--kachery", &dir_s]);
        let req = request_from_cli(&cli, &Config::default(), Path::new("/")).unwrap();
        assert_eq!(req.mounts.len(), 1);
        assert_eq!(req.mounts[0].container, KACHERY_CONTAINER_DIR);
        assert_eq!(
            req.env.get("KACHERY_STORAGE_DIR").map(String::as_str),
            Some(KACHERY_CONTAINER_DIR)
        );
    }

    #[test]
    fn test_bad_port_is_a_configuration_error() {
        let cli = parse(&["img:1", "-p", "80"]);
        let err = request_from_cli(&cli, &Config::default(), Path::new("/")).unwrap_err();
        assert!(matches!(err, LauncherError::Configuration(_)));
    }

    #[test]
    fn test_subcommands_are_not_images() {
        let cli = parse(&["doctor"]);
        assert!(cli.image.is_none());
        assert!(matches!(cli.cmd, Some(crate::cli::Cmd::Doctor)));
    }

    #[test]
    fn test_subcommands_follow_global_flags() {
        let cli = parse(&["--runtime", "/nonexistent/docker", "--verbose", "doctor"]);
        assert!(cli.image.is_none());
        assert!(matches!(cli.cmd, Some(crate::cli::Cmd::Doctor)));
        assert_eq!(cli.runtime.as_deref(), Some("/nonexistent/docker"));
        assert!(cli.verbose);

        let cli = parse(&["--config", "f.yml", "resolve", "sha1://abc"]);
        assert!(cli.image.is_none());
        assert!(matches!(
            cli.cmd,
            Some(crate::cli::Cmd::Resolve { ref identifier }) if identifier == "sha1://abc"
        ));
        assert_eq!(cli.config, Some(PathBuf::from("f.yml")));

        let cli = parse(&["doctor", "--verbose", "--color", "never"]);
        assert!(matches!(cli.cmd, Some(crate::cli::Cmd::Doctor)));
        assert!(cli.verbose);
        assert_eq!(cli.color, Some(labbox_launcher::ColorMode::Never));
    }
}
