use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use labbox_launcher::Config;

mod cli;
mod commands;
mod doctor;

use crate::cli::{Cli, Cmd};

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut cfg = Config::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(rt) = cli
        .runtime
        .as_ref()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
    {
        cfg.runtime = rt.to_string();
    }
    Ok(cfg)
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(c) => c,
        Err(e) => {
            // Usage errors are configuration errors (exit 1); 2 is reserved for launch failures.
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(1)
            } else {
                ExitCode::from(0)
            };
        }
    };

    if let Some(mode) = cli.color {
        labbox_launcher::set_color_mode(mode);
    }
    labbox_launcher::telemetry::telemetry_init(cli.verbose);

    let cfg = match load_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            let use_err = labbox_launcher::color_enabled_stderr();
            labbox_launcher::log_error_stderr(use_err, &format!("labbox-launcher: {e:#}"));
            return ExitCode::from(1);
        }
    };

    match &cli.cmd {
        Some(Cmd::Doctor) => {
            doctor::run_doctor(&cfg, cli.verbose);
            ExitCode::from(0)
        }
        Some(Cmd::Resolve { identifier }) => commands::run_resolve(identifier, &cfg, cli.verbose),
        None => commands::run_launch(&cli, &cfg),
    }
}
