use std::process::{Command, Stdio};

use labbox_launcher::docker::runtime::container_runtime_path;
use labbox_launcher::Config;
use which::which;

fn value(use_color: bool, s: &str) -> String {
    labbox_launcher::paint(use_color, "\x1b[34;1m", s)
}

fn runtime_version(rt: &std::path::Path) -> Option<String> {
    let out = Command::new(rt)
        .arg("--version")
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .ok()?;
    let s = String::from_utf8_lossy(&out.stdout).trim().to_string();
    (out.status.success() && !s.is_empty()).then_some(s)
}

/// Print diagnostics to stderr. Never fails: problems are reported, not fatal.
pub fn run_doctor(cfg: &Config, verbose: bool) {
    let use_err = labbox_launcher::color_enabled_stderr();
    labbox_launcher::log_info_stderr(use_err, "labbox-launcher doctor");
    eprintln!();
    eprintln!("  version: v{}", env!("CARGO_PKG_VERSION"));
    eprintln!(
        "  host:    {} / {}",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    if verbose {
        eprintln!(
            "  build:   {} ({}, {})",
            env!("LABBOX_BUILD_DATE"),
            env!("LABBOX_BUILD_TARGET"),
            env!("LABBOX_BUILD_PROFILE")
        );
    }
    eprintln!();

    match container_runtime_path(&cfg.runtime) {
        Ok(rt) => {
            eprintln!("  runtime: {}", value(use_err, &rt.display().to_string()));
            if let Some(v) = runtime_version(&rt) {
                eprintln!("  runtime version: {v}");
            }
        }
        Err(e) => {
            labbox_launcher::log_warn_stderr(use_err, &format!("  runtime: not found ({e})"));
        }
    }

    match &cfg.kachery_storage_dir {
        Some(dir) if dir.is_dir() => {
            eprintln!("  kachery storage: {}", value(use_err, &dir.display().to_string()));
        }
        Some(dir) => {
            labbox_launcher::log_warn_stderr(
                use_err,
                &format!("  kachery storage: {} (missing)", dir.display()),
            );
        }
        None => eprintln!("  kachery storage: (not configured)"),
    }
    match which(&cfg.kachery_cat) {
        Ok(p) => eprintln!("  kachery-cat: {}", p.display()),
        Err(_) => eprintln!("  kachery-cat: (not found)"),
    }

    let cfg_src = cfg
        .source
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(defaults)".to_string());
    eprintln!("  config: {cfg_src}");
    eprintln!(
        "  prompts: {}",
        cfg.schema
            .fields
            .iter()
            .map(|f| f.field.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    eprintln!();
    labbox_launcher::log_info_stderr(use_err, "doctor: completed diagnostics.");
}
