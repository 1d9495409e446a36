#![allow(clippy::module_name_repetitions)]
//! Terminal color for stderr diagnostics.
//!
//! Precedence: `NO_COLOR` > `--color` > `LABBOX_LAUNCHER_COLOR` > tty detection.
//! stdout carries machine-readable output (container ids, references) and is
//! never painted.

use std::str::FromStr;

use clap::ValueEnum;
use once_cell::sync::OnceCell;

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn enabled(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => is_tty,
        }
    }
}

impl FromStr for ColorMode {
    type Err = ();

    /// Lenient form used for the environment variable; accepts on/off style aliases.
    fn from_str(s: &str) -> Result<Self, ()> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(ColorMode::Auto),
            "always" | "on" | "true" | "yes" | "1" => Ok(ColorMode::Always),
            "never" | "off" | "false" | "no" | "0" => Ok(ColorMode::Never),
            _ => Err(()),
        }
    }
}

static CLI_MODE: OnceCell<ColorMode> = OnceCell::new();

/// Record the `--color` choice. First call wins.
pub fn set_color_mode(mode: ColorMode) {
    let _ = CLI_MODE.set(mode);
}

fn resolve_mode<F>(env: F) -> ColorMode
where
    F: Fn(&str) -> Option<String>,
{
    if env("NO_COLOR").is_some() {
        return ColorMode::Never;
    }
    CLI_MODE
        .get()
        .copied()
        .or_else(|| env("LABBOX_LAUNCHER_COLOR").and_then(|v| v.parse().ok()))
        .unwrap_or(ColorMode::Auto)
}

pub fn color_enabled_stderr() -> bool {
    resolve_mode(|k| std::env::var(k).ok()).enabled(atty::is(atty::Stream::Stderr))
}

/// Wrap `s` in `code` ... reset when `enabled`.
pub fn paint(enabled: bool, code: &str, s: &str) -> String {
    if !enabled {
        return s.to_string();
    }
    format!("{code}{s}\x1b[0m")
}

#[derive(Clone, Copy)]
enum Level {
    Info,
    Warn,
    Error,
}

fn log_stderr(level: Level, use_color: bool, msg: &str) {
    let code = match level {
        Level::Info => "\x1b[36;1m",
        Level::Warn => "\x1b[33m",
        Level::Error => "\x1b[31;1m",
    };
    eprintln!("{}", paint(use_color, code, msg));
}

pub fn log_info_stderr(use_color: bool, msg: &str) {
    log_stderr(Level::Info, use_color, msg);
}

pub fn log_warn_stderr(use_color: bool, msg: &str) {
    log_stderr(Level::Warn, use_color, msg);
}

pub fn log_error_stderr(use_color: bool, msg: &str) {
    log_stderr(Level::Error, use_color, msg);
}
