use std::fmt::Display;

/// Yellow `warning:` line on stderr; plain when color is off.
pub fn warn_print(msg: impl Display) {
    let line = format!("warning: {msg}");
    eprintln!(
        "{}",
        crate::paint(crate::color_enabled_stderr(), "\x1b[33;1m", &line)
    );
}
