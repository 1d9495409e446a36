use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

/// Trimmed stdout of a successful command.
fn command_stdout(program: &str, args: &[&str]) -> Option<String> {
    let out = Command::new(program).args(args).output().ok()?;
    let text = String::from_utf8_lossy(&out.stdout).trim().to_string();
    (out.status.success() && !text.is_empty()).then_some(text)
}

fn emit(key: &str, value: &str) {
    println!("cargo:rustc-env={key}={value}");
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let build_date = command_stdout("date", &["-u", "+%Y-%m-%dT%H:%M:%SZ"]).unwrap_or_else(|| {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        format!("unix:{secs}")
    });
    emit("LABBOX_BUILD_DATE", &build_date);

    for (key, var) in [
        ("LABBOX_BUILD_TARGET", "TARGET"),
        ("LABBOX_BUILD_PROFILE", "PROFILE"),
    ] {
        emit(key, &std::env::var(var).unwrap_or_else(|_| "unknown".to_string()));
    }
}
