#![allow(clippy::module_name_repetitions)]
//! Container runtime discovery (Docker or Podman CLI).

use std::io;
use std::path::PathBuf;

use which::which;

/// Locate the runtime binary. `preferred` is a bare name looked up on PATH, or a path.
pub fn container_runtime_path(preferred: &str) -> io::Result<PathBuf> {
    let preferred = preferred.trim();
    if preferred.contains(std::path::MAIN_SEPARATOR) || preferred.contains('/') {
        let p = PathBuf::from(preferred);
        if p.is_file() {
            return Ok(p);
        }
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("container runtime not found at {}", p.display()),
        ));
    }
    if let Ok(p) = which(preferred) {
        return Ok(p);
    }
    Err(io::Error::new(
        io::ErrorKind::NotFound,
        format!("{preferred} is required but was not found in PATH."),
    ))
}
