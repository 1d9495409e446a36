/*!
Test support helpers shared across integration tests.

- CountingStore: in-memory content store that counts lookups
- resolved(reference): registry ResolvedImage shortcut
- write_script(dir, name, body): executable shell script (unix)
- launcher_cmd(home): binary invocation isolated from the user's config and environment
- kachery_put(root, hash, content): place a blob in a kachery storage tree
*/

use std::cell::Cell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use labbox_launcher::{ContentHash, ContentStore, ImageSource, LookupError, ResolvedImage};

#[allow(dead_code)]
pub const HASH: &str = "deadbeefdeadbeefdeadbeefdeadbeefdeadbeef";

/// In-memory store; hashes not inserted report `NotFound`.
#[allow(dead_code)]
#[derive(Default)]
pub struct CountingStore {
    entries: HashMap<String, String>,
    unreachable: bool,
    calls: Cell<usize>,
}

#[allow(dead_code)]
impl CountingStore {
    pub fn with(hash: &str, reference: &str) -> Self {
        let mut s = Self::default();
        s.entries.insert(hash.to_string(), reference.to_string());
        s
    }

    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl ContentStore for CountingStore {
    fn get_reference(&self, hash: &ContentHash) -> Result<String, LookupError> {
        self.calls.set(self.calls.get() + 1);
        if self.unreachable {
            return Err(LookupError::Unreachable("connection refused".to_string()));
        }
        self.entries
            .get(hash.as_str())
            .cloned()
            .ok_or(LookupError::NotFound)
    }
}

#[allow(dead_code)]
pub fn resolved(reference: &str) -> ResolvedImage {
    ResolvedImage {
        identifier: reference.to_string(),
        concrete_reference: reference.to_string(),
        source: ImageSource::Registry,
    }
}

/// Write an executable `/bin/sh` script and return its path.
#[cfg(unix)]
#[allow(dead_code)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("chmod script");
    path
}

/// Store `content` under `hash` using the kachery sha1 layout.
#[allow(dead_code)]
pub fn kachery_put(root: &Path, hash: &str, content: &str) {
    let dir = root
        .join("sha1")
        .join(&hash[0..2])
        .join(&hash[2..4])
        .join(&hash[4..6]);
    std::fs::create_dir_all(&dir).expect("create kachery dirs");
    std::fs::write(dir.join(hash), content).expect("write kachery blob");
}

/// The launcher binary with HOME pointed at `home` and launcher-related env cleared.
#[allow(dead_code)]
pub fn launcher_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_labbox-launcher"));
    cmd.env("HOME", home)
        .env("NO_COLOR", "1")
        .env("LABBOX_LAUNCHER_NON_INTERACTIVE", "1")
        .env_remove("LABBOX_LAUNCHER_CONFIG")
        .env_remove("LABBOX_LAUNCHER_RUNTIME")
        .env_remove("LABBOX_LAUNCHER_PROMPT_RETRIES")
        .env_remove("LABBOX_LAUNCHER_LOG")
        .env_remove("KACHERY_STORAGE_DIR");
    cmd
}
