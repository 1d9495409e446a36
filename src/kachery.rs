//! Kachery-backed content stores.
//!
//! Kachery keeps blobs under `<storage>/sha1/<h[0..2]>/<h[2..4]>/<h[4..6]>/<hash>`.
//! A blob resolving to an image is a JSON string, a JSON object with an
//! `image` (or `docker_image`) string, or plain text whose first non-empty
//! line is the reference.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;
use which::which;

use crate::config::Config;
use crate::errors::LookupError;
use crate::resolver::{ContentHash, ContentStore};
use crate::util::{ExecRequest, ExecService};

const KACHERY_CAT_TIMEOUT: Duration = Duration::from_secs(60);

/// Extract the image reference from a stored blob.
///
/// JSON that is neither a string nor an object naming an image yields
/// `NoReference`, as does a blob with no non-empty line.
pub fn reference_from_blob(content: &str) -> Result<String, LookupError> {
    match serde_json::from_str::<serde_json::Value>(content) {
        Ok(serde_json::Value::Object(map)) => ["image", "docker_image"]
            .iter()
            .find_map(|k| map.get(*k).and_then(|v| v.as_str()))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                LookupError::NoReference("JSON object has no 'image' or 'docker_image' string".into())
            }),
        Ok(serde_json::Value::String(s)) => Some(s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| LookupError::NoReference("JSON string is empty".into())),
        Ok(other) => Err(LookupError::NoReference(format!(
            "JSON {} is not an image reference",
            json_kind(&other)
        ))),
        Err(_) => content
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(str::to_string)
            .ok_or_else(|| LookupError::NoReference("blob is empty".into())),
    }
}

fn json_kind(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Direct reads from a local kachery storage directory.
#[derive(Debug, Clone)]
pub struct LocalKacheryStore {
    root: PathBuf,
}

impl LocalKacheryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn blob_path(&self, hash: &ContentHash) -> PathBuf {
        let h = hash.as_str();
        self.root
            .join("sha1")
            .join(&h[0..2])
            .join(&h[2..4])
            .join(&h[4..6])
            .join(h)
    }
}

impl ContentStore for LocalKacheryStore {
    fn get_reference(&self, hash: &ContentHash) -> Result<String, LookupError> {
        if !self.root.is_dir() {
            return Err(LookupError::Unreachable(format!(
                "kachery storage directory {} does not exist",
                self.root.display()
            )));
        }
        let path = self.blob_path(hash);
        debug!(path = %path.display(), "reading kachery blob");
        let content = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => LookupError::NotFound,
            _ => LookupError::Unreachable(format!("cannot read {}: {e}", path.display())),
        })?;
        reference_from_blob(&content)
    }
}

/// Lookups through the `kachery-cat` command.
#[derive(Debug, Clone)]
pub struct KacheryCatStore {
    program: PathBuf,
    exec: ExecService,
}

impl KacheryCatStore {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            exec: ExecService::new(KACHERY_CAT_TIMEOUT),
        }
    }
}

impl ContentStore for KacheryCatStore {
    fn get_reference(&self, hash: &ContentHash) -> Result<String, LookupError> {
        let out = self
            .exec
            .run(
                ExecRequest::new(&self.program)
                    .arg(hash.uri())
                    .capture_output(true),
            )
            .map_err(|e| LookupError::Unreachable(format!("{e:#}")))?;
        if !out.status.success() {
            let msg = out.stderr_message();
            if msg.to_ascii_lowercase().contains("not found") {
                return Err(LookupError::NotFound);
            }
            return Err(LookupError::Unreachable(format!(
                "{} exited with {}: {msg}",
                self.program.display(),
                out.status
            )));
        }
        reference_from_blob(&out.stdout)
    }
}

/// Used when no storage is configured and `kachery-cat` is not installed.
#[derive(Debug, Clone, Default)]
pub struct UnavailableStore;

impl ContentStore for UnavailableStore {
    fn get_reference(&self, _hash: &ContentHash) -> Result<String, LookupError> {
        Err(LookupError::Unreachable(
            "no kachery storage configured (set KACHERY_STORAGE_DIR or install kachery-cat)"
                .to_string(),
        ))
    }
}

/// Pick a store: configured storage directory, then `kachery-cat` on PATH.
pub fn store_from_config(cfg: &Config) -> Box<dyn ContentStore> {
    if let Some(dir) = &cfg.kachery_storage_dir {
        debug!(dir = %dir.display(), "using local kachery storage");
        return Box::new(LocalKacheryStore::new(dir.clone()));
    }
    match which(&cfg.kachery_cat) {
        Ok(p) => {
            debug!(program = %p.display(), "using kachery-cat");
            Box::new(KacheryCatStore::new(p))
        }
        Err(_) => Box::new(UnavailableStore),
    }
}
