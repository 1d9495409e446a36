//! Image identifier resolution.
//!
//! `sha1://<40 hex>[/<name>]` identifiers are content addresses and are looked
//! up in the content store; everything else is a registry `name[:tag]` that is
//! passed through untouched. Registry references are not checked over the
//! network here; the runtime reports unknown images at launch time.

use std::fmt;

use tracing::{debug, info_span};
use url::Url;

use crate::errors::{LauncherError, LookupError};
use crate::model::{ImageSource, ResolvedImage};

pub const CONTENT_SCHEME: &str = "sha1";
pub const HASH_LEN: usize = 40;

/// Lowercase hex SHA-1 digest of stored content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHash(String);

impl ContentHash {
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.len() == HASH_LEN && raw.bytes().all(|b| b.is_ascii_hexdigit()) {
            Some(Self(raw.to_ascii_lowercase()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn uri(&self) -> String {
        format!("{CONTENT_SCHEME}://{}", self.0)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// External content-addressed storage.
pub trait ContentStore {
    /// Reference text stored under `hash`.
    fn get_reference(&self, hash: &ContentHash) -> Result<String, LookupError>;
}

impl<T: ContentStore + ?Sized> ContentStore for Box<T> {
    fn get_reference(&self, hash: &ContentHash) -> Result<String, LookupError> {
        (**self).get_reference(hash)
    }
}

/// Classification of a raw identifier before any lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    Registry(String),
    Content(ContentHash),
}

pub fn classify(identifier: &str) -> Result<Identifier, LauncherError> {
    let trimmed = identifier.trim();
    if trimmed.is_empty() {
        return Err(LauncherError::Resolution(
            "image identifier is empty".to_string(),
        ));
    }
    let Some((scheme, _)) = trimmed.split_once("://") else {
        if trimmed.chars().any(char::is_whitespace) {
            return Err(LauncherError::Resolution(format!(
                "image identifier '{trimmed}' contains whitespace"
            )));
        }
        return Ok(Identifier::Registry(trimmed.to_string()));
    };
    if !scheme.eq_ignore_ascii_case(CONTENT_SCHEME) {
        return Err(LauncherError::Resolution(format!(
            "unsupported identifier scheme '{scheme}://' in '{trimmed}' (expected name[:tag] or sha1://<hash>)"
        )));
    }
    let url = Url::parse(trimmed).map_err(|e| {
        LauncherError::Resolution(format!("malformed content address '{trimmed}': {e}"))
    })?;
    if !url.username().is_empty()
        || url.password().is_some()
        || url.port().is_some()
        || url.query().is_some()
        || url.fragment().is_some()
    {
        return Err(LauncherError::Resolution(format!(
            "malformed content address '{trimmed}': only sha1://<hash>[/path] is accepted"
        )));
    }
    let host = url.host_str().unwrap_or_default();
    ContentHash::parse(host).map(Identifier::Content).ok_or_else(|| {
        LauncherError::Resolution(format!(
            "malformed content address '{trimmed}': expected {HASH_LEN} hex characters after sha1://"
        ))
    })
}

/// Validate text returned by the store as a runtime-loadable reference.
fn validate_reference(hash: &ContentHash, reference: &str) -> Result<String, LauncherError> {
    let r = reference.trim();
    if r.is_empty() {
        return Err(LauncherError::Resolution(format!(
            "content {} does not contain an image reference",
            hash.uri()
        )));
    }
    if r.chars().any(char::is_whitespace) || r.contains("://") {
        return Err(LauncherError::Resolution(format!(
            "content {} holds an invalid image reference: {r}",
            hash.uri()
        )));
    }
    Ok(r.to_string())
}

pub struct Resolver<S> {
    store: S,
}

impl<S: ContentStore> Resolver<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn resolve(&self, identifier: &str) -> Result<ResolvedImage, LauncherError> {
        let span = info_span!("resolve", identifier);
        let _enter = span.enter();
        match classify(identifier)? {
            Identifier::Registry(reference) => {
                debug!(%reference, "registry reference passed through");
                Ok(ResolvedImage {
                    identifier: identifier.to_string(),
                    concrete_reference: reference,
                    source: ImageSource::Registry,
                })
            }
            Identifier::Content(hash) => {
                debug!(%hash, "looking up content-addressed reference");
                let raw = self.store.get_reference(&hash).map_err(|e| match e {
                    LookupError::NotFound => LauncherError::Resolution(format!(
                        "{} is not known to the content store",
                        hash.uri()
                    )),
                    LookupError::Unreachable(msg) => LauncherError::Resolution(format!(
                        "cannot look up {}: {msg}",
                        hash.uri()
                    )),
                    LookupError::NoReference(why) => LauncherError::Resolution(format!(
                        "content {} holds no image reference: {why}",
                        hash.uri()
                    )),
                })?;
                let reference = validate_reference(&hash, &raw)?;
                debug!(%reference, "content address resolved");
                Ok(ResolvedImage {
                    identifier: identifier.to_string(),
                    concrete_reference: reference,
                    source: ImageSource::ContentAddressed,
                })
            }
        }
    }
}
