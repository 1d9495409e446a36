//! Launch data model: requests, resolved images, plans and results.
//!
//! Requests are filled in by the CLI and the collector; everything downstream
//! of resolution is an immutable value produced by one stage and consumed by
//! the next.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;

/// Bind mount of a host path into the container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MountSpec {
    pub host: PathBuf,
    pub container: String,
    pub read_only: bool,
}

impl MountSpec {
    /// Container path with trailing slashes removed; used for conflict detection.
    pub fn container_key(&self) -> &str {
        let t = self.container.trim_end_matches('/');
        if t.is_empty() {
            "/"
        } else {
            t
        }
    }

    /// Make a relative host path absolute against `base`.
    pub fn anchored_at(mut self, base: &Path) -> Self {
        if self.host.is_relative() {
            self.host = base.join(&self.host);
        }
        self
    }
}

impl FromStr for MountSpec {
    type Err = String;

    /// `HOST:CONTAINER[:ro|:rw]`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        let (host, container, read_only) = match parts.as_slice() {
            [h, c] => (*h, *c, false),
            [h, c, "ro"] => (*h, *c, true),
            [h, c, "rw"] => (*h, *c, false),
            [_, _, mode] => {
                return Err(format!(
                    "invalid mount mode '{mode}' in '{s}' (expected ro or rw)"
                ))
            }
            _ => return Err(format!("invalid mount '{s}' (expected HOST:CONTAINER[:ro|rw])")),
        };
        if host.trim().is_empty() {
            return Err(format!("invalid mount '{s}': empty host path"));
        }
        if !container.starts_with('/') {
            return Err(format!(
                "invalid mount '{s}': container path must be absolute"
            ));
        }
        Ok(MountSpec {
            host: PathBuf::from(host),
            container: container.to_string(),
            read_only,
        })
    }
}

impl fmt::Display for MountSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host.display(), self.container)?;
        if self.read_only {
            f.write_str(":ro")?;
        }
        Ok(())
    }
}

/// Host port published to a container port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PortSpec {
    pub host: u16,
    pub container: u16,
}

fn parse_port(raw: &str, whole: &str) -> Result<u16, String> {
    match raw.trim().parse::<u16>() {
        Ok(0) | Err(_) => Err(format!(
            "invalid port '{raw}' in '{whole}' (expected 1-65535)"
        )),
        Ok(p) => Ok(p),
    }
}

impl FromStr for PortSpec {
    type Err = String;

    /// `HOST:CONTAINER`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (h, c) = s
            .split_once(':')
            .ok_or_else(|| format!("invalid port mapping '{s}' (expected HOST:CONTAINER)"))?;
        Ok(PortSpec {
            host: parse_port(h, s)?,
            container: parse_port(c, s)?,
        })
    }
}

impl fmt::Display for PortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.container)
    }
}

pub fn valid_env_key(key: &str) -> bool {
    !key.is_empty() && !key.contains('=') && !key.chars().any(char::is_whitespace)
}

/// Parse `KEY=VALUE`; the value may itself contain `=` or be empty.
pub fn parse_env_pair(s: &str) -> Result<(String, String), String> {
    let (k, v) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid env '{s}' (expected KEY=VALUE)"))?;
    if !valid_env_key(k) {
        return Err(format!("invalid env key '{k}' in '{s}'"));
    }
    Ok((k.to_string(), v.to_string()))
}

/// User intent before resolution. `None`/empty means "not given".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchRequest {
    pub image_identifier: Option<String>,
    pub mounts: Vec<MountSpec>,
    pub ports: Vec<PortSpec>,
    pub env: BTreeMap<String, String>,
    /// Attach to the container's streams; `Some(false)` is detached mode.
    pub interactive: Option<bool>,
    pub command: Option<Vec<String>>,
    pub name: Option<String>,
    pub auto_remove: bool,
}

impl LaunchRequest {
    pub fn attached(&self) -> bool {
        self.interactive.unwrap_or(true)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImageSource {
    Registry,
    ContentAddressed,
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSource::Registry => f.write_str("registry"),
            ImageSource::ContentAddressed => f.write_str("content-addressed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedImage {
    pub identifier: String,
    pub concrete_reference: String,
    pub source: ImageSource,
}

/// Fully-specified, conflict-free runtime invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchPlan {
    pub image: ResolvedImage,
    pub mounts: Vec<MountSpec>,
    pub ports: Vec<PortSpec>,
    pub env: BTreeMap<String, String>,
    /// Empty means the image's built-in entry point.
    pub command: Vec<String>,
    pub interactive: bool,
    pub name: Option<String>,
    pub auto_remove: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchResult {
    pub exit_code: i32,
    /// Empty when the launch failed before a container was created.
    pub container_id: String,
}
