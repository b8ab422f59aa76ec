//! The declarative provisioning model.
//!
//! A [`Config`] is loaded from one or more YAML/JSON documents and merged in
//! order. Phases then read it and, where they need to, extend it in place
//! (e.g. the Kubernetes phase appends its packages before the packages phase
//! runs).

pub mod annotated;
pub mod types;

pub use annotated::{Command, Commands, Package, strip_version};
pub use types::*;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::Result;

/// The full provisioning intent before transformation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pre_commands: Vec<Command>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<Command>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub post_commands: Vec<Command>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub filesystem: Filesystem,
    /// Destination path to local source path
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub files: BTreeMap<String, String>,
    /// Destination path to template path
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub templates: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sysctls: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub packages: Vec<Package>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub package_repos: Vec<PackageRepo>,
    /// Container images to pre-pull
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub containers: Vec<Container>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_runtime: Option<ContainerRuntime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubernetes: Option<Kubernetes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub services: BTreeMap<String, Service>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<User>,
    /// Collaborator-owned content (e.g. raw cloud-init), passed through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

impl Config {
    /// Parse a YAML document (JSON is valid YAML).
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load a document from disk, choosing the parser by extension.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        debug!(path = %path.display(), "Loading config");
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Ok(serde_json::from_str(&content)?),
            _ => Self::from_yaml(&content),
        }
    }

    /// Load and merge several documents in order.
    pub fn load_all<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        paths.iter().try_fold(Self::default(), |acc, path| {
            Ok(acc.merge(Self::load(path.as_ref())?))
        })
    }

    /// Merge `other` on top of `self`.
    ///
    /// Lists are concatenated in order, maps are overlaid key by key, and
    /// singular values from `other` replace those in `self` when present.
    pub fn merge(mut self, other: Config) -> Self {
        self.pre_commands.extend(other.pre_commands);
        self.commands.extend(other.commands);
        self.post_commands.extend(other.post_commands);
        self.filesystem.extend(other.filesystem);
        self.files.extend(other.files);
        self.templates.extend(other.templates);
        self.sysctls.extend(other.sysctls);
        self.environment.extend(other.environment);
        self.packages.extend(other.packages);
        self.package_repos.extend(other.package_repos);
        self.images.extend(other.images);
        self.containers.extend(other.containers);
        self.services.extend(other.services);
        self.users.extend(other.users);

        if other.container_runtime.is_some() {
            self.container_runtime = other.container_runtime;
        }
        if other.kubernetes.is_some() {
            self.kubernetes = other.kubernetes;
        }
        if other.timezone.is_some() {
            self.timezone = other.timezone;
        }
        if other.extra.is_some() {
            self.extra = other.extra;
        }
        self
    }
}
