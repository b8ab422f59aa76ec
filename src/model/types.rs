//! Provisioning item types carried by [`Config`](super::Config).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::flags::{Flag, FlagSet};

/// A file to place on the target filesystem.
///
/// Content is carried verbatim; `content_from_url` is downloaded by the
/// generated script, never while rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct File {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_from_url: Option<String>,
    /// Octal mode, e.g. `0644`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<String>,
    /// `user` or `user:group`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, alias = "flags", skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Flag>,
}

impl File {
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn applies_to(&self, active: &FlagSet) -> bool {
        active.satisfies(&self.tags)
    }
}

/// Destination path to file.
pub type Filesystem = BTreeMap<String, File>;

/// A package repository definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PackageRepo {
    /// Repository identifier; derived from its position when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub gpg_key: String,
    /// Repository component, e.g. `stable` or `main` (apt only)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub channel: String,
    /// Overrides the host codename (apt only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_codename: Option<String>,
    /// Raw `key = value` lines appended to the repo file
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_args: BTreeMap<String, String>,
    #[serde(default, alias = "flags", skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Flag>,
}

impl PackageRepo {
    pub fn applies_to(&self, active: &FlagSet) -> bool {
        active.satisfies(&self.tags)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Port {
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<u16>,
}

/// A container to run as a systemd service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Container {
    /// Service name; derived from the image when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    pub image: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Extra `docker run` arguments, e.g. `-p 8080:8080`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub docker_opts: String,
    /// Extra docker client arguments, e.g. `-H unix:///tmp/docker.sock`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub docker_client_args: String,
    /// Arguments passed to the container entrypoint
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub args: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<Port>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<String>,
    /// Host path to container path
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub files: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub templates: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,
    /// CPU limit in cores
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<u32>,
    /// Memory limit in MB
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mem: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<u32>,
}

impl Container {
    /// Service name, falling back to the image's last path segment without tag.
    pub fn service_name(&self) -> String {
        if let Some(service) = &self.service {
            return service.clone();
        }
        let last = self.image.rsplit('/').next().unwrap_or(&self.image);
        last.split([':', '@']).next().unwrap_or(last).to_string()
    }
}

/// Container runtime to install.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ContainerRuntime {
    /// `docker` or `containerd`
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub arg: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub options: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
}

/// Installs Kubernetes node packages; does not bootstrap a cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Kubernetes {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_prefix: Option<String>,
}

/// A systemd service to install and start.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Service {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    pub exec_start: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
    /// Additional `[Service]` keys
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

/// A user account. Carried through to the provisioning agent unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct User {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gecos: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selinux_user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiredate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sudo: Option<String>,
    /// Password hash, never a plain password
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passwd: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_import_id: Option<String>,
    #[serde(default)]
    pub lock_passwd: bool,
    #[serde(default)]
    pub no_create_home: bool,
    #[serde(default)]
    pub no_user_group: bool,
    #[serde(default)]
    pub no_log_init: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ssh_authorized_keys: Vec<String>,
    #[serde(default)]
    pub inactive: bool,
    #[serde(default)]
    pub system: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapuser: Option<String>,
    #[serde(default)]
    pub ssh_redirect_user: bool,
}
