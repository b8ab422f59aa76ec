//! Capability flags and the flag registry.
//!
//! Flags are the tags that gate declarative items: an item annotated with
//! `photon3 kubernetes` only applies on a Photon 3 host that is also being
//! provisioned for Kubernetes. The registry is closed; every spelling that can
//! appear in an annotation is listed in [`REGISTRY`].

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A capability tag.
///
/// Ordering follows declaration order, which keeps [`FlagSet`] iteration
/// stable between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, JsonSchema)]
pub enum Flag {
    #[schemars(rename = "debian")]
    Debian,
    #[schemars(rename = "debian9")]
    Debian9,
    #[schemars(rename = "debian10")]
    Debian10,
    #[schemars(rename = "debian11")]
    Debian11,
    /// Debian and its derivatives
    #[schemars(rename = "debian-like")]
    DebianLike,
    #[schemars(rename = "ubuntu")]
    Ubuntu,
    #[schemars(rename = "ubuntu18")]
    Ubuntu18,
    #[schemars(rename = "ubuntu20")]
    Ubuntu20,
    #[schemars(rename = "ubuntu22")]
    Ubuntu22,
    #[schemars(rename = "redhat")]
    Redhat,
    /// Red Hat and its derivatives
    #[schemars(rename = "redhat-like")]
    RedhatLike,
    #[schemars(rename = "centos")]
    Centos,
    #[schemars(rename = "centos7")]
    Centos7,
    #[schemars(rename = "centos8")]
    Centos8,
    #[schemars(rename = "rhel")]
    Rhel,
    #[schemars(rename = "rhel7")]
    Rhel7,
    #[schemars(rename = "rhel8")]
    Rhel8,
    #[schemars(rename = "fedora")]
    Fedora,
    #[schemars(rename = "amazonlinux")]
    AmazonLinux,
    #[schemars(rename = "photon")]
    Photon,
    #[schemars(rename = "photon2")]
    Photon2,
    #[schemars(rename = "photon3")]
    Photon3,
    /// Docker was requested as the container runtime
    #[schemars(rename = "docker")]
    Docker,
    /// containerd was requested as the container runtime
    #[schemars(rename = "containerd")]
    Containerd,
    #[schemars(rename = "kubernetes")]
    Kubernetes,
    /// At least one container is declared
    #[schemars(rename = "container")]
    Container,
    #[schemars(rename = "aws")]
    Aws,
    #[schemars(rename = "vmware")]
    Vmware,
}

/// Every valid spelling, in declaration order.
pub const REGISTRY: &[(&str, Flag)] = &[
    ("debian", Flag::Debian),
    ("debian9", Flag::Debian9),
    ("debian10", Flag::Debian10),
    ("debian11", Flag::Debian11),
    ("debian-like", Flag::DebianLike),
    ("ubuntu", Flag::Ubuntu),
    ("ubuntu18", Flag::Ubuntu18),
    ("ubuntu20", Flag::Ubuntu20),
    ("ubuntu22", Flag::Ubuntu22),
    ("redhat", Flag::Redhat),
    ("redhat-like", Flag::RedhatLike),
    ("centos", Flag::Centos),
    ("centos7", Flag::Centos7),
    ("centos8", Flag::Centos8),
    ("rhel", Flag::Rhel),
    ("rhel7", Flag::Rhel7),
    ("rhel8", Flag::Rhel8),
    ("fedora", Flag::Fedora),
    ("amazonlinux", Flag::AmazonLinux),
    ("photon", Flag::Photon),
    ("photon2", Flag::Photon2),
    ("photon3", Flag::Photon3),
    ("docker", Flag::Docker),
    ("containerd", Flag::Containerd),
    ("kubernetes", Flag::Kubernetes),
    ("container", Flag::Container),
    ("aws", Flag::Aws),
    ("vmware", Flag::Vmware),
];

impl Flag {
    /// Look up a flag by its canonical spelling.
    pub fn resolve(spelling: &str) -> Option<Flag> {
        REGISTRY
            .iter()
            .find(|(name, _)| *name == spelling)
            .map(|(_, flag)| *flag)
    }

    /// The canonical spelling used in annotations.
    pub fn as_str(&self) -> &'static str {
        REGISTRY
            .iter()
            .find(|(_, flag)| flag == self)
            .map(|(name, _)| *name)
            .unwrap_or("unknown")
    }

    /// All registered flags.
    pub fn all() -> impl Iterator<Item = Flag> {
        REGISTRY.iter().map(|(_, flag)| *flag)
    }

    /// Parse a whitespace-separated list of spellings.
    ///
    /// Fails on the first unknown spelling; no partial list is returned.
    pub fn parse_list(text: &str) -> Result<Vec<Flag>> {
        text.split_whitespace().map(Flag::from_str).collect()
    }
}

impl FromStr for Flag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Flag::resolve(s).ok_or_else(|| Error::UnknownFlag {
            spelling: s.to_string(),
        })
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for Flag {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Flag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let spelling = String::deserialize(deserializer)?;
        spelling.parse().map_err(serde::de::Error::custom)
    }
}

/// A deduplicated set of active flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlagSet(BTreeSet<Flag>);

impl FlagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, flag: Flag) -> bool {
        self.0.contains(&flag)
    }

    /// Returns true if the flag was not already present.
    pub fn insert(&mut self, flag: Flag) -> bool {
        self.0.insert(flag)
    }

    pub fn extend(&mut self, flags: impl IntoIterator<Item = Flag>) {
        self.0.extend(flags);
    }

    /// True iff every required flag is active.
    ///
    /// An empty requirement list always matches.
    pub fn satisfies(&self, required: &[Flag]) -> bool {
        required.iter().all(|flag| self.0.contains(flag))
    }

    pub fn is_superset(&self, other: &FlagSet) -> bool {
        self.0.is_superset(&other.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = Flag> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Flag> for FlagSet {
    fn from_iter<I: IntoIterator<Item = Flag>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for FlagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(Flag::as_str).collect();
        write!(f, "{}", names.join(" "))
    }
}
