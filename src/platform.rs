//! Platform descriptors: one per supported OS family.
//!
//! A descriptor knows how to recognise its family from `/etc/os-release`,
//! which flags that family contributes, and which package manager speaks its
//! command dialect. Detection walks [`Platform::ALL`] in order and takes the
//! first match.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::error::{Error, Result};
use crate::flags::{Flag, FlagSet};
use crate::os_release::OsRelease;
use crate::package_manager::{Apt, Dnf, PackageManager, Tdnf, Yum};

/// Supported operating system families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Photon,
    Fedora,
    Centos,
    Rhel,
    #[serde(rename = "amzn")]
    AmazonLinux,
    Ubuntu,
    Debian,
}

impl Platform {
    /// Detection priority order.
    pub const ALL: [Platform; 7] = [
        Platform::Photon,
        Platform::Fedora,
        Platform::Centos,
        Platform::Rhel,
        Platform::AmazonLinux,
        Platform::Ubuntu,
        Platform::Debian,
    ];

    /// The os-release `ID` this family reports.
    pub fn os_id(&self) -> &'static str {
        match self {
            Platform::Photon => "photon",
            Platform::Fedora => "fedora",
            Platform::Centos => "centos",
            Platform::Rhel => "rhel",
            Platform::AmazonLinux => "amzn",
            Platform::Ubuntu => "ubuntu",
            Platform::Debian => "debian",
        }
    }

    /// The flag identifying this family.
    pub fn family_flag(&self) -> Flag {
        match self {
            Platform::Photon => Flag::Photon,
            Platform::Fedora => Flag::Fedora,
            Platform::Centos => Flag::Centos,
            Platform::Rhel => Flag::Rhel,
            Platform::AmazonLinux => Flag::AmazonLinux,
            Platform::Ubuntu => Flag::Ubuntu,
            Platform::Debian => Flag::Debian,
        }
    }

    /// True iff the host's `ID` matches this family. Never fails.
    pub fn detect_at_runtime(&self, host: &OsRelease) -> bool {
        host.id() == Some(self.os_id())
    }

    /// Flags for this family on `host`, most specific first.
    ///
    /// An unrecognised major version yields only the family-wide flags.
    pub fn tags(&self, host: &OsRelease) -> Vec<Flag> {
        let major = host.major_version();
        let version_flag = match (self, major) {
            (Platform::Photon, Some(2)) => Some(Flag::Photon2),
            (Platform::Photon, Some(3)) => Some(Flag::Photon3),
            (Platform::Centos, Some(7)) => Some(Flag::Centos7),
            (Platform::Centos, Some(8)) => Some(Flag::Centos8),
            (Platform::Rhel, Some(7)) => Some(Flag::Rhel7),
            (Platform::Rhel, Some(8)) => Some(Flag::Rhel8),
            (Platform::Ubuntu, Some(18)) => Some(Flag::Ubuntu18),
            (Platform::Ubuntu, Some(20)) => Some(Flag::Ubuntu20),
            (Platform::Ubuntu, Some(22)) => Some(Flag::Ubuntu22),
            (Platform::Debian, Some(9)) => Some(Flag::Debian9),
            (Platform::Debian, Some(10)) => Some(Flag::Debian10),
            (Platform::Debian, Some(11)) => Some(Flag::Debian11),
            _ => None,
        };

        let mut tags: Vec<Flag> = version_flag.into_iter().collect();
        tags.push(self.family_flag());
        match self {
            Platform::Photon => {}
            Platform::Rhel => tags.extend([Flag::Redhat, Flag::RedhatLike]),
            Platform::Fedora | Platform::Centos | Platform::AmazonLinux => {
                tags.push(Flag::RedhatLike)
            }
            Platform::Ubuntu | Platform::Debian => tags.push(Flag::DebianLike),
        }
        tags
    }

    /// `VERSION_CODENAME`, or empty string.
    pub fn version_codename(&self, host: &OsRelease) -> String {
        host.version_codename()
    }

    pub fn package_manager(&self) -> &'static dyn PackageManager {
        match self {
            Platform::Photon => &Tdnf,
            Platform::Fedora => &Dnf,
            Platform::Centos | Platform::Rhel | Platform::AmazonLinux => &Yum,
            Platform::Ubuntu | Platform::Debian => &Apt,
        }
    }

    /// Select the first descriptor matching `host`.
    pub fn detect(host: &OsRelease) -> Result<Platform> {
        let platform = Self::ALL
            .into_iter()
            .find(|p| p.detect_at_runtime(host))
            .ok_or_else(|| Error::UnsupportedPlatform {
                id: host.id().unwrap_or("<missing>").to_string(),
            })?;
        debug!(platform = %platform, "Detected platform");
        Ok(platform)
    }

    /// Recover the platform from an already-resolved flag set.
    ///
    /// Only for contexts that were not built from a detected host; extra
    /// family flags make the answer ambiguous.
    pub fn for_flags(flags: &FlagSet) -> Option<Platform> {
        Self::ALL
            .into_iter()
            .find(|p| flags.contains(p.family_flag()))
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.os_id())
    }
}
