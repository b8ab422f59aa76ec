//! Reader for the host's OS identity document (`/etc/os-release`).
//!
//! The format is a list of `KEY=value` lines where values may be quoted.
//! Only the handful of keys platform detection needs are exposed as accessors.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Well-known location of the OS identity document.
pub const OS_RELEASE_PATH: &str = "/etc/os-release";

/// Environment variable overriding [`OS_RELEASE_PATH`].
pub const OS_RELEASE_ENV: &str = "FIRSTBOOT_OS_RELEASE";

/// Parsed key/value content of an os-release file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OsRelease {
    values: BTreeMap<String, String>,
}

impl OsRelease {
    /// Parse os-release content.
    ///
    /// Blank lines, comments and lines without `=` are ignored.
    pub fn parse(content: &str) -> Self {
        let values = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| line.split_once('='))
            .map(|(key, value)| (key.trim().to_string(), unquote(value.trim()).to_string()))
            .collect();
        Self { values }
    }

    /// Load from `path`, yielding an empty document if it cannot be read.
    pub fn load_or_default(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "os-release unreadable");
                Self::default()
            }
        }
    }

    /// Load the host document, honouring the override variable.
    pub fn load_host() -> Self {
        Self::load_or_default(&Self::host_path())
    }

    /// Path the host document is read from.
    pub fn host_path() -> PathBuf {
        std::env::var(OS_RELEASE_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(OS_RELEASE_PATH))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// The `ID` key, e.g. `photon`.
    pub fn id(&self) -> Option<&str> {
        self.get("ID")
    }

    /// The `VERSION_ID` key, e.g. `3.0`.
    pub fn version_id(&self) -> Option<&str> {
        self.get("VERSION_ID")
    }

    /// Integer major component of `VERSION_ID`, if it parses.
    pub fn major_version(&self) -> Option<u32> {
        self.version_id()?.split('.').next()?.parse().ok()
    }

    /// `VERSION_CODENAME`, or empty string when absent.
    pub fn version_codename(&self) -> String {
        self.get("VERSION_CODENAME").unwrap_or_default().to_string()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}
