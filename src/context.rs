//! Per-run system context.
//!
//! The context is built once from the detected platform plus user overrides
//! and then threaded through the pipeline by value: the tag-processing pass
//! replaces it with [`SystemContext::with_flags`] instead of mutating a shared
//! instance, so flags only ever accumulate.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::flags::{Flag, FlagSet};
use crate::os_release::OsRelease;
use crate::platform::Platform;

/// Variable holding the host's `VERSION_CODENAME`.
pub const CODENAME_VAR: &str = "version_codename";

/// Resolved runtime state for one render.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemContext {
    /// Free-form variables supplied by the user
    pub vars: BTreeMap<String, serde_json::Value>,
    /// Active capability flags
    pub flags: FlagSet,
    /// Run name, used for generated file names
    pub name: String,
    /// Platform detected from os-release; selects the package manager
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
}

impl SystemContext {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Context seeded with the platform's tags for `host`.
    ///
    /// A non-empty `VERSION_CODENAME` is exposed as the `version_codename` var.
    pub fn for_platform(name: impl Into<String>, platform: Platform, host: &OsRelease) -> Self {
        let ctx = Self {
            platform: Some(platform),
            ..Self::new(name)
        }
        .with_flags(platform.tags(host));
        let codename = platform.version_codename(host);
        if codename.is_empty() {
            ctx
        } else {
            ctx.with_var(CODENAME_VAR, serde_json::Value::String(codename))
        }
    }

    /// Return a context with `flags` added.
    pub fn with_flags(mut self, flags: impl IntoIterator<Item = Flag>) -> Self {
        self.flags.extend(flags);
        self
    }

    pub fn with_var(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.vars.insert(key.into(), value);
        self
    }

    pub fn has(&self, flag: Flag) -> bool {
        self.flags.contains(flag)
    }

    /// The detected platform.
    ///
    /// Contexts built without detection fall back to the first platform
    /// whose family flag is active.
    pub fn platform(&self) -> Option<Platform> {
        self.platform.or_else(|| Platform::for_flags(&self.flags))
    }
}

impl fmt::Display for SystemContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.flags)
    }
}

/// Parse a `key=value` override. Values that parse as JSON keep their type.
pub fn parse_var(text: &str) -> Result<(String, serde_json::Value), String> {
    let (key, value) = text
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{text}'"))?;
    if key.is_empty() {
        return Err(format!("empty variable name in '{text}'"));
    }
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

/// Default run name: the host name, or `firstboot` if unavailable.
pub fn default_run_name() -> String {
    whoami::fallible::hostname().unwrap_or_else(|_| "firstboot".to_string())
}
