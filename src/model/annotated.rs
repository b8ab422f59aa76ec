//! Tag-annotated declaration items: commands and packages.
//!
//! Both accept two spellings in a config document:
//!
//! ```yaml
//! packages:
//!   - curl                              # always applies
//!   - "=!docker # photon3"              # inline annotation
//!   - { name: open-vm-tools, tags: [vmware] }
//! commands:
//!   - "systemctl disable iptables # photon"
//!   - { cmd: "swapoff -a", tags: [kubernetes] }
//! ```
//!
//! The inline annotation is the text after the last whitespace-preceded `#`.
//!
//! The entry must be quoted. In an unquoted YAML scalar (`- docker # photon2`)
//! the `# photon2` is a YAML comment, dropped by the parser before it reaches
//! this module, and the item silently becomes unconditional. Use the quoted
//! form or the structured `tags:` form.

use schemars::{JsonSchema, Schema, SchemaGenerator};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;

use crate::error::Result;
use crate::flags::{Flag, FlagSet};

/// Split `value` into the item text and its inline annotation, if any.
pub fn split_annotation(value: &str) -> (&str, Option<&str>) {
    let bytes = value.as_bytes();
    let marker = value
        .char_indices()
        .rev()
        .find(|(i, c)| *c == '#' && (*i == 0 || bytes[i - 1].is_ascii_whitespace()))
        .map(|(i, _)| i);

    match marker {
        Some(i) => (value[..i].trim(), Some(value[i + 1..].trim())),
        None => (value.trim(), None),
    }
}

/// Parse an inline annotation into flags.
///
/// A missing or empty annotation yields no flags.
pub fn parse_annotation(annotation: Option<&str>) -> Result<Vec<Flag>> {
    match annotation {
        Some(text) => Flag::parse_list(text),
        None => Ok(Vec::new()),
    }
}

fn resolve_tags(tags: &[String]) -> Result<Vec<Flag>> {
    tags.iter().map(|t| t.parse()).collect()
}

// ============================================================================
// Command
// ============================================================================

/// A shell command with the flags required for it to apply.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Command {
    pub cmd: String,
    pub flags: Vec<Flag>,
}

impl Command {
    /// An unconditional command.
    pub fn new(cmd: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            flags: Vec::new(),
        }
    }

    pub fn with_flags(cmd: impl Into<String>, flags: Vec<Flag>) -> Self {
        Self {
            cmd: cmd.into(),
            flags,
        }
    }

    /// Parse a command carrying an optional inline annotation.
    pub fn parse(value: &str) -> Result<Self> {
        let (cmd, annotation) = split_annotation(value);
        Ok(Self {
            cmd: cmd.to_string(),
            flags: parse_annotation(annotation)?,
        })
    }

    pub fn applies_to(&self, active: &FlagSet) -> bool {
        active.satisfies(&self.flags)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cmd)
    }
}

/// A list of commands, as produced by package managers and phases.
pub type Commands = Vec<Command>;

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
enum CommandSpec {
    /// A command string, optionally ending in `# flag flag`. Quote it in
    /// YAML, or the annotation is read as a comment
    Inline(String),
    Structured {
        #[serde(alias = "command")]
        cmd: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tags: Vec<String>,
    },
}

impl<'de> Deserialize<'de> for Command {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let parsed = match CommandSpec::deserialize(deserializer)? {
            CommandSpec::Inline(value) => Command::parse(&value),
            CommandSpec::Structured { cmd, tags } => {
                resolve_tags(&tags).map(|flags| Command { cmd, flags })
            }
        };
        parsed.map_err(serde::de::Error::custom)
    }
}

impl Serialize for Command {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if self.flags.is_empty() {
            CommandSpec::Inline(self.cmd.clone()).serialize(serializer)
        } else {
            CommandSpec::Structured {
                cmd: self.cmd.clone(),
                tags: self.flags.iter().map(|f| f.to_string()).collect(),
            }
            .serialize(serializer)
        }
    }
}

impl JsonSchema for Command {
    fn schema_name() -> Cow<'static, str> {
        "Command".into()
    }

    fn json_schema(generator: &mut SchemaGenerator) -> Schema {
        CommandSpec::json_schema(generator)
    }
}

// ============================================================================
// Package
// ============================================================================

/// A package with its modifiers and required flags.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Package {
    /// Package name, possibly with a `=version` pin suffix.
    pub name: String,
    /// Hold the package (`=` sigil).
    pub mark: bool,
    /// Remove the package (`!` sigil).
    pub uninstall: bool,
    pub flags: Vec<Flag>,
}

impl Package {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Parse a package entry with optional sigils and inline annotation.
    ///
    /// Leading `!` and `=` are stripped repeatedly in any order, so `=!foo`
    /// and `!=foo` both mean "foo, uninstall and mark".
    pub fn parse(value: &str) -> Result<Self> {
        let (entry, annotation) = split_annotation(value);
        let mut package = Self::from_sigils(entry);
        package.flags = parse_annotation(annotation)?;
        Ok(package)
    }

    fn from_sigils(entry: &str) -> Self {
        let mut package = Package::default();
        let mut name = entry;
        loop {
            if let Some(rest) = name.strip_prefix('!') {
                package.uninstall = true;
                name = rest;
            } else if let Some(rest) = name.strip_prefix('=') {
                package.mark = true;
                name = rest;
            } else {
                break;
            }
        }
        package.name = name.trim().to_string();
        package
    }

    /// Name with any `=version` pin removed.
    pub fn base_name(&self) -> &str {
        strip_version(&self.name)
    }

    pub fn applies_to(&self, active: &FlagSet) -> bool {
        active.satisfies(&self.flags)
    }
}

/// Strip a `=version` pin suffix from a package name.
pub fn strip_version(name: &str) -> &str {
    name.split('=').next().unwrap_or(name)
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
enum PackageSpec {
    /// A package name with optional `!`/`=` sigils and `# flag` annotation.
    /// Quote it in YAML, or the annotation is read as a comment
    Inline(String),
    Structured {
        name: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tags: Vec<String>,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        uninstall: bool,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        mark: bool,
    },
}

impl<'de> Deserialize<'de> for Package {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let parsed = match PackageSpec::deserialize(deserializer)? {
            PackageSpec::Inline(value) => Package::parse(&value),
            PackageSpec::Structured {
                name,
                tags,
                uninstall,
                mark,
            } => {
                let mut package = Package::from_sigils(&name);
                package.uninstall |= uninstall;
                package.mark |= mark;
                resolve_tags(&tags).map(|flags| Package { flags, ..package })
            }
        };
        parsed.map_err(serde::de::Error::custom)
    }
}

impl Serialize for Package {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        PackageSpec::Structured {
            name: self.name.clone(),
            tags: self.flags.iter().map(|f| f.to_string()).collect(),
            uninstall: self.uninstall,
            mark: self.mark,
        }
        .serialize(serializer)
    }
}

impl JsonSchema for Package {
    fn schema_name() -> Cow<'static, str> {
        "Package".into()
    }

    fn json_schema(generator: &mut SchemaGenerator) -> Schema {
        PackageSpec::json_schema(generator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_split_annotation() {
        assert_eq!(split_annotation("curl"), ("curl", None));
        assert_eq!(split_annotation("curl # photon"), ("curl", Some("photon")));
        assert_eq!(split_annotation("curl #"), ("curl", Some("")));
        assert_eq!(
            split_annotation("sed -i 's/#x/y/' f # fedora"),
            ("sed -i 's/#x/y/' f", Some("fedora"))
        );
        assert_eq!(split_annotation("echo a#b"), ("echo a#b", None));
    }

    #[test]
    fn test_command_inline_annotation() {
        let cmd = Command::parse("swapoff -a # kubernetes photon3").unwrap();
        assert_eq!(cmd.cmd, "swapoff -a");
        assert_eq!(cmd.flags, vec![Flag::Kubernetes, Flag::Photon3]);
    }

    #[test]
    fn test_empty_annotation_is_no_flags() {
        let cmd = Command::parse("echo hi #").unwrap();
        assert_eq!(cmd.cmd, "echo hi");
        assert!(cmd.flags.is_empty());
    }

    #[test]
    fn test_unknown_flag_is_named() {
        let err = Command::parse("echo hi # photon beos").unwrap_err();
        assert!(matches!(err, Error::UnknownFlag { ref spelling } if spelling == "beos"));
    }

    #[test]
    fn test_package_sigils() {
        let p = Package::parse("!nano").unwrap();
        assert!(p.uninstall && !p.mark);
        assert_eq!(p.name, "nano");

        let p = Package::parse("=kubelet=1.20.1").unwrap();
        assert!(p.mark && !p.uninstall);
        assert_eq!(p.name, "kubelet=1.20.1");
        assert_eq!(p.base_name(), "kubelet");
    }

    #[test]
    fn test_package_combined_sigils_in_either_order() {
        for entry in ["=!foo # photon3", "!=foo # photon3"] {
            let p = Package::parse(entry).unwrap();
            assert_eq!(p.name, "foo");
            assert!(p.uninstall);
            assert!(p.mark);
            assert_eq!(p.flags, vec![Flag::Photon3]);
        }
    }

    #[test]
    fn test_deserialize_mixed_forms() {
        let yaml = r#"
- curl
- "vim # ubuntu"
- { name: "!nano", tags: [fedora] }
- { name: htop, mark: true }
"#;
        let packages: Vec<Package> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(packages.len(), 4);
        assert!(packages[0].flags.is_empty());
        assert_eq!(packages[1].flags, vec![Flag::Ubuntu]);
        assert!(packages[2].uninstall);
        assert_eq!(packages[2].name, "nano");
        assert!(packages[3].mark);
    }

    #[test]
    fn test_unquoted_yaml_annotation_is_a_comment() {
        let yaml = "- docker # photon2\n- \"docker # photon2\"\n- { name: docker, tags: [photon2] }\n";
        let packages: Vec<Package> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(packages[0].name, "docker");
        assert!(packages[0].flags.is_empty());
        assert_eq!(packages[1].flags, vec![Flag::Photon2]);
        assert_eq!(packages[2].flags, vec![Flag::Photon2]);
    }

    #[test]
    fn test_deserialize_structured_unknown_tag_is_named() {
        let yaml = "- { cmd: ls, tags: [photon, plan9] }";
        let err = serde_yaml::from_str::<Vec<Command>>(yaml).unwrap_err();
        assert!(err.to_string().contains("Unknown flag: plan9"), "{err}");
    }

    #[test]
    fn test_command_serializes_as_string_without_flags() {
        let json = serde_json::to_string(&Command::new("ls")).unwrap();
        assert_eq!(json, "\"ls\"");
    }
}
