//! systemd units for declared services.
//!
//! [`Unit`] is also used by the containers phase, which wraps each container
//! in a service running `docker run`.

use std::collections::BTreeMap;

use super::{Phase, PhaseOutput};
use crate::context::SystemContext;
use crate::error::{Error, Result};
use crate::model::{Command, Commands, Config, File};

pub const UNIT_DIR: &str = "/etc/systemd/system";

/// A minimal systemd service unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Unit {
    pub description: String,
    pub after: Vec<String>,
    pub requires: Vec<String>,
    pub environment: BTreeMap<String, String>,
    pub exec_start_pre: Vec<String>,
    pub exec_start: String,
    pub exec_stop: Option<String>,
    /// Additional `[Service]` keys
    pub extra: BTreeMap<String, String>,
}

impl Unit {
    pub fn new(description: impl Into<String>, exec_start: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            after: vec!["network-online.target".into()],
            exec_start: exec_start.into(),
            ..Default::default()
        }
    }

    pub fn path(name: &str) -> String {
        format!("{UNIT_DIR}/{name}.service")
    }

    pub fn render(&self) -> String {
        let mut s = String::from("[Unit]\n");
        s.push_str(&format!("Description={}\n", self.description));
        if !self.after.is_empty() {
            s.push_str(&format!("After={}\n", self.after.join(" ")));
            s.push_str(&format!("Wants={}\n", self.after.join(" ")));
        }
        if !self.requires.is_empty() {
            s.push_str(&format!("Requires={}\n", self.requires.join(" ")));
        }

        s.push_str("\n[Service]\n");
        for (key, value) in &self.environment {
            s.push_str(&format!("Environment=\"{key}={}\"\n", escape_env(value)));
        }
        for pre in &self.exec_start_pre {
            s.push_str(&format!("ExecStartPre={pre}\n"));
        }
        s.push_str(&format!("ExecStart={}\n", self.exec_start));
        if let Some(stop) = &self.exec_stop {
            s.push_str(&format!("ExecStop={stop}\n"));
        }
        if !self.extra.contains_key("Restart") {
            s.push_str("Restart=always\n");
        }
        for (key, value) in &self.extra {
            s.push_str(&format!("{key}={value}\n"));
        }

        s.push_str("\n[Install]\nWantedBy=multi-user.target\n");
        s
    }

    pub fn into_file(self) -> File {
        File {
            permissions: Some("0644".into()),
            ..File::with_content(self.render())
        }
    }
}

fn escape_env(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Reject names that cannot be used as a unit file name.
pub fn validate_unit_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@' | ':'));
    if valid {
        Ok(())
    } else {
        Err(Error::invalid_config(format!("invalid service name '{name}'")))
    }
}

/// `daemon-reload` once, then enable and start each unit.
pub fn enable_commands(names: &[String]) -> Commands {
    if names.is_empty() {
        return Commands::new();
    }
    let mut commands = vec![Command::new("systemctl daemon-reload")];
    commands.extend(
        names
            .iter()
            .map(|name| Command::new(format!("systemctl enable --now {name}.service"))),
    );
    commands
}

pub struct ServicesPhase;

impl Phase for ServicesPhase {
    fn name(&self) -> &'static str {
        "services"
    }

    fn supports_apply(&self) -> bool {
        true
    }

    fn apply(&self, cfg: &mut Config, _ctx: &SystemContext) -> Result<PhaseOutput> {
        let mut out = PhaseOutput::default();
        let mut names = Vec::new();
        for (key, service) in &cfg.services {
            let name = if service.name.is_empty() {
                key.as_str()
            } else {
                service.name.as_str()
            };
            validate_unit_name(name)?;
            if service.exec_start.trim().is_empty() {
                return Err(Error::invalid_config(format!(
                    "service '{name}' has no exec_start"
                )));
            }

            let unit = Unit {
                environment: service.environment.clone(),
                extra: service.extra.clone(),
                ..Unit::new(name, service.exec_start.clone())
            };
            out.files.insert(Unit::path(name), unit.into_file());
            names.push(name.to_string());
        }
        out.commands = enable_commands(&names);
        Ok(out)
    }
}
