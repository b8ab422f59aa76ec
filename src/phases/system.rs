//! Host-level settings: kernel parameters, global environment and timezone.

use super::{Phase, PhaseOutput};
use crate::context::SystemContext;
use crate::error::{Error, Result};
use crate::model::{Command, Config, File};
use crate::package_manager::quote;

pub const SYSCTL_CONF: &str = "/etc/sysctl.d/99-firstboot.conf";
pub const ENVIRONMENT_FILE: &str = "/etc/environment";

pub struct SysctlPhase;

impl Phase for SysctlPhase {
    fn name(&self) -> &'static str {
        "sysctl"
    }

    fn supports_apply(&self) -> bool {
        true
    }

    fn apply(&self, cfg: &mut Config, _ctx: &SystemContext) -> Result<PhaseOutput> {
        if cfg.sysctls.is_empty() {
            return Ok(PhaseOutput::default());
        }
        let content: String = cfg
            .sysctls
            .iter()
            .map(|(key, value)| format!("{key} = {value}\n"))
            .collect();

        let mut out = PhaseOutput::commands(vec![Command::new("sysctl --system")]);
        out.files.insert(
            SYSCTL_CONF.to_string(),
            File {
                permissions: Some("0644".into()),
                ..File::with_content(content)
            },
        );
        Ok(out)
    }
}

pub struct EnvironmentPhase;

impl Phase for EnvironmentPhase {
    fn name(&self) -> &'static str {
        "environment"
    }

    fn supports_apply(&self) -> bool {
        true
    }

    fn apply(&self, cfg: &mut Config, _ctx: &SystemContext) -> Result<PhaseOutput> {
        if cfg.environment.is_empty() {
            return Ok(PhaseOutput::default());
        }
        let mut content = String::new();
        for (key, value) in &cfg.environment {
            if key.is_empty() || key.contains(['=', ' ']) {
                return Err(Error::invalid_config(format!(
                    "invalid environment variable name '{key}'"
                )));
            }
            content.push_str(&format!("{key}={}\n", quote(value)));
        }

        let mut out = PhaseOutput::default();
        out.files.insert(
            ENVIRONMENT_FILE.to_string(),
            File {
                permissions: Some("0644".into()),
                ..File::with_content(content)
            },
        );
        Ok(out)
    }
}

pub struct TimezonePhase;

impl Phase for TimezonePhase {
    fn name(&self) -> &'static str {
        "timezone"
    }

    fn supports_apply(&self) -> bool {
        true
    }

    fn apply(&self, cfg: &mut Config, _ctx: &SystemContext) -> Result<PhaseOutput> {
        match cfg.timezone.as_deref().map(str::trim) {
            None | Some("") => Ok(PhaseOutput::default()),
            Some(tz) => Ok(PhaseOutput::commands(vec![Command::new(format!(
                "timedatectl set-timezone {}",
                quote(tz)
            ))])),
        }
    }
}
