use tracing::debug;

use super::{Phase, PhaseOutput};
use crate::context::SystemContext;
use crate::error::{Error, Result};
use crate::model::Config;

/// Declared `filesystem` entries whose flags are active.
pub struct FilesystemPhase;

impl Phase for FilesystemPhase {
    fn name(&self) -> &'static str {
        "filesystem"
    }

    fn supports_apply(&self) -> bool {
        true
    }

    fn apply(&self, cfg: &mut Config, ctx: &SystemContext) -> Result<PhaseOutput> {
        let mut out = PhaseOutput::default();
        for (path, file) in &cfg.filesystem {
            if !file.applies_to(&ctx.flags) {
                debug!(path = %path, "Skipping file, flags not active");
                continue;
            }
            if !path.starts_with('/') {
                return Err(Error::invalid_config(format!(
                    "filesystem path '{path}' must be absolute"
                )));
            }
            if let Some(mode) = &file.permissions {
                if u32::from_str_radix(mode, 8).is_err() {
                    return Err(Error::invalid_config(format!(
                        "permissions '{mode}' for '{path}' are not octal"
                    )));
                }
            }
            out.files.insert(path.clone(), file.clone());
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::Flag;

    #[test]
    fn test_files_filtered_by_tags() {
        let mut cfg = Config::from_yaml(
            r#"
filesystem:
  /etc/motd:
    content: "welcome\n"
  /etc/photon.conf:
    content: "x"
    tags: [photon]
  /etc/ubuntu.conf:
    content: "y"
    tags: [ubuntu]
"#,
        )
        .unwrap();
        let ctx = SystemContext::new("t").with_flags([Flag::Photon]);
        let out = FilesystemPhase.apply(&mut cfg, &ctx).unwrap();
        let paths: Vec<&str> = out.files.keys().map(String::as_str).collect();
        assert_eq!(paths, vec!["/etc/motd", "/etc/photon.conf"]);
        assert!(out.commands.is_empty());
    }

    #[test]
    fn test_relative_path_rejected() {
        let mut cfg = Config::from_yaml("filesystem:\n  etc/motd:\n    content: x\n").unwrap();
        let err = FilesystemPhase
            .apply(&mut cfg, &SystemContext::new("t"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }

    #[test]
    fn test_inactive_entries_are_not_validated() {
        let mut cfg = Config::from_yaml(
            "filesystem:\n  etc/ubuntu.conf:\n    content: x\n    permissions: \"rw\"\n    tags: [ubuntu]\n",
        )
        .unwrap();
        let ctx = SystemContext::new("t").with_flags([Flag::Photon]);
        let out = FilesystemPhase.apply(&mut cfg, &ctx).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_bad_permissions_rejected() {
        let mut cfg =
            Config::from_yaml("filesystem:\n  /etc/motd:\n    content: x\n    permissions: \"rwx\"\n")
                .unwrap();
        assert!(FilesystemPhase.apply(&mut cfg, &SystemContext::new("t")).is_err());
    }
}
