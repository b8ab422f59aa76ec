//! Package repositories and packages.
//!
//! Emits, in order: repository definitions, a metadata refresh, one install
//! command, one mark command, one uninstall command and a cache cleanup.
//! A package that is both marked and uninstalled is only uninstalled.
//! A `name=version` pin is written in the manager's own syntax; holds are
//! always by bare name.

use std::collections::BTreeSet;
use tracing::debug;

use super::{Phase, PhaseOutput};
use crate::context::{CODENAME_VAR, SystemContext};
use crate::error::{Error, Result};
use crate::model::{Commands, Config, Package, strip_version};
use crate::package_manager::{PackageManager, RepoSpec};

pub struct PackagesPhase;

/// Applicable package names split by action, de-duplicated in declared order.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PackageActions {
    pub install: Vec<String>,
    pub mark: Vec<String>,
    pub uninstall: Vec<String>,
}

/// `name=version` in `manager`'s pin syntax; other names pass through.
fn pinned_name(name: &str, manager: &dyn PackageManager) -> String {
    match name.split_once('=') {
        Some((base, version)) if !version.is_empty() => manager.versioned(base, version),
        Some((base, _)) => base.to_string(),
        None => name.to_string(),
    }
}

impl PackageActions {
    pub fn from_packages(
        packages: &[Package],
        ctx: &SystemContext,
        manager: &dyn PackageManager,
    ) -> Self {
        let mut actions = Self::default();
        let mut seen = BTreeSet::new();
        for package in packages {
            if !package.applies_to(&ctx.flags) {
                debug!(package = %package, "Skipping package, flags not active");
                continue;
            }
            if !seen.insert((package.name.clone(), package.uninstall, package.mark)) {
                continue;
            }
            let name = pinned_name(&package.name, manager);
            if package.uninstall {
                actions.uninstall.push(name);
            } else {
                actions.install.push(name);
                if package.mark {
                    actions.mark.push(strip_version(&package.name).to_string());
                }
            }
        }
        actions
    }
}

impl Phase for PackagesPhase {
    fn name(&self) -> &'static str {
        "packages"
    }

    fn supports_apply(&self) -> bool {
        true
    }

    fn apply(&self, cfg: &mut Config, ctx: &SystemContext) -> Result<PhaseOutput> {
        let repos: Vec<_> = cfg
            .package_repos
            .iter()
            .enumerate()
            .filter(|(_, r)| r.applies_to(&ctx.flags))
            .collect();

        let has_packages = cfg.packages.iter().any(|p| p.applies_to(&ctx.flags));
        if !has_packages && repos.is_empty() {
            return Ok(PhaseOutput::default());
        }

        let platform = ctx.platform().ok_or_else(|| {
            Error::invalid_config("no platform detected, cannot choose a package manager")
        })?;
        let manager = platform.package_manager();
        let actions = PackageActions::from_packages(&cfg.packages, ctx, manager);

        let host_codename = ctx
            .vars
            .get(CODENAME_VAR)
            .and_then(|v| v.as_str())
            .unwrap_or_default();

        let mut commands = Commands::new();
        for (index, repo) in &repos {
            let name = repo
                .name
                .clone()
                .unwrap_or_else(|| format!("firstboot-{index}"));
            let spec = RepoSpec {
                url: &repo.url,
                channel: &repo.channel,
                version_codename: repo.version_codename.as_deref().unwrap_or(host_codename),
                name: &name,
                gpg_key: &repo.gpg_key,
                extra_args: &repo.extra_args,
            };
            commands.extend(manager.add_repo(&spec));
        }

        if !actions.install.is_empty() || !repos.is_empty() {
            commands.extend(manager.update());
        }
        commands.extend(manager.install(&actions.install));
        commands.extend(manager.mark(&actions.mark));
        commands.extend(manager.uninstall(&actions.uninstall));
        commands.extend(manager.cleanup_caches());

        Ok(PhaseOutput::commands(commands))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::Flag;

    fn photon3() -> SystemContext {
        SystemContext::new("t").with_flags([Flag::Photon3, Flag::Photon])
    }

    fn cmds(out: &PhaseOutput) -> Vec<&str> {
        out.commands.iter().map(|c| c.cmd.as_str()).collect()
    }

    #[test]
    fn test_install_uninstall_on_photon() {
        let mut cfg = Config::from_yaml(
            "packages:\n  - curl\n  - \"!nano\"\n  - \"vim # ubuntu\"\n  - \"wget # photon3\"\n",
        )
        .unwrap();
        let out = PackagesPhase.apply(&mut cfg, &photon3()).unwrap();
        assert_eq!(
            cmds(&out),
            vec!["tdnf install -y curl wget", "tdnf remove -y nano"]
        );
    }

    #[test]
    fn test_combined_sigils_resolve_to_uninstall() {
        let mut cfg = Config::from_yaml("packages:\n  - \"=!foo # photon3\"\n").unwrap();
        let out = PackagesPhase.apply(&mut cfg, &photon3()).unwrap();
        assert_eq!(cmds(&out), vec!["tdnf remove -y foo"]);
    }

    #[test]
    fn test_marked_packages_are_installed_and_held() {
        let mut cfg = Config::from_yaml("packages:\n  - \"=kubelet\"\n  - git\n").unwrap();
        let ctx = SystemContext::new("t").with_flags([Flag::Ubuntu, Flag::DebianLike]);
        let out = PackagesPhase.apply(&mut cfg, &ctx).unwrap();
        assert_eq!(
            cmds(&out),
            vec![
                "apt-get update",
                "DEBIAN_FRONTEND=noninteractive apt-get install -y --no-install-recommends kubelet git",
                "apt-mark hold kubelet",
                "apt-get clean",
                "rm -rf /var/lib/apt/lists/*",
            ]
        );
    }

    #[test]
    fn test_repos_before_install_and_tag_filtered() {
        let mut cfg = Config::from_yaml(
            r#"
package_repos:
  - url: https://example.com/photon
    name: example
  - url: https://example.com/ubuntu
    tags: [ubuntu]
packages: [curl]
"#,
        )
        .unwrap();
        let out = PackagesPhase.apply(&mut cfg, &photon3()).unwrap();
        assert_eq!(out.commands.len(), 2);
        assert!(out.commands[0].cmd.contains("/etc/yum.repos.d/example.repo"));
        assert_eq!(out.commands[1].cmd, "tdnf install -y curl");
    }

    #[test]
    fn test_unnamed_repo_gets_positional_name() {
        let mut cfg = Config::from_yaml("package_repos:\n  - url: https://example.com/r\n").unwrap();
        let out = PackagesPhase.apply(&mut cfg, &photon3()).unwrap();
        assert!(out.commands[0].cmd.contains("[firstboot-0]"));
    }

    #[test]
    fn test_apt_repo_uses_host_codename() {
        let mut cfg = Config::from_yaml("package_repos:\n  - url: https://example.com/deb\n    name: ex\n").unwrap();
        let ctx = SystemContext::new("t")
            .with_flags([Flag::Debian])
            .with_var(CODENAME_VAR, serde_json::json!("bookworm"));
        let out = PackagesPhase.apply(&mut cfg, &ctx).unwrap();
        assert!(out.commands[0].cmd.contains("Suites: bookworm\n"));
    }

    #[test]
    fn test_no_platform_is_error_only_with_work() {
        let ctx = SystemContext::new("t");
        let mut empty = Config::default();
        assert!(PackagesPhase.apply(&mut empty, &ctx).unwrap().is_empty());

        let mut cfg = Config::from_yaml("packages: [curl]\n").unwrap();
        let err = PackagesPhase.apply(&mut cfg, &ctx).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }

    #[test]
    fn test_pins_use_tdnf_syntax() {
        let mut cfg = Config::from_yaml("packages:\n  - \"=kubelet=1.20.1\"\n").unwrap();
        let out = PackagesPhase.apply(&mut cfg, &photon3()).unwrap();
        assert_eq!(cmds(&out), vec!["tdnf install -y kubelet-1.20.1"]);
    }

    #[test]
    fn test_pins_use_apt_syntax_and_hold_bare_name() {
        let mut cfg = Config::from_yaml("packages:\n  - \"=kubelet=1.20.1-00\"\n").unwrap();
        let ctx = SystemContext::new("t").with_flags([Flag::Ubuntu, Flag::DebianLike]);
        let out = PackagesPhase.apply(&mut cfg, &ctx).unwrap();
        let cmds = cmds(&out);
        assert_eq!(
            cmds[1],
            "DEBIAN_FRONTEND=noninteractive apt-get install -y --no-install-recommends 'kubelet=1.20.1-00'"
        );
        assert_eq!(cmds[2], "apt-mark hold kubelet");
    }

    #[test]
    fn test_detected_platform_chooses_manager() {
        use crate::os_release::OsRelease;
        use crate::platform::Platform;

        let host = OsRelease::parse("ID=ubuntu\nVERSION_ID=\"22.04\"\n");
        let ctx = SystemContext::for_platform("t", Platform::Ubuntu, &host)
            .with_flags([Flag::Fedora]);
        let mut cfg = Config::from_yaml("packages: [curl]\n").unwrap();
        let out = PackagesPhase.apply(&mut cfg, &ctx).unwrap();
        assert_eq!(cmds(&out)[0], "apt-get update");
        assert!(cmds(&out).iter().all(|c| !c.starts_with("dnf")));
    }

    #[test]
    fn test_duplicates_collapsed() {
        let mut cfg = Config::from_yaml("packages: [curl, curl, git]\n").unwrap();
        let out = PackagesPhase.apply(&mut cfg, &photon3()).unwrap();
        assert_eq!(cmds(&out), vec!["tdnf install -y curl git"]);
    }
}
