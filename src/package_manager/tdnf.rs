//! tdnf, the Photon OS package manager.

use super::rpm::yum_repo_command;
use super::{PackageManager, RepoSpec, join_packages};
use crate::model::{Command, Commands};

pub struct Tdnf;

impl PackageManager for Tdnf {
    fn name(&self) -> &'static str {
        "tdnf"
    }

    fn install(&self, packages: &[String]) -> Commands {
        if packages.is_empty() {
            return Commands::new();
        }
        vec![Command::new(format!(
            "tdnf install -y {}",
            join_packages(packages)
        ))]
    }

    fn update(&self) -> Commands {
        Commands::new()
    }

    fn uninstall(&self, packages: &[String]) -> Commands {
        if packages.is_empty() {
            return Commands::new();
        }
        vec![Command::new(format!(
            "tdnf remove -y {}",
            join_packages(packages)
        ))]
    }

    fn mark(&self, _packages: &[String]) -> Commands {
        Commands::new()
    }

    fn cleanup_caches(&self) -> Commands {
        Commands::new()
    }

    fn add_repo(&self, repo: &RepoSpec<'_>) -> Commands {
        vec![yum_repo_command(repo)]
    }

    fn db_query(&self, package: &str) -> (&'static str, Vec<String>) {
        ("tdnf", vec!["info".into(), package.into()])
    }

    fn installed_query(&self, package: &str) -> (&'static str, Vec<String>) {
        ("tdnf", vec!["info".into(), "installed".into(), package.into()])
    }
}
