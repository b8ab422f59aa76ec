//! apt, for Debian and Ubuntu.

use super::{PackageManager, RepoSpec, join_packages, write_file_command};
use crate::model::{Command, Commands};

const SOURCES_DIR: &str = "/etc/apt/sources.list.d";
const KEYRINGS_DIR: &str = "/usr/share/keyrings";

pub struct Apt;

impl Apt {
    /// Render a deb822 `.sources` stanza.
    fn sources_file(repo: &RepoSpec<'_>) -> String {
        let component = if repo.channel.is_empty() {
            "main"
        } else {
            repo.channel
        };
        let mut content = format!(
            "Types: deb\nURIs: {}\nSuites: {}\nComponents: {}\n",
            repo.url, repo.version_codename, component
        );
        if !repo.gpg_key.is_empty() {
            content.push_str(&format!("Signed-By: {KEYRINGS_DIR}/{}.gpg\n", repo.name));
        }
        for (key, value) in repo.extra_args {
            content.push_str(&format!("{key}: {value}\n"));
        }
        content
    }
}

impl PackageManager for Apt {
    fn name(&self) -> &'static str {
        "apt"
    }

    fn install(&self, packages: &[String]) -> Commands {
        if packages.is_empty() {
            return Commands::new();
        }
        vec![Command::new(format!(
            "DEBIAN_FRONTEND=noninteractive apt-get install -y --no-install-recommends {}",
            join_packages(packages)
        ))]
    }

    fn update(&self) -> Commands {
        vec![Command::new("apt-get update")]
    }

    fn uninstall(&self, packages: &[String]) -> Commands {
        if packages.is_empty() {
            return Commands::new();
        }
        vec![Command::new(format!(
            "apt-get purge -y {}",
            join_packages(packages)
        ))]
    }

    fn mark(&self, packages: &[String]) -> Commands {
        if packages.is_empty() {
            return Commands::new();
        }
        vec![Command::new(format!("apt-mark hold {}", join_packages(packages)))]
    }

    fn cleanup_caches(&self) -> Commands {
        vec![
            Command::new("apt-get clean"),
            Command::new("rm -rf /var/lib/apt/lists/*"),
        ]
    }

    fn add_repo(&self, repo: &RepoSpec<'_>) -> Commands {
        let mut commands = Commands::new();
        if !repo.gpg_key.is_empty() {
            commands.push(Command::new(format!(
                "curl -fsSL {} | gpg --dearmor --yes -o {KEYRINGS_DIR}/{}.gpg",
                repo.gpg_key, repo.name
            )));
        }
        let path = format!("{SOURCES_DIR}/{}.sources", repo.name);
        commands.push(Command::new(write_file_command(
            &path,
            &Self::sources_file(repo),
        )));
        commands
    }

    fn versioned(&self, name: &str, version: &str) -> String {
        format!("{name}={version}")
    }

    fn db_query(&self, package: &str) -> (&'static str, Vec<String>) {
        ("apt-cache", vec!["show".into(), package.into()])
    }

    fn installed_query(&self, package: &str) -> (&'static str, Vec<String>) {
        ("dpkg", vec!["-s".into(), package.into()])
    }
}
