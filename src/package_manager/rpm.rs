//! dnf and yum.
//!
//! Both share the `/etc/yum.repos.d` INI repository format, which tdnf also
//! reads; [`yum_repo_file`] renders it for all three.

use super::{PackageManager, RepoSpec, join_packages, write_file_command};
use crate::model::{Command, Commands};

/// Directory rpm-family tools read `.repo` files from.
pub const YUM_REPOS_DIR: &str = "/etc/yum.repos.d";

/// Render a `.repo` file.
///
/// The GPG stanza is only present when a key is given; otherwise
/// `gpgcheck=0`. Extra args follow as `key = value` lines in key order.
pub fn yum_repo_file(repo: &RepoSpec<'_>) -> String {
    let mut content = format!(
        "[{name}]\nname={name}\nbaseurl={url}\nenabled=1\n",
        name = repo.name,
        url = repo.url
    );

    if repo.gpg_key.is_empty() {
        content.push_str("gpgcheck=0\n");
    } else {
        content.push_str("gpgcheck=1\nrepo_gpgcheck=1\n");
        content.push_str(&format!("gpgkey={}\n", repo.gpg_key));
    }

    for (key, value) in repo.extra_args {
        content.push_str(&format!("{key} = {value}\n"));
    }
    content
}

/// Command writing a `.repo` file under [`YUM_REPOS_DIR`].
pub fn yum_repo_command(repo: &RepoSpec<'_>) -> Command {
    let path = format!("{YUM_REPOS_DIR}/{}.repo", repo.name);
    Command::new(write_file_command(&path, &yum_repo_file(repo)))
}

fn simple(program: &str, subcommand: &str, packages: &[String]) -> Commands {
    if packages.is_empty() {
        return Commands::new();
    }
    vec![Command::new(format!(
        "{program} {subcommand} {}",
        join_packages(packages)
    ))]
}

pub struct Dnf;

impl PackageManager for Dnf {
    fn name(&self) -> &'static str {
        "dnf"
    }

    fn install(&self, packages: &[String]) -> Commands {
        simple("dnf", "install -y", packages)
    }

    fn update(&self) -> Commands {
        Commands::new()
    }

    fn uninstall(&self, packages: &[String]) -> Commands {
        simple("dnf", "remove -y", packages)
    }

    fn mark(&self, packages: &[String]) -> Commands {
        simple("dnf", "mark install", packages)
    }

    fn cleanup_caches(&self) -> Commands {
        vec![Command::new("dnf clean all")]
    }

    fn add_repo(&self, repo: &RepoSpec<'_>) -> Commands {
        vec![yum_repo_command(repo)]
    }

    fn db_query(&self, package: &str) -> (&'static str, Vec<String>) {
        ("dnf", vec!["info".into(), package.into()])
    }

    fn installed_query(&self, package: &str) -> (&'static str, Vec<String>) {
        ("dnf", vec!["info".into(), "--installed".into(), package.into()])
    }
}

pub struct Yum;

impl PackageManager for Yum {
    fn name(&self) -> &'static str {
        "yum"
    }

    fn install(&self, packages: &[String]) -> Commands {
        simple("yum", "install -y", packages)
    }

    fn update(&self) -> Commands {
        Commands::new()
    }

    fn uninstall(&self, packages: &[String]) -> Commands {
        simple("yum", "remove -y", packages)
    }

    fn mark(&self, _packages: &[String]) -> Commands {
        Commands::new()
    }

    fn cleanup_caches(&self) -> Commands {
        vec![Command::new("yum clean all")]
    }

    fn add_repo(&self, repo: &RepoSpec<'_>) -> Commands {
        vec![yum_repo_command(repo)]
    }

    fn db_query(&self, package: &str) -> (&'static str, Vec<String>) {
        ("yum", vec!["info".into(), package.into()])
    }

    fn installed_query(&self, package: &str) -> (&'static str, Vec<String>) {
        ("yum", vec!["info".into(), "installed".into(), package.into()])
    }
}
