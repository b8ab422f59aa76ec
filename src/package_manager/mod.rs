//! Package manager command generation.
//!
//! Every operation except [`PackageManager::installed_version`] is a pure
//! function from package names to shell commands; nothing is executed here.
//! Implementations are stateless unit structs, bound to platforms through
//! [`Platform::package_manager`](crate::platform::Platform::package_manager).

pub mod apt;
pub mod rpm;
pub mod tdnf;

pub use apt::Apt;
pub use rpm::{Dnf, Yum};
pub use tdnf::Tdnf;

use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::command_runner::CommandRunner;
use crate::model::{Commands, strip_version};

/// Returned by [`PackageManager::installed_version`] when a package is
/// installed but its version cannot be read from the tool's output.
pub const UNKNOWN_VERSION: &str = "Unknown Version";

/// Arguments for [`PackageManager::add_repo`].
#[derive(Debug, Clone, Copy)]
pub struct RepoSpec<'a> {
    pub url: &'a str,
    pub channel: &'a str,
    pub version_codename: &'a str,
    pub name: &'a str,
    pub gpg_key: &'a str,
    pub extra_args: &'a BTreeMap<String, String>,
}

/// Capability interface over a concrete packaging tool.
pub trait PackageManager: Send + Sync {
    /// Tool name, e.g. `tdnf`.
    fn name(&self) -> &'static str;

    /// Install all packages in one non-interactive command.
    fn install(&self, packages: &[String]) -> Commands;

    /// Refresh package metadata; empty if the tool has no separate step.
    fn update(&self) -> Commands;

    fn uninstall(&self, packages: &[String]) -> Commands;

    /// Hold packages or mark them manually installed; empty if unsupported.
    fn mark(&self, packages: &[String]) -> Commands;

    fn cleanup_caches(&self) -> Commands;

    /// Write a repository definition for this tool.
    fn add_repo(&self, repo: &RepoSpec<'_>) -> Commands;

    /// Format a pinned package name in this tool's syntax.
    fn versioned(&self, name: &str, version: &str) -> String {
        format!("{name}-{version}")
    }

    /// Command that succeeds iff `package` exists in the package database.
    fn db_query(&self, package: &str) -> (&'static str, Vec<String>);

    /// Command that succeeds iff `package` is installed, printing a
    /// `Version : x` line.
    fn installed_query(&self, package: &str) -> (&'static str, Vec<String>);

    /// Installed version of `package`.
    ///
    /// Returns `""` if the package is unknown or not installed, and
    /// [`UNKNOWN_VERSION`] if it is installed but no version can be parsed.
    fn installed_version(&self, runner: &dyn CommandRunner, package: &str) -> String {
        let package = strip_version(package);

        let (program, args) = self.db_query(package);
        if run_succeeds(runner, program, &args).is_none() {
            debug!(package, manager = self.name(), "No matching package available in db");
            return String::new();
        }

        let (program, args) = self.installed_query(package);
        let Some(stdout) = run_succeeds(runner, program, &args) else {
            debug!(package, manager = self.name(), "Package available in db but not installed");
            return String::new();
        };

        match parse_version_line(&stdout) {
            Some(version) => version,
            None => {
                debug!(package, output = %stdout, "Unable to find version info");
                UNKNOWN_VERSION.to_string()
            }
        }
    }
}

/// Run a query, returning stdout only on a zero exit.
fn run_succeeds(runner: &dyn CommandRunner, program: &str, args: &[String]) -> Option<String> {
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    match runner.run_output(program, &args) {
        Ok(output) if output.status.success() => {
            Some(String::from_utf8_lossy(&output.stdout).into_owned())
        }
        Ok(_) => None,
        Err(e) => {
            debug!(program, error = %e, "Query failed to run");
            None
        }
    }
}

/// Find the first `Version : x` line and return `x`.
pub fn parse_version_line(output: &str) -> Option<String> {
    output
        .lines()
        .map(str::trim_start)
        .filter(|line| line.starts_with("Version"))
        .filter_map(|line| line.split_once(':'))
        .map(|(_, value)| value.trim())
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

/// Shell-quote and space-join package names.
pub(crate) fn join_packages(packages: &[String]) -> String {
    match shlex::try_join(packages.iter().map(String::as_str)) {
        Ok(joined) => joined,
        Err(e) => {
            warn!(error = %e, "Package names cannot be quoted, passing through unquoted");
            packages.join(" ")
        }
    }
}

/// Shell-quote a single word.
pub(crate) fn quote(word: &str) -> String {
    match shlex::try_quote(word) {
        Ok(quoted) => quoted.into_owned(),
        Err(e) => {
            warn!(error = %e, word, "Word cannot be quoted, passing through unquoted");
            word.to_string()
        }
    }
}

/// A here-document writing `content` to `path` in one redirect.
///
/// The delimiter is quoted so `$releasever`-style variables stay literal.
pub(crate) fn write_file_command(path: &str, content: &str) -> String {
    let mut body = content.to_string();
    if !body.ends_with('\n') {
        body.push('\n');
    }
    format!("cat <<'EOF' >{path}\n{body}EOF")
}
