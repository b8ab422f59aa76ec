//! `firstboot installed`: ask the local package database for versions.
//!
//! Unlike `render`, this runs the platform's package manager on the current
//! machine.

use anyhow::{Context, Result};
use clap::Args;

use crate::command_runner::{CommandRunner, RealCommandRunner};
use crate::os_release::OsRelease;
use crate::platform::Platform;

#[derive(Debug, Args)]
pub struct InstalledArgs {
    /// Package names; a `=version` suffix is ignored
    #[arg(required = true)]
    pub packages: Vec<String>,
}

/// `name<TAB>version` per package; empty version when not installed.
pub fn report(platform: Platform, runner: &dyn CommandRunner, packages: &[String]) -> Vec<String> {
    let manager = platform.package_manager();
    packages
        .iter()
        .map(|pkg| format!("{pkg}\t{}", manager.installed_version(runner, pkg)))
        .collect()
}

pub fn run(args: InstalledArgs, host: &OsRelease) -> Result<()> {
    let platform = Platform::detect(host).context("Failed to detect platform")?;
    for line in report(platform, &RealCommandRunner, &args.packages) {
        println!("{line}");
    }
    Ok(())
}
