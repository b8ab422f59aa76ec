//! CLI argument definitions for firstboot.
//!
//! Separated from `main.rs` so shell completion generation can reference
//! these types.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands;
use crate::os_release::{OS_RELEASE_ENV, OsRelease};

#[derive(Debug, Parser)]
#[command(name = "firstboot")]
#[command(about = "Render declarative provisioning configs into first-boot scripts")]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    /// os-release file describing the target (defaults to /etc/os-release)
    #[arg(long, global = true, env = OS_RELEASE_ENV, value_name = "PATH")]
    pub os_release: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// The target's OS identity.
    pub fn host(&self) -> OsRelease {
        match &self.os_release {
            Some(path) => OsRelease::load_or_default(path),
            None => OsRelease::load_host(),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Render config files into a script (or JSON) for the target
    Render(commands::render::RenderArgs),

    /// Show the detected platform, its flags and package manager
    Detect(commands::detect::DetectArgs),

    /// List known flags, or validate flag spellings
    Flags(commands::flags::FlagsArgs),

    /// Query installed package versions on this machine
    Installed(commands::installed::InstalledArgs),

    /// Print the JSON schema for config files
    Schema(commands::schema::SchemaArgs),

    /// Generate shell completions
    Completions(commands::completions::CompletionsArgs),
}
