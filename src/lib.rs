//! firstboot: render declarative provisioning configs into first-boot scripts
//!
//! A [`Config`] describes what a machine should look like after its first
//! boot: packages, repositories, files, services, containers and commands.
//! Individual items can be gated on [`Flag`]s such as `photon3` or
//! `kubernetes`, either inline (`"curl # photon3"`) or with a `tags:` list.
//!
//! Rendering is a pure function of the config and the target's
//! `/etc/os-release`:
//!
//! 1. [`Platform::detect`] picks the OS family and seeds the flag set.
//! 2. Each [`Phase`](phases::Phase) may add flags implied by the config.
//! 3. Each phase then emits commands and files for the final flag set.
//!
//! Nothing is executed while rendering; the output is a bash script (or
//! JSON) to run on the target.

pub mod cli;
pub mod command_runner;
pub mod commands;
pub mod context;
pub mod error;
pub mod flags;
pub mod model;
pub mod os_release;
pub mod output;
pub mod package_manager;
pub mod phases;
pub mod platform;
pub mod render;

pub use cli::{Cli, Commands};
pub use context::SystemContext;
pub use error::{Error, Result};
pub use flags::{Flag, FlagSet};
pub use model::Config;
pub use os_release::OsRelease;
pub use platform::Platform;
pub use render::{Format, RenderOptions, Rendered, render};
