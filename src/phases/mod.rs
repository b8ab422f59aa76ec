//! The phase pipeline.
//!
//! A [`Phase`] is one transformation step over the [`Config`]. Phases have two
//! independent capabilities:
//!
//! - **Flag processing**: inspect the config and report flags it implies
//!   (e.g. "a container runtime was requested"). Runs for every phase before
//!   any phase applies, in pipeline order, so later phases see earlier flags.
//! - **Applying**: given the config and the finalized context, emit commands
//!   and files. May also extend the config for phases further down the line.
//!
//! ```text
//! ┌──────────┐   flags pass    ┌───────────────┐   apply pass   ┌──────────┐
//! │ Platform │ ──────────────▶ │ SystemContext │ ─────────────▶ │ Rendered │
//! └──────────┘  (accumulate)   └───────────────┘  (fail-fast)   └──────────┘
//! ```

pub mod commands;
pub mod containers;
pub mod filesystem;
pub mod packages;
pub mod services;
pub mod system;

use tracing::{debug, info};

use crate::context::SystemContext;
use crate::error::{Error, Result};
use crate::flags::{Flag, FlagSet};
use crate::model::{Commands, Config, Filesystem};
use crate::render::Rendered;

/// Output of a single phase's apply step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhaseOutput {
    pub commands: Commands,
    pub files: Filesystem,
}

impl PhaseOutput {
    pub fn commands(commands: Commands) -> Self {
        Self {
            commands,
            files: Filesystem::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty() && self.files.is_empty()
    }
}

/// A named transformation step.
///
/// Both capabilities default to "not supported"; a phase overrides the pair
/// of methods for each capability it has.
pub trait Phase: Send + Sync {
    /// Short identifier, e.g. `packages`.
    fn name(&self) -> &'static str;

    fn supports_flags(&self) -> bool {
        false
    }

    /// Flags implied by `cfg`, given the flags active so far.
    fn process_flags(&self, _cfg: &Config, _flags: &FlagSet) -> Vec<Flag> {
        Vec::new()
    }

    fn supports_apply(&self) -> bool {
        false
    }

    /// Emit commands and files for this phase.
    fn apply(&self, _cfg: &mut Config, _ctx: &SystemContext) -> Result<PhaseOutput> {
        Ok(PhaseOutput::default())
    }
}

/// Ordered list of phases.
pub struct Pipeline {
    phases: Vec<Box<dyn Phase>>,
}

impl Pipeline {
    /// Pipeline with all built-in phases in their canonical order.
    pub fn builtin() -> Self {
        Self {
            phases: vec![
                Box::new(commands::PreCommandsPhase),
                Box::new(containers::ContainerRuntimePhase),
                Box::new(containers::KubernetesPhase),
                Box::new(system::SysctlPhase),
                Box::new(system::EnvironmentPhase),
                Box::new(system::TimezonePhase),
                Box::new(packages::PackagesPhase),
                Box::new(filesystem::FilesystemPhase),
                Box::new(services::ServicesPhase),
                Box::new(containers::ContainersPhase),
                Box::new(commands::CommandsPhase),
                Box::new(commands::PostCommandsPhase),
            ],
        }
    }

    pub fn new(phases: Vec<Box<dyn Phase>>) -> Self {
        Self { phases }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.phases.iter().map(|p| p.name()).collect()
    }

    pub fn is_valid_name(&self, name: &str) -> bool {
        self.phases.iter().any(|p| p.name() == name)
    }

    /// Keep only selected phases, preserving order.
    ///
    /// - `include`: If `Some`, only keep phases with these names
    /// - `exclude`: Always drop phases with these names
    pub fn filtered(self, include: Option<&[String]>, exclude: &[String]) -> Self {
        let phases = self
            .phases
            .into_iter()
            .filter(|p| {
                if exclude.iter().any(|e| e == p.name()) {
                    return false;
                }
                match include {
                    Some(names) => names.iter().any(|n| n == p.name()),
                    None => true,
                }
            })
            .collect();
        Self { phases }
    }

    /// Run the flag-processing pass, returning the extended context.
    pub fn process_flags(&self, cfg: &Config, ctx: SystemContext) -> SystemContext {
        self.phases
            .iter()
            .filter(|p| p.supports_flags())
            .fold(ctx, |ctx, phase| {
                let added = phase.process_flags(cfg, &ctx.flags);
                if !added.is_empty() {
                    debug!(phase = phase.name(), flags = ?added, "Phase added flags");
                }
                ctx.with_flags(added)
            })
    }

    /// Run both passes over `cfg`.
    ///
    /// Stops at the first phase whose apply step fails; nothing rendered so
    /// far is returned in that case.
    pub fn run(&self, mut cfg: Config, ctx: SystemContext) -> Result<Rendered> {
        let ctx = self.process_flags(&cfg, ctx);
        info!(context = %ctx, "Flags resolved");

        let mut commands = Commands::new();
        let mut files = Filesystem::new();

        for phase in self.phases.iter().filter(|p| p.supports_apply()) {
            let output = phase
                .apply(&mut cfg, &ctx)
                .map_err(|source| Error::Phase {
                    phase: phase.name(),
                    source: Box::new(source),
                })?;
            debug!(
                phase = phase.name(),
                commands = output.commands.len(),
                files = output.files.len(),
                "Phase applied"
            );
            commands.extend(output.commands);
            files.extend(output.files);
        }

        Ok(Rendered {
            context: ctx,
            commands,
            files,
        })
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::builtin()
    }
}
