//! User command lists: `pre_commands`, `commands` and `post_commands`.

use super::{Phase, PhaseOutput};
use crate::context::SystemContext;
use crate::error::Result;
use crate::model::{Command, Commands, Config};

/// Commands whose flags are all active, in declared order.
pub fn applicable(commands: &[Command], ctx: &SystemContext) -> Commands {
    commands
        .iter()
        .filter(|c| c.applies_to(&ctx.flags))
        .map(|c| Command::new(c.cmd.clone()))
        .collect()
}

pub struct PreCommandsPhase;

impl Phase for PreCommandsPhase {
    fn name(&self) -> &'static str {
        "pre-commands"
    }

    fn supports_apply(&self) -> bool {
        true
    }

    fn apply(&self, cfg: &mut Config, ctx: &SystemContext) -> Result<PhaseOutput> {
        Ok(PhaseOutput::commands(applicable(&cfg.pre_commands, ctx)))
    }
}

pub struct CommandsPhase;

impl Phase for CommandsPhase {
    fn name(&self) -> &'static str {
        "commands"
    }

    fn supports_apply(&self) -> bool {
        true
    }

    fn apply(&self, cfg: &mut Config, ctx: &SystemContext) -> Result<PhaseOutput> {
        Ok(PhaseOutput::commands(applicable(&cfg.commands, ctx)))
    }
}

pub struct PostCommandsPhase;

impl Phase for PostCommandsPhase {
    fn name(&self) -> &'static str {
        "post-commands"
    }

    fn supports_apply(&self) -> bool {
        true
    }

    fn apply(&self, cfg: &mut Config, ctx: &SystemContext) -> Result<PhaseOutput> {
        Ok(PhaseOutput::commands(applicable(&cfg.post_commands, ctx)))
    }
}
