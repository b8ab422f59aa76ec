//! Shell completion generation.

use anyhow::Result;
use clap::{CommandFactory, Parser, ValueEnum};
use clap_complete::Generator;
use clap_complete_nushell::Nushell;
use std::io;

use crate::cli::Cli;

/// Supported shell types for completion generation.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    Nushell,
}

#[derive(Debug, Parser)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

fn print_completions<G: Generator>(generator: G, cmd: &mut clap::Command) {
    let name = cmd.get_name().to_string();
    clap_complete::generate(generator, cmd, name, &mut io::stdout());
}

pub fn run(args: CompletionsArgs) -> Result<()> {
    let mut cmd = Cli::command();
    match args.shell {
        Shell::Bash => print_completions(clap_complete::Shell::Bash, &mut cmd),
        Shell::Zsh => print_completions(clap_complete::Shell::Zsh, &mut cmd),
        Shell::Fish => print_completions(clap_complete::Shell::Fish, &mut cmd),
        Shell::Nushell => print_completions(Nushell, &mut cmd),
    }
    Ok(())
}
