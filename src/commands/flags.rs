//! `firstboot flags`: the flag registry.

use anyhow::Result;
use clap::Args;

use crate::flags::{Flag, REGISTRY};
use crate::output::Output;

#[derive(Debug, Args)]
pub struct FlagsArgs {
    /// Validate a space or comma separated flag list instead of listing
    #[arg(long, value_name = "LIST")]
    pub check: Option<String>,
}

pub fn run(args: FlagsArgs) -> Result<()> {
    if let Some(list) = args.check {
        let normalized = list.replace(',', " ");
        let flags = Flag::parse_list(&normalized)?;
        Output::success(format!("{} valid flag(s)", flags.len()));
        for flag in flags {
            println!("{flag}");
        }
        return Ok(());
    }

    for (spelling, _) in REGISTRY {
        println!("{spelling}");
    }
    Ok(())
}
