//! JSON schema for config documents.

use anyhow::{Context, Result};
use clap::Args;
use schemars::schema_for;
use std::fs;
use std::path::PathBuf;

use crate::model::Config;
use crate::output::Output;

#[derive(Debug, Args)]
pub struct SchemaArgs {
    /// Write the schema to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn config_schema() -> Result<String> {
    serde_json::to_string_pretty(&schema_for!(Config)).context("Failed to serialize schema")
}

pub fn run(args: SchemaArgs) -> Result<()> {
    let json = config_schema()?;
    match args.output {
        Some(path) => {
            fs::write(&path, &json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            Output::success(format!("Wrote {}", path.display()));
        }
        None => println!("{json}"),
    }
    Ok(())
}
