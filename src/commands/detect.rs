//! `firstboot detect`: what the target looks like to the pipeline.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use crate::context::{CODENAME_VAR, SystemContext};
use crate::os_release::OsRelease;
use crate::output::Output;
use crate::platform::Platform;

#[derive(Debug, Args)]
pub struct DetectArgs {
    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct Detection {
    platform: String,
    version_id: Option<String>,
    version_codename: String,
    package_manager: &'static str,
    flags: Vec<&'static str>,
}

pub fn run(args: DetectArgs, host: &OsRelease) -> Result<()> {
    let platform = Platform::detect(host).context("Failed to detect platform")?;
    let ctx = SystemContext::for_platform("detect", platform, host);

    let detection = Detection {
        platform: platform.to_string(),
        version_id: host.version_id().map(str::to_string),
        version_codename: ctx
            .vars
            .get(CODENAME_VAR)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        package_manager: platform.package_manager().name(),
        flags: ctx.flags.iter().map(|f| f.as_str()).collect(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&detection)?);
        return Ok(());
    }

    Output::header("Target");
    Output::kv("Platform", &detection.platform);
    Output::kv("Version", detection.version_id.as_deref().unwrap_or("-"));
    if !detection.version_codename.is_empty() {
        Output::kv("Codename", &detection.version_codename);
    }
    Output::kv("Packages", detection.package_manager);
    Output::kv("Flags", detection.flags.join(" "));
    Ok(())
}
