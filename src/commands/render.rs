//! `firstboot render`: config files in, first-boot script out.

use anyhow::{Context, Result};
use clap::Args;
use std::fs;
use std::path::{Path, PathBuf};

use crate::context::parse_var;
use crate::flags::Flag;
use crate::model::Config;
use crate::os_release::OsRelease;
use crate::output::Output;
use crate::render::{Format, RenderOptions, render};

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Config documents (YAML or JSON), merged in order
    #[arg(required = true, value_name = "CONFIG")]
    pub configs: Vec<PathBuf>,

    /// Extra flags to activate (repeatable or comma separated)
    #[arg(long = "tag", value_name = "FLAG", value_delimiter = ',')]
    pub tags: Vec<Flag>,

    /// Context variable as key=value; JSON values keep their type
    #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_var)]
    pub vars: Vec<(String, serde_json::Value)>,

    /// Run name (defaults to the host name)
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long, value_enum, default_value_t = Format::Script)]
    pub format: Format,

    /// Write to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print the SHA-256 of the rendered script instead of the artifact
    #[arg(long)]
    pub digest: bool,

    /// Only run these phases (repeatable)
    #[arg(long = "phase", value_name = "PHASE")]
    pub phases: Vec<String>,

    /// Skip these phases (repeatable)
    #[arg(long = "skip-phase", value_name = "PHASE")]
    pub skip_phases: Vec<String>,
}

impl RenderArgs {
    fn options(&self) -> RenderOptions {
        RenderOptions {
            name: self.name.clone(),
            tags: self.tags.clone(),
            vars: self.vars.clone(),
            phases: (!self.phases.is_empty()).then(|| self.phases.clone()),
            skip_phases: self.skip_phases.clone(),
        }
    }
}

fn write_artifact(path: &Path, content: &str, executable: bool) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    if executable {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755))
            .with_context(|| format!("Failed to set permissions on {}", path.display()))?;
    }
    Ok(())
}

pub fn run(args: RenderArgs, host: &OsRelease) -> Result<()> {
    let cfg = Config::load_all(&args.configs).context("Failed to load config")?;
    let rendered = render(cfg, host, &args.options()).context("Failed to render config")?;
    let artifact = rendered.format(args.format)?;

    if let Some(path) = &args.output {
        write_artifact(path, &artifact, args.format == Format::Script)?;
        Output::success(format!(
            "Wrote {} ({} commands, {} files)",
            path.display(),
            rendered.commands.len(),
            rendered.files.len()
        ));
    }

    if args.digest {
        println!("{}", rendered.digest());
    } else if args.output.is_none() {
        print!("{artifact}");
    }
    Ok(())
}
