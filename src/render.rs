//! Turning a config into a first-boot artifact.
//!
//! [`render`] detects the platform, seeds the [`SystemContext`], and runs the
//! built-in pipeline. The resulting [`Rendered`] can be emitted as a bash
//! script or as JSON. Both are byte-for-byte deterministic for the same
//! inputs, so [`Rendered::digest`] can be used to detect drift.

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::info;

use crate::context::SystemContext;
use crate::error::{Error, Result};
use crate::flags::Flag;
use crate::model::{Commands, Config, File, Filesystem};
use crate::os_release::OsRelease;
use crate::package_manager::quote;
use crate::phases::Pipeline;
use crate::platform::Platform;

const HEREDOC_DELIMITER: &str = "FIRSTBOOT_EOF";

/// Final output of a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rendered {
    pub context: SystemContext,
    pub commands: Commands,
    pub files: Filesystem,
}

impl Rendered {
    /// A bash script that writes every file, then runs every command.
    ///
    /// Files are placed before `pre_commands` run, so a pre-command cannot
    /// create the user or group a file's `owner` names; such accounts must
    /// already exist in the image.
    pub fn to_script(&self) -> String {
        let mut s = String::from("#!/bin/bash\n");
        s.push_str(&format!("# Generated by firstboot for {}\n", self.context.name));
        s.push_str(&format!("# flags: {}\n", self.context.flags));
        s.push_str("set -euo pipefail\n");

        if !self.files.is_empty() {
            s.push('\n');
        }
        for (path, file) in &self.files {
            write_file(&mut s, path, file);
        }

        if !self.commands.is_empty() {
            s.push('\n');
        }
        for command in &self.commands {
            s.push_str(&command.cmd);
            s.push('\n');
        }
        s
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// SHA-256 of the script, hex encoded.
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(self.to_script().as_bytes()))
    }
}

/// A delimiter that does not occur as a line of `content`.
fn delimiter_for(content: &str) -> String {
    let mut delimiter = HEREDOC_DELIMITER.to_string();
    let mut n = 0;
    while content.lines().any(|line| line == delimiter) {
        n += 1;
        delimiter = format!("{HEREDOC_DELIMITER}_{n}");
    }
    delimiter
}

fn write_file(s: &mut String, path: &str, file: &File) {
    let quoted = quote(path);
    if let Some((dir, _)) = path.rsplit_once('/') {
        if !dir.is_empty() {
            s.push_str(&format!("mkdir -p {}\n", quote(dir)));
        }
    }

    if let Some(url) = &file.content_from_url {
        s.push_str(&format!("curl -fsSL --retry 3 -o {quoted} {}\n", quote(url)));
    } else {
        let delimiter = delimiter_for(&file.content);
        s.push_str(&format!("cat <<'{delimiter}' >{quoted}\n"));
        s.push_str(&file.content);
        if !file.content.is_empty() && !file.content.ends_with('\n') {
            s.push('\n');
        }
        s.push_str(&delimiter);
        s.push('\n');
    }

    if let Some(mode) = &file.permissions {
        s.push_str(&format!("chmod {} {quoted}\n", quote(mode)));
    }
    if let Some(owner) = &file.owner {
        s.push_str(&format!("chown {} {quoted}\n", quote(owner)));
    }
}

/// Output format for a rendered run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    #[default]
    Script,
    Json,
}

impl Rendered {
    pub fn format(&self, format: Format) -> Result<String> {
        match format {
            Format::Script => Ok(self.to_script()),
            Format::Json => self.to_json(),
        }
    }
}

/// Caller-supplied overrides for a render.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Run name; defaults to the host name
    pub name: Option<String>,
    /// Flags added on top of the platform's
    pub tags: Vec<Flag>,
    pub vars: Vec<(String, serde_json::Value)>,
    /// Only run these phases
    pub phases: Option<Vec<String>>,
    pub skip_phases: Vec<String>,
}

impl RenderOptions {
    /// Pipeline for these options; unknown phase names are rejected.
    pub fn pipeline(&self) -> Result<Pipeline> {
        let builtin = Pipeline::builtin();
        let requested = self.phases.iter().flatten().chain(&self.skip_phases);
        for name in requested {
            if !builtin.is_valid_name(name) {
                return Err(Error::invalid_config(format!(
                    "unknown phase '{name}', expected one of: {}",
                    builtin.names().join(", ")
                )));
            }
        }
        Ok(builtin.filtered(self.phases.as_deref(), &self.skip_phases))
    }

    /// Initial context for `host`.
    pub fn context(&self, host: &OsRelease) -> Result<SystemContext> {
        let platform = Platform::detect(host)?;
        let name = self
            .name
            .clone()
            .unwrap_or_else(crate::context::default_run_name);
        let ctx = self.vars.iter().fold(
            SystemContext::for_platform(name, platform, host).with_flags(self.tags.iter().copied()),
            |ctx, (key, value)| ctx.with_var(key.clone(), value.clone()),
        );
        Ok(ctx)
    }
}

/// Render `cfg` for `host`.
pub fn render(cfg: Config, host: &OsRelease, opts: &RenderOptions) -> Result<Rendered> {
    let pipeline = opts.pipeline()?;
    let ctx = opts.context(host)?;
    info!(context = %ctx, phases = ?pipeline.names(), "Rendering");
    pipeline.run(cfg, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Command;

    fn photon3() -> OsRelease {
        OsRelease::parse("NAME=\"VMware Photon OS\"\nID=photon\nVERSION_ID=3.0\n")
    }

    fn opts() -> RenderOptions {
        RenderOptions {
            name: Some("node-1".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_script_layout() {
        let mut files = Filesystem::new();
        files.insert(
            "/etc/motd".into(),
            File {
                permissions: Some("0644".into()),
                owner: Some("root:root".into()),
                ..File::with_content("hello")
            },
        );
        let rendered = Rendered {
            context: SystemContext::new("node-1").with_flags([Flag::Photon]),
            commands: vec![Command::new("echo done")],
            files,
        };
        assert_eq!(
            rendered.to_script(),
            "#!/bin/bash\n\
             # Generated by firstboot for node-1\n\
             # flags: photon\n\
             set -euo pipefail\n\
             \n\
             mkdir -p /etc\n\
             cat <<'FIRSTBOOT_EOF' >/etc/motd\n\
             hello\n\
             FIRSTBOOT_EOF\n\
             chmod 0644 /etc/motd\n\
             chown root:root /etc/motd\n\
             \n\
             echo done\n"
        );
    }

    #[test]
    fn test_files_are_written_before_pre_commands() {
        let cfg = Config::from_yaml(
            "pre_commands: [\"useradd app\"]\nfilesystem:\n  /etc/app.conf:\n    content: x\n    owner: app\n",
        )
        .unwrap();
        let script = render(cfg, &photon3(), &opts()).unwrap().to_script();
        let chown_at = script.find("chown app /etc/app.conf\n").unwrap();
        let useradd_at = script.find("useradd app\n").unwrap();
        assert!(chown_at < useradd_at);
    }

    #[test]
    fn test_delimiter_avoids_content() {
        assert_eq!(delimiter_for("a\nb\n"), "FIRSTBOOT_EOF");
        assert_eq!(delimiter_for("x\nFIRSTBOOT_EOF\n"), "FIRSTBOOT_EOF_1");
        assert_eq!(
            delimiter_for("FIRSTBOOT_EOF\nFIRSTBOOT_EOF_1\n"),
            "FIRSTBOOT_EOF_2"
        );
    }

    #[test]
    fn test_remote_content_is_downloaded() {
        let mut s = String::new();
        let file = File {
            content_from_url: Some("https://example.com/motd".into()),
            ..Default::default()
        };
        write_file(&mut s, "/etc/motd", &file);
        assert_eq!(
            s,
            "mkdir -p /etc\ncurl -fsSL --retry 3 -o /etc/motd https://example.com/motd\n"
        );
    }

    #[test]
    fn test_render_photon_scenario() {
        let cfg = Config::from_yaml("packages:\n  - \"=!foo # photon3\"\n").unwrap();
        let rendered = render(cfg, &photon3(), &opts()).unwrap();

        assert!(rendered.context.has(Flag::Photon));
        assert!(rendered.context.has(Flag::Photon3));
        assert_eq!(rendered.context.flags.len(), 2);

        let cmds: Vec<&str> = rendered.commands.iter().map(|c| c.cmd.as_str()).collect();
        assert_eq!(cmds, vec!["tdnf remove -y foo"]);
    }

    #[test]
    fn test_render_is_deterministic() {
        let yaml = r#"
packages: [curl, git]
sysctls:
  vm.swappiness: "10"
filesystem:
  /etc/b: {content: b}
  /etc/a: {content: a}
"#;
        let a = render(Config::from_yaml(yaml).unwrap(), &photon3(), &opts()).unwrap();
        let b = render(Config::from_yaml(yaml).unwrap(), &photon3(), &opts()).unwrap();
        assert_eq!(a.to_script(), b.to_script());
        assert_eq!(a.digest(), b.digest());
        assert_eq!(a.digest().len(), 64);
        assert_eq!(a.to_json().unwrap(), b.to_json().unwrap());
    }

    #[test]
    fn test_render_unsupported_platform() {
        let host = OsRelease::parse("ID=plan9\n");
        let err = render(Config::default(), &host, &opts()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedPlatform { .. }));
    }

    #[test]
    fn test_extra_tags_and_vars() {
        let options = RenderOptions {
            tags: vec![Flag::Aws],
            vars: vec![("region".into(), serde_json::json!("eu-west-1"))],
            ..opts()
        };
        let cfg = Config::from_yaml("commands:\n  - \"echo aws # aws\"\n").unwrap();
        let rendered = render(cfg, &photon3(), &options).unwrap();
        assert_eq!(rendered.commands[0].cmd, "echo aws");
        assert_eq!(rendered.context.vars["region"], serde_json::json!("eu-west-1"));
    }

    #[test]
    fn test_phase_selection() {
        let cfg = Config::from_yaml("packages: [curl]\ncommands: [\"echo hi\"]\n").unwrap();
        let options = RenderOptions {
            skip_phases: vec!["packages".into()],
            ..opts()
        };
        let rendered = render(cfg, &photon3(), &options).unwrap();
        assert_eq!(rendered.commands.len(), 1);

        let options = RenderOptions {
            phases: Some(vec!["nope".into()]),
            ..opts()
        };
        let err = render(Config::default(), &photon3(), &options).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }

    #[test]
    fn test_phase_error_names_phase() {
        let cfg = Config::from_yaml("kubernetes:\n  version: \"1.20.1\"\n").unwrap();
        let err = render(cfg, &photon3(), &opts()).unwrap_err();
        assert_eq!(err.phase(), Some("kubernetes"));
    }
}
