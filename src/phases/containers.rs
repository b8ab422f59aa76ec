//! Container runtime, Kubernetes node packages, and containers run as
//! systemd services.
//!
//! The runtime and Kubernetes phases run before `packages`, so they extend
//! `cfg.packages` and `cfg.sysctls` rather than emitting install commands
//! themselves. Commands that need the packages installed are put at the
//! front of `cfg.commands`, runtime first.

use tracing::{debug, warn};

use super::services::{Unit, enable_commands, validate_unit_name};
use super::{Phase, PhaseOutput};
use crate::context::SystemContext;
use crate::error::{Error, Result};
use crate::flags::{Flag, FlagSet};
use crate::model::{Command, Commands, Config, Container, ContainerRuntime, File, Package};
use crate::package_manager::quote;

pub const DOCKER_DAEMON_JSON: &str = "/etc/docker/daemon.json";
pub const CONTAINERD_CONFIG: &str = "/etc/containerd/config.toml";
pub const K8S_MODULES_CONF: &str = "/etc/modules-load.d/kubernetes.conf";

const DOCKER: &str = "/usr/bin/docker";

/// Supported runtime kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeKind {
    Docker,
    Containerd,
}

impl RuntimeKind {
    pub fn parse(kind: &str) -> Result<Self> {
        match kind.trim().to_ascii_lowercase().as_str() {
            "docker" => Ok(Self::Docker),
            "containerd" => Ok(Self::Containerd),
            other => Err(Error::invalid_config(format!(
                "unknown container runtime '{other}', expected docker or containerd"
            ))),
        }
    }

    pub fn flag(&self) -> Flag {
        match self {
            Self::Docker => Flag::Docker,
            Self::Containerd => Flag::Containerd,
        }
    }

    pub fn service(&self) -> &'static str {
        match self {
            Self::Docker => "docker",
            Self::Containerd => "containerd",
        }
    }

    fn daemon(&self) -> &'static str {
        match self {
            Self::Docker => "/usr/bin/dockerd",
            Self::Containerd => "/usr/bin/containerd",
        }
    }

    /// Distribution package name.
    pub fn package(&self, flags: &FlagSet) -> &'static str {
        match self {
            Self::Docker if flags.contains(Flag::DebianLike) => "docker.io",
            Self::Docker => "docker",
            Self::Containerd => "containerd",
        }
    }
}

/// Commands the runtime phase puts at the front of `cfg.commands`.
fn runtime_commands(kind: RuntimeKind) -> Commands {
    vec![Command::new(format!("systemctl enable --now {}", kind.service()))]
}

/// A package entry, pinned and marked when `version` is given.
fn pinned_package(name: &str, version: &str, ctx: &SystemContext) -> Result<Package> {
    let version = version.trim();
    if version.is_empty() {
        return Ok(Package::new(name));
    }
    let platform = ctx.platform().ok_or_else(|| {
        Error::invalid_config(format!("cannot pin {name} without a detected platform"))
    })?;
    Ok(Package {
        mark: true,
        ..Package::new(platform.package_manager().versioned(name, version))
    })
}

pub struct ContainerRuntimePhase;

impl ContainerRuntimePhase {
    fn config_files(runtime: &ContainerRuntime, kind: RuntimeKind) -> Result<PhaseOutput> {
        let mut out = PhaseOutput::default();
        if !runtime.options.trim().is_empty() {
            let path = match kind {
                RuntimeKind::Docker => {
                    serde_json::from_str::<serde_json::Value>(&runtime.options).map_err(|e| {
                        Error::invalid_config(format!("docker options are not valid JSON: {e}"))
                    })?;
                    DOCKER_DAEMON_JSON
                }
                RuntimeKind::Containerd => CONTAINERD_CONFIG,
            };
            out.files
                .insert(path.to_string(), File::with_content(runtime.options.clone()));
        }
        if !runtime.arg.trim().is_empty() {
            let dropin = format!(
                "/etc/systemd/system/{}.service.d/firstboot.conf",
                kind.service()
            );
            let content = format!(
                "[Service]\nExecStart=\nExecStart={} {}\n",
                kind.daemon(),
                runtime.arg.trim()
            );
            out.files.insert(dropin, File::with_content(content));
        }
        Ok(out)
    }
}

impl Phase for ContainerRuntimePhase {
    fn name(&self) -> &'static str {
        "container-runtime"
    }

    fn supports_flags(&self) -> bool {
        true
    }

    fn process_flags(&self, cfg: &Config, _flags: &FlagSet) -> Vec<Flag> {
        // An unknown kind adds nothing here; apply reports it.
        cfg.container_runtime
            .as_ref()
            .and_then(|rt| RuntimeKind::parse(&rt.kind).ok())
            .map(|kind| vec![kind.flag()])
            .unwrap_or_default()
    }

    fn supports_apply(&self) -> bool {
        true
    }

    fn apply(&self, cfg: &mut Config, ctx: &SystemContext) -> Result<PhaseOutput> {
        let Some(runtime) = cfg.container_runtime.clone() else {
            return Ok(PhaseOutput::default());
        };
        let kind = RuntimeKind::parse(&runtime.kind)?;

        let package = pinned_package(kind.package(&ctx.flags), &runtime.version, ctx)?;
        debug!(package = %package, "Adding container runtime package");
        cfg.packages.push(package);

        let prefix = runtime_commands(kind);
        cfg.commands.splice(0..0, prefix);

        Self::config_files(&runtime, kind)
    }
}

pub struct KubernetesPhase;

impl KubernetesPhase {
    pub const PACKAGES: [&'static str; 3] = ["kubelet", "kubeadm", "kubectl"];

    pub const SYSCTLS: [(&'static str, &'static str); 3] = [
        ("net.bridge.bridge-nf-call-ip6tables", "1"),
        ("net.bridge.bridge-nf-call-iptables", "1"),
        ("net.ipv4.ip_forward", "1"),
    ];
}

impl Phase for KubernetesPhase {
    fn name(&self) -> &'static str {
        "kubernetes"
    }

    fn supports_flags(&self) -> bool {
        true
    }

    fn process_flags(&self, cfg: &Config, _flags: &FlagSet) -> Vec<Flag> {
        if cfg.kubernetes.is_some() {
            vec![Flag::Kubernetes]
        } else {
            vec![]
        }
    }

    fn supports_apply(&self) -> bool {
        true
    }

    fn apply(&self, cfg: &mut Config, ctx: &SystemContext) -> Result<PhaseOutput> {
        let Some(k8s) = cfg.kubernetes.clone() else {
            return Ok(PhaseOutput::default());
        };
        if !ctx.has(Flag::Docker) && !ctx.has(Flag::Containerd) {
            return Err(Error::invalid_config(
                "kubernetes requires a container runtime (docker or containerd)",
            ));
        }

        for name in Self::PACKAGES {
            let package = pinned_package(name, &k8s.version, ctx)?;
            cfg.packages.push(Package {
                mark: true,
                ..package
            });
        }
        for (key, value) in Self::SYSCTLS {
            cfg.sysctls
                .entry(key.to_string())
                .or_insert_with(|| value.to_string());
        }
        if let Some(path) = &k8s.download_path {
            debug!(path = %path, "download_path is passed through, packages come from repos");
        }

        let mut commands = vec![
            Command::new("modprobe br_netfilter"),
            Command::new("swapoff -a"),
            Command::new("systemctl enable kubelet"),
        ];
        if let Some(prefix) = k8s.image_prefix.as_deref().filter(|p| !p.is_empty()) {
            let mut pull = format!("kubeadm config images pull --image-repository {}", quote(prefix));
            if !k8s.version.trim().is_empty() {
                pull.push_str(&format!(" --kubernetes-version {}", quote(k8s.version.trim())));
            }
            commands.push(Command::new(pull));
        }

        // After the runtime's own commands.
        let at = match &cfg.container_runtime {
            Some(rt) => runtime_commands(RuntimeKind::parse(&rt.kind)?).len(),
            None => 0,
        };
        let at = at.min(cfg.commands.len());
        cfg.commands.splice(at..at, commands);

        let mut out = PhaseOutput::default();
        out.files.insert(
            K8S_MODULES_CONF.to_string(),
            File {
                permissions: Some("0644".into()),
                ..File::with_content("br_netfilter\noverlay\n")
            },
        );
        Ok(out)
    }
}

pub struct ContainersPhase;

impl ContainersPhase {
    /// `docker run` invocation for `container`, named `name`.
    pub fn run_command(container: &Container, name: &str) -> String {
        let mut args: Vec<String> = vec![DOCKER.to_string()];
        if !container.docker_client_args.trim().is_empty() {
            args.push(container.docker_client_args.trim().to_string());
        }
        args.extend(["run".into(), "--rm".into(), "--name".into(), quote(name)]);

        if let Some(network) = &container.network {
            args.push(format!("--network {}", quote(network)));
        }
        if let Some(cpu) = container.cpu {
            args.push(format!("--cpus {cpu}"));
        }
        if let Some(mem) = container.mem {
            args.push(format!("--memory {mem}m"));
        }
        for (key, value) in &container.env {
            args.push(format!("-e {}", quote(&format!("{key}={value}"))));
        }
        for (key, value) in &container.labels {
            args.push(format!("--label {}", quote(&format!("{key}={value}"))));
        }
        for port in &container.ports {
            let target = port.target.unwrap_or(port.port);
            args.push(format!("-p {}:{target}", port.port));
        }
        for (host, inner) in container.files.iter().chain(&container.templates) {
            args.push(format!("-v {}", quote(&format!("{host}:{inner}:ro"))));
        }
        for volume in &container.volumes {
            args.push(format!("-v {}", quote(volume)));
        }
        if !container.docker_opts.trim().is_empty() {
            args.push(container.docker_opts.trim().to_string());
        }
        args.push(quote(&container.image));
        if !container.args.trim().is_empty() {
            args.push(container.args.trim().to_string());
        }
        args.join(" ")
    }

    fn unit(container: &Container, name: &str) -> Unit {
        Unit {
            after: vec!["docker.service".into()],
            requires: vec!["docker.service".into()],
            exec_start_pre: vec![format!("-{DOCKER} rm -f {name}")],
            exec_stop: Some(format!("{DOCKER} stop {name}")),
            ..Unit::new(format!("{name} container"), Self::run_command(container, name))
        }
    }
}

impl Phase for ContainersPhase {
    fn name(&self) -> &'static str {
        "containers"
    }

    fn supports_flags(&self) -> bool {
        true
    }

    fn process_flags(&self, cfg: &Config, _flags: &FlagSet) -> Vec<Flag> {
        if cfg.containers.is_empty() {
            vec![]
        } else {
            vec![Flag::Container]
        }
    }

    fn supports_apply(&self) -> bool {
        true
    }

    fn apply(&self, cfg: &mut Config, ctx: &SystemContext) -> Result<PhaseOutput> {
        if cfg.containers.is_empty() && cfg.images.is_empty() {
            return Ok(PhaseOutput::default());
        }
        if !ctx.has(Flag::Docker) {
            return Err(Error::invalid_config(
                "containers and images require the docker runtime",
            ));
        }

        let mut out = PhaseOutput::default();
        out.commands.extend(
            cfg.images
                .iter()
                .map(|image| Command::new(format!("{DOCKER} pull {}", quote(image)))),
        );

        let mut names = Vec::new();
        let mut extra = Commands::new();
        for container in &cfg.containers {
            if container.image.trim().is_empty() {
                return Err(Error::invalid_config("container without an image"));
            }
            let name = container.service_name();
            validate_unit_name(&name)?;
            if names.contains(&name) {
                return Err(Error::invalid_config(format!(
                    "duplicate container service '{name}'"
                )));
            }
            if container.replicas.is_some_and(|r| r > 1) {
                warn!(service = %name, "replicas is not supported, running one instance");
            }

            out.files
                .insert(Unit::path(&name), Self::unit(container, &name).into_file());
            extra.extend(container.commands.iter().cloned().map(Command::new));
            names.push(name);
        }

        out.commands.extend(enable_commands(&names));
        out.commands.extend(extra);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Port;
    use std::collections::BTreeMap;

    fn photon() -> SystemContext {
        SystemContext::new("t").with_flags([Flag::Photon, Flag::Photon3])
    }

    #[test]
    fn test_runtime_flags() {
        let cfg = Config::from_yaml("container_runtime:\n  type: docker\n").unwrap();
        assert_eq!(
            ContainerRuntimePhase.process_flags(&cfg, &FlagSet::new()),
            vec![Flag::Docker]
        );
        let cfg = Config::from_yaml("container_runtime:\n  type: containerd\n").unwrap();
        assert_eq!(
            ContainerRuntimePhase.process_flags(&cfg, &FlagSet::new()),
            vec![Flag::Containerd]
        );
        assert!(
            ContainerRuntimePhase
                .process_flags(&Config::default(), &FlagSet::new())
                .is_empty()
        );
    }

    #[test]
    fn test_runtime_apply_extends_config() {
        let mut cfg = Config::from_yaml(
            "container_runtime:\n  type: docker\n  version: \"20.10.5\"\ncommands: [\"echo hi\"]\n",
        )
        .unwrap();
        let ctx = photon().with_flags([Flag::Docker]);
        let out = ContainerRuntimePhase.apply(&mut cfg, &ctx).unwrap();
        assert!(out.is_empty());
        assert_eq!(cfg.packages.len(), 1);
        assert_eq!(cfg.packages[0].name, "docker-20.10.5");
        assert!(cfg.packages[0].mark);
        assert_eq!(cfg.commands[0].cmd, "systemctl enable --now docker");
        assert_eq!(cfg.commands[1].cmd, "echo hi");
    }

    #[test]
    fn test_runtime_package_name_on_debian_like() {
        let flags: FlagSet = [Flag::Ubuntu, Flag::DebianLike].into_iter().collect();
        assert_eq!(RuntimeKind::Docker.package(&flags), "docker.io");
        assert_eq!(RuntimeKind::Docker.package(&FlagSet::new()), "docker");
    }

    #[test]
    fn test_runtime_daemon_options() {
        let mut cfg = Config::from_yaml(
            "container_runtime:\n  type: docker\n  options: '{\"log-driver\": \"journald\"}'\n  arg: --iptables=false\n",
        )
        .unwrap();
        let out = ContainerRuntimePhase.apply(&mut cfg, &photon()).unwrap();
        assert!(out.files[DOCKER_DAEMON_JSON].content.contains("journald"));
        assert_eq!(
            out.files["/etc/systemd/system/docker.service.d/firstboot.conf"].content,
            "[Service]\nExecStart=\nExecStart=/usr/bin/dockerd --iptables=false\n"
        );

        let mut bad = Config::from_yaml("container_runtime:\n  type: docker\n  options: \"{not json\"\n").unwrap();
        assert!(ContainerRuntimePhase.apply(&mut bad, &photon()).is_err());
    }

    #[test]
    fn test_unknown_runtime_is_error() {
        let mut cfg = Config::from_yaml("container_runtime:\n  type: rkt\n").unwrap();
        assert!(
            ContainerRuntimePhase
                .process_flags(&cfg, &FlagSet::new())
                .is_empty()
        );
        let err = ContainerRuntimePhase.apply(&mut cfg, &photon()).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }

    #[test]
    fn test_kubernetes_requires_runtime() {
        let mut cfg = Config::from_yaml("kubernetes:\n  version: \"1.20.1\"\n").unwrap();
        let err = KubernetesPhase.apply(&mut cfg, &photon()).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }

    #[test]
    fn test_kubernetes_apply() {
        let mut cfg = Config::from_yaml(
            r#"
container_runtime:
  type: docker
kubernetes:
  version: "1.20.1"
  image_prefix: registry.example.com/k8s
sysctls:
  net.ipv4.ip_forward: "0"
"#,
        )
        .unwrap();
        let ctx = photon().with_flags([Flag::Docker, Flag::Kubernetes]);
        ContainerRuntimePhase.apply(&mut cfg, &ctx).unwrap();
        let out = KubernetesPhase.apply(&mut cfg, &ctx).unwrap();

        let names: Vec<&str> = cfg.packages.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["docker", "kubelet-1.20.1", "kubeadm-1.20.1", "kubectl-1.20.1"]
        );
        assert!(cfg.packages[1..].iter().all(|p| p.mark && !p.uninstall));

        // User values win over defaults.
        assert_eq!(cfg.sysctls["net.ipv4.ip_forward"], "0");
        assert_eq!(cfg.sysctls["net.bridge.bridge-nf-call-iptables"], "1");

        let cmds: Vec<&str> = cfg.commands.iter().map(|c| c.cmd.as_str()).collect();
        assert_eq!(
            cmds,
            vec![
                "systemctl enable --now docker",
                "modprobe br_netfilter",
                "swapoff -a",
                "systemctl enable kubelet",
                "kubeadm config images pull --image-repository registry.example.com/k8s --kubernetes-version 1.20.1",
            ]
        );
        assert!(out.files.contains_key(K8S_MODULES_CONF));
    }

    #[test]
    fn test_containers_flag_and_docker_requirement() {
        let mut cfg = Config::from_yaml("containers:\n  - image: nginx:1.25\n").unwrap();
        assert_eq!(
            ContainersPhase.process_flags(&cfg, &FlagSet::new()),
            vec![Flag::Container]
        );
        assert!(ContainersPhase.apply(&mut cfg, &photon()).is_err());
    }

    #[test]
    fn test_containers_become_services() {
        let mut cfg = Config::from_yaml(
            r#"
images: [busybox]
containers:
  - image: docker.io/library/nginx:1.25
    ports:
      - port: 8080
        target: 80
    commands: ["echo started"]
"#,
        )
        .unwrap();
        let ctx = photon().with_flags([Flag::Docker, Flag::Container]);
        let out = ContainersPhase.apply(&mut cfg, &ctx).unwrap();

        let unit = &out.files["/etc/systemd/system/nginx.service"].content;
        assert!(unit.contains("Requires=docker.service\n"));
        assert!(unit.contains("ExecStartPre=-/usr/bin/docker rm -f nginx\n"));
        assert!(unit.contains(
            "ExecStart=/usr/bin/docker run --rm --name nginx -p 8080:80 docker.io/library/nginx:1.25\n"
        ));

        let cmds: Vec<&str> = out.commands.iter().map(|c| c.cmd.as_str()).collect();
        assert_eq!(
            cmds,
            vec![
                "/usr/bin/docker pull busybox",
                "systemctl daemon-reload",
                "systemctl enable --now nginx.service",
                "echo started",
            ]
        );
    }

    #[test]
    fn test_run_command_options() {
        let mut env = BTreeMap::new();
        env.insert("MODE".to_string(), "prod".to_string());
        let container = Container {
            service: Some("api".into()),
            image: "example/api".into(),
            env,
            cpu: Some(2),
            mem: Some(512),
            network: Some("host".into()),
            ports: vec![Port {
                port: 9000,
                target: None,
            }],
            volumes: vec!["/data:/data".into()],
            args: "--verbose".into(),
            ..Default::default()
        };
        let cmd = ContainersPhase::run_command(&container, "api");
        assert!(cmd.starts_with(
            "/usr/bin/docker run --rm --name api --network host --cpus 2 --memory 512m -e "
        ));
        assert!(cmd.contains("MODE=prod"));
        assert!(cmd.ends_with(" -p 9000:9000 -v /data:/data example/api --verbose"));
    }

    #[test]
    fn test_duplicate_container_names_rejected() {
        let mut cfg = Config::from_yaml("containers:\n  - image: nginx\n  - image: other/nginx\n").unwrap();
        let ctx = photon().with_flags([Flag::Docker]);
        assert!(ContainersPhase.apply(&mut cfg, &ctx).is_err());
    }
}
