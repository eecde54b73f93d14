// ABOUTME: Runtime adapter driving Proxmox containers through the local `pct` CLI.
// ABOUTME: Builds create arguments from a service spec and maps "does not exist" to NotFound.

use super::error::{CommandError, ExitedSnafu, SpawnSnafu};
use super::{ContainerStatus, RuntimeAdapter, RuntimeError};
use crate::spec::{Mount, ServiceSpec};
use crate::types::{Ctid, Digest};
use async_trait::async_trait;
use snafu::ResultExt;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

/// Marker `pct` prints when an identity is unknown.
const NOT_FOUND_MARKER: &str = "does not exist";

/// Runs `pct` on the node this process lives on.
///
/// `pct` only manages local containers, so the `node` argument of each
/// call is informational. Commands are killed if the calling future is
/// dropped, which is how cancellation reaches a running command.
pub struct PctRuntime {
    pct_path: PathBuf,
    span: tracing::Span,
}

impl PctRuntime {
    pub fn new(pct_path: impl Into<PathBuf>) -> Self {
        Self {
            pct_path: pct_path.into(),
            span: tracing::info_span!("pct"),
        }
    }

    /// Emit this adapter's events under `span`.
    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    async fn run(&self, args: &[String]) -> Result<String, CommandError> {
        let program = self.pct_path.display().to_string();
        tracing::debug!(parent: &self.span, command = %args.join(" "), "running {}", program);

        let output = Command::new(&self.pct_path)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .context(SpawnSnafu {
                program: program.clone(),
            })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            return ExitedSnafu {
                program,
                args: args.join(" "),
                code: output
                    .status
                    .code()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".to_string()),
                output: combined.trim().to_string(),
            }
            .fail();
        }

        Ok(combined)
    }

    async fn lifecycle(&self, verb: &str, node: &str, ctid: Ctid) -> Result<(), RuntimeError> {
        tracing::info!(parent: &self.span, %node, %ctid, "pct {}", verb);
        self.run(&[verb.to_string(), ctid.to_string()])
            .await
            .map(|_| ())
            .map_err(|e| classify(e, ctid))
    }
}

#[async_trait]
impl RuntimeAdapter for PctRuntime {
    async fn probe_existence(
        &self,
        _node: &str,
        ctid: Ctid,
    ) -> Result<ContainerStatus, RuntimeError> {
        let out = self
            .run(&["status".to_string(), ctid.to_string()])
            .await
            .map_err(|e| classify(e, ctid))?;
        Ok(ContainerStatus::new(parse_status(&out)))
    }

    async fn create(&self, spec: &ServiceSpec, digest: &Digest) -> Result<(), RuntimeError> {
        tracing::info!(
            parent: &self.span,
            service = %spec.name,
            node = %spec.node,
            ctid = %spec.ctid,
            %digest,
            "pct create"
        );
        self.run(&create_args(spec, digest))
            .await
            .map(|_| ())
            .map_err(|e| classify(e, spec.ctid))
    }

    async fn start(&self, node: &str, ctid: Ctid) -> Result<(), RuntimeError> {
        self.lifecycle("start", node, ctid).await
    }

    async fn stop(&self, node: &str, ctid: Ctid) -> Result<(), RuntimeError> {
        self.lifecycle("stop", node, ctid).await
    }

    async fn destroy(&self, node: &str, ctid: Ctid) -> Result<(), RuntimeError> {
        self.lifecycle("destroy", node, ctid).await
    }
}

fn classify(err: CommandError, ctid: Ctid) -> RuntimeError {
    match err.output() {
        Some(output) if output.contains(NOT_FOUND_MARKER) => RuntimeError::NotFound(ctid),
        _ => RuntimeError::Command(err),
    }
}

/// Extract the status word from `pct status` output ("status: running").
fn parse_status(out: &str) -> String {
    let trimmed = out.trim();
    match trimmed.split_once(':') {
        Some((_, status)) => status.trim().to_string(),
        None => trimmed.to_string(),
    }
}

/// Arguments for `pct create`.
fn create_args(spec: &ServiceSpec, digest: &Digest) -> Vec<String> {
    let mut args = vec![
        "create".to_string(),
        spec.ctid.to_string(),
        spec.image.reference(digest.as_str()),
        "--hostname".to_string(),
        spec.name.to_string(),
    ];

    if spec.resources.cores > 0 {
        args.push("--cores".to_string());
        args.push(spec.resources.cores.to_string());
    }
    if spec.resources.memory_mb > 0 {
        args.push("--memory".to_string());
        args.push(spec.resources.memory_mb.to_string());
    }

    if let Some(net) = &spec.network {
        let mut net0 = format!("name=eth0,bridge={}", net.bridge);
        if let Some(ip) = &net.ip {
            net0.push_str(&format!(",ip={}", ip));
        }
        if let Some(gw) = &net.gw {
            net0.push_str(&format!(",gw={}", gw));
        }
        args.push("--net0".to_string());
        args.push(net0);
    }

    for (i, mount) in spec.mounts.iter().enumerate() {
        args.push(format!("--mp{}", i));
        args.push(mount_point(mount));
    }

    args
}

/// `host,mp=guest[,opts]`; `ro` becomes `ro=1` and `rw` is the default.
fn mount_point(mount: &Mount) -> String {
    let mut value = format!("{},mp={}", mount.host.display(), mount.guest);
    if let Some(options) = &mount.options {
        for opt in options.split(',').map(str::trim).filter(|o| !o.is_empty()) {
            match opt {
                "rw" => {}
                "ro" => value.push_str(",ro=1"),
                other => {
                    value.push(',');
                    value.push_str(other);
                }
            }
        }
    }
    value
}
