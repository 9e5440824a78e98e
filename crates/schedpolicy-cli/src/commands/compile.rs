use std::path::Path;

use anyhow::{Context, anyhow};
use schedpolicy_builders::{Backend, BuildRequest, HostnameResolver, StaticHosts};
use schedpolicy_core::{AntiAffinityRequest, LabelConfig, ServiceRef};
use tracing::{info, warn};

use super::load_policy;

/// Paths and options of one `compile` invocation.
pub struct CompileArgs<'a> {
    pub policy: &'a str,
    pub service: &'a str,
    pub backend: &'a str,
    pub labels: Option<&'a str>,
    pub hosts: Option<&'a str>,
    pub anti_affinity: Option<&'a str>,
}

pub fn compile(args: &CompileArgs<'_>) -> anyhow::Result<()> {
    let constraints = render(args)?;
    println!("{}", serde_json::to_string_pretty(&constraints)?);
    Ok(())
}

/// Compile the policy and return the constraints as orchestrator JSON.
pub fn render(args: &CompileArgs<'_>) -> anyhow::Result<serde_json::Value> {
    let backend: Backend = args.backend.parse().map_err(|e: String| anyhow!(e))?;
    let policy = load_policy(args.policy)?;
    if let Err(e) = policy.validate() {
        warn!(error = %e, "compiling anyway");
    }

    let labels = match args.labels {
        Some(path) => LabelConfig::from_file(Path::new(path))
            .with_context(|| format!("failed to load labels {path}"))?,
        None => LabelConfig::default(),
    };
    let hosts = args
        .hosts
        .map(|path| {
            std::fs::read_to_string(path)
                .map(|content| StaticHosts::parse(&content))
                .with_context(|| format!("failed to read hosts {path}"))
        })
        .transpose()?;
    let anti_affinity: Vec<AntiAffinityRequest> = match args.anti_affinity {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read anti-affinity {path}"))?;
            serde_json::from_str(&content)
                .with_context(|| format!("failed to parse anti-affinity {path}"))?
        }
        None => Vec::new(),
    };

    if backend != Backend::Kubernetes && (hosts.is_some() || !anti_affinity.is_empty()) {
        warn!(%backend, "hosts and anti-affinity only apply to k8s, ignoring");
    }

    let service = ServiceRef::new(args.service);
    let mut request = BuildRequest::new(&policy, Some(&service)).with_anti_affinity(&anti_affinity);
    if let Some(hosts) = &hosts {
        request = request.with_resolver(hosts as &dyn HostnameResolver);
    }

    let constraints = schedpolicy_builders::compile(backend, &labels, &request);
    info!(%backend, service = args.service, "compiled placement policy");
    Ok(constraints.to_json()?)
}
