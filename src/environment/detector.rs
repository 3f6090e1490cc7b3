//! CI provider and container runtime checks
//!
//! Checks overlap (a GitHub Actions job also sets `CI=true`; a pod's
//! cgroup often mentions `docker`), so they are ordered specific-first:
//! named providers before the generic `CI` flag, marker files and
//! `KUBERNETES_SERVICE_HOST` before the cgroup scan.

use crate::config::{HostPaths, ProbeConfig};
use crate::probe::{FactValue, FnSource, ResolutionResult, TieredResolver, UnavailableReason, ValueSource};
use crate::profile::{ids, HostProfile};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Snapshot of environment variables
///
/// Cheap to clone; captured once so checks never read ambient state.
#[derive(Debug, Clone, Default)]
pub struct EnvVars {
    vars: Arc<HashMap<String, String>>,
}

impl EnvVars {
    /// Capture the current process environment (non-UTF-8 entries are skipped)
    pub fn from_process() -> Self {
        let vars = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        Self { vars: Arc::new(vars) }
    }

    /// Build a snapshot from explicit pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars = pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        Self { vars: Arc::new(vars) }
    }

    /// Value of a variable
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Whether a variable is set to a true-like value (`true`, `1`, `yes`)
    pub fn is_truthy(&self, key: &str) -> bool {
        self.get(key)
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(false)
    }
}

/// Known CI providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CiProvider {
    /// GitHub Actions
    GithubActions,
    /// GitLab CI
    GitlabCi,
    /// Buildkite
    Buildkite,
    /// CircleCI
    CircleCi,
    /// Jenkins
    Jenkins,
    /// Azure Pipelines
    AzurePipelines,
    /// Some CI that only sets `CI=true`
    Generic,
}

/// How a CI variable is tested
#[derive(Debug, Clone, Copy)]
enum VarCheck {
    Truthy,
    Present,
}

/// CI checks in precedence order
const CI_CHECKS: &[(CiProvider, &str, VarCheck)] = &[
    (CiProvider::GithubActions, "GITHUB_ACTIONS", VarCheck::Truthy),
    (CiProvider::GitlabCi, "GITLAB_CI", VarCheck::Present),
    (CiProvider::Buildkite, "BUILDKITE", VarCheck::Truthy),
    (CiProvider::CircleCi, "CIRCLECI", VarCheck::Truthy),
    (CiProvider::Jenkins, "JENKINS_URL", VarCheck::Present),
    (CiProvider::AzurePipelines, "TF_BUILD", VarCheck::Truthy),
    (CiProvider::Generic, "CI", VarCheck::Truthy),
];

impl CiProvider {
    /// Stable identifier used as the fact value
    pub fn as_str(&self) -> &'static str {
        match self {
            CiProvider::GithubActions => "github-actions",
            CiProvider::GitlabCi => "gitlab-ci",
            CiProvider::Buildkite => "buildkite",
            CiProvider::CircleCi => "circleci",
            CiProvider::Jenkins => "jenkins",
            CiProvider::AzurePipelines => "azure-pipelines",
            CiProvider::Generic => "generic-ci",
        }
    }

    /// Parse a stable identifier
    pub fn from_id(id: &str) -> Option<Self> {
        CI_CHECKS.iter().map(|(p, _, _)| *p).find(|p| p.as_str() == id)
    }

    /// Human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            CiProvider::GithubActions => "GitHub Actions",
            CiProvider::GitlabCi => "GitLab CI",
            CiProvider::Buildkite => "Buildkite",
            CiProvider::CircleCi => "CircleCI",
            CiProvider::Jenkins => "Jenkins",
            CiProvider::AzurePipelines => "Azure Pipelines",
            CiProvider::Generic => "CI (unidentified)",
        }
    }
}

/// Known container runtimes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerRuntime {
    /// Docker
    Docker,
    /// Podman
    Podman,
    /// Kubernetes pod
    Kubernetes,
    /// Plain containerd
    Containerd,
    /// LXC
    Lxc,
}

impl ContainerRuntime {
    const ALL: [ContainerRuntime; 5] = [
        ContainerRuntime::Docker,
        ContainerRuntime::Podman,
        ContainerRuntime::Kubernetes,
        ContainerRuntime::Containerd,
        ContainerRuntime::Lxc,
    ];

    /// Stable identifier used as the fact value
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerRuntime::Docker => "docker",
            ContainerRuntime::Podman => "podman",
            ContainerRuntime::Kubernetes => "kubernetes",
            ContainerRuntime::Containerd => "containerd",
            ContainerRuntime::Lxc => "lxc",
        }
    }

    /// Parse a stable identifier
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_str() == id)
    }

    /// Runtime named in a `/proc/1/cgroup` file
    fn from_cgroup(content: &str) -> Option<Self> {
        // kubepods first: pod cgroups frequently also mention docker
        [
            ("kubepods", ContainerRuntime::Kubernetes),
            ("libpod", ContainerRuntime::Podman),
            ("docker", ContainerRuntime::Docker),
            ("containerd", ContainerRuntime::Containerd),
            ("lxc", ContainerRuntime::Lxc),
        ]
        .into_iter()
        .find(|(marker, _)| content.contains(marker))
        .map(|(_, runtime)| runtime)
    }
}

/// Where a run happens
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EnvironmentDescriptor {
    /// CI provider, if any
    pub ci_provider: Option<CiProvider>,
    /// Check that identified the CI provider
    pub ci_source: Option<String>,
    /// Container runtime, if any
    pub container: Option<ContainerRuntime>,
    /// Check that identified the container runtime
    pub container_source: Option<String>,
}

impl EnvironmentDescriptor {
    fn from_results(ci: Option<&ResolutionResult>, container: Option<&ResolutionResult>) -> Self {
        let ci_provider = ci
            .and_then(|r| r.value())
            .and_then(FactValue::as_text)
            .and_then(CiProvider::from_id);
        let container_runtime = container
            .and_then(|r| r.value())
            .and_then(FactValue::as_text)
            .and_then(ContainerRuntime::from_id);

        Self {
            ci_provider,
            ci_source: ci_provider.and(ci.and_then(|r| r.source_used()).map(str::to_string)),
            container: container_runtime,
            container_source: container_runtime.and(container.and_then(|r| r.source_used()).map(str::to_string)),
        }
    }

    /// Read the environment facts out of a resolved profile
    pub fn from_profile(profile: &HostProfile) -> Self {
        Self::from_results(profile.get(ids::ENV_CI_PROVIDER), profile.get(ids::ENV_CONTAINER))
    }
}

/// Builds the ordered environment checks
#[derive(Debug, Clone)]
pub struct EnvironmentDetector {
    env: EnvVars,
    paths: HostPaths,
}

impl EnvironmentDetector {
    /// Create a detector over an environment snapshot and filesystem root
    pub fn new(env: EnvVars, paths: HostPaths) -> Self {
        Self { env, paths }
    }

    /// Create a detector from runtime configuration
    pub fn from_config(config: &ProbeConfig) -> Self {
        Self::new(config.env.clone(), config.paths.clone())
    }

    /// Ordered CI provider checks
    pub fn ci_sources(&self) -> Vec<Box<dyn ValueSource>> {
        CI_CHECKS
            .iter()
            .map(|&(provider, var, check)| {
                let env = self.env.clone();
                let source = FnSource::optional(format!("env:{}", var), move || {
                    let hit = match check {
                        VarCheck::Truthy => env.is_truthy(var),
                        VarCheck::Present => env.get(var).is_some_and(|v| !v.is_empty()),
                    };
                    hit.then(|| FactValue::from(provider.as_str()))
                });
                Box::new(source) as Box<dyn ValueSource>
            })
            .collect()
    }

    /// Ordered container runtime checks
    pub fn container_sources(&self) -> Vec<Box<dyn ValueSource>> {
        let mut sources: Vec<Box<dyn ValueSource>> = vec![
            Box::new(marker_file(self.paths.path(".dockerenv"), ContainerRuntime::Docker)),
            Box::new(marker_file(self.paths.path("run/.containerenv"), ContainerRuntime::Podman)),
        ];

        let env = self.env.clone();
        sources.push(Box::new(FnSource::optional("env:KUBERNETES_SERVICE_HOST", move || {
            env.get("KUBERNETES_SERVICE_HOST")
                .filter(|v| !v.is_empty())
                .map(|_| FactValue::from(ContainerRuntime::Kubernetes.as_str()))
        })));

        let cgroup = self.paths.path("proc/1/cgroup");
        sources.push(Box::new(FnSource::new(cgroup.display().to_string(), move || {
            let content = std::fs::read_to_string(&cgroup).map_err(|e| UnavailableReason::from_io(&e))?;
            ContainerRuntime::from_cgroup(&content)
                .map(|runtime| FactValue::from(runtime.as_str()))
                .ok_or(UnavailableReason::NotSupported)
        })));

        sources
    }

    /// Resolve the environment directly, outside of a profile build
    pub fn detect(&self) -> EnvironmentDescriptor {
        let resolver = TieredResolver::new();
        let ci = resolver.resolve(&crate::profile::env_ci_fact(), &self.ci_sources());
        let container = resolver.resolve(&crate::profile::env_container_fact(), &self.container_sources());
        EnvironmentDescriptor::from_results(Some(&ci), Some(&container))
    }
}

fn marker_file(path: PathBuf, runtime: ContainerRuntime) -> FnSource {
    FnSource::new(path.display().to_string(), move || match std::fs::metadata(&path) {
        Ok(_) => Ok(FactValue::from(runtime.as_str())),
        Err(e) => Err(UnavailableReason::from_io(&e)),
    })
}
