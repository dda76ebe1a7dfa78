use crate::{print_json, ManifestSource};
use anyhow::{Context, Result};
use clap::Parser;
use hybrid_model::constants::{ARTIFACT_SIGNING_HELPER, ARTIFACT_KUBELET};
use hybrid_model::{Artifact, K8sVersion, Platform};
use serde::Serialize;

/// Print the artifact sources for a Kubernetes version.
#[derive(Debug, Parser)]
pub(crate) struct Source {
    /// A `major.minor` version selects the latest patch, `major.minor.patch` selects that patch.
    #[clap(long = "kubernetes-version")]
    kubernetes_version: K8sVersion,
    /// Also resolve the kubelet and signing helper for this OS. Defaults to the running host.
    #[clap(long)]
    os: Option<String>,
    /// Also resolve the kubelet and signing helper for this architecture (`amd64`, `arm64`).
    #[clap(long)]
    arch: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SourceOutput<'a> {
    #[serde(flatten)]
    source: &'a hybrid_model::Source,
    #[serde(skip_serializing_if = "Option::is_none")]
    platform: Option<PlatformArtifacts<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlatformArtifacts<'a> {
    os: &'a str,
    arch: &'a str,
    kubelet: &'a Artifact,
    signing_helper: &'a Artifact,
}

impl Source {
    pub(crate) async fn run(&self, manifest: &ManifestSource) -> Result<()> {
        let manifest = manifest.load().await?;
        let source = manifest.source(&self.kubernetes_version).context(format!(
            "Unable to find sources for Kubernetes '{}'",
            self.kubernetes_version
        ))?;

        if self.os.is_none() && self.arch.is_none() {
            return print_json(&SourceOutput {
                source: &source,
                platform: None,
            });
        }

        let current = Platform::current();
        let platform = Platform::new(
            self.os.clone().unwrap_or(current.os),
            self.arch.clone().unwrap_or(current.arch),
        );
        let kubelet = source
            .eks_artifact(ARTIFACT_KUBELET, &platform)
            .context("Unable to find the kubelet")?;
        let signing_helper = source
            .iam_roles_anywhere_artifact(ARTIFACT_SIGNING_HELPER, &platform)
            .context("Unable to find the IAM Roles Anywhere signing helper")?;
        print_json(&SourceOutput {
            source: &source,
            platform: Some(PlatformArtifacts {
                os: &platform.os,
                arch: &platform.arch,
                kubelet,
                signing_helper,
            }),
        })
    }
}
