use crate::{print_json, ManifestSource};
use anyhow::Result;
use clap::Parser;
use hybrid_model::EcrRegistry;
use log::warn;
use serde::Serialize;

/// Print the ECR registry that serves EKS images in a region.
#[derive(Debug, Parser)]
pub(crate) struct Registry {
    /// The region nodes run in.
    #[clap(long)]
    region: String,
    /// Resolve from the built-in tables only, without loading the release manifest.
    #[clap(long)]
    offline: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RegistryOutput {
    #[serde(flatten)]
    registry: EcrRegistry,
    host: String,
    pause_image: String,
}

impl Registry {
    pub(crate) async fn run(&self, manifest: &ManifestSource) -> Result<()> {
        let manifest = if self.offline {
            None
        } else {
            match manifest.load().await {
                Ok(manifest) => Some(manifest),
                Err(e) => {
                    warn!("Falling back to built-in registries: {:#}", e);
                    None
                }
            }
        };
        let region_data = manifest
            .as_ref()
            .and_then(|manifest| manifest.region_data(&self.region));
        let registry = EcrRegistry::for_region(&self.region, region_data);
        print_json(&RegistryOutput {
            host: registry.host(),
            pause_image: registry.pause_image(),
            registry,
        })
    }
}
