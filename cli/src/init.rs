use crate::{print_json, ManifestSource};
use agent_utils::aws::aws_config;
use agent_utils::{base64_decode_write_file, write_file};
use anyhow::{Context, Result};
use clap::Parser;
use hybrid_model::constants::CLUSTER_CA_PATH;
use hybrid_model::{
    cluster_dns_ip, ClusterInfo, CredentialProvider, EcrRegistry, Kubeconfig, NodeConfig,
};
use log::info;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Join this machine to the cluster described by a node config.
#[derive(Debug, Parser)]
pub(crate) struct Init {
    /// Path to the NodeConfig YAML document.
    #[clap(short = 'c', long = "config-source", parse(from_os_str))]
    config_source: PathBuf,
}

/// What `init` resolved and wrote.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Bootstrap {
    cluster: ClusterInfo,
    credential_provider: CredentialProvider,
    #[serde(skip_serializing_if = "Option::is_none")]
    roles_anywhere_endpoint: Option<String>,
    registry: String,
    pause_image: String,
    kubeconfig: PathBuf,
}

impl Init {
    pub(crate) async fn run(&self, manifest: &ManifestSource) -> Result<()> {
        let node_config = load_node_config(&self.config_source).await?;
        let region = node_config.spec.cluster.region.clone();
        let credential_provider = node_config
            .credential_provider()
            .context("Unable to select a credential provider")?;
        info!("Using credential provider '{}'", credential_provider);

        let manifest = manifest.load().await?;
        let region_data = manifest.region_data(&region);
        credential_provider
            .ensure_available(&region, region_data)
            .context("The credential provider cannot be used")?;
        let registry = EcrRegistry::for_region(&region, region_data);

        let roles_anywhere_endpoint = match node_config.iam_roles_anywhere() {
            Some(iam_ra) => Some(
                iam_ra
                    .endpoint(&region)
                    .context("Unable to resolve the IAM Roles Anywhere endpoint")?,
            ),
            None => None,
        };

        let cluster = describe_cluster(&node_config).await?;
        info!(
            "Cluster '{}' is served at '{}'",
            cluster.name, cluster.endpoint
        );

        base64_decode_write_file(&cluster.certificate_authority, Path::new(CLUSTER_CA_PATH))
            .context("Unable to write the cluster certificate authority")?;
        let kubeconfig_path = Kubeconfig::default_path();
        let kubeconfig = Kubeconfig::for_node(&cluster, &node_config)
            .and_then(|kubeconfig| kubeconfig.to_yaml())
            .context("Unable to render the kubeconfig")?;
        write_file(&kubeconfig_path, kubeconfig).context("Unable to write the kubeconfig")?;
        info!("Wrote kubeconfig to '{}'", kubeconfig_path.display());

        print_json(&Bootstrap {
            cluster,
            credential_provider,
            roles_anywhere_endpoint,
            registry: registry.host(),
            pause_image: registry.pause_image(),
            kubeconfig: kubeconfig_path,
        })
    }
}

async fn load_node_config(path: &Path) -> Result<NodeConfig> {
    let yaml = tokio::fs::read_to_string(path)
        .await
        .context(format!("Unable to read node config '{}'", path.display()))?;
    let node_config = NodeConfig::from_yaml_str(yaml)
        .context(format!("Unable to parse node config '{}'", path.display()))?;
    node_config.validate().context("Invalid node config")?;
    Ok(node_config)
}

async fn describe_cluster(node_config: &NodeConfig) -> Result<ClusterInfo> {
    let name = &node_config.spec.cluster.name;
    let region = &node_config.spec.cluster.region;
    let config = aws_config(&Some(region.clone()), &None, &None)
        .await
        .context("Unable to create the aws config")?;
    let output = aws_sdk_eks::Client::new(&config)
        .describe_cluster()
        .name(name)
        .send()
        .await
        .context(format!("Unable to describe cluster '{}'", name))?;
    let cluster = output
        .cluster()
        .context(format!("Cluster '{}' was missing from the response", name))?;

    let endpoint = cluster
        .endpoint()
        .context(format!("Cluster '{}' has no endpoint yet", name))?;
    let certificate_authority = cluster
        .certificate_authority()
        .and_then(|ca| ca.data())
        .context(format!("Cluster '{}' has no certificate authority", name))?;
    let network = cluster.kubernetes_network_config();
    let cluster_dns_ip = cluster_dns_ip(
        network
            .and_then(|network| network.ip_family())
            .map(|family| family.as_str()),
        network.and_then(|network| network.service_ipv4_cidr()),
        network.and_then(|network| network.service_ipv6_cidr()),
    )
    .context(format!("Unable to find the DNS IP of cluster '{}'", name))?;

    Ok(ClusterInfo {
        name: name.clone(),
        region: region.clone(),
        endpoint: endpoint.to_string(),
        certificate_authority: certificate_authority.to_string(),
        cluster_dns_ip,
    })
}
