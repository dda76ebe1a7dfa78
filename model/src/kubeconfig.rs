use crate::constants::{
    CLUSTER_CA_PATH, HYBRID_AWS_PROFILE, IAM_AUTHENTICATOR_PATH, KUBELET_KUBECONFIG_PATH,
};
use crate::error::{self, Result};
use crate::node_config::{CredentialProvider, NodeConfig};
use serde::{Deserialize, Serialize};
use snafu::{ensure, OptionExt, ResultExt};
use std::path::PathBuf;

/// The control plane details a node needs to join the cluster, usually read from the EKS
/// `DescribeCluster` API.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterInfo {
    pub name: String,
    pub region: String,
    pub endpoint: String,
    /// Base64 encoded certificate authority bundle.
    pub certificate_authority: String,
    pub cluster_dns_ip: String,
}

/// Derive the cluster DNS service IP from the service CIDR. IPv6 clusters use the `a` address of
/// the service prefix; IPv4 (or unknown) clusters use the `.10` address.
pub fn cluster_dns_ip(
    ip_family: Option<&str>,
    service_ipv4_cidr: Option<&str>,
    service_ipv6_cidr: Option<&str>,
) -> Result<String> {
    let ip_family = ip_family.context(error::ClusterDnsIpSnafu {
        what: "cluster network config is missing the IP family",
    })?;
    if ip_family.eq_ignore_ascii_case("ipv6") {
        let service_ipv6_cidr = service_ipv6_cidr.context(error::ClusterDnsIpSnafu {
            what: "IPv6 cluster is missing its service IPv6 CIDR",
        })?;
        let prefix = service_ipv6_cidr.split('/').next().unwrap_or_default();
        return Ok(format!("{}a", prefix));
    }
    let service_ipv4_cidr = service_ipv4_cidr.context(error::ClusterDnsIpSnafu {
        what: "IPv4 cluster is missing its service IPv4 CIDR",
    })?;
    let mut octets: Vec<&str> = service_ipv4_cidr.split('.').collect();
    ensure!(
        octets.len() == 4,
        error::ClusterDnsIpSnafu {
            what: format!(
                "expected 4 components in service IPv4 CIDR '{}' but found {}",
                service_ipv4_cidr,
                octets.len()
            ),
        }
    );
    octets[3] = "10";
    Ok(octets.join("."))
}

/// A minimal kubeconfig with one cluster, one user and one context.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Kubeconfig {
    pub api_version: String,
    pub kind: String,
    pub clusters: Vec<NamedCluster>,
    pub users: Vec<NamedUser>,
    pub contexts: Vec<NamedContext>,
    pub current_context: String,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct NamedCluster {
    pub name: String,
    pub cluster: KubeCluster,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct KubeCluster {
    pub server: String,
    pub certificate_authority: PathBuf,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct NamedUser {
    pub name: String,
    pub user: KubeUser,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct KubeUser {
    pub exec: ExecConfig,
}

/// A client-go exec credential plugin.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecConfig {
    pub api_version: String,
    pub command: String,
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<ExecEnvVar>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ExecEnvVar {
    pub name: String,
    pub value: String,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct NamedContext {
    pub name: String,
    pub context: KubeContext,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct KubeContext {
    pub cluster: String,
    pub user: String,
}

const EXEC_API_VERSION: &str = "client.authentication.k8s.io/v1beta1";
const KUBELET_USER: &str = "kubelet";
const KUBELET_CONTEXT: &str = "kubelet";

impl Kubeconfig {
    /// Render the kubelet kubeconfig for a node described by `node_config`.
    pub fn for_node(cluster: &ClusterInfo, node_config: &NodeConfig) -> Result<Self> {
        let mut env = Vec::new();
        if node_config.credential_provider()? == CredentialProvider::IamRolesAnywhere {
            if let Some(iam_ra) = node_config.iam_roles_anywhere() {
                env.push(ExecEnvVar {
                    name: "AWS_CONFIG_FILE".to_string(),
                    value: iam_ra.aws_config_path().display().to_string(),
                });
                env.push(ExecEnvVar {
                    name: "AWS_PROFILE".to_string(),
                    value: HYBRID_AWS_PROFILE.to_string(),
                });
            }
        }
        Ok(Self {
            api_version: "v1".to_string(),
            kind: "Config".to_string(),
            clusters: vec![NamedCluster {
                name: cluster.name.clone(),
                cluster: KubeCluster {
                    server: cluster.endpoint.clone(),
                    certificate_authority: PathBuf::from(CLUSTER_CA_PATH),
                },
            }],
            users: vec![NamedUser {
                name: KUBELET_USER.to_string(),
                user: KubeUser {
                    exec: ExecConfig {
                        api_version: EXEC_API_VERSION.to_string(),
                        command: IAM_AUTHENTICATOR_PATH.to_string(),
                        args: vec![
                            "token".to_string(),
                            "-i".to_string(),
                            cluster.name.clone(),
                            "--region".to_string(),
                            cluster.region.clone(),
                        ],
                        env,
                    },
                },
            }],
            contexts: vec![NamedContext {
                name: KUBELET_CONTEXT.to_string(),
                context: KubeContext {
                    cluster: cluster.name.clone(),
                    user: KUBELET_USER.to_string(),
                },
            }],
            current_context: KUBELET_CONTEXT.to_string(),
        })
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self).context(error::KubeconfigSerializeSnafu)?)
    }

    pub fn default_path() -> PathBuf {
        PathBuf::from(KUBELET_KUBECONFIG_PATH)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::node_config::{
        ClusterDetails, HybridOptions, IamRolesAnywhere, NodeConfigSpec, Ssm,
    };

    fn cluster() -> ClusterInfo {
        ClusterInfo {
            name: "my-cluster".to_string(),
            region: "us-west-2".to_string(),
            endpoint: "https://ABC.gr7.us-west-2.eks.amazonaws.com".to_string(),
            certificate_authority: "Y2VydA==".to_string(),
            cluster_dns_ip: "10.100.0.10".to_string(),
        }
    }

    fn node_config(hybrid: HybridOptions) -> NodeConfig {
        NodeConfig {
            api_version: "node.eks.aws/v1alpha1".to_string(),
            kind: "NodeConfig".to_string(),
            spec: NodeConfigSpec {
                cluster: ClusterDetails {
                    name: "my-cluster".to_string(),
                    region: "us-west-2".to_string(),
                },
                hybrid: Some(hybrid),
            },
        }
    }

    #[test]
    fn cluster_dns_ip_from_service_ipv4_cidr() {
        assert_eq!(
            cluster_dns_ip(Some("ipv4"), Some("10.100.0.0/16"), None).unwrap(),
            "10.100.0.10"
        );
        // Unknown families fall back to IPv4.
        assert_eq!(
            cluster_dns_ip(Some("dual"), Some("172.20.0.0/16"), None).unwrap(),
            "172.20.0.10"
        );
    }

    #[test]
    fn cluster_dns_ip_from_service_ipv6_cidr() {
        assert_eq!(
            cluster_dns_ip(Some("ipv6"), None, Some("fd30:1c53:5f8a::/108")).unwrap(),
            "fd30:1c53:5f8a::a"
        );
    }

    #[test]
    fn cluster_dns_ip_errors() {
        assert!(cluster_dns_ip(None, Some("10.100.0.0/16"), None).is_err());
        assert!(cluster_dns_ip(Some("ipv4"), None, None).is_err());
        assert!(cluster_dns_ip(Some("ipv4"), Some("10.100/16"), None).is_err());
        assert!(cluster_dns_ip(Some("ipv6"), Some("10.100.0.0/16"), None).is_err());
    }

    #[test]
    fn ssm_kubeconfig() {
        let config = node_config(HybridOptions {
            ssm: Some(Ssm {
                activation_id: "id".to_string(),
                activation_code: "code".to_string(),
            }),
            iam_roles_anywhere: None,
        });
        let kubeconfig = Kubeconfig::for_node(&cluster(), &config).unwrap();
        let yaml = kubeconfig.to_yaml().unwrap();
        assert!(yaml.contains("current-context: kubelet"));
        assert!(yaml.contains("certificate-authority: /etc/kubernetes/pki/ca.crt"));
        assert!(!yaml.contains("AWS_PROFILE"));

        let parsed: Kubeconfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, kubeconfig);
        assert_eq!(
            parsed.users[0].user.exec.args,
            vec!["token", "-i", "my-cluster", "--region", "us-west-2"]
        );
    }

    #[test]
    fn iam_roles_anywhere_kubeconfig() {
        let config = node_config(HybridOptions {
            ssm: None,
            iam_roles_anywhere: Some(IamRolesAnywhere {
                node_name: "node-1".to_string(),
                trust_anchor_arn: "arn:aws:rolesanywhere:us-west-2:1:trust-anchor/a".to_string(),
                profile_arn: "arn:aws:rolesanywhere:us-west-2:1:profile/b".to_string(),
                role_arn: "arn:aws:iam::1:role/c".to_string(),
                aws_config_path: None,
            }),
        });
        let kubeconfig = Kubeconfig::for_node(&cluster(), &config).unwrap();
        let env = &kubeconfig.users[0].user.exec.env;
        assert_eq!(env.len(), 2);
        assert_eq!(env[0].value, "/etc/aws/hybrid/config");
        assert_eq!(env[1].value, "hybrid");
    }
}
