use crate::constants::{HYBRID_AWS_CONFIG_PATH, NODE_CONFIG_API_VERSION, NODE_CONFIG_KIND};
use crate::error::{self, Result};
use crate::manifest::RegionData;
use crate::partition::{parse_partition_from_arn, parse_region_from_arn, partition_dns_suffix};
use serde::{Deserialize, Serialize};
use serde_plain::{derive_display_from_serialize, derive_fromstr_from_deserialize};
use snafu::{ensure, ResultExt};
use std::path::PathBuf;

/// The node configuration document handed to `nodeadm`.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeConfig {
    pub api_version: String,
    pub kind: String,
    pub spec: NodeConfigSpec,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeConfigSpec {
    pub cluster: ClusterDetails,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hybrid: Option<HybridOptions>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterDetails {
    pub name: String,
    pub region: String,
}

/// How a hybrid node obtains AWS credentials. Exactly one of the two must be set.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HybridOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssm: Option<Ssm>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iam_roles_anywhere: Option<IamRolesAnywhere>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ssm {
    pub activation_id: String,
    pub activation_code: String,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IamRolesAnywhere {
    pub node_name: String,
    pub trust_anchor_arn: String,
    pub profile_arn: String,
    pub role_arn: String,
    /// Where the AWS config file with the signing helper's credential process is written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_config_path: Option<PathBuf>,
}

/// The mechanism a hybrid node uses to get credentials.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum CredentialProvider {
    #[serde(rename = "ssm")]
    Ssm,
    #[serde(rename = "iam-ra")]
    IamRolesAnywhere,
}

derive_display_from_serialize!(CredentialProvider);
derive_fromstr_from_deserialize!(CredentialProvider);

impl CredentialProvider {
    /// Fails if the manifest's configuration for `region` disables this provider. Regions that the
    /// manifest does not describe accept every provider.
    pub fn ensure_available(&self, region: &str, region_data: Option<&RegionData>) -> Result<()> {
        let flags = match region_data.and_then(|data| data.cred_providers) {
            Some(flags) => flags,
            None => return Ok(()),
        };
        let available = match self {
            CredentialProvider::Ssm => flags.ssm,
            CredentialProvider::IamRolesAnywhere => flags.iam_roles_anywhere,
        };
        ensure!(
            available,
            error::CredentialProviderUnavailableSnafu {
                provider: self.to_string(),
                region,
            }
        );
        Ok(())
    }
}

impl NodeConfig {
    pub fn from_yaml_str<S: AsRef<str>>(yaml: S) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml.as_ref()).context(error::NodeConfigParseSnafu)?)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.api_version == NODE_CONFIG_API_VERSION,
            error::InvalidNodeConfigSnafu {
                what: format!(
                    "apiVersion must be '{}', got '{}'",
                    NODE_CONFIG_API_VERSION, self.api_version
                ),
            }
        );
        ensure!(
            self.kind == NODE_CONFIG_KIND,
            error::InvalidNodeConfigSnafu {
                what: format!("kind must be '{}', got '{}'", NODE_CONFIG_KIND, self.kind),
            }
        );
        let cluster = &self.spec.cluster;
        ensure!(
            !cluster.name.is_empty(),
            error::InvalidNodeConfigSnafu {
                what: "cluster name is required",
            }
        );
        ensure!(
            !cluster.region.is_empty(),
            error::InvalidNodeConfigSnafu {
                what: "cluster region is required",
            }
        );
        match self.credential_provider()? {
            CredentialProvider::Ssm => self.hybrid_ssm()?.validate(),
            CredentialProvider::IamRolesAnywhere => self.hybrid_iam_roles_anywhere()?.validate(),
        }
    }

    /// The credential provider selected by the hybrid options.
    pub fn credential_provider(&self) -> Result<CredentialProvider> {
        let hybrid = self.spec.hybrid.as_ref();
        let ssm = hybrid.map(|h| h.ssm.is_some()).unwrap_or_default();
        let iam_ra = hybrid
            .map(|h| h.iam_roles_anywhere.is_some())
            .unwrap_or_default();
        match (ssm, iam_ra) {
            (true, false) => Ok(CredentialProvider::Ssm),
            (false, true) => Ok(CredentialProvider::IamRolesAnywhere),
            (true, true) => error::InvalidNodeConfigSnafu {
                what: "only one of hybrid.ssm and hybrid.iamRolesAnywhere can be set",
            }
            .fail()
            .map_err(Into::into),
            (false, false) => error::InvalidNodeConfigSnafu {
                what: "one of hybrid.ssm or hybrid.iamRolesAnywhere is required",
            }
            .fail()
            .map_err(Into::into),
        }
    }

    fn hybrid_ssm(&self) -> Result<&Ssm> {
        self.spec
            .hybrid
            .as_ref()
            .and_then(|h| h.ssm.as_ref())
            .ok_or_else(|| missing("hybrid.ssm"))
    }

    fn hybrid_iam_roles_anywhere(&self) -> Result<&IamRolesAnywhere> {
        self.spec
            .hybrid
            .as_ref()
            .and_then(|h| h.iam_roles_anywhere.as_ref())
            .ok_or_else(|| missing("hybrid.iamRolesAnywhere"))
    }

    /// The Roles Anywhere options, when that provider is selected.
    pub fn iam_roles_anywhere(&self) -> Option<&IamRolesAnywhere> {
        self.spec
            .hybrid
            .as_ref()
            .and_then(|h| h.iam_roles_anywhere.as_ref())
    }
}

fn missing(what: &str) -> error::Error {
    error::OpaqueError::InvalidNodeConfig {
        what: format!("{} is required", what),
    }
    .into()
}

impl Ssm {
    fn validate(&self) -> Result<()> {
        ensure!(
            !self.activation_id.is_empty() && !self.activation_code.is_empty(),
            error::InvalidNodeConfigSnafu {
                what: "hybrid.ssm needs both activationId and activationCode",
            }
        );
        Ok(())
    }
}

impl IamRolesAnywhere {
    fn validate(&self) -> Result<()> {
        ensure!(
            !self.node_name.is_empty(),
            error::InvalidNodeConfigSnafu {
                what: "hybrid.iamRolesAnywhere.nodeName is required",
            }
        );
        for arn in [&self.trust_anchor_arn, &self.profile_arn, &self.role_arn] {
            parse_partition_from_arn(arn)?;
        }
        Ok(())
    }

    /// The Roles Anywhere endpoint for the trust anchor, e.g.
    /// `rolesanywhere.us-west-2.amazonaws.com`. The region falls back to `default_region` when the
    /// trust anchor ARN has none.
    pub fn endpoint(&self, default_region: &str) -> Result<String> {
        let partition = parse_partition_from_arn(&self.trust_anchor_arn)?;
        let region = parse_region_from_arn(&self.trust_anchor_arn)
            .unwrap_or_else(|| default_region.to_string());
        Ok(format!(
            "rolesanywhere.{}.{}",
            region,
            partition_dns_suffix(&partition)
        ))
    }

    pub fn aws_config_path(&self) -> PathBuf {
        self.aws_config_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(HYBRID_AWS_CONFIG_PATH))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::manifest::CredentialProviderFlags;

    const SSM_CONFIG: &str = r#"
apiVersion: node.eks.aws/v1alpha1
kind: NodeConfig
spec:
  cluster:
    name: my-cluster
    region: us-west-2
  hybrid:
    ssm:
      activationId: a1b2c3
      activationCode: secret
"#;

    const IAM_RA_CONFIG: &str = r#"
apiVersion: node.eks.aws/v1alpha1
kind: NodeConfig
spec:
  cluster:
    name: my-cluster
    region: cn-north-1
  hybrid:
    iamRolesAnywhere:
      nodeName: node-1
      trustAnchorArn: arn:aws-cn:rolesanywhere:cn-north-1:123456789012:trust-anchor/abc
      profileArn: arn:aws-cn:rolesanywhere:cn-north-1:123456789012:profile/def
      roleArn: arn:aws-cn:iam::123456789012:role/hybrid-node
"#;

    #[test]
    fn ssm_config() {
        let config = NodeConfig::from_yaml_str(SSM_CONFIG).unwrap();
        config.validate().unwrap();
        assert_eq!(config.credential_provider().unwrap(), CredentialProvider::Ssm);
        assert!(config.iam_roles_anywhere().is_none());
    }

    #[test]
    fn iam_roles_anywhere_config() {
        let config = NodeConfig::from_yaml_str(IAM_RA_CONFIG).unwrap();
        config.validate().unwrap();
        assert_eq!(
            config.credential_provider().unwrap(),
            CredentialProvider::IamRolesAnywhere
        );
        let iam_ra = config.iam_roles_anywhere().unwrap();
        assert_eq!(
            iam_ra.endpoint("us-west-2").unwrap(),
            "rolesanywhere.cn-north-1.amazonaws.com.cn"
        );
        assert_eq!(
            iam_ra.aws_config_path(),
            PathBuf::from("/etc/aws/hybrid/config")
        );
    }

    #[test]
    fn invalid_configs() {
        let mut config = NodeConfig::from_yaml_str(SSM_CONFIG).unwrap();
        config.spec.cluster.region = String::new();
        assert!(config.validate().is_err());

        let mut config = NodeConfig::from_yaml_str(SSM_CONFIG).unwrap();
        config.kind = "KubeletConfig".to_string();
        assert!(config.validate().is_err());

        let mut config = NodeConfig::from_yaml_str(SSM_CONFIG).unwrap();
        config.spec.hybrid = None;
        assert!(config.credential_provider().is_err());

        let mut config = NodeConfig::from_yaml_str(SSM_CONFIG).unwrap();
        let iam_ra = NodeConfig::from_yaml_str(IAM_RA_CONFIG).unwrap();
        config
            .spec
            .hybrid
            .as_mut()
            .unwrap()
            .iam_roles_anywhere = iam_ra.iam_roles_anywhere().cloned();
        assert!(config.credential_provider().is_err());

        let mut config = NodeConfig::from_yaml_str(IAM_RA_CONFIG).unwrap();
        config
            .spec
            .hybrid
            .as_mut()
            .unwrap()
            .iam_roles_anywhere
            .as_mut()
            .unwrap()
            .role_arn = "hybrid-node".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn provider_availability() {
        let data = RegionData {
            cred_providers: Some(CredentialProviderFlags {
                ssm: true,
                iam_roles_anywhere: false,
            }),
            ..RegionData::default()
        };
        assert!(CredentialProvider::Ssm
            .ensure_available("cn-north-1", Some(&data))
            .is_ok());
        assert!(CredentialProvider::IamRolesAnywhere
            .ensure_available("cn-north-1", Some(&data))
            .is_err());
        assert!(CredentialProvider::IamRolesAnywhere
            .ensure_available("us-west-2", Some(&RegionData::default()))
            .is_ok());
        assert!(CredentialProvider::IamRolesAnywhere
            .ensure_available("us-west-2", None)
            .is_ok());
    }

    #[test]
    fn provider_names() {
        assert_eq!(CredentialProvider::IamRolesAnywhere.to_string(), "iam-ra");
        assert_eq!(
            "ssm".parse::<CredentialProvider>().unwrap(),
            CredentialProvider::Ssm
        );
    }
}
