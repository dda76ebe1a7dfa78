/// Helper macro to build names under the node config API group.
macro_rules! node_eks {
    () => {
        "node.eks.aws"
    };
    ($s:literal) => {
        concat!(node_eks!(), "/", $s)
    };
}

// Node config identifiers
pub const NODE_CONFIG_API_VERSION: &str = node_eks!("v1alpha1");
pub const NODE_CONFIG_KIND: &str = "NodeConfig";

// Partitions
pub const PARTITION_AWS: &str = "aws";
pub const PARTITION_AWS_CN: &str = "aws-cn";
pub const PARTITION_AWS_US_GOV: &str = "aws-us-gov";
pub const PARTITION_AWS_ISO: &str = "aws-iso";
pub const PARTITION_AWS_ISO_B: &str = "aws-iso-b";
pub const PARTITION_AWS_ISO_E: &str = "aws-iso-e";
pub const PARTITION_AWS_ISO_F: &str = "aws-iso-f";
pub const DEFAULT_DNS_SUFFIX: &str = "amazonaws.com";

// ECR
pub const DEFAULT_ECR_ACCOUNT_ID: &str = "602401143452";
pub const DEFAULT_ECR_REGION: &str = "us-west-2";
pub const PAUSE_IMAGE_REPOSITORY: &str = "eks/pause";
pub const PAUSE_IMAGE_TAG: &str = "3.5";

// Artifact names in the release manifest
pub const ARTIFACT_KUBELET: &str = "kubelet";
pub const ARTIFACT_IAM_AUTHENTICATOR: &str = "aws-iam-authenticator";
pub const ARTIFACT_SIGNING_HELPER: &str = "aws_signing_helper";

// Node paths
pub const KUBELET_KUBECONFIG_PATH: &str = "/var/lib/kubelet/kubeconfig";
pub const CLUSTER_CA_PATH: &str = "/etc/kubernetes/pki/ca.crt";
pub const IAM_AUTHENTICATOR_PATH: &str = "/usr/local/bin/aws-iam-authenticator";
pub const HYBRID_AWS_CONFIG_PATH: &str = "/etc/aws/hybrid/config";
pub const HYBRID_AWS_PROFILE: &str = "hybrid";

// e2e tags
pub const E2E_CLUSTER_TAG_KEY: &str = "Nodeadm-E2E-Tests-Cluster";
pub const E2E_CREATION_TIME_TAG_KEY: &str = "Nodeadm-E2E-Tests-Creation-Time";
