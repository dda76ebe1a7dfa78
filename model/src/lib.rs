/*!

This library provides the value types and decision logic used to bootstrap hybrid nodes: AWS
partition and ECR registry resolution, the release manifest and artifact selection, the node
config and its credential provider, kubeconfig rendering, and the e2e sweeper's resource filter.

Nothing in here talks to the network; see `agent-utils` for that.

!*/

#![deny(
    clippy::expect_used,
    clippy::get_unwrap,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::panicking_unwrap,
    clippy::unwrap_in_result,
    clippy::unwrap_used
)]

pub use ecr::{registry_coordinates, EcrRegistry};
pub use error::{Error, Result};
pub use filter::{FilterInput, ResourceWithTags};
pub use kubeconfig::{cluster_dns_ip, ClusterInfo, Kubeconfig};
pub use manifest::{
    Artifact, CredentialProviderFlags, IamRolesAnywhereRelease, Manifest, PatchRelease,
    RegionConfig, RegionData, SupportedEksRelease,
};
pub use node_config::{
    ClusterDetails, CredentialProvider, HybridOptions, IamRolesAnywhere, NodeConfig,
    NodeConfigSpec, Ssm,
};
pub use partition::{
    parse_partition_from_arn, parse_region_from_arn, partition_dns_suffix, partition_for_region,
};
pub use source::{Platform, Source};
pub use version::K8sVersion;

pub mod constants;
mod ecr;
mod error;
mod filter;
mod kubeconfig;
mod manifest;
mod node_config;
mod partition;
mod source;
mod version;
