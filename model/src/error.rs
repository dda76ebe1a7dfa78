use snafu::Snafu;

/// The error type for this library. Variants are kept private so that callers match on behavior
/// (`is_err`, `Display`) rather than on the shape of the failure.
#[derive(Debug, Snafu)]
pub struct Error(OpaqueError);
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub(crate) enum OpaqueError {
    #[snafu(display("Artifact '{}' for '{}/{}' is missing from the {} release", name, os, arch, release))]
    ArtifactNotFound {
        name: String,
        os: String,
        arch: String,
        release: String,
    },

    #[snafu(display("Cannot derive the cluster DNS IP: {}", what))]
    ClusterDnsIp { what: String },

    #[snafu(display(
        "Credential provider '{}' is not available in region '{}'",
        provider,
        region
    ))]
    CredentialProviderUnavailable { provider: String, region: String },

    #[snafu(display("Invalid ARN '{}': {}", arn, what))]
    InvalidArn { arn: String, what: String },

    #[snafu(display("Invalid sweeper filter: {}", what))]
    InvalidFilter { what: String },

    #[snafu(display("Invalid node config: {}", what))]
    InvalidNodeConfig { what: String },

    #[snafu(display("Unable to serialize kubeconfig: {}", source))]
    KubeconfigSerialize { source: serde_yaml::Error },

    #[snafu(display("Unable to parse release manifest: {}", source))]
    ManifestParse { source: serde_yaml::Error },

    #[snafu(display("The release manifest does not list any IAM Roles Anywhere releases"))]
    NoIamRolesAnywhereRelease,

    #[snafu(display("Unable to parse node config: {}", source))]
    NodeConfigParse { source: serde_yaml::Error },

    #[snafu(display("No patch release '{}' found in the release manifest", version))]
    PatchReleaseNotFound { version: String },

    #[snafu(display("Invalid release date '{}' on {} release", date, release))]
    ReleaseDate { date: String, release: String },

    #[snafu(display("Kubernetes version '{}' is not supported by the release manifest", version))]
    UnsupportedKubernetesVersion { version: String },
}
