use crate::error::{self, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use snafu::{OptionExt, ResultExt};
use std::collections::BTreeMap;

/// The release manifest published alongside node artifacts. It lists the supported Kubernetes
/// releases, the IAM Roles Anywhere signing helper releases, and per-region configuration.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub supported_eks_releases: Vec<SupportedEksRelease>,
    #[serde(default)]
    pub iam_roles_anywhere_releases: Vec<IamRolesAnywhereRelease>,
    #[serde(default)]
    pub region_config: RegionConfig,
}

/// All patch releases published for one `major.minor` Kubernetes version.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct SupportedEksRelease {
    pub major_minor_version: String,
    pub latest_patch_version: String,
    #[serde(default)]
    pub patch_releases: Vec<PatchRelease>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct PatchRelease {
    pub version: String,
    pub patch_version: String,
    pub release_date: String,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct IamRolesAnywhereRelease {
    pub version: String,
    pub release_date: String,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
}

/// A downloadable file and the location of its checksum.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub name: String,
    pub arch: String,
    pub os: String,
    pub uri: String,
    pub checksum_uri: String,
}

pub type RegionConfig = BTreeMap<String, RegionData>;

/// Per-region overrides carried by the manifest.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct RegionData {
    /// The account that hosts EKS images in this region.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ecr_account_id: Option<String>,

    /// The DNS suffix for service endpoints in this region.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns_suffix: Option<String>,

    /// Which credential providers can be used by hybrid nodes in this region.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cred_providers: Option<CredentialProviderFlags>,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct CredentialProviderFlags {
    #[serde(default)]
    pub ssm: bool,
    #[serde(default, rename = "iam-ra")]
    pub iam_roles_anywhere: bool,
}

impl RegionData {
    /// The manifest's ECR account for the region, ignoring empty values.
    pub fn ecr_account_id(&self) -> Option<&str> {
        self.ecr_account_id
            .as_deref()
            .filter(|account| !account.is_empty())
    }

    pub fn dns_suffix(&self) -> Option<&str> {
        self.dns_suffix.as_deref().filter(|suffix| !suffix.is_empty())
    }
}

impl Manifest {
    pub fn from_yaml_str<S: AsRef<str>>(yaml: S) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml.as_ref()).context(error::ManifestParseSnafu)?)
    }

    /// The manifest's configuration for `region`, if it has any.
    pub fn region_data(&self, region: &str) -> Option<&RegionData> {
        self.region_config.get(region)
    }
}

impl PatchRelease {
    pub fn released_on(&self) -> Result<NaiveDate> {
        parse_release_date(&self.release_date, &self.patch_version)
    }
}

impl IamRolesAnywhereRelease {
    pub fn released_on(&self) -> Result<NaiveDate> {
        parse_release_date(&self.release_date, &self.version)
    }
}

/// Release dates are published either as RFC3339 timestamps or as plain `YYYY-MM-DD` dates.
pub(crate) fn parse_release_date(date: &str, release: &str) -> Result<NaiveDate> {
    DateTime::parse_from_rfc3339(date)
        .map(|timestamp| timestamp.with_timezone(&Utc).date_naive())
        .ok()
        .or_else(|| NaiveDate::parse_from_str(date, "%Y-%m-%d").ok())
        .context(error::ReleaseDateSnafu { date, release })
        .map_err(Into::into)
}
