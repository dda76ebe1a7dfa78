use crate::error::{self, Result};
use crate::manifest::{Artifact, IamRolesAnywhereRelease, Manifest, PatchRelease};
use crate::version::K8sVersion;
use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};
use snafu::{ensure, OptionExt};
use std::env;

/// The operating system and architecture that artifacts are selected for, named the way the
/// release manifest names them.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    pub os: String,
    pub arch: String,
}

impl Platform {
    pub fn new<S1: Into<String>, S2: Into<String>>(os: S1, arch: S2) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// The platform of the running host.
    pub fn current() -> Self {
        let arch = match env::consts::ARCH {
            "x86_64" => "amd64",
            "aarch64" => "arm64",
            rest => rest,
        };
        Self::new(env::consts::OS.to_ascii_lowercase(), arch)
    }
}

/// The resolved set of artifact locations for one Kubernetes version and one IAM Roles Anywhere
/// signing helper version.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub eks: PatchRelease,
    pub iam_roles_anywhere: IamRolesAnywhereRelease,
}

impl Source {
    /// Find the Kubernetes artifact called `name` built for `platform`.
    pub fn eks_artifact(&self, name: &str, platform: &Platform) -> Result<&Artifact> {
        find_artifact(&self.eks.artifacts, name, platform, &self.eks.patch_version)
    }

    /// Find the IAM Roles Anywhere artifact called `name` built for `platform`.
    pub fn iam_roles_anywhere_artifact(&self, name: &str, platform: &Platform) -> Result<&Artifact> {
        find_artifact(
            &self.iam_roles_anywhere.artifacts,
            name,
            platform,
            &self.iam_roles_anywhere.version,
        )
    }
}

fn find_artifact<'a>(
    artifacts: &'a [Artifact],
    name: &str,
    platform: &Platform,
    release: &str,
) -> Result<&'a Artifact> {
    artifacts
        .iter()
        .find(|artifact| {
            artifact.name == name && artifact.os == platform.os && artifact.arch == platform.arch
        })
        .context(error::ArtifactNotFoundSnafu {
            name,
            os: &platform.os,
            arch: &platform.arch,
            release,
        })
        .map_err(Into::into)
}

impl Manifest {
    /// Resolve the artifacts for `version` and the newest IAM Roles Anywhere release.
    pub fn source(&self, version: &K8sVersion) -> Result<Source> {
        Ok(Source {
            eks: self.eks_release(version)?.clone(),
            iam_roles_anywhere: self.latest_iam_roles_anywhere_release()?.clone(),
        })
    }

    /// Select the patch release for `version`.
    ///
    /// A `major.minor` version selects the release's latest patch version; a `major.minor.patch`
    /// version selects that patch. When the manifest lists the selected patch version more than
    /// once, the entry with the latest release date wins.
    pub fn eks_release(&self, version: &K8sVersion) -> Result<&PatchRelease> {
        let major_minor = version.major_minor_without_v();
        let supported = self
            .supported_eks_releases
            .iter()
            .find(|release| release.major_minor_version == major_minor)
            .context(error::UnsupportedKubernetesVersionSnafu {
                version: version.full_version_without_v(),
            })?;
        let patch_version = match version.patch() {
            Some(_) => version.full_version_without_v(),
            None => supported.latest_patch_version.clone(),
        };
        debug!(
            "Selecting patch release '{}' for kubernetes version '{}'",
            patch_version, version
        );

        let candidates = supported
            .patch_releases
            .iter()
            .filter(|release| release.patch_version == patch_version)
            .map(|release| -> Result<_> {
                Ok((release.released_on()?, release))
            })
            .collect::<Result<Vec<_>>>()?;
        latest_by_date(candidates)
            .context(error::PatchReleaseNotFoundSnafu {
                version: patch_version,
            })
            .map_err(Into::into)
    }

    /// The IAM Roles Anywhere release with the highest version. Release dates break ties, and
    /// versions that are not semver rank below all that are.
    pub fn latest_iam_roles_anywhere_release(&self) -> Result<&IamRolesAnywhereRelease> {
        ensure!(
            !self.iam_roles_anywhere_releases.is_empty(),
            error::NoIamRolesAnywhereReleaseSnafu
        );
        let ranked = self
            .iam_roles_anywhere_releases
            .iter()
            .map(|release| -> Result<_> {
                let version = semver::Version::parse(
                    release
                        .version
                        .strip_prefix('v')
                        .unwrap_or(&release.version),
                )
                .ok();
                Ok(((version, release.released_on()?), release))
            })
            .collect::<Result<Vec<_>>>()?;
        ranked
            .into_iter()
            .max_by(|(a, _), (b, _)| a.cmp(b))
            .map(|(_, release)| release)
            .context(error::NoIamRolesAnywhereReleaseSnafu)
            .map_err(Into::into)
    }
}

/// Picks the entry with the latest date. On equal dates the entry listed last wins.
fn latest_by_date<T>(candidates: Vec<(NaiveDate, T)>) -> Option<T> {
    candidates
        .into_iter()
        .max_by_key(|(date, _)| *date)
        .map(|(_, item)| item)
}
