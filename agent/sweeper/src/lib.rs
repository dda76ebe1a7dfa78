/*!

`hybrid-sweeper` deletes the cloud resources that e2e test runs leave behind. Resources are
recognized by the `Nodeadm-E2E-Tests-Cluster` tag and selected by a [`FilterInput`]: either
everything belonging to one cluster, or everything of any cluster older than an age threshold.

Steps run in dependency order (stacks, instances, SSM activations, IAM roles, buckets, VPCs).
A failing step is logged and the remaining steps still run.

!*/

mod cfn;
mod ec2;
mod error;
mod iam;
mod s3;
mod ssm;
mod vpc;

pub use error::{IntoSweepError, SweepError, SweepResult};

use agent_utils::impl_display_as_json;
use chrono::{DateTime, TimeZone, Utc};
use hybrid_model::{FilterInput, ResourceWithTags};
use log::{error, info};
use serde::Serialize;
use std::collections::BTreeMap;
use std::future::Future;

/// One kind of resource the sweeper removes, in the order they are removed.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SweepStep {
    CloudformationStacks,
    Ec2Instances,
    SsmActivations,
    IamRoles,
    S3Buckets,
    Vpcs,
}

serde_plain::derive_display_from_serialize!(SweepStep);

impl SweepStep {
    pub const ALL: [SweepStep; 6] = [
        SweepStep::CloudformationStacks,
        SweepStep::Ec2Instances,
        SweepStep::SsmActivations,
        SweepStep::IamRoles,
        SweepStep::S3Buckets,
        SweepStep::Vpcs,
    ];
}

/// What a sweep removed (or, for a dry run, would have removed) and which steps failed.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub dry_run: bool,
    pub deleted: BTreeMap<SweepStep, Vec<String>>,
    pub failed: BTreeMap<SweepStep, String>,
}

impl_display_as_json!(SweepReport);

pub struct Sweeper {
    filter: FilterInput,
    region: String,
    cfn_client: aws_sdk_cloudformation::Client,
    ec2_client: aws_sdk_ec2::Client,
    iam_client: aws_sdk_iam::Client,
    s3_client: aws_sdk_s3::Client,
    ssm_client: aws_sdk_ssm::Client,
}

impl Sweeper {
    pub fn new(config: &aws_types::SdkConfig, filter: FilterInput) -> SweepResult<Self> {
        filter.validate().context("Invalid sweep filter")?;
        let region = config
            .region()
            .map(|region| region.to_string())
            .context("The aws config does not specify a region")?;
        Ok(Self {
            filter,
            region,
            cfn_client: aws_sdk_cloudformation::Client::new(config),
            ec2_client: aws_sdk_ec2::Client::new(config),
            iam_client: aws_sdk_iam::Client::new(config),
            s3_client: aws_sdk_s3::Client::new(config),
            ssm_client: aws_sdk_ssm::Client::new(config),
        })
    }

    pub fn filter(&self) -> &FilterInput {
        &self.filter
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Run every step in order. The report is returned only if all steps succeeded.
    pub async fn run(&self) -> SweepResult<SweepReport> {
        let now = Utc::now();
        self.run_steps(move |step| self.sweep(step, now)).await
    }

    async fn run_steps<F, Fut>(&self, sweep: F) -> SweepResult<SweepReport>
    where
        F: Fn(SweepStep) -> Fut,
        Fut: Future<Output = SweepResult<Vec<String>>>,
    {
        let mut report = SweepReport {
            dry_run: self.filter.dry_run,
            ..SweepReport::default()
        };
        for step in SweepStep::ALL {
            info!("Sweeping {} in '{}'", step, self.region);
            match sweep(step).await {
                Ok(ids) => {
                    report.deleted.insert(step, ids);
                }
                Err(e) => {
                    error!("Failed to sweep {}: {}", step, e);
                    report.failed.insert(step, e.to_string());
                }
            }
        }
        info!("Sweep finished:\n{}", report);

        if !report.failed.is_empty() {
            let failed: Vec<String> = report.failed.keys().map(ToString::to_string).collect();
            return Err(SweepError::new_with_context(format!(
                "Failed to sweep {}",
                failed.join(", ")
            )));
        }
        Ok(report)
    }

    async fn sweep(&self, step: SweepStep, now: DateTime<Utc>) -> SweepResult<Vec<String>> {
        match step {
            SweepStep::CloudformationStacks => cfn::sweep(self, now).await,
            SweepStep::Ec2Instances => ec2::sweep(self, now).await,
            SweepStep::SsmActivations => ssm::sweep(self, now).await,
            SweepStep::IamRoles => iam::sweep(self, now).await,
            SweepStep::S3Buckets => s3::sweep(self, now).await,
            SweepStep::Vpcs => vpc::sweep(self, now).await,
        }
    }

    /// Whether `resource` should be removed.
    pub(crate) fn select(&self, kind: &str, resource: &ResourceWithTags, now: DateTime<Utc>) -> bool {
        let selected = self.filter.should_delete(resource, now);
        if selected {
            info!(
                "Found {} '{}' of cluster '{}'",
                kind,
                resource.id,
                resource.cluster_name().unwrap_or_default()
            );
        }
        selected
    }

    /// Delete each of `ids`, continuing past failures. Dry runs only log the ids.
    pub(crate) async fn delete_each<F, Fut>(
        &self,
        kind: &str,
        ids: Vec<String>,
        delete: F,
    ) -> SweepResult<Vec<String>>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = SweepResult<()>>,
    {
        if self.filter.dry_run {
            for id in &ids {
                info!("Dry run, not deleting {} '{}'", kind, id);
            }
            return Ok(ids);
        }

        let mut deleted = Vec::new();
        let mut failures = Vec::new();
        for id in ids {
            match delete(id.clone()).await {
                Ok(()) => {
                    info!("Deleted {} '{}'", kind, id);
                    deleted.push(id);
                }
                Err(e) => {
                    error!("Unable to delete {} '{}': {}", kind, id, e);
                    failures.push(id);
                }
            }
        }
        if failures.is_empty() {
            Ok(deleted)
        } else {
            Err(SweepError::new_with_context(format!(
                "Unable to delete {} {}: {}",
                failures.len(),
                kind,
                failures.join(", ")
            )))
        }
    }
}

/// Convert an SDK timestamp.
pub(crate) fn to_utc(time: Option<&aws_smithy_types::DateTime>) -> Option<DateTime<Utc>> {
    time.and_then(|time| Utc.timestamp_opt(time.secs(), time.subsec_nanos()).single())
}

/// Build the filter's view of a resource from SDK key/value tag pairs.
pub(crate) fn tagged<'a, I>(
    id: &str,
    creation_time: Option<DateTime<Utc>>,
    tags: I,
) -> ResourceWithTags
where
    I: IntoIterator<Item = (Option<&'a str>, Option<&'a str>)>,
{
    ResourceWithTags::new(
        id,
        creation_time,
        tags.into_iter()
            .filter_map(|(key, value)| key.map(|key| (key, value.unwrap_or_default()))),
    )
}
