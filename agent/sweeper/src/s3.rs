use crate::error::{IntoSweepError, SweepError, SweepResult};
use crate::{tagged, to_utc, Sweeper};
use agent_utils::aws::{error_code, has_error_code, is_not_found};
use agent_utils::retry::{retry, ONE_RETRY};
use aws_sdk_s3::model::{Delete, Error as ObjectError, ObjectIdentifier};
use chrono::{DateTime, Utc};
use log::debug;

const KIND: &str = "S3 bucket";

/// The region of a bucket from its `GetBucketLocation` constraint. Buckets in `us-east-1` have an
/// empty constraint and the legacy `EU` constraint means `eu-west-1`.
pub(crate) fn bucket_region(location_constraint: Option<&str>) -> String {
    match location_constraint.unwrap_or_default() {
        "" => "us-east-1".to_string(),
        "EU" => "eu-west-1".to_string(),
        region => region.to_string(),
    }
}

/// Empty and delete the e2e buckets in the sweeper's region selected by the filter.
pub(crate) async fn sweep(sweeper: &Sweeper, now: DateTime<Utc>) -> SweepResult<Vec<String>> {
    let output = sweeper
        .s3_client
        .list_buckets()
        .send()
        .await
        .context("Unable to list buckets")?;

    let mut bucket_names = Vec::new();
    for bucket in output.buckets().unwrap_or_default() {
        let bucket_name = match bucket.name() {
            Some(bucket_name) => bucket_name,
            None => continue,
        };
        let location = match sweeper
            .s3_client
            .get_bucket_location()
            .bucket(bucket_name)
            .send()
            .await
        {
            Ok(location) => location,
            Err(e) if is_not_found(&e) => continue,
            Err(e) => {
                return Err(e).context(format!(
                    "Unable to get location of bucket '{}'",
                    bucket_name
                ))
            }
        };
        let region = bucket_region(
            location
                .location_constraint()
                .map(|constraint| constraint.as_str()),
        );
        if region != sweeper.region {
            continue;
        }

        let tagging = match sweeper
            .s3_client
            .get_bucket_tagging()
            .bucket(bucket_name)
            .send()
            .await
        {
            Ok(tagging) => tagging,
            Err(e) if error_code(&e) == Some("NoSuchTagSet") || is_not_found(&e) => continue,
            Err(e) => {
                return Err(e).context(format!("Unable to get tags of bucket '{}'", bucket_name))
            }
        };
        let resource = tagged(
            bucket_name,
            to_utc(bucket.creation_date()),
            tagging
                .tag_set()
                .unwrap_or_default()
                .iter()
                .map(|tag| (tag.key(), tag.value())),
        );
        if sweeper.select(KIND, &resource, now) {
            bucket_names.push(resource.id);
        }
    }

    sweeper
        .delete_each(KIND, bucket_names, move |bucket_name| {
            delete_bucket(sweeper, bucket_name)
        })
        .await
}

async fn delete_bucket(sweeper: &Sweeper, bucket_name: String) -> SweepResult<()> {
    empty_bucket(sweeper, &bucket_name).await?;
    // Deletes that were just acknowledged can still block the bucket deletion briefly.
    let result = retry(
        ONE_RETRY,
        &format!("Deleting bucket '{}'", bucket_name),
        |e| has_error_code(e, &["BucketNotEmpty"]),
        || {
            sweeper
                .s3_client
                .delete_bucket()
                .bucket(&bucket_name)
                .send()
        },
    )
    .await;
    match result {
        Err(e) if !is_not_found(&e) => {
            Err(e).context(format!("Unable to delete bucket '{}'", bucket_name))
        }
        _ => Ok(()),
    }
}

/// Delete every object version and delete marker in the bucket.
async fn empty_bucket(sweeper: &Sweeper, bucket_name: &str) -> SweepResult<()> {
    let mut key_marker = None;
    let mut version_id_marker = None;
    loop {
        let output = sweeper
            .s3_client
            .list_object_versions()
            .bucket(bucket_name)
            .set_key_marker(key_marker)
            .set_version_id_marker(version_id_marker)
            .send()
            .await
            .context(format!("Unable to list objects of bucket '{}'", bucket_name))?;

        let versions = output
            .versions()
            .unwrap_or_default()
            .iter()
            .map(|version| (version.key(), version.version_id()));
        let markers = output
            .delete_markers()
            .unwrap_or_default()
            .iter()
            .map(|marker| (marker.key(), marker.version_id()));
        let objects: Vec<ObjectIdentifier> = versions
            .chain(markers)
            .filter_map(|(key, version_id)| {
                key.map(|key| {
                    ObjectIdentifier::builder()
                        .key(key)
                        .set_version_id(version_id.map(ToString::to_string))
                        .build()
                })
            })
            .collect();

        if !objects.is_empty() {
            debug!(
                "Deleting {} objects from bucket '{}'",
                objects.len(),
                bucket_name
            );
            let deleted = sweeper
                .s3_client
                .delete_objects()
                .bucket(bucket_name)
                .delete(Delete::builder().set_objects(Some(objects)).quiet(true).build())
                .send()
                .await
                .context(format!(
                    "Unable to delete objects of bucket '{}'",
                    bucket_name
                ))?;
            check_object_errors(bucket_name, deleted.errors().unwrap_or_default())?;
        }

        if !output.is_truncated() {
            return Ok(());
        }
        key_marker = output.next_key_marker().map(ToString::to_string);
        version_id_marker = output.next_version_id_marker().map(ToString::to_string);
    }
}

/// `DeleteObjects` reports per-key failures in its output rather than failing the call.
fn check_object_errors(bucket_name: &str, errors: &[ObjectError]) -> SweepResult<()> {
    if errors.is_empty() {
        return Ok(());
    }
    let failed: Vec<String> = errors
        .iter()
        .map(|error| {
            format!(
                "{} ({})",
                error.key().unwrap_or_default(),
                error.code().unwrap_or("unknown error")
            )
        })
        .collect();
    Err(SweepError::new_with_context(format!(
        "Unable to delete {} objects of bucket '{}': {}",
        failed.len(),
        bucket_name,
        failed.join(", ")
    )))
}
