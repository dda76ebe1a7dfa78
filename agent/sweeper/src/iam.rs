use crate::error::{IntoSweepError, SweepResult};
use crate::{tagged, to_utc, Sweeper};
use agent_utils::aws::{has_error_code, is_not_found};
use agent_utils::retry::{retry, DEPENDENCY_RETRY};
use chrono::{DateTime, Utc};
use hybrid_model::constants::E2E_CLUSTER_TAG_KEY;
use log::{debug, warn};

const KIND: &str = "IAM role";

/// Delete the e2e roles selected by the filter along with their policies and instance profiles.
pub(crate) async fn sweep(sweeper: &Sweeper, now: DateTime<Utc>) -> SweepResult<Vec<String>> {
    let mut role_names = Vec::new();
    let mut marker = None;
    loop {
        let output = sweeper
            .iam_client
            .list_roles()
            .set_marker(marker)
            .send()
            .await
            .context("Unable to list roles")?;
        for role in output.roles().unwrap_or_default() {
            let role_name = match role.role_name() {
                Some(role_name) => role_name,
                None => continue,
            };
            // `ListRoles` does not return tags.
            let tags = match e2e_tags(role_name, role_tags(sweeper, role_name).await) {
                Some(tags) => tags,
                None => continue,
            };
            let resource = tagged(
                role_name,
                to_utc(role.create_date()),
                tags.iter()
                    .map(|(key, value)| (Some(key.as_str()), Some(value.as_str()))),
            );
            if sweeper.select(KIND, &resource, now) {
                role_names.push(resource.id);
            }
        }
        marker = output.marker().map(ToString::to_string);
        if !output.is_truncated() || marker.is_none() {
            break;
        }
    }

    sweeper
        .delete_each(KIND, role_names, move |role_name| {
            delete_role(sweeper, role_name)
        })
        .await
}

/// The tags of a role that belongs to an e2e cluster. Roles whose tags cannot be read (service
/// linked roles can deny `ListRoleTags`) are skipped rather than failing the whole step.
fn e2e_tags(
    role_name: &str,
    tags: SweepResult<Vec<(String, String)>>,
) -> Option<Vec<(String, String)>> {
    match tags {
        Ok(tags) if tags.iter().any(|(key, _)| key == E2E_CLUSTER_TAG_KEY) => Some(tags),
        Ok(_) => None,
        Err(e) => {
            warn!("Skipping role '{}': {}", role_name, e);
            None
        }
    }
}

async fn role_tags(sweeper: &Sweeper, role_name: &str) -> SweepResult<Vec<(String, String)>> {
    let result = sweeper
        .iam_client
        .list_role_tags()
        .role_name(role_name)
        .send()
        .await;
    let output = match result {
        // Deleted between listing and tagging.
        Err(e) if is_not_found(&e) => return Ok(Vec::new()),
        result => result.context(format!("Unable to list tags of role '{}'", role_name))?,
    };
    Ok(output
        .tags()
        .unwrap_or_default()
        .iter()
        .filter_map(|tag| {
            tag.key().map(|key| {
                (
                    key.to_string(),
                    tag.value().unwrap_or_default().to_string(),
                )
            })
        })
        .collect())
}

async fn delete_role(sweeper: &Sweeper, role_name: String) -> SweepResult<()> {
    let iam = &sweeper.iam_client;

    let attached = iam
        .list_attached_role_policies()
        .role_name(&role_name)
        .send()
        .await
        .context(format!(
            "Unable to list attached policies of role '{}'",
            role_name
        ))?;
    for policy_arn in attached
        .attached_policies()
        .unwrap_or_default()
        .iter()
        .filter_map(|policy| policy.policy_arn())
    {
        debug!("Detaching '{}' from role '{}'", policy_arn, role_name);
        if let Err(e) = iam
            .detach_role_policy()
            .role_name(&role_name)
            .policy_arn(policy_arn)
            .send()
            .await
        {
            if !is_not_found(&e) {
                return Err(e).context(format!(
                    "Unable to detach '{}' from role '{}'",
                    policy_arn, role_name
                ));
            }
        }
    }

    let inline = iam
        .list_role_policies()
        .role_name(&role_name)
        .send()
        .await
        .context(format!(
            "Unable to list inline policies of role '{}'",
            role_name
        ))?;
    for policy_name in inline.policy_names().unwrap_or_default() {
        debug!("Deleting inline policy '{}' of role '{}'", policy_name, role_name);
        if let Err(e) = iam
            .delete_role_policy()
            .role_name(&role_name)
            .policy_name(policy_name)
            .send()
            .await
        {
            if !is_not_found(&e) {
                return Err(e).context(format!(
                    "Unable to delete inline policy '{}' of role '{}'",
                    policy_name, role_name
                ));
            }
        }
    }

    let profiles = iam
        .list_instance_profiles_for_role()
        .role_name(&role_name)
        .send()
        .await
        .context(format!(
            "Unable to list instance profiles of role '{}'",
            role_name
        ))?;
    for profile_name in profiles
        .instance_profiles()
        .unwrap_or_default()
        .iter()
        .filter_map(|profile| profile.instance_profile_name())
    {
        debug!(
            "Removing role '{}' from instance profile '{}'",
            role_name, profile_name
        );
        if let Err(e) = iam
            .remove_role_from_instance_profile()
            .instance_profile_name(profile_name)
            .role_name(&role_name)
            .send()
            .await
        {
            if !is_not_found(&e) {
                return Err(e).context(format!(
                    "Unable to remove role '{}' from instance profile '{}'",
                    role_name, profile_name
                ));
            }
        }
        if let Err(e) = iam
            .delete_instance_profile()
            .instance_profile_name(profile_name)
            .send()
            .await
        {
            if !is_not_found(&e) {
                return Err(e).context(format!(
                    "Unable to delete instance profile '{}'",
                    profile_name
                ));
            }
        }
    }

    let result = retry(
        DEPENDENCY_RETRY,
        &format!("Deleting role '{}'", role_name),
        |e| has_error_code(e, &["DeleteConflict"]),
        || iam.delete_role().role_name(&role_name).send(),
    )
    .await;
    match result {
        Err(e) if !is_not_found(&e) => {
            Err(e).context(format!("Unable to delete role '{}'", role_name))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::SweepError;

    fn tag(key: &str, value: &str) -> (String, String) {
        (key.to_string(), value.to_string())
    }

    #[test]
    fn only_e2e_roles_are_considered() {
        let tags = vec![tag(E2E_CLUSTER_TAG_KEY, "c1"), tag("Name", "node")];
        assert_eq!(e2e_tags("node-role", Ok(tags.clone())), Some(tags));
        assert_eq!(e2e_tags("other-role", Ok(vec![tag("Name", "x")])), None);
    }

    #[test]
    fn unreadable_tags_skip_the_role() {
        let denied = Err(SweepError::new_with_context("AccessDenied"));
        assert_eq!(e2e_tags("AWSServiceRoleForSupport", denied), None);
    }
}
