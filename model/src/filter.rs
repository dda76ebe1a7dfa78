use crate::constants::{E2E_CLUSTER_TAG_KEY, E2E_CREATION_TIME_TAG_KEY};
use crate::error::{self, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use snafu::ensure;
use std::collections::HashMap;
use std::time::Duration;

/// Decides which tagged e2e resources the sweeper removes.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterInput {
    /// Delete every resource tagged for this cluster, regardless of age.
    pub cluster_name: Option<String>,

    /// Delete resources of any e2e cluster once they are older than `age_threshold`.
    pub all_clusters: bool,

    pub age_threshold: Duration,

    /// Only report what would be deleted.
    pub dry_run: bool,
}

/// A cloud resource reduced to what the filter needs.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceWithTags {
    pub id: String,
    pub creation_time: Option<DateTime<Utc>>,
    pub tags: HashMap<String, String>,
}

impl ResourceWithTags {
    pub fn new<S, I, K, V>(id: S, creation_time: Option<DateTime<Utc>>, tags: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            id: id.into(),
            creation_time,
            tags: tags
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// The e2e cluster this resource belongs to, if it is tagged as an e2e resource.
    pub fn cluster_name(&self) -> Option<&str> {
        self.tags.get(E2E_CLUSTER_TAG_KEY).map(String::as_str)
    }

    /// Some APIs do not report creation times, so e2e resources also carry them as an RFC3339
    /// tag. Unparseable values are treated as absent.
    pub fn creation_time_from_tag(tags: &HashMap<String, String>) -> Option<DateTime<Utc>> {
        tags.get(E2E_CREATION_TIME_TAG_KEY)
            .and_then(|value| DateTime::parse_from_rfc3339(value).ok())
            .map(|time| time.with_timezone(&Utc))
    }
}

impl FilterInput {
    pub fn validate(&self) -> Result<()> {
        let has_cluster = self
            .cluster_name
            .as_ref()
            .map(|name| !name.is_empty())
            .unwrap_or_default();
        ensure!(
            has_cluster || self.all_clusters,
            error::InvalidFilterSnafu {
                what: "either a cluster name or all clusters must be selected",
            }
        );
        ensure!(
            !(has_cluster && self.all_clusters),
            error::InvalidFilterSnafu {
                what: "a cluster name and all clusters cannot be selected together",
            }
        );
        Ok(())
    }

    /// Whether `resource` should be deleted as of `now`.
    pub fn should_delete(&self, resource: &ResourceWithTags, now: DateTime<Utc>) -> bool {
        let resource_cluster = match resource.cluster_name() {
            Some(name) => name,
            None => return false,
        };
        if let Some(cluster_name) = self.cluster_name.as_deref().filter(|n| !n.is_empty()) {
            return resource_cluster == cluster_name;
        }
        if !self.all_clusters {
            return false;
        }
        let threshold = match chrono::Duration::from_std(self.age_threshold) {
            Ok(threshold) => threshold,
            Err(_) => return false,
        };
        match resource.creation_time {
            Some(created) => now.signed_duration_since(created) > threshold,
            None => false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;
    use maplit::hashmap;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, 1, 12, 0, 0).unwrap()
    }

    fn resource(cluster: Option<&str>, hours_old: Option<i64>) -> ResourceWithTags {
        let mut tags = hashmap! { "Name".to_string() => "thing".to_string() };
        if let Some(cluster) = cluster {
            tags.insert(E2E_CLUSTER_TAG_KEY.to_string(), cluster.to_string());
        }
        ResourceWithTags::new(
            "id-1",
            hours_old.map(|h| now() - chrono::Duration::hours(h)),
            tags,
        )
    }

    fn all_clusters(hours: u64) -> FilterInput {
        FilterInput {
            all_clusters: true,
            age_threshold: Duration::from_secs(hours * 3600),
            ..FilterInput::default()
        }
    }

    #[test]
    fn untagged_resources_are_kept() {
        let by_name = FilterInput {
            cluster_name: Some("c1".to_string()),
            ..FilterInput::default()
        };
        assert!(!by_name.should_delete(&resource(None, Some(100)), now()));
        assert!(!all_clusters(1).should_delete(&resource(None, Some(100)), now()));
    }

    #[test]
    fn cluster_name_matches_any_age() {
        let by_name = FilterInput {
            cluster_name: Some("c1".to_string()),
            ..FilterInput::default()
        };
        assert!(by_name.should_delete(&resource(Some("c1"), Some(0)), now()));
        assert!(by_name.should_delete(&resource(Some("c1"), None), now()));
        assert!(!by_name.should_delete(&resource(Some("c2"), Some(100)), now()));
    }

    #[test]
    fn all_clusters_uses_age() {
        let filter = all_clusters(12);
        assert!(filter.should_delete(&resource(Some("c1"), Some(13)), now()));
        assert!(!filter.should_delete(&resource(Some("c2"), Some(11)), now()));
        assert!(!filter.should_delete(&resource(Some("c2"), Some(12)), now()));
        assert!(!filter.should_delete(&resource(Some("c2"), None), now()));
    }

    #[test]
    fn nothing_selected() {
        let filter = FilterInput::default();
        assert!(!filter.should_delete(&resource(Some("c1"), Some(100)), now()));
        assert!(filter.validate().is_err());
    }

    #[test]
    fn validation() {
        assert!(all_clusters(1).validate().is_ok());
        let both = FilterInput {
            cluster_name: Some("c1".to_string()),
            ..all_clusters(1)
        };
        assert!(both.validate().is_err());
        let empty_name = FilterInput {
            cluster_name: Some(String::new()),
            ..FilterInput::default()
        };
        assert!(empty_name.validate().is_err());
    }

    #[test]
    fn creation_time_tag() {
        let tags = hashmap! {
            E2E_CREATION_TIME_TAG_KEY.to_string() => "2024-08-01T10:00:00Z".to_string(),
        };
        assert_eq!(
            ResourceWithTags::creation_time_from_tag(&tags),
            Some(Utc.with_ymd_and_hms(2024, 8, 1, 10, 0, 0).unwrap())
        );
        let tags = hashmap! {
            E2E_CREATION_TIME_TAG_KEY.to_string() => "yesterday".to_string(),
        };
        assert_eq!(ResourceWithTags::creation_time_from_tag(&tags), None);
        assert_eq!(ResourceWithTags::creation_time_from_tag(&HashMap::new()), None);
    }
}
