use crate::constants::{
    DEFAULT_ECR_ACCOUNT_ID, DEFAULT_ECR_REGION, PAUSE_IMAGE_REPOSITORY, PAUSE_IMAGE_TAG,
};
use crate::manifest::RegionData;
use crate::partition::{partition_dns_suffix, partition_for_region};
use lazy_static::lazy_static;
use maplit::hashmap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{Display, Formatter};

lazy_static! {
    /// Regions that host EKS images in an account other than the default commercial account.
    static ref ACCOUNTS_BY_REGION: HashMap<&'static str, &'static str> = hashmap! {
        "af-south-1" => "877085696533",
        "ap-east-1" => "800184023465",
        "ap-south-2" => "900889452093",
        "ap-southeast-3" => "296578399912",
        "ap-southeast-4" => "491585149902",
        "ap-southeast-5" => "151610086707",
        "ap-southeast-7" => "121268973566",
        "ca-west-1" => "761377655185",
        "cn-north-1" => "918309763551",
        "cn-northwest-1" => "961992271922",
        "eu-central-2" => "900612956339",
        "eu-isoe-west-1" => "249663109785",
        "eu-south-1" => "590381155156",
        "eu-south-2" => "455263428931",
        "il-central-1" => "066635153087",
        "me-central-1" => "759879836304",
        "me-south-1" => "558608220178",
        "mx-central-1" => "730335286997",
        "us-gov-east-1" => "151742754352",
        "us-gov-west-1" => "013241004608",
        "us-iso-east-1" => "725322719131",
        "us-iso-west-1" => "608367168043",
        "us-isob-east-1" => "187977181151",
        "us-isof-east-1" => "171035529528",
        "us-isof-south-1" => "676585237158",
    };
}

/// When a region is not in the table, regions sharing one of these prefixes pull from the
/// partition's anchor region. `us-isob-` and `us-isof-` must be checked before `us-iso-`.
const PREFIX_FALLBACKS: &[(&str, &str, &str)] = &[
    ("us-gov-", "013241004608", "us-gov-west-1"),
    ("cn-", "961992271922", "cn-northwest-1"),
    ("us-isob-", "187977181151", "us-isob-east-1"),
    ("us-isof-", "171035529528", "us-isof-east-1"),
    ("eu-isoe-", "249663109785", "eu-isoe-west-1"),
    ("us-iso-", "725322719131", "us-iso-east-1"),
];

/// Returns the `(account, region)` of the ECR registry that serves EKS images to `region`.
///
/// The manifest's account for the region always wins when it is set. Otherwise the hardcoded
/// table is consulted, then the partition prefix fallbacks, and finally the default commercial
/// registry in `us-west-2`.
pub fn registry_coordinates(region: &str, region_data: Option<&RegionData>) -> (String, String) {
    if let Some(account) = region_data.and_then(|data| data.ecr_account_id()) {
        return (account.to_string(), region.to_string());
    }
    if let Some(account) = ACCOUNTS_BY_REGION.get(region) {
        return (account.to_string(), region.to_string());
    }
    PREFIX_FALLBACKS
        .iter()
        .find(|(prefix, _, _)| region.starts_with(prefix))
        .map(|(_, account, anchor)| (account.to_string(), anchor.to_string()))
        .unwrap_or_else(|| {
            (
                DEFAULT_ECR_ACCOUNT_ID.to_string(),
                DEFAULT_ECR_REGION.to_string(),
            )
        })
}

/// A resolved ECR registry.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EcrRegistry {
    pub account_id: String,
    pub region: String,
    pub dns_suffix: String,
}

impl EcrRegistry {
    /// Resolve the registry for nodes in `region`.
    pub fn for_region(region: &str, region_data: Option<&RegionData>) -> Self {
        let (account_id, registry_region) = registry_coordinates(region, region_data);
        let dns_suffix = region_data
            .and_then(|data| data.dns_suffix())
            .unwrap_or_else(|| partition_dns_suffix(partition_for_region(&registry_region)))
            .to_string();
        Self {
            account_id,
            region: registry_region,
            dns_suffix,
        }
    }

    pub fn host(&self) -> String {
        format!(
            "{}.dkr.ecr.{}.{}",
            self.account_id, self.region, self.dns_suffix
        )
    }

    pub fn image(&self, repository: &str, tag: &str) -> String {
        format!("{}/{}:{}", self.host(), repository, tag)
    }

    /// The sandbox image kubelet and containerd use for pods.
    pub fn pause_image(&self) -> String {
        self.image(PAUSE_IMAGE_REPOSITORY, PAUSE_IMAGE_TAG)
    }
}

impl Display for EcrRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.host(), f)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn with_account(account: &str) -> RegionData {
        RegionData {
            ecr_account_id: Some(account.to_string()),
            ..RegionData::default()
        }
    }

    #[test]
    fn table_regions_keep_their_region() {
        assert_eq!(
            registry_coordinates("cn-north-1", None),
            ("918309763551".to_string(), "cn-north-1".to_string())
        );
        assert_eq!(
            registry_coordinates("us-gov-east-1", None),
            ("151742754352".to_string(), "us-gov-east-1".to_string())
        );
    }

    #[test]
    fn unlisted_region_uses_default_registry() {
        assert_eq!(
            registry_coordinates("us-east-1", None),
            ("602401143452".to_string(), "us-west-2".to_string())
        );
        assert_eq!(
            registry_coordinates("eu-west-1", Some(&RegionData::default())),
            ("602401143452".to_string(), "us-west-2".to_string())
        );
    }

    #[test]
    fn prefix_fallbacks() {
        assert_eq!(
            registry_coordinates("cn-south-9", None),
            ("961992271922".to_string(), "cn-northwest-1".to_string())
        );
        assert_eq!(
            registry_coordinates("us-isob-west-1", None),
            ("187977181151".to_string(), "us-isob-east-1".to_string())
        );
        assert_eq!(
            registry_coordinates("us-iso-south-1", None),
            ("725322719131".to_string(), "us-iso-east-1".to_string())
        );
    }

    #[test]
    fn manifest_account_wins() {
        assert_eq!(
            registry_coordinates("cn-north-1", Some(&with_account("111122223333"))),
            ("111122223333".to_string(), "cn-north-1".to_string())
        );
        assert_eq!(
            registry_coordinates("us-east-1", Some(&with_account("444455556666"))),
            ("444455556666".to_string(), "us-east-1".to_string())
        );
        // An empty account falls through to the table.
        assert_eq!(
            registry_coordinates("cn-north-1", Some(&with_account(""))),
            ("918309763551".to_string(), "cn-north-1".to_string())
        );
    }

    #[test]
    fn registry_host() {
        let registry = EcrRegistry::for_region("cn-north-1", None);
        assert_eq!(
            registry.host(),
            "918309763551.dkr.ecr.cn-north-1.amazonaws.com.cn"
        );
        assert_eq!(
            registry.pause_image(),
            "918309763551.dkr.ecr.cn-north-1.amazonaws.com.cn/eks/pause:3.5"
        );

        let registry = EcrRegistry::for_region("us-isob-east-1", None);
        assert_eq!(
            registry.host(),
            "187977181151.dkr.ecr.us-isob-east-1.sc2s.sgov.gov"
        );

        let data = RegionData {
            ecr_account_id: Some("111122223333".to_string()),
            dns_suffix: Some("example.internal".to_string()),
            cred_providers: None,
        };
        let registry = EcrRegistry::for_region("xx-test-1", Some(&data));
        assert_eq!(registry.host(), "111122223333.dkr.ecr.xx-test-1.example.internal");
    }
}
