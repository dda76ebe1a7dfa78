use crate::constants::{
    DEFAULT_DNS_SUFFIX, PARTITION_AWS, PARTITION_AWS_CN, PARTITION_AWS_ISO, PARTITION_AWS_ISO_B,
    PARTITION_AWS_ISO_E, PARTITION_AWS_ISO_F, PARTITION_AWS_US_GOV,
};
use crate::error::{self, Result};
use snafu::{ensure, OptionExt};

/// Region prefixes and the partitions they belong to. `us-isob-` and `us-isof-` must be checked
/// before `us-iso-`.
const REGION_PREFIX_PARTITIONS: &[(&str, &str)] = &[
    ("cn-", PARTITION_AWS_CN),
    ("us-gov-", PARTITION_AWS_US_GOV),
    ("us-isob-", PARTITION_AWS_ISO_B),
    ("us-isof-", PARTITION_AWS_ISO_F),
    ("eu-isoe-", PARTITION_AWS_ISO_E),
    ("us-iso-", PARTITION_AWS_ISO),
];

/// Returns the partition field of an ARN, e.g. `aws-cn` for `arn:aws-cn:iam::123:user/x`.
pub fn parse_partition_from_arn<S: AsRef<str>>(arn: S) -> Result<String> {
    let arn = arn.as_ref();
    let mut parts = arn.split(':');
    // `split` always yields at least one item, the text before the first colon.
    let _prefix = parts.next();
    let partition = parts.next().context(error::InvalidArnSnafu {
        arn,
        what: "missing partition",
    })?;
    ensure!(
        !partition.is_empty(),
        error::InvalidArnSnafu {
            arn,
            what: "empty partition",
        }
    );
    Ok(partition.to_string())
}

/// Returns the region field of an ARN if it has one.
pub fn parse_region_from_arn<S: AsRef<str>>(arn: S) -> Option<String> {
    arn.as_ref()
        .split(':')
        .nth(3)
        .filter(|region| !region.is_empty())
        .map(|region| region.to_string())
}

/// The DNS suffix used by service endpoints in `partition`. Unknown partitions get the commercial
/// suffix.
pub fn partition_dns_suffix(partition: &str) -> &'static str {
    match partition {
        PARTITION_AWS => "amazonaws.com",
        PARTITION_AWS_CN => "amazonaws.com.cn",
        PARTITION_AWS_US_GOV => "amazonaws.com",
        PARTITION_AWS_ISO => "c2s.ic.gov",
        PARTITION_AWS_ISO_B => "sc2s.sgov.gov",
        PARTITION_AWS_ISO_E => "cloud.adc-e.uk",
        PARTITION_AWS_ISO_F => "csp.hci.ic.gov",
        _ => DEFAULT_DNS_SUFFIX,
    }
}

/// The partition a region belongs to, judged by its name.
pub fn partition_for_region(region: &str) -> &'static str {
    REGION_PREFIX_PARTITIONS
        .iter()
        .find(|(prefix, _)| region.starts_with(prefix))
        .map(|(_, partition)| *partition)
        .unwrap_or(PARTITION_AWS)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn partition_from_arn() {
        assert_eq!(
            parse_partition_from_arn("arn:aws-cn:iam::123:user/x").unwrap(),
            "aws-cn"
        );
        assert_eq!(
            parse_partition_from_arn("arn:aws:sts::123456789012:assumed-role/a/b").unwrap(),
            "aws"
        );
    }

    #[test]
    fn partition_from_malformed_arn() {
        assert!(parse_partition_from_arn("").is_err());
        assert!(parse_partition_from_arn("not-an-arn").is_err());
        assert!(parse_partition_from_arn("arn::iam::123:user/x").is_err());
    }

    #[test]
    fn region_from_arn() {
        assert_eq!(
            parse_region_from_arn(
                "arn:aws:rolesanywhere:us-west-2:123456789012:trust-anchor/abc"
            )
            .as_deref(),
            Some("us-west-2")
        );
        assert_eq!(parse_region_from_arn("arn:aws:iam::123:role/x"), None);
    }

    #[test]
    fn dns_suffixes() {
        assert_eq!(partition_dns_suffix("aws-iso-b"), "sc2s.sgov.gov");
        assert_eq!(partition_dns_suffix("aws-cn"), "amazonaws.com.cn");
        assert_eq!(partition_dns_suffix("aws-iso-f"), "csp.hci.ic.gov");
        assert_eq!(partition_dns_suffix("aws-mars"), "amazonaws.com");
    }

    #[test]
    fn region_partitions() {
        assert_eq!(partition_for_region("cn-northwest-1"), "aws-cn");
        assert_eq!(partition_for_region("us-gov-east-1"), "aws-us-gov");
        assert_eq!(partition_for_region("us-isob-east-1"), "aws-iso-b");
        assert_eq!(partition_for_region("us-iso-west-1"), "aws-iso");
        assert_eq!(partition_for_region("eu-isoe-west-1"), "aws-iso-e");
        assert_eq!(partition_for_region("ap-southeast-7"), "aws");
    }
}
