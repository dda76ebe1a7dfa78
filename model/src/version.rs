use serde_plain::{derive_deserialize_from_fromstr, derive_serialize_from_display};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Represents a parsed Kubernetes version. Examples of valid values when parsing:
/// - `v1.30`
/// - `1.30`
/// - `v1.30.2`
/// - `1.30.2`
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct K8sVersion {
    major: u8,
    minor: u8,
    patch: Option<u8>,
}

impl K8sVersion {
    pub const fn new(major: u8, minor: u8, patch: Option<u8>) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    pub fn patch(&self) -> Option<u8> {
        self.patch
    }

    /// Example: `v1.30`, even if a patch value is present.
    pub fn major_minor_with_v(&self) -> String {
        format!("v{}.{}", self.major, self.minor)
    }

    /// Example: `1.30`, even if a patch value is present.
    pub fn major_minor_without_v(&self) -> String {
        format!("{}.{}", self.major, self.minor)
    }

    /// Includes the patch value if it exists: `v1.30.2` or `v1.30`.
    pub fn full_version_with_v(&self) -> String {
        format!("v{}", self.full_version_without_v())
    }

    /// Includes the patch value if it exists: `1.30.2` or `1.30`.
    pub fn full_version_without_v(&self) -> String {
        match self.patch {
            Some(patch) => format!("{}.{}.{}", self.major, self.minor, patch),
            None => self.major_minor_without_v(),
        }
    }

    pub fn parse<S: AsRef<str>>(s: S) -> std::result::Result<Self, String> {
        let original = s.as_ref().trim();
        let no_v = original.strip_prefix('v').unwrap_or(original);
        let mut iter = no_v.split('.');
        let major = parse_component(iter.next(), "major", original)?;
        let minor = parse_component(iter.next(), "minor", original)?;
        let patch = match iter.next() {
            Some(patch) => Some(parse_component(Some(patch), "patch", original)?),
            None => None,
        };
        if iter.next().is_some() {
            return Err(format!(
                "Too many components when parsing '{}' as a k8s version",
                original
            ));
        }
        Ok(Self {
            major,
            minor,
            patch,
        })
    }
}

fn parse_component(part: Option<&str>, which: &str, original: &str) -> Result<u8, String> {
    part.ok_or_else(|| {
        format!(
            "Unable to find the {} version number when parsing '{}' as a k8s version",
            which, original
        )
    })?
    .parse::<u8>()
    .map_err(|e| {
        format!(
            "Error when parsing the {} version number of '{}': {}",
            which, original, e
        )
    })
}

impl Display for K8sVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.full_version_with_v(), f)
    }
}

impl FromStr for K8sVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        K8sVersion::parse(s)
    }
}

derive_serialize_from_display!(K8sVersion);
derive_deserialize_from_fromstr!(K8sVersion, "k8s version such as v1.30 or 1.30.2");

#[test]
fn k8s_version_invalid() {
    assert!(K8sVersion::parse("1.foo").is_err());
    assert!(K8sVersion::parse("1").is_err());
    assert!(K8sVersion::parse("1.30.x").is_err());
    assert!(K8sVersion::parse("1.30.1.4").is_err());
}

#[test]
fn k8s_version_valid() {
    let k8s_version = K8sVersion::from_str("v1.30.3").unwrap();
    assert_eq!("v1.30", k8s_version.major_minor_with_v());
    assert_eq!("1.30", k8s_version.major_minor_without_v());
    assert_eq!("v1.30.3", k8s_version.full_version_with_v());
    assert_eq!("1.30.3", k8s_version.full_version_without_v());

    let k8s_version = K8sVersion::from_str("1.29").unwrap();
    assert_eq!(k8s_version.patch(), None);
    assert_eq!("1.29", k8s_version.full_version_without_v());
}
