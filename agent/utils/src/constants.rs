use log::LevelFilter;

pub const DEFAULT_REGION: &str = "us-west-2";
pub const DEFAULT_AGENT_LEVEL_FILTER: LevelFilter = LevelFilter::Info;
pub const DEFAULT_ASSUME_ROLE_SESSION_DURATION: i32 = 3600;
pub const DEFAULT_SDK_MAX_ATTEMPTS: u32 = 15;
pub const DEFAULT_MANIFEST_URL: &str = "https://hybrid-assets.eks.amazonaws.com/manifest.yaml";
pub const SESSION_NAME: &str = "nodeadm";
