pub mod github;

pub use github::{extract_version_from_tag, GitHubClient, ReleaseInfo, VersionInfo};
