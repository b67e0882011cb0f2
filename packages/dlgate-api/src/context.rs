use crate::contact::{CaptchaVerifier, Mailer};
use dlgate_geo::RegionClassifier;
use dlgate_release::GitHubClient;
use dlgate_store::ProductStore;

/// Everything a request handler needs, wired once at startup and shared
/// behind an `Arc`. Upstream clients carry their own injectable caches,
/// so tests can swap hosts and TTLs freely.
pub struct ApiContext {
    pub store: ProductStore,
    pub classifier: RegionClassifier,
    pub github: GitHubClient,
    pub captcha: Box<dyn CaptchaVerifier>,
    pub mailer: Box<dyn Mailer>,
}
