use serde::Serialize;

use crate::os::ClientOs;
use dlgate_store::{PlatformLinks, Product};

/// Marker substring in a mirror URL meaning "link not yet configured".
pub const PLACEHOLDER_MARKER: &str = "TODO_";

/// Token in platform URLs replaced with the resolved version string.
pub const VERSION_TOKEN: &str = "{version}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadSource {
    Cdn,
    Mirror,
    Platform,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownloadOption {
    pub label: String,
    /// Absent for placeholder links, which are never actionable.
    pub url: Option<String>,
    pub source: DownloadSource,
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DisabledReason {
    ComingSoon,
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DownloadAction {
    /// Open a single destination directly.
    Open { option: DownloadOption },
    /// Present a set of variants to pick from.
    Chooser { options: Vec<DownloadOption> },
    /// Nothing actionable to offer.
    Disabled { reason: DisabledReason },
}

impl DownloadAction {
    /// Only a direct open counts as a download; opening the chooser or a
    /// disabled rendering never increments the counter.
    pub fn records_download(&self) -> bool {
        matches!(self, DownloadAction::Open { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownloadPlan {
    pub primary: DownloadAction,
    pub alternatives: Vec<DownloadOption>,
}

pub fn is_placeholder(url: &str) -> bool {
    url.contains(PLACEHOLDER_MARKER)
}

pub fn substitute_version(url: &str, version: &str) -> String {
    url.replace(VERSION_TOKEN, version)
}

fn option(label: &str, url: &str, source: DownloadSource, version: &str) -> DownloadOption {
    DownloadOption {
        label: label.to_string(),
        url: Some(substitute_version(url, version)),
        source,
        enabled: true,
    }
}

fn windows_options(links: &PlatformLinks, version: &str) -> Vec<DownloadOption> {
    let mut options = Vec::new();
    if let Some(windows) = &links.windows {
        if let Some(url) = &windows.portable {
            options.push(option("windows-portable", url, DownloadSource::Platform, version));
        }
        if let Some(url) = &windows.installer {
            options.push(option("windows-installer", url, DownloadSource::Platform, version));
        }
    }
    options
}

fn linux_options(links: &PlatformLinks, version: &str) -> Vec<DownloadOption> {
    let mut options = Vec::new();
    if let Some(linux) = &links.linux {
        if let Some(url) = &linux.appimage {
            options.push(option("linux-appimage", url, DownloadSource::Platform, version));
        }
        if let Some(url) = &linux.rpm {
            options.push(option("linux-rpm", url, DownloadSource::Platform, version));
        }
        if let Some(url) = &linux.deb {
            options.push(option("linux-deb", url, DownloadSource::Platform, version));
        }
    }
    options
}

fn mac_option(links: &PlatformLinks, version: &str) -> Option<DownloadOption> {
    links
        .mac
        .as_deref()
        .map(|url| option("mac", url, DownloadSource::Platform, version))
}

fn all_options(links: &PlatformLinks, version: &str) -> Vec<DownloadOption> {
    let mut options = windows_options(links, version);
    options.extend(mac_option(links, version));
    options.extend(linux_options(links, version));
    options
}

/// Pick the primary download action and the secondary options for one
/// product, given the region verdict, the detected client OS and the
/// already-resolved version string.
pub fn resolve_plan(
    product: &Product,
    is_mainland: bool,
    os: ClientOs,
    version: &str,
) -> DownloadPlan {
    if !product.available {
        return DownloadPlan {
            primary: DownloadAction::Disabled {
                reason: DisabledReason::Unavailable,
            },
            alternatives: Vec::new(),
        };
    }

    let links = &product.download;
    let mirror_placeholder = is_placeholder(&links.mirror);
    let mirror = DownloadOption {
        label: "mirror".to_string(),
        url: (!mirror_placeholder).then(|| links.mirror.clone()),
        source: DownloadSource::Mirror,
        enabled: !mirror_placeholder,
    };
    let cdn = option("cdn", &links.cdn, DownloadSource::Cdn, version);

    if !is_mainland {
        // Non-mainland clients get the mirror; the CDN entry is shown but
        // kept non-actionable outside mainland China.
        let primary = if mirror_placeholder {
            DownloadAction::Disabled {
                reason: DisabledReason::ComingSoon,
            }
        } else {
            DownloadAction::Open {
                option: mirror.clone(),
            }
        };
        let restricted_cdn = DownloadOption {
            enabled: false,
            ..cdn
        };
        return DownloadPlan {
            primary,
            alternatives: vec![restricted_cdn],
        };
    }

    let primary = match &links.platform_links {
        Some(platform) => match os {
            ClientOs::Mac => match mac_option(platform, version) {
                Some(option) => DownloadAction::Open { option },
                None => {
                    let options = all_options(platform, version);
                    if options.is_empty() {
                        DownloadAction::Open { option: cdn }
                    } else {
                        DownloadAction::Chooser { options }
                    }
                }
            },
            ClientOs::Linux => {
                let options = linux_options(platform, version);
                if options.is_empty() {
                    DownloadAction::Open { option: cdn }
                } else {
                    DownloadAction::Chooser { options }
                }
            }
            ClientOs::Windows | ClientOs::Unknown => {
                let options = all_options(platform, version);
                if options.is_empty() {
                    DownloadAction::Open { option: cdn }
                } else {
                    DownloadAction::Chooser { options }
                }
            }
        },
        None => DownloadAction::Open { option: cdn },
    };

    DownloadPlan {
        primary,
        alternatives: vec![mirror],
    }
}
