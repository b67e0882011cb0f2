use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::coords::is_coordinate_in_mainland;
use dlgate_cache::CacheManager;
use dlgate_utils::http::{get, http_status_is_ok};

pub const IP_API_URL: &str = "https://ipapi.co";

const CHINA_TIMEZONES: [&str; 4] = [
    "Asia/Shanghai",
    "Asia/Chongqing",
    "Asia/Harbin",
    "Asia/Urumqi",
];

/// Which cascade stage produced the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectionMethod {
    CountryHeader,
    Coordinates,
    IpLookup,
    Heuristic,
    Default,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct RegionVerdict {
    pub is_mainland_china: Option<bool>,
    pub method: DetectionMethod,
}

impl RegionVerdict {
    pub fn new(is_mainland_china: bool, method: DetectionMethod) -> Self {
        Self {
            is_mainland_china: Some(is_mainland_china),
            method,
        }
    }

    /// Tri-state placeholder for a not-yet-classified client.
    pub fn unknown() -> Self {
        Self {
            is_mainland_china: None,
            method: DetectionMethod::Default,
        }
    }

    /// Collapse the tri-state: unresolved means non-mainland, so default
    /// download paths stay reachable.
    pub fn is_mainland(&self) -> bool {
        self.is_mainland_china.unwrap_or(false)
    }
}

/// Signals extracted from one request. Coordinates are only present when
/// the client supplied them explicitly; the classifier never asks for
/// them on its own.
#[derive(Debug, Clone, Default)]
pub struct RegionSignals {
    pub country_header: Option<String>,
    pub coordinates: Option<(f64, f64)>,
    pub client_ip: Option<String>,
    pub timezone: Option<String>,
    pub locale: Option<String>,
}

pub struct RegionClassifier {
    ip_api_base: String,
    cache: Arc<CacheManager>,
}

impl RegionClassifier {
    pub fn new(cache: Arc<CacheManager>) -> Self {
        Self::with_ip_api_base(cache, IP_API_URL)
    }

    /// Point the IP lookup at a different host (used by tests).
    pub fn with_ip_api_base(cache: Arc<CacheManager>, ip_api_base: impl Into<String>) -> Self {
        Self {
            ip_api_base: ip_api_base.into(),
            cache,
        }
    }

    /// Run the cascade over the request's signals, short-circuiting on the
    /// first conclusive stage. Never fails; an inconclusive cascade ends
    /// with a non-mainland default verdict.
    pub async fn classify(&self, signals: &RegionSignals) -> RegionVerdict {
        if let Some(code) = signals.country_header.as_deref() {
            let code = code.trim();
            // "unknown" is the CDN's own could-not-classify sentinel and
            // is as inconclusive as a missing header.
            if !code.is_empty() && code != "unknown" {
                return RegionVerdict::new(code == "CN", DetectionMethod::CountryHeader);
            }
        }

        if let Some((latitude, longitude)) = signals.coordinates {
            return RegionVerdict::new(
                is_coordinate_in_mainland(latitude, longitude),
                DetectionMethod::Coordinates,
            );
        }

        if let Some(ip) = signals.client_ip.as_deref() {
            if let Some(code) = self.lookup_country(ip).await {
                return RegionVerdict::new(code == "CN", DetectionMethod::IpLookup);
            }
        }

        if let Some(heuristic) = heuristic_verdict(signals) {
            return RegionVerdict::new(heuristic, DetectionMethod::Heuristic);
        }

        RegionVerdict::new(false, DetectionMethod::Default)
    }

    /// Two-letter country code for an IP via the third-party geolocation
    /// API. Successful lookups are cached; any failure is inconclusive.
    pub async fn lookup_country(&self, ip: &str) -> Option<String> {
        if ip.is_empty() || ip == "unknown" {
            return None;
        }
        let url = format!("{}/{}/json/", self.ip_api_base, ip);

        if let Ok(Some(code)) = self.cache.get(&url).await {
            return Some(code);
        }

        let parsed_url = url.parse().ok()?;
        let header_map = HashMap::from([(
            "Accept".to_string(),
            "application/json".to_string(),
        )]);
        let rsp = get(parsed_url, &header_map).await.ok()?;
        if !http_status_is_ok(rsp.status) {
            return None;
        }
        let body = rsp.body?;
        let data: serde_json::Value = serde_json::from_slice(&body).ok()?;
        let code = data.get("country_code")?.as_str()?.to_string();
        let _ = self.cache.set(&url, &code).await;
        Some(code)
    }
}

/// Timezone or language heuristic: either signal matching mainland China
/// is sufficient. Returns None when neither signal is present.
fn heuristic_verdict(signals: &RegionSignals) -> Option<bool> {
    let tz_match = signals
        .timezone
        .as_deref()
        .map(|tz| CHINA_TIMEZONES.contains(&tz));
    let locale_match = signals.locale.as_deref().map(is_mainland_chinese_locale);

    match (tz_match, locale_match) {
        (None, None) => None,
        (tz, locale) => Some(tz.unwrap_or(false) || locale.unwrap_or(false)),
    }
}

/// Language tags that indicate mainland China: `zh`, `zh-CN`, and
/// simplified-script variants. Traditional-script and HK/MO/TW region
/// tags do not count.
fn is_mainland_chinese_locale(tag: &str) -> bool {
    let tag = tag.trim().to_ascii_lowercase();
    if tag != "zh" && !tag.starts_with("zh-") {
        return false;
    }
    for part in tag.split('-').skip(1) {
        match part {
            "tw" | "hk" | "mo" | "hant" => return false,
            _ => {}
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn classifier() -> RegionClassifier {
        let cache = Arc::new(CacheManager::new_memory(Duration::from_secs(3600)));
        // Unroutable base: any lookup attempt fails fast as inconclusive.
        RegionClassifier::with_ip_api_base(cache, "http://127.0.0.1:0")
    }

    #[tokio::test]
    async fn test_country_header_short_circuits() {
        let verdict = classifier()
            .classify(&RegionSignals {
                country_header: Some("CN".to_string()),
                ..Default::default()
            })
            .await;
        assert_eq!(verdict.is_mainland_china, Some(true));
        assert_eq!(verdict.method, DetectionMethod::CountryHeader);

        let verdict = classifier()
            .classify(&RegionSignals {
                country_header: Some("US".to_string()),
                // Coordinates inside the mainland must not be consulted.
                coordinates: Some((39.9, 116.4)),
                ..Default::default()
            })
            .await;
        assert_eq!(verdict.is_mainland_china, Some(false));
        assert_eq!(verdict.method, DetectionMethod::CountryHeader);
    }

    #[tokio::test]
    async fn test_unknown_country_header_is_inconclusive() {
        let verdict = classifier()
            .classify(&RegionSignals {
                country_header: Some("unknown".to_string()),
                coordinates: Some((39.9, 116.4)),
                ..Default::default()
            })
            .await;
        assert_eq!(verdict.is_mainland_china, Some(true));
        assert_eq!(verdict.method, DetectionMethod::Coordinates);

        // Sentinel with no further signals ends at the default stage.
        let verdict = classifier()
            .classify(&RegionSignals {
                country_header: Some("unknown".to_string()),
                ..Default::default()
            })
            .await;
        assert_eq!(verdict.is_mainland_china, Some(false));
        assert_eq!(verdict.method, DetectionMethod::Default);
    }

    #[tokio::test]
    async fn test_coordinates_stage() {
        let verdict = classifier()
            .classify(&RegionSignals {
                coordinates: Some((39.9, 116.4)),
                ..Default::default()
            })
            .await;
        assert_eq!(verdict.is_mainland_china, Some(true));
        assert_eq!(verdict.method, DetectionMethod::Coordinates);

        // Hong Kong exclusion box.
        let verdict = classifier()
            .classify(&RegionSignals {
                coordinates: Some((22.3, 114.2)),
                ..Default::default()
            })
            .await;
        assert_eq!(verdict.is_mainland_china, Some(false));
        assert_eq!(verdict.method, DetectionMethod::Coordinates);
    }

    #[tokio::test]
    async fn test_heuristic_fallback() {
        let verdict = classifier()
            .classify(&RegionSignals {
                timezone: Some("Asia/Shanghai".to_string()),
                ..Default::default()
            })
            .await;
        assert_eq!(verdict.is_mainland_china, Some(true));
        assert_eq!(verdict.method, DetectionMethod::Heuristic);

        let verdict = classifier()
            .classify(&RegionSignals {
                timezone: Some("Europe/Berlin".to_string()),
                locale: Some("zh-CN".to_string()),
                ..Default::default()
            })
            .await;
        assert_eq!(verdict.is_mainland_china, Some(true));

        let verdict = classifier()
            .classify(&RegionSignals {
                timezone: Some("Asia/Taipei".to_string()),
                locale: Some("zh-TW".to_string()),
                ..Default::default()
            })
            .await;
        assert_eq!(verdict.is_mainland_china, Some(false));
        assert_eq!(verdict.method, DetectionMethod::Heuristic);
    }

    #[tokio::test]
    async fn test_default_verdict() {
        let verdict = classifier().classify(&RegionSignals::default()).await;
        assert_eq!(verdict.is_mainland_china, Some(false));
        assert_eq!(verdict.method, DetectionMethod::Default);
    }

    #[test]
    fn test_mainland_chinese_locale() {
        assert!(is_mainland_chinese_locale("zh"));
        assert!(is_mainland_chinese_locale("zh-CN"));
        assert!(is_mainland_chinese_locale("zh-Hans"));
        assert!(is_mainland_chinese_locale("zh-Hans-CN"));
        assert!(!is_mainland_chinese_locale("zh-TW"));
        assert!(!is_mainland_chinese_locale("zh-Hant-HK"));
        assert!(!is_mainland_chinese_locale("en-US"));
    }

    #[test]
    fn test_unknown_verdict_defaults_to_non_mainland() {
        let verdict = RegionVerdict::unknown();
        assert_eq!(verdict.is_mainland_china, None);
        assert!(!verdict.is_mainland());
    }
}
