use std::sync::Arc;
use std::time::Duration;

use dlgate_cache::CacheManager;
use dlgate_geo::{DetectionMethod, RegionClassifier, RegionSignals};
use mockito::Server;

fn new_cache() -> Arc<CacheManager> {
    Arc::new(CacheManager::new_memory(Duration::from_secs(3600)))
}

#[tokio::test]
async fn test_ip_lookup_stage() {
    let mut server = Server::new_async().await;
    let _m = server
        .mock("GET", "/1.2.3.4/json/")
        .with_status(200)
        .with_body(r#"{"ip": "1.2.3.4", "country_code": "CN", "country_name": "China"}"#)
        .create_async()
        .await;

    let classifier = RegionClassifier::with_ip_api_base(new_cache(), server.url());
    let verdict = classifier
        .classify(&RegionSignals {
            client_ip: Some("1.2.3.4".to_string()),
            ..Default::default()
        })
        .await;
    assert_eq!(verdict.is_mainland_china, Some(true));
    assert_eq!(verdict.method, DetectionMethod::IpLookup);
}

#[tokio::test]
async fn test_ip_lookup_result_is_cached() {
    let mut server = Server::new_async().await;
    let m = server
        .mock("GET", "/5.6.7.8/json/")
        .with_status(200)
        .with_body(r#"{"country_code": "DE"}"#)
        .expect(1)
        .create_async()
        .await;

    let classifier = RegionClassifier::with_ip_api_base(new_cache(), server.url());
    assert_eq!(
        classifier.lookup_country("5.6.7.8").await,
        Some("DE".to_string())
    );
    assert_eq!(
        classifier.lookup_country("5.6.7.8").await,
        Some("DE".to_string())
    );
    m.assert_async().await;
}

#[tokio::test]
async fn test_failed_lookup_falls_through_to_heuristic() {
    let mut server = Server::new_async().await;
    let _m = server
        .mock("GET", "/9.9.9.9/json/")
        .with_status(500)
        .create_async()
        .await;

    let classifier = RegionClassifier::with_ip_api_base(new_cache(), server.url());
    let verdict = classifier
        .classify(&RegionSignals {
            client_ip: Some("9.9.9.9".to_string()),
            timezone: Some("Asia/Shanghai".to_string()),
            ..Default::default()
        })
        .await;
    assert_eq!(verdict.is_mainland_china, Some(true));
    assert_eq!(verdict.method, DetectionMethod::Heuristic);
}

#[tokio::test]
async fn test_header_stage_never_invokes_lookup() {
    let mut server = Server::new_async().await;
    let m = server
        .mock("GET", "/1.2.3.4/json/")
        .with_status(200)
        .with_body(r#"{"country_code": "US"}"#)
        .expect(0)
        .create_async()
        .await;

    let classifier = RegionClassifier::with_ip_api_base(new_cache(), server.url());
    let verdict = classifier
        .classify(&RegionSignals {
            country_header: Some("CN".to_string()),
            client_ip: Some("1.2.3.4".to_string()),
            ..Default::default()
        })
        .await;
    assert_eq!(verdict.is_mainland_china, Some(true));
    m.assert_async().await;
}
