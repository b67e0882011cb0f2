use bytes::{Bytes, BytesMut};
use http_body_util::{BodyExt, Full};
use hyper::{Method, StatusCode, Uri};
use hyper_rustls::ConfigBuilderExt;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use once_cell::sync::Lazy;
use rustls::ClientConfig;
use std::{collections::HashMap, fmt};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug)]
pub struct ResponseData {
    pub status: u16,
    pub body: Option<Bytes>,
}

impl fmt::Display for ResponseData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Response status: {}, body: {}",
            self.status,
            self.body.as_ref().map_or_else(
                || "".to_string(),
                |body| String::from_utf8_lossy(body).to_string(),
            )
        )
    }
}

pub async fn get(url: Uri, header_map: &HashMap<String, String>) -> Result<ResponseData, BoxError> {
    request(Method::GET, url, header_map, Bytes::new()).await
}

/// POST with an `application/x-www-form-urlencoded` body built from the
/// given key/value pairs.
pub async fn post_form(
    url: Uri,
    header_map: &HashMap<String, String>,
    params: &[(&str, &str)],
) -> Result<ResponseData, BoxError> {
    let body = params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    let mut headers = header_map.clone();
    headers.insert(
        "Content-Type".to_string(),
        "application/x-www-form-urlencoded".to_string(),
    );
    request(Method::POST, url, &headers, Bytes::from(body)).await
}

/// POST with an `application/json` body.
pub async fn post_json(
    url: Uri,
    header_map: &HashMap<String, String>,
    body: String,
) -> Result<ResponseData, BoxError> {
    let mut headers = header_map.clone();
    headers.insert("Content-Type".to_string(), "application/json".to_string());
    request(Method::POST, url, &headers, Bytes::from(body)).await
}

async fn request(
    method: Method,
    url: Uri,
    header_map: &HashMap<String, String>,
    body: Bytes,
) -> Result<ResponseData, BoxError> {
    if url.scheme_str() == Some("https") {
        let https = https_config()?;
        let client = Client::builder(TokioExecutor::new()).build(https);
        send(client, method, url, header_map, body).await
    } else {
        let http = HttpConnector::new();
        let client = Client::builder(TokioExecutor::new()).build(http);
        send(client, method, url, header_map, body).await
    }
}

async fn send<C>(
    client: Client<C, Full<Bytes>>,
    method: Method,
    url: Uri,
    header_map: &HashMap<String, String>,
    body: Bytes,
) -> Result<ResponseData, BoxError>
where
    C: hyper_util::client::legacy::connect::Connect + Clone + Send + Sync + 'static,
{
    let mut req = hyper::Request::builder().method(method).uri(url);
    for (key, value) in header_map {
        req = req.header(key, value);
    }
    let req = req.body(Full::new(body))?;
    let mut res = client.request(req).await?;
    let status = res.status();
    let mut body = BytesMut::new();
    while let Some(next) = res.frame().await {
        let frame = next?;
        if let Some(chunk) = frame.data_ref() {
            body.extend_from_slice(chunk);
        }
    }
    Ok(ResponseData {
        status: status.as_u16(),
        body: Some(body.freeze()),
    })
}

static PROVIDER: Lazy<std::sync::Arc<rustls::crypto::CryptoProvider>> =
    Lazy::new(|| std::sync::Arc::new(rustls::crypto::ring::default_provider()));

fn https_config() -> Result<hyper_rustls::HttpsConnector<HttpConnector>, BoxError> {
    let tls = ClientConfig::builder_with_provider(PROVIDER.clone())
        .with_safe_default_protocol_versions()?
        .with_native_roots()?
        .with_no_client_auth();
    Ok(hyper_rustls::HttpsConnectorBuilder::new()
        .with_tls_config(tls)
        .https_or_http()
        .enable_http1()
        .enable_http2()
        .build())
}

pub fn http_status_is_ok(status: u16) -> bool {
    if let Ok(status) = StatusCode::from_u16(status) {
        !(status.is_client_error() || status.is_server_error())
    } else {
        false
    }
}
