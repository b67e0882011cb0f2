use bytes::Bytes;
use hyper::body::Incoming;
use hyper::header::HeaderMap;
use hyper::{Method, Request, Response, StatusCode, Uri};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, warn};

use crate::contact::{ContactMessage, ContactRequest};
use crate::context::ApiContext;
use crate::error::ApiError;
use dlgate_geo::RegionSignals;
use dlgate_release::extract_version_from_tag;
use dlgate_resolver::{detect_os, resolve_plan};

pub type Body = http_body_util::Full<Bytes>;
type BoxError = Box<dyn std::error::Error + Send + Sync>;

const COUNTRY_HEADERS: [&str; 3] = ["eo-client-ipcountry", "x-vercel-ip-country", "cf-ipcountry"];

/// Dispatch one request. Handler failures are mapped to their JSON error
/// responses here, so the service layer only ever sees `Ok`.
pub async fn route(
    context: Arc<ApiContext>,
    req: Request<Incoming>,
) -> Result<Response<Body>, BoxError> {
    let method = req.method().clone();
    let path = req.uri().path().trim_matches('/').to_string();
    let segments: Vec<&str> = path.split('/').collect();

    let result = match (&method, segments.as_slice()) {
        (&Method::GET, ["api", "geo"]) => geo_get(context, req).await,
        (&Method::POST, ["api", "geo"]) => geo_post(context, req).await,
        (&Method::GET, ["api", "github-version"]) => github_version(context, req).await,
        (&Method::GET, ["api", "download-count", slug]) => {
            download_count_get(context, &slug.to_string()).await
        }
        (&Method::POST, ["api", "download-count", slug]) => {
            download_count_post(context, &slug.to_string()).await
        }
        (&Method::GET, ["api", "download-plan", slug]) => {
            download_plan(context, &slug.to_string(), req).await
        }
        (&Method::POST, ["api", "contact"]) => contact_post(context, req).await,
        (
            _,
            ["api", "geo"] | ["api", "github-version"] | ["api", "contact"]
            | ["api", "download-count", _] | ["api", "download-plan", _],
        ) => {
            return Ok(json_response(
                StatusCode::METHOD_NOT_ALLOWED,
                &json!({"error": "Method not allowed"}),
            ))
        }
        _ => Err(ApiError::not_found("Not found")),
    };

    match result {
        Ok(response) => Ok(response),
        Err(err) => {
            let status = err.status();
            if status.is_server_error() {
                error!(%method, %path, "request failed: {}", err);
            } else {
                warn!(%method, %path, %status, "request rejected: {}", err);
            }
            Ok(json_response(status, &json!({"error": err.to_string()})))
        }
    }
}

pub fn json_response(status: StatusCode, value: &Value) -> Response<Body> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Body::from(value.to_string()))
        // Infallible: status and header are statically well-formed.
        .unwrap_or_default()
}

async fn read_body(req: Request<Incoming>) -> Result<Bytes, ApiError> {
    match http_body_util::BodyExt::collect(req.into_body()).await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) => Err(ApiError::validation(format!("Failed to read body: {}", e))),
    }
}

fn parse_query(uri: &Uri) -> HashMap<String, String> {
    uri.query()
        .map(|query| {
            query
                .split('&')
                .filter_map(|pair| {
                    let mut parts = pair.splitn(2, '=');
                    let key = parts.next()?;
                    let value = parts.next().unwrap_or("");
                    Some((
                        urlencoding::decode(key).ok()?.into_owned(),
                        urlencoding::decode(value).ok()?.into_owned(),
                    ))
                })
                .collect()
        })
        .unwrap_or_default()
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// First CDN country header, or None when no header carries a usable
/// code. The literal value "unknown" is a CDN sentinel for "could not
/// classify" and counts as absent.
fn country_from_headers(headers: &HeaderMap) -> Option<String> {
    COUNTRY_HEADERS
        .iter()
        .find_map(|name| header_value(headers, name))
        .filter(|code| code != "unknown")
}

/// Client IP from the forwarding chain: first forwarded-for entry, then
/// the real-IP and CDN-specific headers.
fn client_ip_from_headers(headers: &HeaderMap) -> Option<String> {
    header_value(headers, "x-forwarded-for")
        .and_then(|chain| {
            chain
                .split(',')
                .next()
                .map(|ip| ip.trim().to_string())
                .filter(|ip| !ip.is_empty())
        })
        .or_else(|| header_value(headers, "x-real-ip"))
        .or_else(|| header_value(headers, "cf-connecting-ip"))
}

fn locale_from_headers(headers: &HeaderMap) -> Option<String> {
    header_value(headers, "accept-language").and_then(|value| {
        value
            .split(',')
            .next()
            .and_then(|tag| tag.split(';').next())
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty() && tag != "*")
    })
}

async fn geo_get(
    context: Arc<ApiContext>,
    req: Request<Incoming>,
) -> Result<Response<Body>, ApiError> {
    let headers = req.headers();
    let client_ip = client_ip_from_headers(headers);

    let mut country = country_from_headers(headers);
    if country.is_none() {
        if let Some(ip) = client_ip.as_deref() {
            country = context.classifier.lookup_country(ip).await;
        }
    }

    let is_china = country.as_deref() == Some("CN");
    let mut body = json!({
        "isChina": is_china,
        "country": country.as_deref().unwrap_or("unknown"),
    });
    if let Some(ip) = client_ip {
        body["clientIp"] = json!(ip);
    }
    Ok(json_response(StatusCode::OK, &body))
}

async fn geo_post(
    _context: Arc<ApiContext>,
    req: Request<Incoming>,
) -> Result<Response<Body>, ApiError> {
    let body = read_body(req).await?;
    let data: Value = serde_json::from_slice(&body)
        .map_err(|_| ApiError::validation("Invalid coordinates"))?;

    let latitude = data.get("latitude").and_then(|v| v.as_f64());
    let longitude = data.get("longitude").and_then(|v| v.as_f64());
    let (latitude, longitude) = match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => (latitude, longitude),
        _ => return Err(ApiError::validation("Invalid coordinates")),
    };

    let is_china = dlgate_geo::is_coordinate_in_mainland(latitude, longitude);
    Ok(json_response(
        StatusCode::OK,
        &json!({
            "isChina": is_china,
            "method": "coordinate",
            "latitude": latitude,
            "longitude": longitude,
        }),
    ))
}

async fn github_version(
    context: Arc<ApiContext>,
    req: Request<Incoming>,
) -> Result<Response<Body>, ApiError> {
    let query = parse_query(req.uri());
    let repo = query
        .get("repo")
        .ok_or_else(|| ApiError::validation("Repository parameter is required"))?;
    let include_prerelease = query.get("includePrerelease").map(String::as_str) == Some("true");

    let parts: Vec<&str> = repo.split('/').collect();
    let (owner, name) = match parts.as_slice() {
        [owner, name] if !owner.is_empty() && !name.is_empty() => (*owner, *name),
        _ => {
            return Err(ApiError::validation(
                "Invalid repository format. Expected: owner/repo",
            ))
        }
    };

    let info = context.github.get_version_info(owner, name).await;
    let release = if include_prerelease {
        info.latest.clone()
    } else {
        info.latest_stable.clone().or_else(|| info.latest.clone())
    };
    let release =
        release.ok_or_else(|| ApiError::not_found("Failed to fetch release information"))?;

    let mut body = json!({
        "version": extract_version_from_tag(&release.tag_name),
        "isPrerelease": release.prerelease,
        "tagName": release.tag_name,
        "publishedAt": release.published_at,
        "url": release.html_url,
    });
    // Surface the stable fallback only when the latest is a pre-release
    // and a differing stable release exists.
    if release.prerelease {
        if let Some(stable) = &info.latest_stable {
            if stable.tag_name != release.tag_name {
                body["stableVersion"] = json!(extract_version_from_tag(&stable.tag_name));
                body["stableTagName"] = json!(stable.tag_name);
                body["stableUrl"] = json!(stable.html_url);
            }
        }
    }
    Ok(json_response(StatusCode::OK, &body))
}

async fn download_count_get(
    context: Arc<ApiContext>,
    slug: &str,
) -> Result<Response<Body>, ApiError> {
    let count = context
        .store
        .get_count(slug)
        .await
        .map_err(|e| ApiError::upstream(format!("Failed to read counter: {}", e)))?;
    Ok(json_response(StatusCode::OK, &json!({"count": count})))
}

async fn download_count_post(
    context: Arc<ApiContext>,
    slug: &str,
) -> Result<Response<Body>, ApiError> {
    let count = context
        .store
        .increment_count(slug)
        .await
        .map_err(|e| ApiError::upstream(format!("Failed to update counter: {}", e)))?;
    match count {
        Some(count) => Ok(json_response(StatusCode::OK, &json!({"count": count}))),
        None => Ok(json_response(
            StatusCode::NOT_FOUND,
            &json!({"count": 0}),
        )),
    }
}

async fn download_plan(
    context: Arc<ApiContext>,
    slug: &str,
    req: Request<Incoming>,
) -> Result<Response<Body>, ApiError> {
    let product = context
        .store
        .get_product(slug)
        .await
        .map_err(|e| ApiError::upstream(format!("Failed to read catalog: {}", e)))?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;

    let headers = req.headers();
    let os = detect_os(
        header_value(headers, "user-agent")
            .as_deref()
            .unwrap_or(""),
    );
    let signals = RegionSignals {
        country_header: country_from_headers(headers),
        coordinates: None,
        client_ip: client_ip_from_headers(headers),
        timezone: None,
        locale: locale_from_headers(headers),
    };
    let verdict = context.classifier.classify(&signals).await;

    let mut version = product.version.clone();
    if let Some(repo) = product.github_repo.as_deref() {
        if let Some((owner, name)) = repo.split_once('/') {
            let info = context.github.get_version_info(owner, name).await;
            if let Some(release) = info.latest_stable.or(info.latest) {
                version = extract_version_from_tag(&release.tag_name).to_string();
            }
        }
    }

    let plan = resolve_plan(&product, verdict.is_mainland(), os, &version);
    let body = json!({
        "slug": product.slug,
        "isChina": verdict.is_mainland(),
        "method": verdict.method,
        "os": os,
        "version": version,
        "plan": plan,
    });
    Ok(json_response(StatusCode::OK, &body))
}

async fn contact_post(
    context: Arc<ApiContext>,
    req: Request<Incoming>,
) -> Result<Response<Body>, ApiError> {
    let body = read_body(req).await?;
    let request: ContactRequest = serde_json::from_slice(&body)
        .map_err(|_| ApiError::validation("Invalid JSON body"))?;

    request.validate()?;

    if !context.captcha.verify(&request.captcha_token).await {
        return Err(ApiError::validation("Captcha verification failed"));
    }

    let message = ContactMessage::from(&request);
    context.mailer.send(&message).await.map_err(|e| {
        error!("mail dispatch failed: {}", e);
        ApiError::upstream("Failed to send email")
    })?;

    Ok(json_response(StatusCode::OK, &json!({"success": true})))
}
