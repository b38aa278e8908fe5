//! ADS-B Aggregator Client
//!
//! Fetches aircraft snapshots from the public aggregator. Only https URLs on
//! the configured host allow-list are ever requested, and a response is only
//! accepted when it is a 200 with a non-empty JSON body.

use std::time::Duration;

use reqwest::{header::CONTENT_TYPE, StatusCode, Url};
use tracing::debug;

use crate::config::defaults::ALLOWED_API_HOSTS;
use crate::geo::Coordinates;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("aggregator returned status {0}")]
    NonOk(StatusCode),
    #[error("aggregator returned an empty body")]
    EmptyBody,
    #[error("aggregator returned non-JSON content type '{0}'")]
    NonJson(String),
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("host '{0}' is not on the allow-list")]
    UnauthorizedHost(String),
}

/// Nearby-traffic endpoint for a location and radius (nautical miles).
pub fn aircraft_url(host: &str, location: Coordinates, radius_nm: u32) -> String {
    format!(
        "https://{host}/api/v2/lat/{:.6}/lon/{:.6}/dist/{radius_nm}",
        location.latitude, location.longitude
    )
}

/// Worldwide military endpoint.
pub fn military_url(host: &str) -> String {
    format!("https://{host}/api/v2/mil")
}

/// Reject anything that is not https on an allow-listed host.
pub fn validate_url(raw: &str) -> Result<Url, FetchError> {
    let url = Url::parse(raw).map_err(|e| FetchError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    if url.scheme() != "https" {
        return Err(FetchError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("scheme '{}' is not https", url.scheme()),
        });
    }
    let host = url.host_str().unwrap_or_default();
    if !ALLOWED_API_HOSTS.contains(&host) {
        return Err(FetchError::UnauthorizedHost(host.to_string()));
    }
    Ok(url)
}

fn is_json(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
}

/// Thin wrapper over a `reqwest::Client` with the aggregator's rules applied.
#[derive(Clone)]
pub struct AdsbClient {
    http: reqwest::Client,
}

impl AdsbClient {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .https_only(true)
            .user_agent(concat!("airspottr/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http })
    }

    /// GET `url` and return the raw JSON body.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let url = validate_url(url)?;
        debug!(url = %url, "Fetching aircraft snapshot");

        let resp = self.http.get(url).send().await?;
        if resp.status() != StatusCode::OK {
            return Err(FetchError::NonOk(resp.status()));
        }

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !is_json(&content_type) {
            return Err(FetchError::NonJson(content_type));
        }

        let body = resp.bytes().await?;
        if body.is_empty() {
            return Err(FetchError::EmptyBody);
        }
        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aircraft_url_format() {
        let url = aircraft_url("opendata.adsb.fi", Coordinates::new(1.359_297, 103.989_348), 250);
        assert_eq!(
            url,
            "https://opendata.adsb.fi/api/v2/lat/1.359297/lon/103.989348/dist/250"
        );
        assert!(validate_url(&url).is_ok());
    }

    #[test]
    fn test_validate_rejects_plain_http() {
        assert!(matches!(
            validate_url("http://opendata.adsb.fi/api/v2/mil"),
            Err(FetchError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_unlisted_host() {
        assert!(matches!(
            validate_url("https://example.com/api/v2/mil"),
            Err(FetchError::UnauthorizedHost(host)) if host == "example.com"
        ));
    }

    #[test]
    fn test_validate_rejects_garbage() {
        assert!(matches!(
            validate_url("not a url"),
            Err(FetchError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_json_content_type_detection() {
        assert!(is_json("application/json"));
        assert!(is_json("application/json; charset=utf-8"));
        assert!(!is_json("text/html"));
        assert!(!is_json(""));
    }

    #[test]
    fn test_military_url() {
        assert_eq!(military_url("opendata.adsb.fi"), "https://opendata.adsb.fi/api/v2/mil");
    }
}
