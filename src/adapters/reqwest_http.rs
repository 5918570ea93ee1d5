//! [`HttpClient`] over reqwest with rustls.

use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, warn};

use crate::config::ConnectorConfig;
use crate::traits::{ByteStream, Headers, HttpClient, HttpError, Response};

/// Production HTTP client for the platform live stream and file store.
///
/// ```ignore
/// let http = ReqwestHttpClient::from_config(&config)?;
/// let body = http.get_stream(&url, &headers).await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// rustls, TLS 1.2 or later, certificates verified unless `ssl_verify`
    /// is off.
    pub fn from_config(config: &ConnectorConfig) -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .min_tls_version(reqwest::tls::Version::TLS_1_2)
            .danger_accept_invalid_certs(!config.ssl_verify)
            .build()
            .map_err(|e| HttpError::Tls(e.to_string()))?;
        if !config.ssl_verify {
            warn!("Certificate verification is disabled for {}", config.base_url());
        }
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn send(&self, url: &str, headers: &Headers) -> Result<reqwest::Response, HttpError> {
        debug!("GET {}", url);
        self.client
            .get(url)
            .headers(to_header_map(headers)?)
            .send()
            .await
            .map_err(transport_error)
    }
}

fn transport_error(err: reqwest::Error) -> HttpError {
    if err.is_timeout() {
        HttpError::Timeout(err.to_string())
    } else if err.is_connect() {
        HttpError::ConnectionFailed(err.to_string())
    } else if err.is_builder() {
        HttpError::InvalidUrl(err.to_string())
    } else {
        HttpError::Other(err.to_string())
    }
}

fn to_header_map(headers: &Headers) -> Result<HeaderMap, HttpError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| HttpError::Other(format!("header name {}: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| HttpError::Other(format!("header value for {}: {}", name, e)))?;
        map.insert(name, value);
    }
    Ok(map)
}

/// Non-UTF-8 values are dropped.
fn from_header_map(map: &HeaderMap) -> Headers {
    map.iter()
        .filter_map(|(name, value)| {
            let value = value.to_str().ok()?;
            Some((name.as_str().to_string(), value.to_string()))
        })
        .collect()
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str, headers: &Headers) -> Result<Response, HttpError> {
        let response = self.send(url, headers).await?;
        let status = response.status().as_u16();
        let response_headers = from_header_map(response.headers());
        let body = response.bytes().await.map_err(transport_error)?;

        let mut response = Response::new(status, body);
        response.headers = response_headers;
        Ok(response)
    }

    async fn get_stream(&self, url: &str, headers: &Headers) -> Result<ByteStream, HttpError> {
        let response = self.send(url, headers).await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(HttpError::ServerError {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.bytes_stream().map_err(transport_error).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_with_and_without_verification() {
        let config = ConnectorConfig::new("c1", "https://platform.example");
        assert!(ReqwestHttpClient::from_config(&config).is_ok());
        assert!(ReqwestHttpClient::from_config(&config.with_ssl_verify(false)).is_ok());
    }

    #[test]
    fn test_header_map_conversion() {
        let mut headers = Headers::new();
        headers.insert("authorization".to_string(), "Bearer t".to_string());
        headers.insert("listen-delete".to_string(), "true".to_string());

        let map = to_header_map(&headers).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(from_header_map(&map), headers);
    }

    #[test]
    fn test_invalid_header_name_is_rejected() {
        let mut headers = Headers::new();
        headers.insert("bad header".to_string(), "x".to_string());
        assert!(matches!(to_header_map(&headers), Err(HttpError::Other(_))));
    }

    #[tokio::test]
    async fn test_get_stream_connection_refused() {
        let client = ReqwestHttpClient::new();
        let result = client
            .get_stream("http://127.0.0.1:59999/stream", &Headers::new())
            .await;
        assert!(matches!(
            result,
            Err(HttpError::ConnectionFailed(_)) | Err(HttpError::Other(_))
        ));
    }
}
