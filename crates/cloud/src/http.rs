//! HTTP client wrapper: byte ranges for COG tiles, JSON for STAC, retry with
//! exponential backoff.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt, TryStreamExt};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::auth::{CloudAuth, NoAuth};
use crate::error::{CloudError, Result};

const BASE_BACKOFF_MS: u64 = 250;

/// Shared HTTP client. Cheap to clone.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    auth: Arc<dyn CloudAuth>,
    max_retries: u32,
    request_timeout: Duration,
}

/// Response from a HEAD request.
#[derive(Debug, Clone, Copy)]
pub struct HeadInfo {
    pub content_length: Option<u64>,
    pub accept_ranges: bool,
}

impl HttpClient {
    pub fn new(request_timeout: Duration, max_retries: u32) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("tidemark/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, auth: Arc::new(NoAuth), max_retries, request_timeout })
    }

    pub fn with_auth(mut self, auth: Arc<dyn CloudAuth>) -> Self {
        self.auth = auth;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    fn authorized(&self, mut req: RequestBuilder, url: &str, method: &str) -> Result<RequestBuilder> {
        let mut headers = Vec::new();
        self.auth.sign_request(url, method, &mut headers)?;
        for (key, value) in &headers {
            req = req.header(key.as_str(), value.as_str());
        }
        Ok(req)
    }

    pub async fn head(&self, url: &str) -> Result<HeadInfo> {
        let req = self.authorized(self.client.head(url), url, "HEAD")?;
        let resp = check_status(self.execute_with_retry(req).await?, url)?;

        let accept_ranges = resp
            .headers()
            .get(reqwest::header::ACCEPT_RANGES)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains("bytes"))
            .unwrap_or(false);
        let content_length = resp
            .headers()
            .get(reqwest::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());

        Ok(HeadInfo { content_length, accept_ranges })
    }

    /// Bytes `[offset, offset + length)` of a remote file.
    ///
    /// A server that ignores the `Range` header and answers 200 with the whole
    /// body is tolerated: the requested slice is cut out of the full response.
    pub async fn fetch_range(&self, url: &str, offset: u64, length: u64) -> Result<Vec<u8>> {
        if length == 0 {
            return Ok(Vec::new());
        }
        let range = format!("bytes={}-{}", offset, offset + length - 1);
        let req = self.authorized(self.client.get(url).header(reqwest::header::RANGE, range), url, "GET")?;
        let resp = check_status(self.execute_with_retry(req).await?, url)?;
        let partial = resp.status() == StatusCode::PARTIAL_CONTENT;
        let body = resp.bytes().await?;

        if partial {
            return Ok(body.to_vec());
        }
        warn!("{} ignored the Range header; sliced {} bytes from a full download", url, length);
        let start = (offset as usize).min(body.len());
        let end = (start + length as usize).min(body.len());
        Ok(body[start..end].to_vec())
    }

    /// Fetch several ranges with at most `concurrency` requests in flight.
    /// Results keep the order of `ranges`.
    pub async fn fetch_ranges(&self, url: &str, ranges: &[(u64, u64)], concurrency: usize) -> Result<Vec<Vec<u8>>> {
        stream::iter(ranges.iter().map(|&(offset, length)| self.fetch_range(url, offset, length)))
            .buffered(concurrency.max(1))
            .try_collect()
            .await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let req = self.authorized(self.client.get(url), url, "GET")?;
        let resp = check_status(self.execute_with_retry(req).await?, url)?;
        Ok(serde_json::from_slice(&resp.bytes().await?)?)
    }

    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(&self, url: &str, body: &B) -> Result<T> {
        let req = self.authorized(self.client.post(url).json(body), url, "POST")?;
        let resp = check_status(self.execute_with_retry(req).await?, url)?;
        Ok(serde_json::from_slice(&resp.bytes().await?)?)
    }

    /// Send with exponential backoff on timeouts, connection errors, 429 and
    /// 5xx responses. Other responses are returned as-is.
    async fn execute_with_retry(&self, request: RequestBuilder) -> Result<Response> {
        let mut attempt = 0;
        loop {
            let Some(req) = request.try_clone() else {
                return Ok(request.send().await?);
            };
            match req.send().await {
                Ok(resp) if is_transient_status(resp.status()) && attempt < self.max_retries => {
                    debug!("HTTP {} from {}, retrying", resp.status(), resp.url());
                }
                Ok(resp) => return Ok(resp),
                Err(e) if (e.is_timeout() || e.is_connect()) && attempt < self.max_retries => {
                    debug!("transient HTTP error: {e}, retrying");
                }
                Err(e) => return Err(e.into()),
            }
            attempt += 1;
            tokio::time::sleep(Duration::from_millis(BASE_BACKOFF_MS << (attempt - 1))).await;
        }
    }
}

fn is_transient_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Map 401/403 to [`CloudError::Auth`] and other failures to [`CloudError::Status`].
fn check_status(resp: Response, url: &str) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp)
    } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        Err(CloudError::Auth(format!("HTTP {} from {}", status.as_u16(), url)))
    } else {
        Err(CloudError::Status { status: status.as_u16(), url: url.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_statuses() {
        assert!(is_transient_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_transient_status(StatusCode::BAD_GATEWAY));
        assert!(!is_transient_status(StatusCode::NOT_FOUND));
        assert!(!is_transient_status(StatusCode::FORBIDDEN));
    }

    #[tokio::test]
    async fn range_request_and_auth_mapping() {
        let mut server = mockito::Server::new_async().await;
        let ok = server
            .mock("GET", "/b03.tif")
            .match_header("range", "bytes=4-7")
            .with_status(206)
            .with_body([4u8, 5, 6, 7])
            .create_async()
            .await;
        let denied = server.mock("GET", "/secret.tif").with_status(403).create_async().await;

        let client = HttpClient::new(Duration::from_secs(5), 0).unwrap();
        let bytes = client.fetch_range(&format!("{}/b03.tif", server.url()), 4, 4).await.unwrap();
        assert_eq!(bytes, vec![4, 5, 6, 7]);

        let err = client.fetch_range(&format!("{}/secret.tif", server.url()), 0, 4).await.unwrap_err();
        assert!(err.is_auth());
        ok.assert_async().await;
        denied.assert_async().await;
    }

    #[tokio::test]
    async fn full_body_is_sliced_when_range_ignored() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/plain.tif")
            .with_status(200)
            .with_body((0u8..16).collect::<Vec<_>>())
            .create_async()
            .await;
        let client = HttpClient::new(Duration::from_secs(5), 0).unwrap();
        let bytes = client.fetch_range(&format!("{}/plain.tif", server.url()), 10, 3).await.unwrap();
        assert_eq!(bytes, vec![10, 11, 12]);
    }

    #[tokio::test]
    async fn server_errors_are_retried() {
        let mut server = mockito::Server::new_async().await;
        let failing = server.mock("GET", "/flaky").with_status(503).expect(3).create_async().await;
        let client = HttpClient::new(Duration::from_secs(5), 2).unwrap();
        let err = client.get_json::<serde_json::Value>(&format!("{}/flaky", server.url())).await.unwrap_err();
        assert!(matches!(err, CloudError::Status { status: 503, .. }));
        failing.assert_async().await;
    }
}
