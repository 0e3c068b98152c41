use std::{sync::Arc, time::Duration};

use chrono::{DateTime, TimeZone};
use futures::future;
use reqwest::header::{HeaderMap, HeaderValue, REFERER, USER_AGENT};
use reqwest_cookie_store::CookieStoreMutex;
use tokio::sync::watch;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/80.0.3987.122 Safari/537.36 Edg/80.0.361.62";

/// reqwest client carrying the fixed header set and a cookie jar shared
/// across polls. Requests are never retried here.
pub struct HttpClient {
    pub client: reqwest::Client,
    pub cookies: Arc<CookieStoreMutex>,
}

#[derive(thiserror::Error, Debug)]
pub enum HttpError {
    #[error("reqwest error: {0}")]
    ReqwestError(#[from] reqwest::Error),
    #[error("unexpected HTTP status {0}")]
    Status(reqwest::StatusCode),
}

impl HttpClient {
    pub fn new(timeout: Duration) -> reqwest::Result<HttpClient> {
        let cookies = Arc::new(CookieStoreMutex::default());

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
        headers.insert(REFERER, HeaderValue::from_static(""));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .cookie_provider(cookies.clone())
            .timeout(timeout)
            .build()?;

        Ok(HttpClient { client, cookies })
    }

    /// GET `url` and return the body, failing on any non-success status
    /// without reading the body.
    pub async fn fetch_text(&self, url: reqwest::Url) -> Result<String, HttpError> {
        let resp = self.client.get(url).send().await?;
        if !resp.status().is_success() {
            return Err(HttpError::Status(resp.status()));
        }
        resp.text().await.map_err(|e| e.into())
    }

    pub async fn status_of(&self, url: &str) -> Result<reqwest::StatusCode, HttpError> {
        Ok(self.client.get(url).send().await?.status())
    }
}

/// Sortable capture timestamp used in output file names.
pub fn capture_timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format("%Y%m%d_%H%M%S").to_string()
}

/// Resolves once the shutdown flag is set. Never resolves if the sender is
/// gone without having set it.
pub async fn wait_for_shutdown(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            future::pending::<()>().await;
        }
    }
}

pub fn format_bytes(bytes: u64) -> String {
    let mut bytes = bytes as f64;
    let mut suffix = "B";

    for next in ["KiB", "MiB", "GiB", "TiB"] {
        if bytes <= 1024.0 {
            break;
        }
        bytes /= 1024.0;
        suffix = next;
    }

    format!("{:.2} {}", bytes, suffix)
}
