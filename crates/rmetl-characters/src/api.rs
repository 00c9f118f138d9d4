//! Page fetcher for the character endpoint

use std::time::Duration;

use rmetl_core::{SHARED_RUNTIME, http_client};

use crate::config::Config;
use crate::schema::Page;

/// Why a page produced no data.
///
/// Every variant carries the page number it happened on.
#[derive(Debug)]
pub enum FetchError {
    /// Server answered with a 4xx/5xx status
    Http {
        page: u32,
        status: u16,
        message: String,
    },
    /// Could not connect (DNS, refused, TLS, connect timeout)
    Connection { page: u32, message: String },
    /// Request started but did not finish in time
    Timeout { page: u32, message: String },
    /// Any other transport failure
    Request { page: u32, message: String },
    /// Body is not the expected JSON shape
    Decode { page: u32, message: String },
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http {
                page,
                status,
                message,
            } => write!(f, "HTTP {status} at page {page}: {message}"),
            Self::Connection { page, message } => {
                write!(f, "Connection error at page {page}: {message}")
            }
            Self::Timeout { page, message } => write!(f, "Timeout at page {page}: {message}"),
            Self::Request { page, message } => {
                write!(f, "Request error at page {page}: {message}")
            }
            Self::Decode { page, message } => {
                write!(f, "JSON decode error at page {page}: {message}")
            }
        }
    }
}

impl std::error::Error for FetchError {}

impl FetchError {
    /// Classify a reqwest error for `page`.
    ///
    /// Connect failures win over timeouts, so a connect timeout is a
    /// `Connection` error.
    pub fn from_reqwest(page: u32, e: &reqwest::Error) -> Self {
        let message = e.to_string();
        if let Some(status) = e.status() {
            Self::Http {
                page,
                status: status.as_u16(),
                message,
            }
        } else if e.is_connect() {
            Self::Connection { page, message }
        } else if e.is_timeout() {
            Self::Timeout { page, message }
        } else if e.is_decode() {
            Self::Decode { page, message }
        } else {
            Self::Request { page, message }
        }
    }

    pub fn page(&self) -> u32 {
        match self {
            Self::Http { page, .. }
            | Self::Connection { page, .. }
            | Self::Timeout { page, .. }
            | Self::Request { page, .. }
            | Self::Decode { page, .. } => *page,
        }
    }

    /// 404: the page index is past the last page, not a transient fault
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Http { status: 404, .. })
    }

    /// Short label for summaries
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Http { .. } => "http",
            Self::Connection { .. } => "connection",
            Self::Timeout { .. } => "timeout",
            Self::Request { .. } => "request",
            Self::Decode { .. } => "decode",
        }
    }
}

/// Anything that can hand out numbered pages.
pub trait PageSource {
    fn fetch(&self, page: u32) -> Result<Page, FetchError>;
}

/// Parse a page body.
pub fn decode_page(page: u32, body: &str) -> Result<Page, FetchError> {
    serde_json::from_str(body).map_err(|e| FetchError::Decode {
        page,
        message: e.to_string(),
    })
}

/// Live HTTP source: `GET {base_url}{resource}?page={n}`, no retry.
#[derive(Debug, Clone)]
pub struct HttpPageSource {
    base_url: String,
    resource: String,
    timeout: Duration,
}

impl HttpPageSource {
    pub fn new(base_url: impl Into<String>, resource: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            resource: resource.into(),
            timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.base_url, &config.resource, config.timeout)
    }

    pub fn page_url(&self, page: u32) -> String {
        format!("{}{}?page={page}", self.base_url, self.resource)
    }

    fn get(&self, page: u32) -> Result<Page, FetchError> {
        let url = self.page_url(page);
        let body: Result<String, reqwest::Error> = SHARED_RUNTIME.handle().block_on(async {
            http_client()
                .get(&url)
                .header(reqwest::header::ACCEPT, "application/json")
                .timeout(self.timeout)
                .send()
                .await?
                .error_for_status()?
                .text()
                .await
        });
        let body = body.map_err(|e| FetchError::from_reqwest(page, &e))?;
        decode_page(page, &body)
    }
}

impl PageSource for HttpPageSource {
    fn fetch(&self, page: u32) -> Result<Page, FetchError> {
        let result = self.get(page);
        if let Err(e) = &result {
            log::warn!("{e}");
            if e.is_exhausted() {
                log::info!("Page {page} not found - likely end of data");
            }
        }
        result
    }
}
