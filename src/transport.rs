//! HTTP transport used by the request executor.

use std::fmt;
use std::io::Read;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use tracing::warn;

use crate::config::ClientConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::util::{backoff, retriable_status};

/// Raw response: status code and body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs a single GET.
pub trait Transport: Send + Sync + fmt::Debug {
    fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse>;
}

/// `reqwest` blocking transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: HttpClient,
    progress: bool,
}

impl HttpTransport {
    pub fn new(cfg: &ClientConfig) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("cmapapi-rs/{}", env!("CARGO_PKG_VERSION")))
                .unwrap_or(HeaderValue::from_static("cmapapi-rs")),
        );

        let http = HttpClient::builder()
            .default_headers(default_headers)
            .connect_timeout(cfg.connect_timeout)
            .timeout(cfg.timeout)
            .build()
            .map_err(|e| {
                Error::with_source(
                    ErrorKind::TransportError("failed to build HTTP client".into()),
                    e,
                )
            })?;

        Ok(Self {
            http,
            progress: cfg.progress,
        })
    }

    fn spinner(&self, total: Option<u64>) -> Option<ProgressBar> {
        if !self.progress {
            return None;
        }
        let pb = match total {
            Some(n) => ProgressBar::new(n),
            None => ProgressBar::new_spinner(),
        };
        let style = ProgressStyle::with_template(
            "{spinner:.green} {bytes} downloaded ({bytes_per_sec}) {elapsed}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
        pb.set_style(style);
        Some(pb)
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse> {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::with_source(ErrorKind::MalformedRequest(e.to_string()), e))?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                Error::with_source(
                    ErrorKind::MalformedRequest("header value is not valid ASCII".into()),
                    e,
                )
            })?;
            map.insert(name, value);
        }

        let mut resp = self.http.get(url).headers(map).send()?;
        let status = resp.status().as_u16();

        let pb = self.spinner(resp.content_length());
        let mut bytes = Vec::new();
        let mut buf = [0u8; 64 * 1024];
        loop {
            let n = resp.read(&mut buf).map_err(|e| {
                Error::with_source(
                    ErrorKind::TransportError("response body interrupted".into()),
                    e,
                )
            })?;
            if n == 0 {
                break;
            }
            bytes.extend_from_slice(&buf[..n]);
            if let Some(pb) = &pb {
                pb.inc(n as u64);
            }
        }
        if let Some(pb) = &pb {
            pb.finish_and_clear();
        }

        let body = String::from_utf8(bytes).map_err(|e| {
            Error::with_source(
                ErrorKind::MalformedResponse("response body is not UTF-8".into()),
                e,
            )
        })?;

        Ok(HttpResponse { status, body })
    }
}

/// Bounded retry around another transport.
///
/// Retries transport failures and retriable statuses (408, 429, 5xx gateway
/// errors). After `retry_max` attempts the last outcome is returned as is.
#[derive(Debug, Clone)]
pub struct RetryingTransport {
    inner: Arc<dyn Transport>,
    retry_max: usize,
    sleep_max: Duration,
}

impl RetryingTransport {
    pub fn new(inner: Arc<dyn Transport>, retry_max: usize, sleep_max: Duration) -> Self {
        Self {
            inner,
            retry_max: retry_max.max(1),
            sleep_max,
        }
    }
}

impl Transport for RetryingTransport {
    fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse> {
        let mut tries = 0usize;
        let mut sleep = Duration::ZERO;
        loop {
            tries += 1;
            let result = self.inner.get(url, headers);

            let retry = match &result {
                Ok(resp) => retriable_status(resp.status),
                Err(err) => err.is_retryable(),
            };
            if !retry || tries >= self.retry_max {
                return result;
            }

            sleep = backoff(sleep, self.sleep_max);
            match &result {
                Ok(resp) => warn!(
                    attempt = tries,
                    status = resp.status,
                    delay_ms = sleep.as_millis() as u64,
                    "retriable status, retrying"
                ),
                Err(err) => warn!(
                    attempt = tries,
                    delay_ms = sleep.as_millis() as u64,
                    error = %err,
                    "request failed, retrying"
                ),
            }
            thread::sleep(sleep);
        }
    }
}
