//! HTTP fetch feeding the dispatcher.
//!
//! A URL is downloaded with retries and exponential backoff, written to a scratch
//! file whose name carries a usable extension, and dispatched like a byte input.
//! Every resulting unit is tagged with the `url` it came from.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response, StatusCode, Url};
use serde_json::Value;

use crate::core::config::RuntimeOptions;
use crate::core::dispatch::{Dispatcher, ExtractionInput};
use crate::table::Table;
use crate::{Result, UnifileError};

/// Download behaviour for [`fetch_url`].
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Options for the extraction of the downloaded body.
    pub runtime: RuntimeOptions,
    /// Additional attempts after the first one fails with a retryable error.
    pub max_retries: u32,
    /// Delay before retry `n` is `backoff_base * 2^n`.
    pub backoff_base: Duration,
    /// Pause before every request, including the first.
    pub politeness_delay: Duration,
    pub timeout: Duration,
    pub user_agent: String,
    /// Largest body accepted, in bytes. Bigger downloads fail without retrying.
    pub max_bytes: u64,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            runtime: RuntimeOptions::default(),
            max_retries: 3,
            backoff_base: Duration::from_millis(500),
            politeness_delay: Duration::ZERO,
            timeout: Duration::from_secs(30),
            user_agent: format!("unifile/{}", env!("CARGO_PKG_VERSION")),
            max_bytes: 100 * 1024 * 1024,
        }
    }
}

struct Download {
    body: Vec<u8>,
    content_type: Option<String>,
}

fn is_retryable(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

/// Scratch filename for a download: the URL's last segment if it has an extension,
/// otherwise `page.<ext>` guessed from the content type, falling back to `page.html`.
fn filename_for(url: &Url, content_type: Option<&str>) -> String {
    let last = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();
    if last.contains('.') && !last.starts_with('.') && !last.ends_with('.') {
        return last.to_string();
    }

    let essence = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase());
    let extension = match essence.as_deref() {
        Some("text/html") | None => "html",
        Some("text/plain") => "txt",
        Some("application/json") => "json",
        Some("text/csv") => "csv",
        Some("application/xml") | Some("text/xml") => "xml",
        Some(other) => mime_guess::get_mime_extensions_str(other)
            .and_then(|exts| exts.first().copied())
            .unwrap_or("html"),
    };
    format!("page.{}", extension)
}

/// Body of `response`, or `None` once it grows past `max_bytes`.
async fn read_capped(mut response: Response, max_bytes: u64) -> std::result::Result<Option<Vec<u8>>, reqwest::Error> {
    if response.content_length().is_some_and(|len| len > max_bytes) {
        return Ok(None);
    }
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        body.extend_from_slice(&chunk);
        if body.len() as u64 > max_bytes {
            return Ok(None);
        }
    }
    Ok(Some(body))
}

async fn download(client: &Client, url: &Url, options: &FetchOptions) -> Result<Download> {
    let mut attempt = 0u32;
    loop {
        if !options.politeness_delay.is_zero() {
            tokio::time::sleep(options.politeness_delay).await;
        }

        let failure = match client.get(url.clone()).send().await {
            Ok(response) if response.status().is_success() => {
                let content_type = response
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                match read_capped(response, options.max_bytes).await {
                    Ok(Some(body)) => return Ok(Download { body, content_type }),
                    Ok(None) => {
                        return Err(UnifileError::remote(format!(
                            "Body of {} exceeds the {} byte limit",
                            url, options.max_bytes
                        )));
                    }
                    Err(e) => UnifileError::remote_with_source(format!("Failed to read body of {}", url), e),
                }
            }
            Ok(response) if is_retryable(response.status()) => {
                UnifileError::remote(format!("HTTP {} from {}", response.status(), url))
            }
            Ok(response) => {
                return Err(UnifileError::remote(format!("HTTP {} from {}", response.status(), url)));
            }
            Err(e) => UnifileError::remote_with_source(format!("Request to {} failed", url), e),
        };

        if attempt >= options.max_retries {
            return Err(UnifileError::remote_with_source(
                format!("Giving up on {} after {} attempts", url, attempt + 1),
                failure,
            ));
        }

        let delay = options.backoff_base.saturating_mul(2u32.saturating_pow(attempt));
        tracing::warn!(url = %url, attempt = attempt + 1, error = %failure, delay_ms = delay.as_millis() as u64, "Fetch failed, retrying");
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

impl Dispatcher {
    /// Download `url` and extract it into the canonical table.
    ///
    /// # Errors
    ///
    /// - `Validation` for a malformed URL or invalid runtime options
    /// - `Remote` for a non-retryable HTTP status or once retries are exhausted
    /// - `UnsupportedType` when the downloaded body has no registered extractor
    #[tracing::instrument(skip(self, options))]
    pub async fn fetch_url(&self, url: &str, options: &FetchOptions) -> Result<Table> {
        let parsed = Url::parse(url).map_err(|e| UnifileError::validation(format!("Invalid URL '{}': {}", url, e)))?;
        let client = Client::builder()
            .timeout(options.timeout)
            .user_agent(options.user_agent.as_str())
            .build()
            .map_err(|e| UnifileError::remote_with_source("Failed to build HTTP client", e))?;

        let download = download(&client, &parsed, options).await?;
        let filename = filename_for(&parsed, download.content_type.as_deref());
        tracing::debug!(url = %parsed, filename = %filename, bytes = download.body.len(), "Fetched");

        let dispatcher = self.clone();
        let runtime = options.runtime.clone();
        let input = ExtractionInput::bytes(download.body, filename);
        let mut units = tokio::task::spawn_blocking(move || dispatcher.extract_units(input, &runtime, None))
            .await
            .map_err(|e| UnifileError::Other(format!("Extraction task failed: {}", e)))??;

        for unit in &mut units {
            unit.set_metadata("url", Value::String(url.to_string()));
        }
        Ok(Table::from_units(&units))
    }
}

/// Download `url` and extract it through the process-wide dispatcher.
///
/// ```rust,no_run
/// use unifile::remote::{fetch_url, FetchOptions};
///
/// # async fn example() -> unifile::Result<()> {
/// let table = fetch_url("https://example.com/report.json", &FetchOptions::default()).await?;
/// println!("{} rows", table.len());
/// # Ok(())
/// # }
/// ```
pub async fn fetch_url(url: &str, options: &FetchOptions) -> Result<Table> {
    Dispatcher::global().fetch_url(url, options).await
}
