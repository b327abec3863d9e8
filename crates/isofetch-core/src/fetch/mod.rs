//! HTTP transport (libcurl via the `curl` crate).
//!
//! Blocking calls; run them from `spawn_blocking` when used from async code.
//! Both entry points observe a `CancellationToken` from inside curl's
//! callbacks, so a cancel lands mid-transfer rather than at call boundaries.

mod headers;
mod stream;
mod text;

use std::time::Duration;

use crate::config::FetchConfig;

pub use headers::ResponseHead;

/// Redirect hops followed before giving up.
const MAX_REDIRECTS: u32 = 10;

/// Options shared by payload and checksum requests.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub connect_timeout: Duration,
    /// Total deadline for checksum-file requests. Payload streams have no
    /// overall or read deadline; only cancellation bounds them.
    pub checksum_timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self::from_config(&FetchConfig::default())
    }
}

impl HttpOptions {
    pub fn from_config(cfg: &FetchConfig) -> Self {
        Self {
            connect_timeout: cfg.connect_timeout(),
            checksum_timeout: cfg.checksum_timeout(),
            user_agent: concat!("isofetch/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Transport errors. Cancellation is its own variant so callers never
/// mistake it for a network failure.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("invalid request for {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: curl::Error,
    },
    #[error("GET {url} returned HTTP {code}")]
    Status { url: String, code: u32 },
    #[error("transfer from {url} failed: {source}")]
    Transfer {
        url: String,
        #[source]
        source: curl::Error,
    },
    #[error("write failed: {0}")]
    Write(#[source] std::io::Error),
    #[error("response from {url} exceeds {limit} bytes")]
    TooLarge { url: String, limit: usize },
    #[error("download canceled")]
    Canceled,
}

impl FetchError {
    pub fn is_canceled(&self) -> bool {
        matches!(self, FetchError::Canceled)
    }
}

/// Curl-backed HTTP client; cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct HttpClient {
    opts: HttpOptions,
}

impl HttpClient {
    pub fn new(opts: HttpOptions) -> Self {
        Self { opts }
    }

    pub fn options(&self) -> &HttpOptions {
        &self.opts
    }

    /// Easy handle with the settings every request shares.
    fn easy(&self, url: &str) -> Result<curl::easy::Easy, FetchError> {
        let request_err = |source| FetchError::Request {
            url: url.to_string(),
            source,
        };
        let mut easy = curl::easy::Easy::new();
        easy.url(url).map_err(request_err)?;
        easy.follow_location(true).map_err(request_err)?;
        easy.max_redirections(MAX_REDIRECTS).map_err(request_err)?;
        easy.connect_timeout(self.opts.connect_timeout)
            .map_err(request_err)?;
        easy.useragent(&self.opts.user_agent).map_err(request_err)?;
        // Fail on >= 400 before any body byte reaches the write callback.
        easy.fail_on_error(true).map_err(request_err)?;
        // Enables the progress callback, which curl also calls while idle;
        // that is where cancellation is observed on a stalled connection.
        easy.progress(true).map_err(request_err)?;
        Ok(easy)
    }
}

/// Maps the outcome of `perform` into a `FetchError`, checking cancellation
/// first so an aborted transfer is never reported as a network failure.
fn classify_perform(
    url: &str,
    easy: &mut curl::easy::Easy,
    performed: Result<(), curl::Error>,
    canceled: bool,
    write_error: Option<std::io::Error>,
) -> Result<(), FetchError> {
    if canceled {
        return Err(FetchError::Canceled);
    }
    if let Some(e) = write_error {
        return Err(FetchError::Write(e));
    }
    if let Err(source) = performed {
        if source.is_http_returned_error() {
            let code = easy.response_code().unwrap_or(0);
            return Err(FetchError::Status {
                url: url.to_string(),
                code,
            });
        }
        return Err(FetchError::Transfer {
            url: url.to_string(),
            source,
        });
    }
    let code = easy.response_code().map_err(|source| FetchError::Transfer {
        url: url.to_string(),
        source,
    })?;
    if !(200..300).contains(&code) {
        return Err(FetchError::Status {
            url: url.to_string(),
            code,
        });
    }
    Ok(())
}
