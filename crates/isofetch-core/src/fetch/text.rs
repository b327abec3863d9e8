//! Small text GETs (checksum files).

use tokio_util::sync::CancellationToken;

use super::{classify_perform, FetchError, HttpClient};

/// Upper bound on a checksum file body.
pub const MAX_TEXT_BYTES: usize = 4 * 1024 * 1024;

impl HttpClient {
    /// GET `url` and return the body as (lossy) UTF-8. Bounded by the
    /// checksum timeout and `MAX_TEXT_BYTES`; honours `cancel`.
    pub fn fetch_text(&self, url: &str, cancel: &CancellationToken) -> Result<String, FetchError> {
        if cancel.is_cancelled() {
            return Err(FetchError::Canceled);
        }
        let mut easy = self.easy(url)?;
        easy.timeout(self.opts.checksum_timeout)
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        let mut body: Vec<u8> = Vec::new();
        let mut too_large = false;

        let performed = {
            let mut transfer = easy.transfer();
            transfer
                .write_function(|data| {
                    if cancel.is_cancelled() {
                        return Ok(0);
                    }
                    if body.len() + data.len() > MAX_TEXT_BYTES {
                        too_large = true;
                        return Ok(0);
                    }
                    body.extend_from_slice(data);
                    Ok(data.len())
                })
                .map_err(|source| FetchError::Request {
                    url: url.to_string(),
                    source,
                })?;
            transfer
                .progress_function(|_, _, _, _| !cancel.is_cancelled())
                .map_err(|source| FetchError::Request {
                    url: url.to_string(),
                    source,
                })?;
            transfer.perform()
        };

        if too_large && !cancel.is_cancelled() {
            return Err(FetchError::TooLarge {
                url: url.to_string(),
                limit: MAX_TEXT_BYTES,
            });
        }
        classify_perform(url, &mut easy, performed, cancel.is_cancelled(), None)?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}
