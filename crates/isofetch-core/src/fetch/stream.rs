//! Streaming GET: hands each body chunk to a caller-supplied sink.

use std::cell::RefCell;
use std::io;

use tokio_util::sync::CancellationToken;

use super::{classify_perform, FetchError, HttpClient, ResponseHead};

impl HttpClient {
    /// Stream the body of `url` into `on_data`, which receives each chunk and
    /// the announced total size (if the final response had a Content-Length).
    ///
    /// Cancellation is checked before every chunk and from curl's progress
    /// callback, so an idle connection is aborted too. Status >= 400 fails
    /// before any byte is handed to `on_data`. Returns the bytes delivered.
    pub fn stream<F>(&self, url: &str, cancel: &CancellationToken, mut on_data: F) -> Result<u64, FetchError>
    where
        F: FnMut(&[u8], Option<u64>) -> io::Result<()>,
    {
        if cancel.is_cancelled() {
            return Err(FetchError::Canceled);
        }
        let mut easy = self.easy(url)?;

        let head = RefCell::new(ResponseHead::default());
        let mut delivered: u64 = 0;
        let mut write_error: Option<io::Error> = None;

        let performed = {
            let mut transfer = easy.transfer();
            transfer
                .header_function(|line| {
                    head.borrow_mut().observe(line);
                    true
                })
                .map_err(|source| FetchError::Request {
                    url: url.to_string(),
                    source,
                })?;
            transfer
                .write_function(|data| {
                    if cancel.is_cancelled() {
                        // Short count makes curl abort with a write error.
                        return Ok(0);
                    }
                    let total = head.borrow().content_length;
                    match on_data(data, total) {
                        Ok(()) => {
                            delivered += data.len() as u64;
                            Ok(data.len())
                        }
                        Err(e) => {
                            write_error = Some(e);
                            Ok(0)
                        }
                    }
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

        classify_perform(url, &mut easy, performed, cancel.is_cancelled(), write_error)?;
        tracing::debug!(url, bytes = delivered, "stream finished");
        Ok(delivered)
    }
}
