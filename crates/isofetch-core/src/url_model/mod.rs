//! URL modeling and filename derivation.
//!
//! Two names matter for every job: the *remote* filename (what the publisher
//! calls the artifact, and what checksum files reference) and the *local*
//! filename the artifact is published under, which is sanitized and may be
//! overridden by the caller.

mod path;
mod sanitize;

pub use path::remote_filename;
pub use sanitize::sanitize_filename;

/// Fallback when neither the override nor the URL path yields a usable name.
pub const DEFAULT_FILENAME: &str = "download.img";

/// Derives the local publish name for a download.
///
/// Prefers `name_override` when it sanitizes to something usable, otherwise
/// the last path segment of `url`.
///
/// # Examples
///
/// - `local_filename("https://example.com/debian-12.iso", None)` → `"debian-12.iso"`
/// - `local_filename("https://example.com/latest", Some("alpine 3.20.iso"))` → `"alpine_3.20.iso"`
pub fn local_filename(url: &str, name_override: Option<&str>) -> String {
    name_override
        .map(sanitize_filename)
        .filter(|s| is_usable(s))
        .or_else(|| {
            remote_filename(url)
                .map(|raw| sanitize_filename(&raw))
                .filter(|s| is_usable(s))
        })
        .unwrap_or_else(|| DEFAULT_FILENAME.to_string())
}

/// Accepts only `http` and `https` URLs that carry a host.
pub fn validate_source_url(url: &str) -> Result<url::Url, String> {
    let parsed = url::Url::parse(url).map_err(|e| format!("invalid URL {url:?}: {e}"))?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(format!("unsupported URL scheme {other:?} in {url}")),
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(format!("URL has no host: {url}"));
    }
    Ok(parsed)
}

fn is_usable(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".."
}
