//! Remote filename extraction from a URL path.

/// Returns the last non-empty path segment of `url`, exactly as it appears in
/// the URL (no sanitizing). Checksum files published next to an artifact list
/// it under this name.
///
/// Returns `None` if the URL cannot be parsed or the path is empty/root.
pub fn remote_filename(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
    if segment == "." || segment == ".." {
        return None;
    }
    Some(segment.to_string())
}
