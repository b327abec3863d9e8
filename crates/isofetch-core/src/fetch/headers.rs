//! Response head tracking from curl's header callback.
//!
//! Curl reports the headers of every response in a redirect chain; a status
//! line starts a new response, so everything seen before it is discarded.

/// Fields of the most recent response head.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: Option<u32>,
    pub content_length: Option<u64>,
    pub content_type: Option<String>,
}

impl ResponseHead {
    /// Feed one raw header line (as curl hands it over, CRLF included).
    pub fn observe(&mut self, raw: &[u8]) {
        let line = String::from_utf8_lossy(raw);
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        if line.starts_with("HTTP/") {
            *self = ResponseHead {
                status: parse_status_code(line),
                ..ResponseHead::default()
            };
            return;
        }
        let Some((name, value)) = line.split_once(':') else {
            return;
        };
        let name = name.trim();
        let value = value.trim();
        if name.eq_ignore_ascii_case("content-length") {
            self.content_length = value.parse::<u64>().ok();
        } else if name.eq_ignore_ascii_case("content-type") {
            self.content_type = Some(value.to_string());
        }
    }
}

fn parse_status_code(line: &str) -> Option<u32> {
    line.split_whitespace().nth(1)?.parse().ok()
}
