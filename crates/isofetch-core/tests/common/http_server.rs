//! Minimal threaded HTTP/1.1 server for integration tests.
//!
//! Serves a fixed table of paths. Unknown paths get 404. A route can be
//! throttled to stream its body in small chunks, which keeps a transfer in
//! flight long enough to cancel it.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Route {
    pub status: u16,
    pub body: Vec<u8>,
    /// Send `Content-Length`; when false the body is terminated by close.
    pub content_length: bool,
    /// Stream in `(chunk_size, delay)` steps instead of one write.
    pub throttle: Option<(usize, Duration)>,
}

impl Route {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            content_length: true,
            throttle: None,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: format!("status {status}").into_bytes(),
            content_length: true,
            throttle: None,
        }
    }

    pub fn without_length(mut self) -> Self {
        self.content_length = false;
        self
    }

    pub fn throttled(mut self, chunk: usize, delay: Duration) -> Self {
        self.throttle = Some((chunk.max(1), delay));
        self
    }
}

/// Start serving `routes` on an ephemeral port. Returns the base URL without
/// a trailing slash, e.g. `http://127.0.0.1:40123`. Runs until process exit.
pub fn start(routes: Vec<(&str, Route)>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let routes: Arc<HashMap<String, Route>> = Arc::new(
        routes
            .into_iter()
            .map(|(path, route)| (path.to_string(), route))
            .collect(),
    );
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let routes = Arc::clone(&routes);
            thread::spawn(move || handle(stream, &routes));
        }
    });
    format!("http://127.0.0.1:{port}")
}

fn handle(mut stream: TcpStream, routes: &HashMap<String, Route>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let Ok(request) = std::str::from_utf8(&buf[..n]) else {
        return;
    };
    let path = request
        .lines()
        .next()
        .and_then(|l| l.split_whitespace().nth(1))
        .unwrap_or("/");

    let not_found = Route::status(404);
    let route = routes.get(path).unwrap_or(&not_found);
    let reason = match route.status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Status",
    };
    let mut head = format!("HTTP/1.1 {} {}\r\nConnection: close\r\n", route.status, reason);
    if route.content_length {
        head.push_str(&format!("Content-Length: {}\r\n", route.body.len()));
    }
    head.push_str("\r\n");
    if stream.write_all(head.as_bytes()).is_err() {
        return;
    }
    match route.throttle {
        None => {
            let _ = stream.write_all(&route.body);
        }
        Some((chunk, delay)) => {
            for part in route.body.chunks(chunk) {
                if stream.write_all(part).is_err() || stream.flush().is_err() {
                    return;
                }
                thread::sleep(delay);
            }
        }
    }
}
