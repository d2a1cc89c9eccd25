//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves configurable routes (pages, documents, status codes, redirects,
//! truncated bodies, slow responses) and counts requests per path. One
//! request per connection; unknown paths get 404.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Route {
    pub status: u16,
    pub body: Vec<u8>,
    pub content_type: &'static str,
    pub location: Option<String>,
    pub delay: Duration,
    /// Advertise the full length but close after this many bytes.
    pub truncate_at: Option<usize>,
}

impl Route {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            content_type: "application/octet-stream",
            location: None,
            delay: Duration::ZERO,
            truncate_at: None,
        }
    }

    pub fn html(body: &str) -> Self {
        Self {
            content_type: "text/html; charset=utf-8",
            ..Self::ok(body.as_bytes().to_vec())
        }
    }

    pub fn status(code: u16) -> Self {
        Self {
            status: code,
            ..Self::ok(format!("status {}", code).into_bytes())
        }
    }

    pub fn redirect(location: &str) -> Self {
        Self {
            status: 302,
            location: Some(location.to_string()),
            ..Self::ok(Vec::new())
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn truncated(mut self, at: usize) -> Self {
        self.truncate_at = Some(at);
        self
    }
}

#[derive(Clone)]
pub struct DocServer {
    base: String,
    routes: Arc<Mutex<HashMap<String, Route>>>,
    hits: Arc<Mutex<HashMap<String, usize>>>,
    cookies: Arc<Mutex<Vec<String>>>,
}

impl DocServer {
    /// Starts the server in a background thread; it runs until the process exits.
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().unwrap().port();
        let server = DocServer {
            base: format!("http://127.0.0.1:{}", port),
            routes: Arc::default(),
            hits: Arc::default(),
            cookies: Arc::default(),
        };
        let shared = server.clone();
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let s = shared.clone();
                thread::spawn(move || s.handle(stream));
            }
        });
        server
    }

    /// `path` must start with `/`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn route(&self, path: &str, route: Route) {
        self.routes.lock().unwrap().insert(path.to_string(), route);
    }

    pub fn hits(&self, path: &str) -> usize {
        self.hits.lock().unwrap().get(path).copied().unwrap_or(0)
    }

    pub fn total_hits(&self) -> usize {
        self.hits.lock().unwrap().values().sum()
    }

    /// `Cookie` header values seen so far.
    pub fn cookies_seen(&self) -> Vec<String> {
        self.cookies.lock().unwrap().clone()
    }

    fn handle(&self, mut stream: TcpStream) {
        let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
        let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut chunk) {
                Ok(0) | Err(_) => return,
                Ok(n) => buf.extend_from_slice(&chunk[..n]),
            }
        }
        let request = String::from_utf8_lossy(&buf).into_owned();
        let mut lines = request.lines();
        let target = lines
            .next()
            .and_then(|l| l.split_whitespace().nth(1))
            .unwrap_or("/")
            .to_string();
        for line in lines {
            if let Some((name, value)) = line.split_once(':') {
                if name.trim().eq_ignore_ascii_case("cookie") {
                    self.cookies.lock().unwrap().push(value.trim().to_string());
                }
            }
        }
        let path = target.split('?').next().unwrap_or("/").to_string();
        *self.hits.lock().unwrap().entry(path.clone()).or_insert(0) += 1;

        let route = self
            .routes
            .lock()
            .unwrap()
            .get(&path)
            .cloned()
            .unwrap_or_else(|| Route::status(404));
        if !route.delay.is_zero() {
            thread::sleep(route.delay);
        }

        let mut head = format!(
            "HTTP/1.1 {} X\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n",
            route.status,
            route.content_type,
            route.body.len()
        );
        if let Some(loc) = &route.location {
            head.push_str(&format!("Location: {}\r\n", loc));
        }
        head.push_str("\r\n");
        let _ = stream.write_all(head.as_bytes());
        let body = match route.truncate_at {
            Some(n) => &route.body[..n.min(route.body.len())],
            None => &route.body[..],
        };
        let _ = stream.write_all(body);
        let _ = stream.flush();
    }
}
