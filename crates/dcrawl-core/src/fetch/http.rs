//! libcurl plumbing shared by page fetches and document downloads.

use std::collections::HashMap;
use std::io::{self, Write};
use std::time::Duration;

use crate::config::HttpConfig;

use super::FetchError;

/// A fetched HTML page.
#[derive(Debug, Clone)]
pub struct PageResponse {
    pub code: u32,
    /// URL after redirects.
    pub effective_url: String,
    pub body: String,
}

/// Blocking HTTP client settings. Each request uses its own easy handle, so
/// one `HttpClient` can be shared by every download thread.
#[derive(Debug, Clone)]
pub struct HttpClient {
    user_agent: String,
    connect_timeout: Duration,
    timeout: Duration,
}

impl HttpClient {
    pub fn new(cfg: &HttpConfig) -> Self {
        Self {
            user_agent: cfg.user_agent.clone(),
            connect_timeout: cfg.connect_timeout(),
            timeout: cfg.timeout(),
        }
    }

    fn easy(&self, url: &str, headers: &HashMap<String, String>) -> Result<curl::easy::Easy, curl::Error> {
        let mut easy = curl::easy::Easy::new();
        easy.url(url)?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.useragent(&self.user_agent)?;
        easy.connect_timeout(self.connect_timeout)?;
        easy.timeout(self.timeout)?;

        let mut list = curl::easy::List::new();
        for (k, v) in headers {
            list.append(&format!("{}: {}", k.trim(), v.trim()))?;
        }
        if !headers.is_empty() {
            easy.http_headers(list)?;
        }
        Ok(easy)
    }

    /// GET `url` and return status, final URL and body (lossy UTF-8).
    pub fn get_page(&self, url: &str, headers: &HashMap<String, String>) -> Result<PageResponse, curl::Error> {
        let mut easy = self.easy(url, headers)?;
        let mut body = Vec::new();
        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform()?;
        }
        let code = easy.response_code()?;
        let effective_url = easy
            .effective_url()?
            .map(str::to_string)
            .unwrap_or_else(|| url.to_string());
        Ok(PageResponse {
            code,
            effective_url,
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }

    /// Stream the body of `url` into `sink`. Returns the HTTP status; the
    /// caller decides what a non-2xx body means.
    pub fn download<W: Write>(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        sink: &mut W,
    ) -> Result<u32, FetchError> {
        let mut easy = self
            .easy(url, headers)
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        let mut write_err: Option<io::Error> = None;
        let performed = {
            let mut transfer = easy.transfer();
            transfer
                .write_function(|data| match sink.write_all(data) {
                    Ok(()) => Ok(data.len()),
                    Err(e) => {
                        write_err = Some(e);
                        Ok(0) // abort transfer
                    }
                })
                .map_err(|e| FetchError::Transport(e.to_string()))?;
            transfer.perform()
        };
        if let Some(e) = write_err {
            return Err(FetchError::Storage(e));
        }
        performed.map_err(|e| FetchError::Transport(e.to_string()))?;
        easy.response_code()
            .map_err(|e| FetchError::Transport(e.to_string()))
    }
}
