//! Anchor scanning with section preference.

use scraper::{Html, Selector};
use url::Url;

use crate::config::LinksConfig;
use crate::fetch::HttpClient;
use crate::session::Session;

use super::{LinkExtractor, LinkOutcome};

#[derive(Debug, thiserror::Error)]
#[error("invalid CSS selector {selector:?}: {message}")]
pub struct SelectorError {
    pub selector: String,
    pub message: String,
}

fn parse_selector(s: &str) -> Result<Selector, SelectorError> {
    Selector::parse(s).map_err(|e| SelectorError {
        selector: s.to_string(),
        message: e.to_string(),
    })
}

/// Fetches a page with the session's cookies and returns the document links
/// of the first selector group that yields any.
pub struct HtmlLinkExtractor {
    http: HttpClient,
    selectors: Vec<String>,
    extensions: Vec<String>,
    login_url_fragment: String,
}

impl HtmlLinkExtractor {
    /// Fails if any configured selector does not parse.
    pub fn new(cfg: &LinksConfig, login_url_fragment: &str, http: HttpClient) -> Result<Self, SelectorError> {
        for s in &cfg.selectors {
            parse_selector(s)?;
        }
        Ok(Self {
            http,
            selectors: cfg.selectors.clone(),
            extensions: cfg.extensions.iter().map(|e| e.to_lowercase()).collect(),
            login_url_fragment: login_url_fragment.to_string(),
        })
    }
}

impl LinkExtractor for HtmlLinkExtractor {
    fn find_document_links(&self, url: &str, session: &dyn Session) -> LinkOutcome {
        let page = match self.http.get_page(url, &session.headers()) {
            Ok(p) => p,
            Err(e) => return LinkOutcome::Error(format!("fetch page: {}", e)),
        };
        if !self.login_url_fragment.is_empty() && page.effective_url.contains(&self.login_url_fragment) {
            tracing::info!(url, redirected = %page.effective_url, "page redirected to login");
            return LinkOutcome::AuthRequired;
        }
        match page.code {
            200..=299 => {}
            401 | 403 => return LinkOutcome::AuthRequired,
            code => return LinkOutcome::Error(format!("HTTP {}", code)),
        }

        let selectors = match self
            .selectors
            .iter()
            .map(|s| parse_selector(s))
            .collect::<Result<Vec<_>, _>>()
        {
            Ok(v) => v,
            Err(e) => return LinkOutcome::Error(e.to_string()),
        };
        let links = extract_links(&page.body, &page.effective_url, &selectors, &self.extensions);
        tracing::debug!(url, count = links.len(), "extracted document links");
        LinkOutcome::Links(links)
    }
}

/// Scan `html` with each selector group in order; the first group with at
/// least one matching `href` wins. An href matches if its lower-cased form
/// contains one of `extensions`. Hrefs are resolved against `page_url`.
pub fn extract_links(html: &str, page_url: &str, selectors: &[Selector], extensions: &[String]) -> Vec<String> {
    let document = Html::parse_document(html);
    let base = Url::parse(page_url).ok();

    for selector in selectors {
        let mut found: Vec<String> = Vec::new();
        for element in document.select(selector) {
            let Some(href) = element.value().attr("href") else {
                continue;
            };
            let href = href.trim();
            let lower = href.to_lowercase();
            if !extensions.iter().any(|ext| lower.contains(ext.as_str())) {
                continue;
            }
            let resolved = match &base {
                Some(b) => match b.join(href) {
                    Ok(u) => u.to_string(),
                    Err(_) => continue,
                },
                None => href.to_string(),
            };
            if !found.contains(&resolved) {
                found.push(resolved);
            }
        }
        if !found.is_empty() {
            return found;
        }
    }
    Vec::new()
}
