//! Session backed by a cookie artifact file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{Duration, Utc};

use crate::config::SessionConfig;
use crate::fetch::HttpClient;

use super::{AuthArtifact, Session};

/// Loads cookies from the artifact file. `login` re-reads the file, so an
/// operator (or `dcrawl session set`) can refresh it while a run is going.
pub struct CookieSession {
    artifact_path: PathBuf,
    artifact: Option<AuthArtifact>,
    max_age: Duration,
    check_url: Option<String>,
    logged_in_marker: Option<String>,
    login_url_fragment: String,
    http: HttpClient,
}

/// Huge configured ages saturate instead of overflowing.
fn max_age(secs: u64) -> Duration {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX)
}

impl CookieSession {
    pub fn new(cfg: &SessionConfig, artifact_path: &Path, http: HttpClient) -> Self {
        let mut session = Self {
            artifact_path: artifact_path.to_path_buf(),
            artifact: None,
            max_age: max_age(cfg.max_age_secs),
            check_url: cfg.check_url.clone(),
            logged_in_marker: cfg.logged_in_marker.clone(),
            login_url_fragment: cfg.login_url_fragment.clone(),
            http,
        };
        session.reload();
        session
    }

    fn reload(&mut self) {
        self.artifact = match AuthArtifact::load(&self.artifact_path) {
            Ok(a) => Some(a),
            Err(e) => {
                tracing::warn!("{}", e);
                None
            }
        };
    }

    pub fn artifact(&self) -> Option<&AuthArtifact> {
        self.artifact.as_ref()
    }

    fn check_remote(&self, url: &str) -> bool {
        let page = match self.http.get_page(url, &self.headers()) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(url, "session check request failed: {}", e);
                return false;
            }
        };
        if !(200..300).contains(&page.code) {
            tracing::info!(url, code = page.code, "session check rejected");
            return false;
        }
        if !self.login_url_fragment.is_empty() && page.effective_url.contains(&self.login_url_fragment) {
            tracing::info!(url, "session check redirected to login");
            return false;
        }
        match &self.logged_in_marker {
            Some(marker) => page.body.contains(marker.as_str()),
            None => true,
        }
    }
}

impl Session for CookieSession {
    fn check_login(&mut self) -> bool {
        let fresh = match &self.artifact {
            Some(a) => a.is_fresh(self.max_age, Utc::now()),
            None => false,
        };
        if !fresh {
            tracing::info!(path = %self.artifact_path.display(), "auth artifact missing or expired");
            return false;
        }
        match &self.check_url {
            Some(url) => self.check_remote(url),
            None => true,
        }
    }

    fn login(&mut self) -> bool {
        self.reload();
        let ok = self.check_login();
        if ok {
            tracing::info!("session refreshed from {}", self.artifact_path.display());
        } else {
            tracing::warn!("session refresh failed");
        }
        ok
    }

    fn headers(&self) -> HashMap<String, String> {
        let mut h = HashMap::new();
        if let Some(a) = &self.artifact {
            if !a.cookies.is_empty() {
                h.insert("Cookie".to_string(), a.cookie_header());
            }
        }
        h
    }
}
