use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Row-level retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per row (including the first).
    pub max_attempts: u32,
    /// Fixed delay in seconds; the wait before attempt k+1 is `k * delay_secs`.
    pub delay_secs: f64,
    /// How many "authentication required" signals one row may trigger a refresh for
    /// before they start counting as failed attempts.
    pub max_auth_refreshes: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_secs: 5.0,
            max_auth_refreshes: 2,
        }
    }
}

/// HTTP client settings shared by page fetches and document downloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    pub connect_timeout_secs: u64,
    /// Upper bound on one whole transfer.
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string(),
            connect_timeout_secs: 30,
            timeout_secs: 300,
        }
    }
}

impl HttpConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Where the serialized login lives and how to tell whether it still works.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Auth artifact path; `None` means `~/.local/state/dcrawl/session.json`.
    pub artifact_path: Option<PathBuf>,
    /// Page fetched by `check_login`. Without it only artifact freshness is checked.
    pub check_url: Option<String>,
    /// Text that only appears on `check_url` for a logged-in user.
    pub logged_in_marker: Option<String>,
    /// A response whose final URL contains this was redirected to the login page.
    pub login_url_fragment: String,
    /// Cookies older than this are treated as expired.
    pub max_age_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            artifact_path: None,
            check_url: None,
            logged_in_marker: None,
            login_url_fragment: "dang-nhap".to_string(),
            max_age_secs: 12 * 3600,
        }
    }
}

impl SessionConfig {
    pub fn resolved_artifact_path(&self) -> Result<PathBuf> {
        match &self.artifact_path {
            Some(p) => Ok(p.clone()),
            None => default_artifact_path(),
        }
    }
}

/// Link extraction heuristics: CSS selector groups tried in order, first non-empty wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinksConfig {
    pub selectors: Vec<String>,
    /// Substrings (lower-case) an href must contain to count as a document.
    pub extensions: Vec<String>,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            selectors: vec![
                "div.the-document-entry div.vn-doc a[href]".to_string(),
                "div.list-download a[href]".to_string(),
                "a[href]".to_string(),
            ],
            extensions: vec![".doc".to_string(), ".pdf".to_string()],
        }
    }
}

/// Global configuration loaded from `~/.config/dcrawl/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Folder scanned for `*.jsonl` batch files.
    pub batches_dir: PathBuf,
    /// Root of the `<category>/<year>/<file>` tree.
    pub downloads_dir: PathBuf,
    /// Worker processes per batch; `None` = min(cores - 1, 4).
    pub max_processes: Option<usize>,
    /// Download threads inside each worker process.
    pub workers_per_process: usize,
    /// Tasks handed to the thread pool per round; each round is joined before the next.
    pub inner_batch_size: usize,
    /// Pause between inner batches in milliseconds.
    pub batch_pause_ms: u64,
    /// Rows per worker process.
    pub chunk_size: usize,
    /// How long a download waits for another holder of the same destination.
    pub lock_timeout_secs: u64,
    /// Optional retry policy; if missing, built-in defaults are used.
    pub retry: Option<RetryConfig>,
    pub http: HttpConfig,
    pub session: SessionConfig,
    pub links: LinksConfig,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            batches_dir: PathBuf::from("batches"),
            downloads_dir: PathBuf::from("downloads"),
            max_processes: None,
            workers_per_process: 4,
            inner_batch_size: 5,
            batch_pause_ms: 500,
            chunk_size: 50,
            lock_timeout_secs: 60,
            retry: None,
            http: HttpConfig::default(),
            session: SessionConfig::default(),
            links: LinksConfig::default(),
        }
    }
}

impl CrawlConfig {
    /// Worker-process count: the configured value, or `default_max_processes()`.
    pub fn process_count(&self) -> usize {
        self.max_processes
            .unwrap_or_else(default_max_processes)
            .max(1)
    }

    pub fn retry_config(&self) -> RetryConfig {
        self.retry.clone().unwrap_or_default()
    }
}

/// One core is left to the coordinator; more than four sessions tend to get throttled.
pub fn default_max_processes() -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(2);
    cores.saturating_sub(1).clamp(1, 4)
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("dcrawl")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

pub fn default_artifact_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("dcrawl")?;
    Ok(xdg_dirs.place_state_file("session.json")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<CrawlConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = CrawlConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: CrawlConfig = toml::from_str(&data)?;
    Ok(cfg)
}
