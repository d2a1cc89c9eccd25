//! `dcrawl session set|check` – manage the auth artifact.

use anyhow::{Context, Result};
use dcrawl_core::config::CrawlConfig;
use dcrawl_core::fetch::HttpClient;
use dcrawl_core::session::{parse_cookie_arg, AuthArtifact, Cookie, CookieSession, Session};

pub fn run_set_session(cfg: &CrawlConfig, cookie_args: &[String]) -> Result<()> {
    let cookies = cookie_args
        .iter()
        .map(|a| parse_cookie_arg(a).with_context(|| format!("expected NAME=VALUE, got {:?}", a)))
        .collect::<Result<Vec<Cookie>>>()?;
    let path = cfg.session.resolved_artifact_path()?;
    AuthArtifact::new(cookies).save(&path)?;
    tracing::info!(path = %path.display(), "auth artifact saved");
    println!("Saved {} cookie(s) to {}", cookie_args.len(), path.display());
    Ok(())
}

pub async fn run_check_session(cfg: &CrawlConfig) -> Result<()> {
    let path = cfg.session.resolved_artifact_path()?;
    let session_cfg = cfg.session.clone();
    let http = HttpClient::new(&cfg.http);
    let artifact_path = path.clone();
    let ok = tokio::task::spawn_blocking(move || CookieSession::new(&session_cfg, &artifact_path, http).check_login())
        .await?;
    if !ok {
        anyhow::bail!("session in {} is missing, expired or rejected", path.display());
    }
    println!("Session OK ({})", path.display());
    Ok(())
}
