use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use scraper::{ElementRef, Selector};

const API_USER_AGENT: &str = "ArcTimersApp/1.0";
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const API_TIMEOUT: Duration = Duration::from_secs(10);
const PAGE_TIMEOUT: Duration = Duration::from_secs(15);

static CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .timeout(PAGE_TIMEOUT)
        .build()
        .expect("http client")
});

pub fn clean_text(input: &str) -> String {
    input
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

pub fn inner_text(element: ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<Vec<_>>().join(" "))
}

pub fn first_text(element: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .next()
        .map(inner_text)
        .filter(|text| !text.is_empty())
}

/// Fetches a JSON endpoint. Only a plain `200 OK` counts as success.
pub fn fetch_json(url: &str) -> Result<String> {
    let response = CLIENT
        .get(url)
        .header(USER_AGENT, API_USER_AGENT)
        .header(ACCEPT, "application/json")
        .timeout(API_TIMEOUT)
        .send()
        .with_context(|| format!("request failed for {url}"))?;
    let status = response.status();
    if status != reqwest::StatusCode::OK {
        anyhow::bail!("unexpected status {status} for {url}");
    }
    response
        .text()
        .with_context(|| format!("unable to read response body for {url}"))
}

pub fn fetch_html(url: &str) -> Result<String> {
    let response = CLIENT
        .get(url)
        .header(USER_AGENT, BROWSER_USER_AGENT)
        .header(
            ACCEPT,
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        )
        .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9")
        .send()
        .with_context(|| format!("request failed for {url}"))?;
    let response = response
        .error_for_status()
        .with_context(|| format!("non-success status for {url}"))?;
    response
        .text()
        .with_context(|| format!("unable to read response body for {url}"))
}

/// Best-effort copy of a raw response for offline inspection.
pub fn dump_debug(path: &Path, body: &str) {
    if let Some(parent) = path.parent() {
        if let Err(err) = fs::create_dir_all(parent) {
            tracing::warn!(event = "scrape.debug_dump_failed", path = ?parent, error = %err);
            return;
        }
    }
    match fs::write(path, body) {
        Ok(()) => tracing::debug!(event = "scrape.debug_dump_written", path = ?path),
        Err(err) => tracing::warn!(event = "scrape.debug_dump_failed", path = ?path, error = %err),
    }
}
