//! Downloads remote spec sheets.

mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::{Context, Result};

/// Fetches `url` with a GET request, failing on any non-success status.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>> {
    let req = reqwest::Request::new(
        reqwest::Method::GET,
        url.parse().with_context(|| format!("invalid URL '{url}'"))?,
    );

    let resp = client
        .execute(req)
        .await
        .with_context(|| format!("request to '{url}' failed"))?
        .error_for_status()?;
    Ok(resp.bytes().await?.to_vec())
}
