//! Opens an input location as a buffered line stream.

use anyhow::{Context, Result};
use std::io::Cursor;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, BufReader};
use tracing::debug;

use crate::fetch::{BasicClient, fetch_bytes};

pub type SourceReader = Box<dyn AsyncBufRead + Unpin + Send>;

/// Returns `true` when `location` should be fetched over HTTP.
pub fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Loads a source from a local file path or fetches it over HTTP.
#[tracing::instrument]
pub async fn open_source(location: &str) -> Result<SourceReader> {
    if is_remote(location) {
        let client = BasicClient::new()?;
        let bytes = fetch_bytes(&client, location).await?;
        debug!(bytes = bytes.len(), "Remote source downloaded");
        Ok(Box::new(Cursor::new(bytes)))
    } else {
        let file = File::open(location)
            .await
            .with_context(|| format!("cannot open source '{location}'"))?;
        Ok(Box::new(BufReader::new(file)))
    }
}
