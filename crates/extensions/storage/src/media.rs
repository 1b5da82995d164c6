//! Fetching media bytes referenced by a payload.

use base64::Engine;
use url::Url;

use crate::error::StorageError;

/// Decode the body of a `data:` URL.
pub(crate) fn decode_data_url(url: &str) -> Result<Vec<u8>, StorageError> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| StorageError::UnsupportedUrl(url.to_string()))?;
    let (meta, data) = rest
        .split_once(',')
        .ok_or_else(|| StorageError::UnsupportedUrl(url.to_string()))?;

    if meta.ends_with(";base64") {
        base64::engine::general_purpose::STANDARD
            .decode(data.trim())
            .map_err(|e| StorageError::Fetch {
                url: truncate(url),
                reason: e.to_string(),
            })
    } else {
        Ok(percent_decode(data))
    }
}

fn hex_value(b: u8) -> Option<u8> {
    (b as char).to_digit(16).map(|d| d as u8)
}

fn percent_decode(data: &str) -> Vec<u8> {
    let bytes = data.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                out.push(hi * 16 + lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    out
}

/// Shorten long `data:` URLs for error messages and logs.
pub(crate) fn truncate(url: &str) -> String {
    match url.char_indices().nth(64) {
        Some((idx, _)) => format!("{}...", &url[..idx]),
        None => url.to_string(),
    }
}

/// Fetches media for the folder sink.
#[derive(Debug, Clone, Default)]
pub(crate) struct MediaFetcher {
    client: reqwest::Client,
}

impl MediaFetcher {
    pub(crate) fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub(crate) async fn fetch(&self, url: &str) -> Result<Vec<u8>, StorageError> {
        if url.starts_with("data:") {
            return decode_data_url(url);
        }
        if url.starts_with("blob:") {
            return Err(StorageError::UnsupportedUrl(url.to_string()));
        }

        let parsed = Url::parse(url).map_err(|_| StorageError::UnsupportedUrl(url.to_string()))?;
        match parsed.scheme() {
            "file" => {
                let path = parsed
                    .to_file_path()
                    .map_err(|_| StorageError::UnsupportedUrl(url.to_string()))?;
                Ok(tokio::fs::read(path).await?)
            }
            "http" | "https" => self.fetch_http(parsed).await,
            _ => Err(StorageError::UnsupportedUrl(url.to_string())),
        }
    }

    async fn fetch_http(&self, url: Url) -> Result<Vec<u8>, StorageError> {
        let fetch_error = |reason: String| StorageError::Fetch {
            url: url.to_string(),
            reason,
        };
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(format!("HTTP {}", status.as_u16())));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}
