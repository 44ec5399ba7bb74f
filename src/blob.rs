//! Opaque photo blob storage.
//!
//! Photos are addressed by a random key; the rest of the crate only ever
//! derives serving URLs from that key.

use crate::error::{AppError, AppResult};

const BLOB_KEY_LEN: usize = 24;

/// Stores photo bytes and returns the new blob key.
pub async fn store(data: &[u8]) -> AppResult<String> {
    let key = crate::util::random_b64_string(BLOB_KEY_LEN);
    tokio::fs::create_dir_all(&*crate::env::MEDIA_DIR)
        .await
        .map_err(|e| AppError::Other(format!("cannot create media directory: {e}")))?;
    tokio::fs::write(blob_path(&key), data)
        .await
        .map_err(|e| AppError::Other(format!("cannot store photo: {e}")))?;
    Ok(key)
}

/// Reads photo bytes back, if the blob exists.
pub async fn read(key: &str) -> AppResult<Vec<u8>> {
    if !key_is_valid(key) {
        return Err(AppError::NotFound);
    }
    tokio::fs::read(blob_path(key))
        .await
        .map_err(|_| AppError::NotFound)
}

/// Deletes a stored blob. Missing blobs are not an error.
pub async fn delete(key: &str) {
    if !key_is_valid(key) {
        return;
    }
    if let Err(err) = tokio::fs::remove_file(blob_path(key)).await {
        if err.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(%key, %err, "failed to delete photo blob");
        }
    }
}

/// Returns the serving URL for a blob, bounded by `size` pixels on the
/// longest edge.
pub fn serving_url(key: &str, size: u32) -> String {
    format!("/media?key={key}&size={size}")
}

#[derive(serde::Deserialize)]
pub struct MediaQuery {
    pub key: String,
    // accepted for URL compatibility; resizing is the image service's job
    #[serde(default)]
    #[allow(unused)]
    pub size: Option<u32>,
}

pub async fn media_handler(
    axum::extract::Query(query): axum::extract::Query<MediaQuery>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let data = read(&query.key).await?;
    Ok(([(axum::http::header::CONTENT_TYPE, "image/jpeg")], data))
}

fn blob_path(key: &str) -> std::path::PathBuf {
    std::path::Path::new(&*crate::env::MEDIA_DIR).join(key)
}

// Keys are generated by us; anything else could be a path traversal attempt.
fn key_is_valid(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_traversal_keys() {
        assert!(!key_is_valid("../secret"));
        assert!(!key_is_valid(""));
        assert!(key_is_valid("aZ09-_"));
    }
}
