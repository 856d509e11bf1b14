use std::path::PathBuf;

use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::config::Config;

//
// Blob storage for uploaded media (artist photos, booking images).
// Files are stored on the local filesystem under:
//   {MEDIA_STORAGE_PATH}/{key}
// where `key` is "{uuid}.{ext}". Callers persist only the returned
// URL path; the approval workflow never touches file contents.
//

fn media_path(key: &str) -> PathBuf {
    Config::get().media_storage_path.join(key)
}

/// Store a blob and return the stable URL path it will be served from.
pub async fn put(bytes: &[u8], extension: &str) -> std::io::Result<String> {
    let dir = Config::get().media_storage_path.clone();
    fs::create_dir_all(&dir).await?;

    let key = format!("{}.{}", Uuid::new_v4(), extension);
    let mut file = fs::File::create(dir.join(&key)).await?;
    file.write_all(bytes).await?;
    file.flush().await?;

    Ok(format!("/media/{key}"))
}

/// Fetch a blob by key. Returns `None` when no such file exists.
pub async fn get(key: &str) -> std::io::Result<Option<Vec<u8>>> {
    // Keys are uuid-based filenames; refuse anything that could escape the dir.
    if key.contains('/') || key.contains("..") {
        return Ok(None);
    }

    let path = media_path(key);
    if fs::metadata(&path).await.is_err() {
        return Ok(None);
    }

    fs::read(&path).await.map(Some)
}
