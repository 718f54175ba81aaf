use axum::extract::Multipart;
use rand::Rng;
use std::path::{Path, PathBuf};

use crate::data_formats::UploadResponse;
use crate::errors::RequestError;

/// Root directory for stored uploads, served back under `/uploads`.
pub fn uploads_root() -> PathBuf {
    std::env::var("UPLOADS_DIR")
        .unwrap_or_else(|_| "uploads".to_string())
        .into()
}

fn unique_filename(original: &str) -> String {
    let extension = Path::new(original)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("bin");
    let nonce: u32 = rand::thread_rng().gen();
    format!(
        "{}-{nonce:08x}.{extension}",
        chrono::Utc::now().timestamp_millis()
    )
}

/// Pulls the `image` field out of a multipart body and stores it under
/// `<uploads_root>/<subdir>/` with a collision-free name.
pub async fn save_upload(
    mut multipart: Multipart,
    subdir: &str,
) -> Result<UploadResponse, RequestError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| RequestError::Validation("Malformed multipart body"))?
    {
        if field.name() != Some("image") {
            continue;
        }
        let original = field.file_name().unwrap_or("upload.bin").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|_| RequestError::Validation("Failed to read uploaded file"))?;
        if data.is_empty() {
            return Err(RequestError::Validation("Uploaded file is empty"));
        }

        let filename = unique_filename(&original);
        let dir = uploads_root().join(subdir);
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            tracing::error!("failed to create upload dir: {e}");
            RequestError::ServerError
        })?;
        tokio::fs::write(dir.join(&filename), &data)
            .await
            .map_err(|e| {
                tracing::error!("failed to store upload: {e}");
                RequestError::ServerError
            })?;

        return Ok(UploadResponse {
            url: format!("/uploads/{subdir}/{filename}"),
            filename,
        });
    }
    Err(RequestError::Validation("No image field in upload"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filenames_keep_the_extension_and_never_collide() {
        let a = unique_filename("trail.jpg");
        let b = unique_filename("trail.jpg");
        assert!(a.ends_with(".jpg"));
        assert!(b.ends_with(".jpg"));
        assert_ne!(a, b);
    }

    #[test]
    fn missing_extension_falls_back() {
        assert!(unique_filename("noext").ends_with(".bin"));
    }
}
