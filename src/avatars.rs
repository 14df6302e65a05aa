use bytes::Bytes;
use image::ImageFormat;
use rand::RngCore;
use thiserror::Error;
use tracing::info;

use crate::state::AppState;

/// Thumbnails are capped to this square footprint, aspect preserved.
pub const THUMB_SIZE: u32 = 125;

#[derive(Debug, Error)]
pub enum AvatarError {
    #[error("unsupported image type")]
    UnsupportedType,
    #[error("could not read image: {0}")]
    InvalidImage(#[from] image::ImageError),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// An uploaded picture as it arrives from the multipart form.
pub struct Upload {
    pub filename: String,
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// Resize an uploaded picture and store it under a fresh random name,
/// returning the stored filename.
pub async fn save_avatar(state: &AppState, upload: Upload) -> Result<String, AvatarError> {
    let ext = file_ext(&upload.filename, upload.content_type.as_deref())
        .ok_or(AvatarError::UnsupportedType)?;
    let format = ImageFormat::from_extension(ext).ok_or(AvatarError::UnsupportedType)?;

    let thumb = make_thumbnail(&upload.body, format)?;
    let filename = format!("{}.{}", random_basename(), ext);

    state
        .avatars
        .write(&filename, Bytes::from(thumb))
        .await?;

    info!(%filename, "avatar stored");
    Ok(filename)
}

fn make_thumbnail(body: &[u8], format: ImageFormat) -> Result<Vec<u8>, AvatarError> {
    let img = image::load_from_memory(body)?;
    // Only downsize; images already inside the footprint are kept as-is.
    let thumb = if img.width() <= THUMB_SIZE && img.height() <= THUMB_SIZE {
        img
    } else {
        img.thumbnail(THUMB_SIZE, THUMB_SIZE)
    };

    let mut out = Vec::new();
    thumb.write_to(&mut std::io::Cursor::new(&mut out), format)?;
    Ok(out)
}

/// 8 random bytes rendered as 16 hex characters, so concurrent uploads
/// never collide on disk.
fn random_basename() -> String {
    let mut bytes = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Extension for the stored file: taken from the uploaded filename when it
/// names a known image type, otherwise derived from the content type.
fn file_ext(filename: &str, content_type: Option<&str>) -> Option<&'static str> {
    if let Some(ext) = filename.rsplit_once('.').map(|(_, e)| e.to_ascii_lowercase()) {
        match ext.as_str() {
            "jpg" | "jpeg" => return Some("jpg"),
            "png" => return Some("png"),
            "gif" => return Some("gif"),
            "webp" => return Some("webp"),
            _ => {}
        }
    }
    content_type.and_then(ext_from_mime)
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}
