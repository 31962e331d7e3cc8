// src/services/media_service.rs - base64 image field storage

use std::path::{Path, PathBuf};

use base64::{Engine as _, engine::general_purpose};
use log::{debug, warn};
use uuid::Uuid;

pub const POSTS_DIR: &str = "posts";

pub const INVALID_IMAGE: &str = "Загрузите корректное изображение. Загруженный файл не является \
     изображением, либо является испорченным.";
pub const NOT_A_FILE: &str =
    "Загруженный файл не является корректным файлом. Проверьте кодировку формы.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Webp,
}

impl ImageFormat {
    /// Sniffs the format from the leading bytes.
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(ImageFormat::Png)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageFormat::Jpeg)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(ImageFormat::Gif)
        } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(ImageFormat::Webp)
        } else {
            None
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Gif => "gif",
            ImageFormat::Webp => "webp",
        }
    }
}

#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
}

/// Decodes a `data:image/<fmt>;base64,<payload>` string.
/// The error is the field message to report to the client.
pub fn decode_image(data: &str) -> Result<DecodedImage, &'static str> {
    let Some((header, payload)) = data.split_once(";base64,") else {
        return Err(NOT_A_FILE);
    };
    if !header.starts_with("data:image") {
        return Err(NOT_A_FILE);
    }
    let bytes = general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|_| INVALID_IMAGE)?;
    let format = ImageFormat::detect(&bytes).ok_or(INVALID_IMAGE)?;
    Ok(DecodedImage { format, bytes })
}

/// Content type for a stored file, by extension.
pub fn content_type(name: &str) -> mime::Mime {
    match Path::new(name).extension().and_then(|ext| ext.to_str()) {
        Some("jpg") | Some("jpeg") => mime::IMAGE_JPEG,
        Some("png") => mime::IMAGE_PNG,
        Some("gif") => mime::IMAGE_GIF,
        Some("webp") => "image/webp".parse().unwrap_or(mime::APPLICATION_OCTET_STREAM),
        _ => mime::APPLICATION_OCTET_STREAM,
    }
}

/// Local directory holding uploaded images plus the public URL prefix they
/// are served under.
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
    url_prefix: String,
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>, url_prefix: &str) -> Self {
        let mut url_prefix = url_prefix.to_string();
        if !url_prefix.ends_with('/') {
            url_prefix.push('/');
        }
        Self {
            root: root.into(),
            url_prefix,
        }
    }

    pub fn url_prefix(&self) -> &str {
        &self.url_prefix
    }

    /// Writes the image under `posts/` and returns its media-relative name.
    pub async fn save(&self, image: &DecodedImage) -> std::io::Result<String> {
        let dir = self.root.join(POSTS_DIR);
        tokio::fs::create_dir_all(&dir).await?;
        let filename = format!("{}.{}", Uuid::new_v4(), image.format.extension());
        tokio::fs::write(dir.join(&filename), &image.bytes).await?;
        debug!("stored image {} ({} bytes)", filename, image.bytes.len());
        Ok(format!("{}/{}", POSTS_DIR, filename))
    }

    /// Deletes a file written by `save`. A missing file is not an error.
    pub async fn remove(&self, name: &str) {
        let Some(safe_name) = Path::new(name).file_name() else {
            return;
        };
        match tokio::fs::remove_file(self.root.join(POSTS_DIR).join(safe_name)).await {
            Ok(()) => debug!("removed image {}", name),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("failed to remove image {}: {}", name, e),
        }
    }

    /// Absolute URL for a stored name, e.g. `http://host/media/posts/x.png`.
    pub fn url(&self, base_url: &str, name: &str) -> String {
        format!("{}{}{}", base_url.trim_end_matches('/'), self.url_prefix, name)
    }

    /// Reads a file from `posts/`. Only the final path component of
    /// `filename` is used.
    pub async fn read_post_image(&self, filename: &str) -> std::io::Result<Option<Vec<u8>>> {
        let Some(safe_name) = Path::new(filename).file_name() else {
            return Ok(None);
        };
        match tokio::fs::read(self.root.join(POSTS_DIR).join(safe_name)).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_PIXEL: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    #[test]
    fn decodes_png_data_uri() {
        let image = decode_image(&format!("data:image/png;base64,{}", PNG_PIXEL)).unwrap();
        assert_eq!(image.format, ImageFormat::Png);
        assert!(!image.bytes.is_empty());
    }

    #[test]
    fn rejects_payload_that_is_not_an_image() {
        let data = format!("data:image/png;base64,{}", general_purpose::STANDARD.encode("hello"));
        assert_eq!(decode_image(&data).unwrap_err(), INVALID_IMAGE);
        assert_eq!(decode_image("data:image/png;base64,@@@").unwrap_err(), INVALID_IMAGE);
    }

    #[test]
    fn rejects_strings_without_data_uri_header() {
        assert_eq!(decode_image(PNG_PIXEL).unwrap_err(), NOT_A_FILE);
        assert_eq!(decode_image("data:text/plain;base64,aGk=").unwrap_err(), NOT_A_FILE);
    }

    #[test]
    fn content_type_follows_extension() {
        assert_eq!(content_type("a.png"), mime::IMAGE_PNG);
        assert_eq!(content_type("a.jpg"), mime::IMAGE_JPEG);
        assert_eq!(content_type("a.bin"), mime::APPLICATION_OCTET_STREAM);
    }

    #[tokio::test]
    async fn saved_image_can_be_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let storage = MediaStorage::new(dir.path(), "/media");
        let image = decode_image(&format!("data:image/png;base64,{}", PNG_PIXEL)).unwrap();
        let name = storage.save(&image).await.unwrap();
        assert!(name.starts_with("posts/") && name.ends_with(".png"));
        assert_eq!(
            storage.url("http://testserver/", &name),
            format!("http://testserver/media/{}", name)
        );
        let filename = name.trim_start_matches("posts/");
        let data = storage.read_post_image(filename).await.unwrap().unwrap();
        assert_eq!(data, image.bytes);
        let traversal = format!("../../{}", filename);
        assert!(storage.read_post_image(&traversal).await.unwrap().is_some());
        assert!(storage.read_post_image("missing.png").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn removed_image_is_gone() {
        let dir = tempfile::tempdir().unwrap();
        let storage = MediaStorage::new(dir.path(), "/media/");
        let image = decode_image(&format!("data:image/png;base64,{}", PNG_PIXEL)).unwrap();
        let name = storage.save(&image).await.unwrap();

        storage.remove(&name).await;
        let filename = name.trim_start_matches("posts/");
        assert!(storage.read_post_image(filename).await.unwrap().is_none());
        storage.remove(&name).await;
    }
}
