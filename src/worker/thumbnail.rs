//! Derivative generation.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};

use super::JobError;
use crate::file::FileStorage;

/// Resize the image at `original` to `width`, keeping its aspect ratio, and
/// write it to `<original>_<width>`.
///
/// The derivative is encoded in the source format when possible, else PNG.
pub async fn generate_derivative(original: &Path, width: u32) -> Result<PathBuf, JobError> {
    let bytes = tokio::fs::read(original).await?;
    let target = FileStorage::derivative_path(original, width);

    let encoded = tokio::task::spawn_blocking(move || resize_encoded(&bytes, width))
        .await
        .map_err(|e| JobError::Task(e.to_string()))??;

    tokio::fs::write(&target, encoded).await?;
    Ok(target)
}

fn resize_encoded(bytes: &[u8], width: u32) -> Result<Vec<u8>, JobError> {
    let format = image::guess_format(bytes)?;
    let source = image::load_from_memory_with_format(bytes, format)?;

    let height = scaled_height(source.width(), source.height(), width);
    let resized = source.resize_exact(width, height, FilterType::Lanczos3);

    let mut out = Cursor::new(Vec::new());
    let encoded = match format {
        // JPEG has no alpha channel.
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(resized.to_rgb8()).write_to(&mut out, format),
        _ => resized.write_to(&mut out, format),
    };
    if encoded.is_err() {
        out = Cursor::new(Vec::new());
        resized.write_to(&mut out, ImageFormat::Png)?;
    }

    Ok(out.into_inner())
}

fn scaled_height(src_width: u32, src_height: u32, width: u32) -> u32 {
    if src_width == 0 {
        return 1;
    }
    let height = (u64::from(src_height) * u64::from(width) + u64::from(src_width) / 2)
        / u64::from(src_width);
    height.clamp(1, u64::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba, RgbaImage};
    use tempfile::TempDir;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
        });
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn test_scaled_height() {
        assert_eq!(scaled_height(600, 400, 500), 333);
        assert_eq!(scaled_height(600, 400, 100), 67);
        assert_eq!(scaled_height(1000, 1, 100), 1);
        assert_eq!(scaled_height(0, 10, 100), 1);
    }

    #[tokio::test]
    async fn test_generate_derivative() {
        let dir = TempDir::new().unwrap();
        let original = dir.path().join("orig");
        tokio::fs::write(&original, png_bytes(600, 400)).await.unwrap();

        let path = generate_derivative(&original, 250).await.unwrap();
        assert_eq!(path, dir.path().join("orig_250"));

        let thumb = image::load_from_memory(&tokio::fs::read(&path).await.unwrap()).unwrap();
        assert_eq!(thumb.dimensions(), (250, 167));
    }

    #[tokio::test]
    async fn test_generate_derivative_not_an_image() {
        let dir = TempDir::new().unwrap();
        let original = dir.path().join("orig");
        tokio::fs::write(&original, b"hello").await.unwrap();

        assert!(matches!(
            generate_derivative(&original, 100).await,
            Err(JobError::Image(_))
        ));
        assert!(!dir.path().join("orig_100").exists());
    }

    #[tokio::test]
    async fn test_generate_derivative_missing_original() {
        let dir = TempDir::new().unwrap();
        let result = generate_derivative(&dir.path().join("nope"), 100).await;
        assert!(matches!(result, Err(JobError::Io(_))));
    }
}
