//! Decoding uploads and encoding PNG output.
//!
//! `decode_bytes`, `encode_png` and `thumbnail` are plain CPU work. The async
//! functions run them on the blocking pool and do their file I/O with
//! `tokio::fs`.

use image::{
    ExtendedColorType, ImageEncoder, RgbaImage, codecs::png::PngEncoder, imageops::FilterType,
};
use pixel_filter::{ImageData, PixelFilterError};
use std::{
    io,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImageIoError {
    #[error("Read {path} failed: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Write {path} failed: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Decode image failed: {0}")]
    DecodeFailed(#[source] image::ImageError),

    #[error("Encode PNG failed: {0}")]
    EncodeFailed(#[source] image::ImageError),

    #[error(transparent)]
    Malformed(#[from] PixelFilterError),

    #[error("Image task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

pub type ImageIoResult<T> = Result<T, ImageIoError>;

/// Reads and decodes any supported image file into RGBA8.
pub async fn read_image(path: impl AsRef<Path>) -> ImageIoResult<ImageData> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| ImageIoError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;

    let image = decode(bytes).await?;
    log::debug!(
        "decoded {} as {}x{}",
        path.display(),
        image.width,
        image.height
    );

    Ok(image)
}

/// Encodes `image` as PNG and writes it to `path`.
pub async fn write_png(path: impl AsRef<Path>, image: ImageData) -> ImageIoResult<()> {
    let path = path.as_ref();
    let (_, bytes) = encode(image).await?;

    tokio::fs::write(path, bytes)
        .await
        .map_err(|source| ImageIoError::WriteFailed {
            path: path.to_path_buf(),
            source,
        })
}

/// [`decode_bytes`] on the blocking pool.
pub async fn decode(bytes: Vec<u8>) -> ImageIoResult<ImageData> {
    tokio::task::spawn_blocking(move || decode_bytes(&bytes)).await?
}

/// [`encode_png`] on the blocking pool. The image is handed back along with
/// its PNG bytes.
pub async fn encode(image: ImageData) -> ImageIoResult<(ImageData, Vec<u8>)> {
    tokio::task::spawn_blocking(move || encode_png(&image).map(|bytes| (image, bytes))).await?
}

pub fn decode_bytes(bytes: &[u8]) -> ImageIoResult<ImageData> {
    let image = image::load_from_memory(bytes).map_err(ImageIoError::DecodeFailed)?;
    Ok(ImageData::from(image.to_rgba8()))
}

pub fn encode_png(image: &ImageData) -> ImageIoResult<Vec<u8>> {
    check_len(image)?;

    let mut bytes = vec![];
    PngEncoder::new(&mut bytes)
        .write_image(
            &image.data,
            image.width,
            image.height,
            ExtendedColorType::Rgba8,
        )
        .map_err(ImageIoError::EncodeFailed)?;

    Ok(bytes)
}

/// Downscales `image` so that its longer edge is at most `edge` pixels.
/// Smaller images are returned unchanged.
pub fn thumbnail(image: &ImageData, edge: u32) -> ImageIoResult<ImageData> {
    let (width, height) = thumbnail_size(image.dimensions(), edge);
    if (width, height) == image.dimensions() {
        return Ok(image.clone());
    }

    let source: RgbaImage = image.clone().into_rgba_image()?;
    let resized = image::imageops::resize(&source, width, height, FilterType::Triangle);

    Ok(ImageData::from(resized))
}

fn thumbnail_size((width, height): (u32, u32), edge: u32) -> (u32, u32) {
    let longest = width.max(height);
    if edge == 0 || longest <= edge {
        return (width, height);
    }

    let scale = edge as f64 / longest as f64;
    let fit = |side: u32| ((side as f64 * scale).round() as u32).max(1);
    (fit(width), fit(height))
}

fn check_len(image: &ImageData) -> ImageIoResult<()> {
    let expected = image.width as usize * image.height as usize * 4;
    if image.data.len() != expected {
        return Err(PixelFilterError::MalformedMessage(format!(
            "The data of {}x{} must hold {expected} bytes, got {}",
            image.width,
            image.height,
            image.data.len()
        ))
        .into());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ImageData {
        ImageData::new(3, 2, (0..24).collect())
    }

    #[test]
    fn test_png_round_trip() {
        let bytes = encode_png(&sample()).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
        assert_eq!(decode_bytes(&bytes).unwrap(), sample());
    }

    #[test]
    fn test_decode_garbage() {
        assert!(matches!(
            decode_bytes(b"not an image"),
            Err(ImageIoError::DecodeFailed(_))
        ));
    }

    #[test]
    fn test_encode_rejects_short_buffer() {
        let image = ImageData::new(2, 2, vec![0; 3]);
        assert!(matches!(
            encode_png(&image),
            Err(ImageIoError::Malformed(PixelFilterError::MalformedMessage(_)))
        ));
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_image(dir.path().join("missing.png")).await,
            Err(ImageIoError::ReadFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.png");
        write_png(&path, sample()).await.unwrap();
        assert_eq!(read_image(&path).await.unwrap(), sample());
    }

    #[tokio::test]
    async fn test_encode_hands_image_back() {
        let (image, bytes) = encode(sample()).await.unwrap();
        assert_eq!(image, sample());
        assert_eq!(decode(bytes).await.unwrap(), sample());

        assert!(matches!(
            decode(b"garbage".to_vec()).await,
            Err(ImageIoError::DecodeFailed(_))
        ));
    }

    #[test]
    fn test_thumbnail_size() {
        assert_eq!(thumbnail_size((400, 200), 100), (100, 50));
        assert_eq!(thumbnail_size((200, 400), 100), (50, 100));
        assert_eq!(thumbnail_size((1000, 1), 100), (100, 1));
        assert_eq!(thumbnail_size((50, 20), 100), (50, 20));
        assert_eq!(thumbnail_size((50, 20), 0), (50, 20));
    }

    #[test]
    fn test_thumbnail() {
        let image = ImageData::new(8, 4, vec![200; 8 * 4 * 4]);
        let thumb = thumbnail(&image, 4).unwrap();
        assert_eq!(thumb.dimensions(), (4, 2));
        assert!(thumb.data.iter().all(|v| (199..=201).contains(v)));

        assert_eq!(thumbnail(&sample(), 16).unwrap(), sample());
    }
}
