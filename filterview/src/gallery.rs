//! Filter gallery
//!
//! A gallery holds one entry per catalog filter, in catalog order, each with
//! the fully filtered image and a PNG thumbnail of it. Building a gallery only
//! dispatches requests to the [`EffectApplicator`]; the filtering itself runs
//! on its worker threads, thumbnails on the blocking pool.

use crate::image_io;
use anyhow::{Context, Result};
use derive_setters::Setters;
use futures::stream::{FuturesUnordered, StreamExt};
use pixel_filter::{EffectApplicator, ImageData, PixelFilterError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// How gallery requests are handed to the applicator.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Dispatch {
    /// One request in flight at a time, entries appended as they arrive.
    #[default]
    Sequential,

    /// Every request in flight at once, entries appended when all are done.
    Concurrent,
}

#[derive(Debug, Clone, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
#[non_exhaustive]
pub struct GalleryOptions {
    pub dispatch: Dispatch,

    /// Longest thumbnail edge in pixels
    #[derivative(Default(value = "96"))]
    pub thumbnail_size: u32,

    /// Thumbnails are also written there as `NN-<slug>.png`
    #[setters(strip_option)]
    pub out_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct GalleryEntry {
    pub name: String,
    pub image: ImageData,
    /// PNG bytes
    pub thumbnail: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct Gallery {
    entries: Vec<GalleryEntry>,
}

impl Gallery {
    pub fn entries(&self) -> &[GalleryEntry] {
        &self.entries
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn find(&self, name: &str) -> Option<&GalleryEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Fills `gallery` with one entry per catalog filter applied to `source`.
///
/// The gallery is cleared first. When `token` is cancelled no further entry
/// is appended and the build fails with [`PixelFilterError::Cancelled`];
/// entries appended before the cancellation stay in the gallery.
pub async fn build_gallery(
    applicator: &EffectApplicator,
    source: &ImageData,
    options: &GalleryOptions,
    token: &CancellationToken,
    gallery: &mut Gallery,
) -> Result<()> {
    gallery.clear();

    if let Some(dir) = &options.out_dir {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("create {} failed", dir.display()))?;
    }

    match options.dispatch {
        Dispatch::Sequential => build_sequential(applicator, source, options, token, gallery).await,
        Dispatch::Concurrent => build_concurrent(applicator, source, options, token, gallery).await,
    }
}

async fn build_sequential(
    applicator: &EffectApplicator,
    source: &ImageData,
    options: &GalleryOptions,
    token: &CancellationToken,
    gallery: &mut Gallery,
) -> Result<()> {
    let names = applicator.catalog().definitions();
    let total = names.len();

    for (index, name) in names.into_iter().enumerate() {
        if token.is_cancelled() {
            return Err(PixelFilterError::Cancelled.into());
        }

        let image = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(PixelFilterError::Cancelled.into()),
            reply = applicator.query(source.clone(), name) => reply?,
        };

        let entry = render_entry(name, image, index, options).await?;
        if token.is_cancelled() {
            return Err(PixelFilterError::Cancelled.into());
        }

        gallery.entries.push(entry);
        log::debug!("gallery {}/{total}: `{name}` ready", index + 1);
    }

    Ok(())
}

async fn build_concurrent(
    applicator: &EffectApplicator,
    source: &ImageData,
    options: &GalleryOptions,
    token: &CancellationToken,
    gallery: &mut Gallery,
) -> Result<()> {
    let names = applicator.catalog().definitions();
    let total = names.len();

    let mut pending = names
        .into_iter()
        .enumerate()
        .map(|(index, name)| {
            let image = source.clone();
            async move {
                let reply = applicator.query(image, name).await;
                (index, name, reply)
            }
        })
        .collect::<FuturesUnordered<_>>();

    let mut entries = Vec::with_capacity(total);
    loop {
        let (index, name, reply) = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(PixelFilterError::Cancelled.into()),
            next = pending.next() => match next {
                Some(done) => done,
                None => break,
            },
        };

        let entry = render_entry(name, reply?, index, options).await?;
        entries.push((index, entry));
        log::debug!("gallery {}/{total}: `{name}` ready", entries.len());
    }

    if token.is_cancelled() {
        return Err(PixelFilterError::Cancelled.into());
    }

    entries.sort_by_key(|(index, _)| *index);
    gallery
        .entries
        .extend(entries.into_iter().map(|(_, entry)| entry));

    Ok(())
}

async fn render_entry(
    name: &str,
    image: ImageData,
    index: usize,
    options: &GalleryOptions,
) -> Result<GalleryEntry> {
    let edge = options.thumbnail_size;
    let (image, thumbnail) = tokio::task::spawn_blocking(move || {
        let thumbnail = image_io::thumbnail(&image, edge).and_then(|t| image_io::encode_png(&t));
        (image, thumbnail)
    })
    .await?;
    let thumbnail = thumbnail.with_context(|| format!("render `{name}` thumbnail failed"))?;

    if let Some(dir) = &options.out_dir {
        let path = thumbnail_path(dir, index, name);
        tokio::fs::write(&path, &thumbnail)
            .await
            .with_context(|| format!("write {} failed", path.display()))?;
    }

    Ok(GalleryEntry {
        name: name.to_string(),
        image,
        thumbnail,
    })
}

/// Whether `error` is the one a cancelled [`build_gallery`] returns.
pub fn is_cancelled(error: &anyhow::Error) -> bool {
    matches!(
        error.downcast_ref::<PixelFilterError>(),
        Some(PixelFilterError::Cancelled)
    )
}

/// `01-red-emphasis.png` for the second filter named `Red emphasis`.
pub fn thumbnail_path(dir: &Path, index: usize, name: &str) -> PathBuf {
    dir.join(format!("{:02}-{}.png", index, slug(name)))
}

pub fn slug(name: &str) -> String {
    name.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug() {
        assert_eq!(slug("Red emphasis"), "red-emphasis");
        assert_eq!(slug("  Blue  emphasis "), "blue-emphasis");
        assert_eq!(slug("Invert"), "invert");
    }

    #[test]
    fn test_is_cancelled() {
        assert!(is_cancelled(&PixelFilterError::Cancelled.into()));
        assert!(is_cancelled(
            &anyhow::Error::from(PixelFilterError::Cancelled).context("build gallery")
        ));
        assert!(!is_cancelled(&PixelFilterError::UndefinedFilter("Blur".to_string()).into()));
    }

    #[test]
    fn test_thumbnail_path() {
        let path = thumbnail_path(Path::new("/tmp/out"), 1, "Red emphasis");
        assert_eq!(path, PathBuf::from("/tmp/out/01-red-emphasis.png"));
    }

    #[test]
    fn test_options_default() {
        let options = GalleryOptions::default();
        assert_eq!(options.dispatch, Dispatch::Sequential);
        assert_eq!(options.thumbnail_size, 96);
        assert!(options.out_dir.is_none());

        let options = options
            .with_dispatch(Dispatch::Concurrent)
            .with_out_dir(PathBuf::from("out"));
        assert_eq!(options.dispatch, Dispatch::Concurrent);
        assert_eq!(options.out_dir, Some(PathBuf::from("out")));
    }

    #[test]
    fn test_dispatch_serde() {
        #[derive(Serialize, Deserialize)]
        struct Wrap {
            dispatch: Dispatch,
        }

        let wrap: Wrap = toml::from_str("dispatch = \"concurrent\"").unwrap();
        assert_eq!(wrap.dispatch, Dispatch::Concurrent);
        assert!(toml::from_str::<Wrap>("dispatch = \"parallel\"").is_err());
    }
}
