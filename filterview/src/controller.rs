//! Session state and the operations a user can run against it.
//!
//! The controller owns the current image, the name of the file it came from,
//! and the gallery built from it. Every time a new image becomes current the
//! previous gallery build is cancelled and a new one starts. A running build
//! can also be interrupted from outside through a [`BuildCanceller`].

use crate::{
    gallery::{Gallery, GalleryOptions, build_gallery, is_cancelled},
    image_io,
    store::UploadStore,
};
use anyhow::{Context, Result};
use pixel_filter::{EffectApplicator, FilterCatalog, ImageData};
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tokio_util::sync::CancellationToken;

/// What the session does with a command error nobody handled.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    /// Drop the error.
    Ignore,

    /// Log the error and carry on.
    Log,

    /// Show the error and reset the session to the remembered upload.
    #[default]
    Surface,
}

/// Interrupts the gallery build of the operation the controller is running.
///
/// Each operation re-arms the interrupt when it starts, so a cancel only
/// reaches the operation in progress (or the next one if none is running).
#[derive(Debug, Clone)]
pub struct BuildCanceller {
    interrupt: Arc<Mutex<CancellationToken>>,
}

impl BuildCanceller {
    pub fn cancel(&self) {
        self.interrupt.lock().unwrap().cancel();
    }
}

pub struct Controller {
    applicator: EffectApplicator,
    store: Box<dyn UploadStore>,
    options: GalleryOptions,
    severity: AlertSeverity,

    current: Option<ImageData>,
    file_name: Option<String>,
    gallery: Gallery,
    token: CancellationToken,
    interrupt: Arc<Mutex<CancellationToken>>,
}

impl Controller {
    pub fn new(applicator: EffectApplicator, store: impl UploadStore + 'static) -> Self {
        Self {
            applicator,
            store: Box::new(store),
            options: GalleryOptions::default(),
            severity: AlertSeverity::default(),
            current: None,
            file_name: None,
            gallery: Gallery::default(),
            token: CancellationToken::new(),
            interrupt: Arc::new(Mutex::new(CancellationToken::new())),
        }
    }

    pub fn with_options(mut self, options: GalleryOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_severity(mut self, severity: AlertSeverity) -> Self {
        self.severity = severity;
        self
    }

    pub fn catalog(&self) -> &FilterCatalog {
        self.applicator.catalog()
    }

    pub fn current(&self) -> Option<&ImageData> {
        self.current.as_ref()
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn gallery(&self) -> &Gallery {
        &self.gallery
    }

    pub fn severity(&self) -> AlertSeverity {
        self.severity
    }

    pub fn canceller(&self) -> BuildCanceller {
        BuildCanceller {
            interrupt: self.interrupt.clone(),
        }
    }

    /// Makes the remembered upload current. Returns `false` when there is
    /// none.
    pub async fn restore(&mut self) -> Result<bool> {
        self.rearm();

        match self.load_last_upload().await? {
            Some(image) => {
                self.apply_image(image).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Decodes `path`, makes it current and remembers it. A file that can't
    /// be decoded leaves the session as it was.
    pub async fn upload(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.rearm();

        let path = path.as_ref();
        let image = image_io::read_image(path)
            .await
            .with_context(|| format!("open {} failed", path.display()))?;
        let (image, bytes) = image_io::encode(image).await?;

        self.file_name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned());
        self.apply_image(image).await?;
        self.save_last_upload(Some(&bytes)).await
    }

    /// Makes the `name` rendition of the current image the new current image.
    pub async fn select(&mut self, name: &str) -> Result<()> {
        self.rearm();

        let image = match self.gallery.find(name) {
            Some(entry) => entry.image.clone(),
            None => {
                let current = self.current.clone().context("no image is loaded")?;
                self.applicator.query(current, name).await?
            }
        };

        self.apply_image(image).await
    }

    /// Writes the current image to `dir` as `<file stem>.png`, or
    /// `<unix millis>.png` when the image has no file behind it.
    pub async fn download(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let image = self.current.as_ref().context("no image to download")?;
        let name = match &self.file_name {
            Some(name) => name.trim().to_string(),
            None => chrono::Utc::now().timestamp_millis().to_string(),
        };

        let path = dir.as_ref().join(format!("{name}.png"));
        image_io::write_png(&path, image.clone()).await?;

        log::info!("downloaded {}", path.display());
        Ok(path)
    }

    /// Forgets the remembered upload and empties the session.
    pub async fn clear(&mut self) -> Result<()> {
        self.reset();
        self.save_last_upload(None).await
    }

    /// Applies the configured [`AlertSeverity`] to an unhandled error.
    pub async fn handle_error(&mut self, error: anyhow::Error) -> Result<()> {
        match self.severity {
            AlertSeverity::Ignore => {}
            AlertSeverity::Log => log::error!("{error:?}"),
            AlertSeverity::Surface => {
                eprintln!("error: {error:#}");
                self.reset();
                self.restore().await?;
            }
        }

        Ok(())
    }

    fn reset(&mut self) {
        self.token.cancel();
        self.current = None;
        self.file_name = None;
        self.gallery.clear();
    }

    fn rearm(&mut self) {
        *self.interrupt.lock().unwrap() = CancellationToken::new();
    }

    /// Makes `image` current and builds its gallery. A cancelled build keeps
    /// the entries it had produced and is not an error.
    async fn apply_image(&mut self, image: ImageData) -> Result<()> {
        self.token.cancel();
        self.token = self.interrupt.lock().unwrap().child_token();

        let current = self.current.insert(image);
        let result = build_gallery(
            &self.applicator,
            current,
            &self.options,
            &self.token,
            &mut self.gallery,
        )
        .await;

        match result {
            Err(e) if is_cancelled(&e) => {
                log::info!("gallery build cancelled after {} entries", self.gallery.len());
                Ok(())
            }
            result => result,
        }
    }

    async fn load_last_upload(&self) -> Result<Option<ImageData>> {
        let Some(bytes) = self.store.load().await? else {
            return Ok(None);
        };

        match image_io::decode(bytes).await {
            Ok(image) => Ok(Some(image)),
            Err(e) => {
                log::warn!("drop undecodable last upload: {e}");
                self.store.remove().await?;
                Ok(None)
            }
        }
    }

    async fn save_last_upload(&self, bytes: Option<&[u8]>) -> Result<()> {
        match bytes {
            Some(bytes) => self.store.save(bytes).await,
            None => self.store.remove().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_serde() {
        #[derive(Deserialize)]
        struct Wrap {
            severity: AlertSeverity,
        }

        for (text, severity) in [
            ("ignore", AlertSeverity::Ignore),
            ("log", AlertSeverity::Log),
            ("surface", AlertSeverity::Surface),
        ] {
            let wrap: Wrap = toml::from_str(&format!("severity = \"{text}\"")).unwrap();
            assert_eq!(wrap.severity, severity);
        }

        assert_eq!(AlertSeverity::default(), AlertSeverity::Surface);
    }
}
