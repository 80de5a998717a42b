//! Owned RGBA pixel buffer.

use crate::{
    Channel, Color, PixelFilterError, PixelFilterResult, applicator::ImageData,
};
use image::{Rgba, RgbaImage};
use std::{fmt, sync::Arc};

/// A mutable 2-D RGBA buffer.
///
/// Backed by an [`RgbaImage`], so the byte length always equals
/// `width * height * 4` and pixel `(x, y)` lives at `(y * width + x) * 4`.
/// An attached [`Progress`] observer hears from every pixel pass.
#[derive(Clone)]
pub struct Texture {
    image: RgbaImage,
    progress: Option<Progress>,
}

impl Texture {
    /// A fully transparent black texture.
    pub fn new(width: u32, height: u32) -> Self {
        Self::from(RgbaImage::new(width, height))
    }

    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> PixelFilterResult<Self> {
        let len = data.len();
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(4));

        let malformed = || {
            PixelFilterError::MalformedMessage(format!(
                "The data of {len} bytes must be a {width}x{height} RGBA buffer of {} bytes",
                width as u64 * height as u64 * 4
            ))
        };

        if expected != Some(len) {
            return Err(malformed());
        }

        RgbaImage::from_raw(width, height, data)
            .map(Self::from)
            .ok_or_else(malformed)
    }

    pub fn from_image_data(data: ImageData) -> PixelFilterResult<Self> {
        Self::from_raw(data.width, data.height, data.data)
    }

    pub fn into_image_data(self) -> ImageData {
        let (width, height) = self.image.dimensions();
        ImageData {
            width,
            height,
            data: self.image.into_raw(),
        }
    }

    pub fn to_image_data(&self) -> ImageData {
        self.clone().into_image_data()
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn pixel_count(&self) -> usize {
        self.image.width() as usize * self.image.height() as usize
    }

    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        self.image.get_pixel_checked(x, y).map(Color::from)
    }

    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.set_progress(progress);
        self
    }

    pub fn set_progress(&mut self, progress: Progress) {
        self.progress = Some(progress);
    }

    pub fn take_progress(&mut self) -> Option<Progress> {
        self.progress.take()
    }

    /// Visits every pixel in row-major order with a mutable channel view,
    /// reporting the processed fraction to the attached [`Progress`].
    pub fn for_each<F>(&mut self, mut visitor: F)
    where
        F: FnMut(&mut Rgba<u8>),
    {
        let Some(progress) = &self.progress else {
            self.image.pixels_mut().for_each(visitor);
            return;
        };

        let total = self.pixel_count();
        for (index, pixel) in self.image.pixels_mut().enumerate() {
            visitor(pixel);

            let processed = index + 1;
            if processed % progress.every == 0 && processed != total {
                progress.report(processed as f32 / total as f32);
            }
        }
        progress.report(1.0);
    }

    /// Replaces every pixel with `transform(pixel)`.
    pub fn map_colors<F>(&mut self, mut transform: F)
    where
        F: FnMut(Color) -> Color,
    {
        self.for_each(|pixel| *pixel = transform(Color::from(*pixel)).into());
    }

    pub fn grayscale(&mut self) {
        self.map_colors(|color| color.grayscale(1.0));
    }

    pub fn sepia(&mut self) {
        self.map_colors(|color| color.sepia(1.0));
    }

    pub fn invert(&mut self) {
        self.map_colors(|color| color.invert(1.0));
    }

    pub fn emphasize(&mut self, channel: Channel, boost: f32, damping: f32) {
        self.map_colors(|color| color.emphasize(channel, boost, damping));
    }

    /// Sets each listed channel to zero.
    pub fn mask_channels(&mut self, channels: &[Channel]) {
        self.for_each(|pixel| {
            for channel in channels {
                pixel[channel.index()] = 0;
            }
        });
    }
}

impl From<RgbaImage> for Texture {
    fn from(image: RgbaImage) -> Self {
        Self {
            image,
            progress: None,
        }
    }
}

impl PartialEq for Texture {
    fn eq(&self, other: &Self) -> bool {
        self.image == other.image
    }
}

impl Eq for Texture {}

impl fmt::Debug for Texture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Texture")
            .field("width", &self.image.width())
            .field("height", &self.image.height())
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

/// Rate-limited progress observer for long pixel loops.
///
/// The callback receives the processed fraction every `every` pixels and
/// once with `1.0` when a pass ends.
#[derive(Clone)]
pub struct Progress {
    every: usize,
    callback: Arc<dyn Fn(f32) + Send + Sync>,
}

impl Progress {
    pub const DEFAULT_INTERVAL: usize = 64 * 1024;

    pub fn new(callback: impl Fn(f32) + Send + Sync + 'static) -> Self {
        Self {
            every: Self::DEFAULT_INTERVAL,
            callback: Arc::new(callback),
        }
    }

    pub fn with_interval(mut self, every: usize) -> Self {
        self.every = every.max(1);
        self
    }

    fn report(&self, fraction: f32) {
        (self.callback)(fraction);
    }
}
