//! Off-thread filter application.
//!
//! A request is an [`ImageData`] plus a filter name; the reply is the filtered
//! buffer or the error that rejected the request. [`apply_request`] is the
//! whole computation. [`EffectApplicator`] runs it on a pool of worker threads
//! so async callers only ever await a reply.

use crate::{FilterCatalog, PixelFilterError, PixelFilterResult, Progress, Texture};
use crossbeam::channel::{Receiver, Sender, unbounded};
use image::RgbaImage;
use std::{
    sync::Arc,
    thread::{self, JoinHandle},
};
use tokio::sync::oneshot;

/// Raw RGBA buffer descriptor exchanged with the applicator.
///
/// Nothing is guaranteed about it until it is turned into a [`Texture`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl ImageData {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn into_rgba_image(self) -> PixelFilterResult<RgbaImage> {
        Texture::from_image_data(self).map(Texture::into_image)
    }
}

impl From<RgbaImage> for ImageData {
    fn from(image: RgbaImage) -> Self {
        Texture::from(image).into_image_data()
    }
}

#[derive(Debug, Clone)]
pub struct ApplicatorRequest {
    pub image: ImageData,
    pub filter: String,
}

impl ApplicatorRequest {
    pub fn new(image: ImageData, filter: impl Into<String>) -> Self {
        Self {
            image,
            filter: filter.into(),
        }
    }
}

pub type ApplicatorReply = PixelFilterResult<ImageData>;

/// Requests with at least this many pixels log their progress.
pub const PROGRESS_LOG_PIXELS: usize = 16 * Progress::DEFAULT_INTERVAL;

/// Looks up the filter, decodes the buffer, applies the filter and re-encodes.
pub fn apply_request(catalog: &FilterCatalog, request: ApplicatorRequest) -> ApplicatorReply {
    let ApplicatorRequest { image, filter } = request;

    let filter = catalog.find(&filter)?;
    let mut texture = Texture::from_image_data(image)?;
    if texture.pixel_count() >= PROGRESS_LOG_PIXELS {
        texture.set_progress(progress_logger(filter.name(), texture.pixel_count()));
    }

    filter.apply(&mut texture);
    Ok(texture.into_image_data())
}

fn progress_logger(filter: &str, pixels: usize) -> Progress {
    let filter = filter.to_string();
    Progress::new(move |fraction| {
        log::debug!("`{filter}` over {pixels} pixels: {:.0}%", fraction * 100.0)
    })
    .with_interval(pixels.div_ceil(4))
}

struct Job {
    request: ApplicatorRequest,
    reply: oneshot::Sender<ApplicatorReply>,
}

/// Pool of worker threads applying catalog filters, one job per request.
pub struct EffectApplicator {
    catalog: Arc<FilterCatalog>,
    sender: Option<Sender<Job>>,
    handles: Vec<JoinHandle<()>>,
}

impl EffectApplicator {
    pub fn new(catalog: Arc<FilterCatalog>, workers: usize) -> Self {
        let workers = workers.max(1);
        let (sender, receiver) = unbounded();

        let handles = (0..workers)
            .map(|index| Self::worker(catalog.clone(), receiver.clone(), index))
            .collect();

        log::info!("effect applicator started with {workers} workers");

        Self {
            catalog,
            sender: Some(sender),
            handles,
        }
    }

    fn worker(catalog: Arc<FilterCatalog>, receiver: Receiver<Job>, index: usize) -> JoinHandle<()> {
        thread::spawn(move || {
            while let Ok(Job { request, reply }) = receiver.recv() {
                let filter = request.filter.clone();
                let (width, height) = request.image.dimensions();

                let result = apply_request(&catalog, request);
                match &result {
                    Ok(_) => log::debug!("worker[{index}] applied `{filter}` to {width}x{height}"),
                    Err(e) => log::warn!("worker[{index}] rejected `{filter}` request: {e}"),
                }

                if reply.send(result).is_err() {
                    log::debug!("worker[{index}] reply for `{filter}` dropped by caller");
                }
            }

            log::debug!("effect applicator worker[{index}] exit");
        })
    }

    pub fn catalog(&self) -> &Arc<FilterCatalog> {
        &self.catalog
    }

    pub fn workers(&self) -> usize {
        self.handles.len()
    }

    /// Queues a request and returns the receiver of its reply.
    pub fn submit(
        &self,
        request: ApplicatorRequest,
    ) -> PixelFilterResult<oneshot::Receiver<ApplicatorReply>> {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| PixelFilterError::ApplicatorClosed("no worker is running".to_string()))?;

        let (reply, receiver) = oneshot::channel();
        sender.send(Job { request, reply }).map_err(|e| {
            PixelFilterError::ApplicatorClosed(format!(
                "send `{}` request failed",
                e.0.request.filter
            ))
        })?;

        Ok(receiver)
    }

    /// Applies `filter` to a copy of `image` on a worker and awaits the reply.
    pub async fn query(&self, image: ImageData, filter: &str) -> ApplicatorReply {
        let dimensions = image.dimensions();
        let receiver = self.submit(ApplicatorRequest::new(image, filter))?;

        let reply = receiver.await.map_err(|_| {
            PixelFilterError::ApplicatorClosed(format!("worker dropped `{filter}` request"))
        })??;

        check_dimensions(reply, dimensions)
    }

    /// Blocking flavour of [`EffectApplicator::query`]. Must not be called
    /// from inside an async runtime.
    pub fn query_blocking(&self, image: ImageData, filter: &str) -> ApplicatorReply {
        let dimensions = image.dimensions();
        let receiver = self.submit(ApplicatorRequest::new(image, filter))?;

        let reply = receiver.blocking_recv().map_err(|_| {
            PixelFilterError::ApplicatorClosed(format!("worker dropped `{filter}` request"))
        })??;

        check_dimensions(reply, dimensions)
    }
}

impl Drop for EffectApplicator {
    fn drop(&mut self) {
        self.sender.take();

        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                log::warn!("effect applicator worker panicked");
            }
        }
    }
}

fn check_dimensions(reply: ImageData, (width, height): (u32, u32)) -> ApplicatorReply {
    if reply.dimensions() != (width, height) {
        return Err(PixelFilterError::MalformedMessage(format!(
            "The reply of {}x{} must match the {width}x{height} request",
            reply.width, reply.height
        )));
    }

    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::names;

    fn sample() -> ImageData {
        ImageData::new(2, 1, vec![200, 100, 50, 255, 10, 20, 30, 128])
    }

    #[test]
    fn test_apply_request_redless() {
        let catalog = FilterCatalog::builtin().unwrap();
        let reply = apply_request(&catalog, ApplicatorRequest::new(sample(), names::REDLESS));
        assert_eq!(reply.unwrap().data, vec![0, 100, 50, 255, 0, 20, 30, 128]);
    }

    #[test]
    fn test_apply_request_invert() {
        let catalog = FilterCatalog::builtin().unwrap();
        let reply = apply_request(&catalog, ApplicatorRequest::new(sample(), names::INVERT));
        assert_eq!(reply.unwrap().data, vec![55, 155, 205, 255, 245, 235, 225, 128]);
    }

    #[test]
    fn test_apply_request_rejects_short_buffer() {
        let catalog = FilterCatalog::builtin().unwrap();
        let image = ImageData::new(2, 2, vec![0; 8]);
        let reply = apply_request(&catalog, ApplicatorRequest::new(image, names::SEPIA));
        assert!(matches!(reply, Err(PixelFilterError::MalformedMessage(_))));
    }

    #[test]
    fn test_apply_request_unknown_filter() {
        let catalog = FilterCatalog::builtin().unwrap();
        let reply = apply_request(&catalog, ApplicatorRequest::new(sample(), "Blur"));
        assert_eq!(reply, Err(PixelFilterError::UndefinedFilter("Blur".to_string())));
    }

    #[test]
    fn test_apply_request_large_image() {
        let catalog = FilterCatalog::builtin().unwrap();
        let (width, height) = (1024, PROGRESS_LOG_PIXELS as u32 / 1024);
        let image = ImageData::new(width, height, vec![10; PROGRESS_LOG_PIXELS * 4]);

        let reply = apply_request(&catalog, ApplicatorRequest::new(image, names::INVERT)).unwrap();
        assert_eq!(reply.dimensions(), (width, height));
        assert!(reply.data.chunks(4).all(|px| px == [245, 245, 245, 10]));
    }

    #[test]
    fn test_check_dimensions() {
        assert!(check_dimensions(sample(), (2, 1)).is_ok());
        assert!(matches!(
            check_dimensions(sample(), (1, 2)),
            Err(PixelFilterError::MalformedMessage(_))
        ));
    }

    #[test]
    fn test_image_data_rgba_conversion() {
        let image = sample().into_rgba_image().unwrap();
        assert_eq!(image.dimensions(), (2, 1));
        assert_eq!(ImageData::from(image), sample());
    }

    #[test]
    fn test_query_blocking() {
        let catalog = Arc::new(FilterCatalog::builtin().unwrap());
        let applicator = EffectApplicator::new(catalog, 2);
        assert_eq!(applicator.workers(), 2);

        let reply = applicator.query_blocking(sample(), names::RED).unwrap();
        assert_eq!(reply.data, vec![200, 0, 0, 255, 10, 0, 0, 128]);
    }
}
