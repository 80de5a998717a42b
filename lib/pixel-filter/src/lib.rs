//! Per-pixel color filters over RGBA textures.
//!
//! The crate is layered leaf first:
//! - [`color`]: a single RGBA value and its color-space transforms
//! - [`texture`]: an owned RGBA buffer with per-pixel iteration
//! - [`base_effect`], [`filter_effect`], [`channel_effect`]: configurable effects
//! - [`filter`]: the named filter catalog
//! - [`applicator`]: a worker pool that applies one filter per request

pub mod applicator;
pub mod base_effect;
pub mod channel_effect;
pub mod color;
pub mod filter;
pub mod filter_effect;
pub mod texture;

pub use applicator::{ApplicatorReply, ApplicatorRequest, EffectApplicator, ImageData};
pub use color::{Channel, Color};
pub use filter::{Filter, FilterCatalog};
pub use texture::{Progress, Texture};

pub type PixelFilterResult<T> = Result<T, PixelFilterError>;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PixelFilterError {
    #[error("Undefined filter '{0}' name")]
    UndefinedFilter(String),
    #[error("Filter '{0}' already defined")]
    DuplicateFilter(String),
    #[error("Malformed message: {0}")]
    MalformedMessage(String),
    #[error("Applicator closed: {0}")]
    ApplicatorClosed(String),
    #[error("Operation cancelled")]
    Cancelled,
}

/// An in-place transform over a whole texture.
pub trait Effect {
    fn apply(&self, texture: &mut Texture);
}

#[derive(Debug, Clone)]
pub enum PixelEffect {
    // Base effects
    Grayscale(base_effect::GrayscaleConfig),
    Invert(base_effect::InvertConfig),

    // Filter effects
    Sepia(filter_effect::SepiaConfig),

    // Channel effects
    ChannelMask(channel_effect::ChannelMaskConfig),
    Emphasis(channel_effect::EmphasisConfig),
}

impl Effect for PixelEffect {
    fn apply(&self, texture: &mut Texture) {
        match self {
            PixelEffect::Grayscale(config) => config.apply(texture),
            PixelEffect::Invert(config) => config.apply(texture),
            PixelEffect::Sepia(config) => config.apply(texture),
            PixelEffect::ChannelMask(config) => config.apply(texture),
            PixelEffect::Emphasis(config) => config.apply(texture),
        }
    }
}

impl From<base_effect::GrayscaleConfig> for PixelEffect {
    fn from(config: base_effect::GrayscaleConfig) -> Self {
        PixelEffect::Grayscale(config)
    }
}

impl From<base_effect::InvertConfig> for PixelEffect {
    fn from(config: base_effect::InvertConfig) -> Self {
        PixelEffect::Invert(config)
    }
}

impl From<filter_effect::SepiaConfig> for PixelEffect {
    fn from(config: filter_effect::SepiaConfig) -> Self {
        PixelEffect::Sepia(config)
    }
}

impl From<channel_effect::ChannelMaskConfig> for PixelEffect {
    fn from(config: channel_effect::ChannelMaskConfig) -> Self {
        PixelEffect::ChannelMask(config)
    }
}

impl From<channel_effect::EmphasisConfig> for PixelEffect {
    fn from(config: channel_effect::EmphasisConfig) -> Self {
        PixelEffect::Emphasis(config)
    }
}
