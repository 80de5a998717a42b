//! Channel manipulation effects
//!
//! Provides operations for zeroing and emphasizing color channels.

use crate::{Channel, Effect, Texture};
use derivative::Derivative;
use derive_setters::Setters;

// ============================================================================
// Channel Mask Effects
// ============================================================================

/// Zeroes every listed channel, leaving the others untouched.
#[derive(Debug, Clone, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
#[non_exhaustive]
pub struct ChannelMaskConfig {
    channels: Vec<Channel>,
}

impl ChannelMaskConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps only `channel` among red, green and blue.
    pub fn isolate(channel: Channel) -> Self {
        let channels = Channel::COLORS
            .into_iter()
            .filter(|c| *c != channel)
            .collect();
        Self { channels }
    }

    /// Drops `channel`, keeping the two others.
    pub fn remove(channel: Channel) -> Self {
        Self {
            channels: vec![channel],
        }
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }
}

impl Effect for ChannelMaskConfig {
    fn apply(&self, texture: &mut Texture) {
        texture.mask_channels(&self.channels);
    }
}

// ============================================================================
// Channel Emphasis Effects
// ============================================================================

/// Boosts one color channel and damps the two others.
#[derive(Debug, Clone, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
#[non_exhaustive]
pub struct EmphasisConfig {
    #[derivative(Default(value = "Channel::Red"))]
    channel: Channel,

    #[derivative(Default(value = "1.25"))]
    boost: f32,

    #[derivative(Default(value = "0.85"))]
    damping: f32,
}

impl EmphasisConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of(channel: Channel) -> Self {
        Self::default().with_channel(channel)
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }
}

impl Effect for EmphasisConfig {
    fn apply(&self, texture: &mut Texture) {
        texture.emphasize(self.channel, self.boost, self.damping);
    }
}
