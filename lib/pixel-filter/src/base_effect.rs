use crate::{Effect, Texture};
use derivative::Derivative;
use derive_setters::Setters;

/// Grayscale effect configuration
#[derive(Debug, Clone, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
#[non_exhaustive]
pub struct GrayscaleConfig {
    #[derivative(Default(value = "1.0"))]
    strength: f32,
}

impl GrayscaleConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strength(&self) -> f32 {
        self.strength
    }
}

impl Effect for GrayscaleConfig {
    fn apply(&self, texture: &mut Texture) {
        let strength = self.strength;
        texture.map_colors(|color| color.grayscale(strength));
    }
}

/// Invert effect configuration
#[derive(Debug, Clone, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
#[non_exhaustive]
pub struct InvertConfig {
    #[derivative(Default(value = "1.0"))]
    strength: f32,
}

impl InvertConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strength(&self) -> f32 {
        self.strength
    }
}

impl Effect for InvertConfig {
    fn apply(&self, texture: &mut Texture) {
        let strength = self.strength;
        texture.map_colors(|color| color.invert(strength));
    }
}
