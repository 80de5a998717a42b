use crate::{Effect, Texture};
use derivative::Derivative;
use derive_setters::Setters;

/// Sepia tone configuration
#[derive(Debug, Clone, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
#[non_exhaustive]
pub struct SepiaConfig {
    #[derivative(Default(value = "1.0"))]
    intensity: f32,
}

impl SepiaConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intensity(&self) -> f32 {
        self.intensity
    }
}

impl Effect for SepiaConfig {
    fn apply(&self, texture: &mut Texture) {
        let intensity = self.intensity;
        texture.map_colors(|color| color.sepia(intensity));
    }
}
