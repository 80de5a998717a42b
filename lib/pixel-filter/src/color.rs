//! RGBA color value and its color-space transforms.
//!
//! Every channel, alpha included, is an 8-bit integer. Transforms compute in
//! `f32`, round, and clamp back into `0..=255`. Strength arguments are clamped
//! to `[0, 1]` and blend linearly between the input and the fully transformed
//! color.

use image::Rgba;

/// Rec. 601 luma weights.
const LUMA_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

/// Canonical sepia tone matrix, one row per output channel.
const SEPIA_MATRIX: [[f32; 3]; 3] = [
    [0.393, 0.769, 0.189],
    [0.349, 0.686, 0.168],
    [0.272, 0.534, 0.131],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Red,
    Green,
    Blue,
    Alpha,
}

impl Channel {
    pub const COLORS: [Channel; 3] = [Channel::Red, Channel::Green, Channel::Blue];

    /// Byte offset of the channel inside an RGBA pixel.
    pub const fn index(self) -> usize {
        match self {
            Channel::Red => 0,
            Channel::Green => 1,
            Channel::Blue => 2,
            Channel::Alpha => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Channel::Red => "Red",
            Channel::Green => "Green",
            Channel::Blue => "Blue",
            Channel::Alpha => "Alpha",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
}

impl Color {
    pub const fn new(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    pub const fn opaque(red: u8, green: u8, blue: u8) -> Self {
        Self::new(red, green, blue, u8::MAX)
    }

    pub fn channel(&self, channel: Channel) -> u8 {
        match channel {
            Channel::Red => self.red,
            Channel::Green => self.green,
            Channel::Blue => self.blue,
            Channel::Alpha => self.alpha,
        }
    }

    pub fn with_channel(mut self, channel: Channel, value: u8) -> Self {
        match channel {
            Channel::Red => self.red = value,
            Channel::Green => self.green = value,
            Channel::Blue => self.blue = value,
            Channel::Alpha => self.alpha = value,
        }
        self
    }

    /// Alpha as a fraction in `[0, 1]`.
    pub fn alpha_normalized(&self) -> f32 {
        self.alpha as f32 / 255.0
    }

    /// Perceived brightness, Rec. 601 weighted sum of R, G and B.
    pub fn luma(&self) -> f32 {
        LUMA_WEIGHTS[0] * self.red as f32
            + LUMA_WEIGHTS[1] * self.green as f32
            + LUMA_WEIGHTS[2] * self.blue as f32
    }

    /// Per-channel linear interpolation from `self` (t = 0) to `other` (t = 1).
    pub fn mix(self, other: Color, t: f32) -> Self {
        let t = clamp_strength(t);
        Self {
            red: lerp(self.red, other.red, t),
            green: lerp(self.green, other.green, t),
            blue: lerp(self.blue, other.blue, t),
            alpha: lerp(self.alpha, other.alpha, t),
        }
    }

    pub fn grayscale(self, strength: f32) -> Self {
        let gray = to_channel(self.luma());
        self.mix(Self::new(gray, gray, gray, self.alpha), strength)
    }

    pub fn sepia(self, strength: f32) -> Self {
        let input = [self.red as f32, self.green as f32, self.blue as f32];
        let [red, green, blue] = SEPIA_MATRIX.map(|row| {
            to_channel(row[0] * input[0] + row[1] * input[1] + row[2] * input[2])
        });
        self.mix(Self::new(red, green, blue, self.alpha), strength)
    }

    pub fn invert(self, strength: f32) -> Self {
        let inverted = Self::new(
            u8::MAX - self.red,
            u8::MAX - self.green,
            u8::MAX - self.blue,
            self.alpha,
        );
        self.mix(inverted, strength)
    }

    /// Scales `channel` by `boost` and the two other color channels by `damping`.
    ///
    /// Negative factors are treated as zero. Emphasizing [`Channel::Alpha`]
    /// leaves the color untouched.
    pub fn emphasize(self, channel: Channel, boost: f32, damping: f32) -> Self {
        if channel == Channel::Alpha {
            return self;
        }

        let (boost, damping) = (boost.max(0.0), damping.max(0.0));
        Channel::COLORS.iter().fold(self, |color, &c| {
            let factor = if c == channel { boost } else { damping };
            color.with_channel(c, to_channel(color.channel(c) as f32 * factor))
        })
    }
}

impl From<Rgba<u8>> for Color {
    fn from(pixel: Rgba<u8>) -> Self {
        let [red, green, blue, alpha] = pixel.0;
        Self::new(red, green, blue, alpha)
    }
}

impl From<&Rgba<u8>> for Color {
    fn from(pixel: &Rgba<u8>) -> Self {
        Self::from(*pixel)
    }
}

impl From<Color> for Rgba<u8> {
    fn from(color: Color) -> Self {
        Rgba([color.red, color.green, color.blue, color.alpha])
    }
}

impl From<(u8, u8, u8, u8)> for Color {
    fn from((red, green, blue, alpha): (u8, u8, u8, u8)) -> Self {
        Self::new(red, green, blue, alpha)
    }
}

fn clamp_strength(t: f32) -> f32 {
    if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) }
}

fn to_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

fn lerp(from: u8, to: u8, t: f32) -> u8 {
    to_channel(from as f32 + (to as f32 - from as f32) * t)
}
