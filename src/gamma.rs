//! Output power correction
//!
//! The eye responds to luminance non-linearly. A lookup table maps each
//! requested level to the device intensity that makes equal level steps
//! look equally large.

use crate::color::Rgb;
use crate::error::ValidationError;

/// Gamma table parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GammaConfig {
    /// Gamma exponent, 2.2 is typical for the human eye
    pub gamma: f32,
    /// Number of bits of requested levels
    pub in_bits: u8,
    /// Number of bits of device intensity
    pub out_bits: u8,
}

impl GammaConfig {
    /// Identity mapping, leaves colors untouched
    pub const LINEAR: Self = Self {
        gamma: 1.0,
        in_bits: 8,
        out_bits: 8,
    };
}

impl Default for GammaConfig {
    fn default() -> Self {
        Self::LINEAR
    }
}

/// Precomputed level -> intensity lookup
#[derive(Debug, Clone)]
pub struct GammaTable {
    config: GammaConfig,
    levels: heapless::Vec<u8, 256>,
}

impl GammaTable {
    /// Build the lookup table
    ///
    /// Each level maps to `ceil((level / 2^in_bits)^gamma * 2^out_bits)`,
    /// capped at the largest intensity the device accepts.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn new(config: GammaConfig) -> Result<Self, ValidationError> {
        let GammaConfig {
            gamma,
            in_bits,
            out_bits,
        } = config;
        if !(1..=8).contains(&in_bits) || !(1..=8).contains(&out_bits) {
            return Err(ValidationError::InvalidGammaBits { in_bits, out_bits });
        }
        if !gamma.is_finite() || gamma <= 0.0 {
            return Err(ValidationError::InvalidGamma(gamma));
        }

        let scale_in = f64::from(1u32 << in_bits);
        let scale_out = f64::from(1u32 << out_bits);
        let max_out = scale_out - 1.0;

        let mut levels = heapless::Vec::new();
        for level in 0..(1u32 << in_bits) {
            let intensity =
                libm::ceil(libm::pow(f64::from(level) / scale_in, f64::from(gamma)) * scale_out);
            // Capacity is 256 and `in_bits` is at most 8
            let _ = levels.push(intensity.min(max_out) as u8);
        }

        Ok(Self { config, levels })
    }

    /// Identity table
    pub fn linear() -> Self {
        let mut levels = heapless::Vec::new();
        for level in 0..=u8::MAX {
            let _ = levels.push(level);
        }
        Self {
            config: GammaConfig::LINEAR,
            levels,
        }
    }

    pub const fn config(&self) -> GammaConfig {
        self.config
    }

    /// Corrected intensity for a single 8-bit channel level
    pub fn correct_level(&self, level: u8) -> u8 {
        let index = usize::from(level >> (8 - self.config.in_bits));
        self.levels.get(index).copied().unwrap_or(level)
    }

    /// Correct every channel of a color
    pub fn correct(&self, color: Rgb) -> Rgb {
        Rgb {
            r: self.correct_level(color.r),
            g: self.correct_level(color.g),
            b: self.correct_level(color.b),
        }
    }
}

impl Default for GammaTable {
    fn default() -> Self {
        Self::linear()
    }
}
