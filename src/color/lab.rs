//! CIE L*a*b* conversion
//!
//! sRGB (D65) to Lab and back. Lab is only used as an intermediate space
//! so that interpolation looks linear to the eye.

use core::ops::{Add, Mul, Sub};

use super::Rgb;

// D65 reference white
const REF_X: f64 = 0.950_47;
const REF_Y: f64 = 1.0;
const REF_Z: f64 = 1.088_83;

const EPSILON: f64 = 216.0 / 24_389.0;
const KAPPA: f64 = 24_389.0 / 27.0;

/// Color in CIE L*a*b* space.
///
/// Also used for color deltas (see [`color_diff`]).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Lab {
    /// Lightness, 0 (black) to 100 (white)
    pub l: f32,
    /// Green (negative) to red (positive)
    pub a: f32,
    /// Blue (negative) to yellow (positive)
    pub b: f32,
}

/// Difference between two Lab colors
pub type LabDelta = Lab;

impl Lab {
    pub const fn new(l: f32, a: f32, b: f32) -> Self {
        Self { l, a, b }
    }
}

impl Add for Lab {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.l + rhs.l, self.a + rhs.a, self.b + rhs.b)
    }
}

impl Sub for Lab {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.l - rhs.l, self.a - rhs.a, self.b - rhs.b)
    }
}

impl Mul<f32> for Lab {
    type Output = Self;

    fn mul(self, factor: f32) -> Self {
        Self::new(self.l * factor, self.a * factor, self.b * factor)
    }
}

/// Elementwise `(target - begin) * factor`
pub fn color_diff(begin: Lab, target: Lab, factor: f32) -> LabDelta {
    (target - begin) * factor
}

/// Convert an sRGB color to Lab
#[allow(clippy::cast_possible_truncation)]
pub fn rgb_to_lab(color: Rgb) -> Lab {
    let r = expand(color.r);
    let g = expand(color.g);
    let b = expand(color.b);

    let x = 0.412_456_4 * r + 0.357_576_1 * g + 0.180_437_5 * b;
    let y = 0.212_672_9 * r + 0.715_152_2 * g + 0.072_175_0 * b;
    let z = 0.019_333_9 * r + 0.119_192_0 * g + 0.950_304_1 * b;

    let fx = lab_f(x / REF_X);
    let fy = lab_f(y / REF_Y);
    let fz = lab_f(z / REF_Z);

    Lab {
        l: (116.0 * fy - 16.0) as f32,
        a: (500.0 * (fx - fy)) as f32,
        b: (200.0 * (fy - fz)) as f32,
    }
}

/// Convert a Lab color to sRGB
///
/// Colors outside of the sRGB gamut are clamped per channel.
pub fn lab_to_rgb(lab: Lab) -> Rgb {
    let l = f64::from(lab.l);
    let fy = (l + 16.0) / 116.0;
    let fx = fy + f64::from(lab.a) / 500.0;
    let fz = fy - f64::from(lab.b) / 200.0;

    let x = lab_f_inv(fx) * REF_X;
    let y = if l > KAPPA * EPSILON {
        fy * fy * fy
    } else {
        l / KAPPA
    } * REF_Y;
    let z = lab_f_inv(fz) * REF_Z;

    let r = 3.240_454_2 * x - 1.537_138_5 * y - 0.498_531_4 * z;
    let g = -0.969_266_0 * x + 1.876_010_8 * y + 0.041_556_0 * z;
    let b = 0.055_643_4 * x - 0.204_025_9 * y + 1.057_225_2 * z;

    Rgb {
        r: compress(r),
        g: compress(g),
        b: compress(b),
    }
}

/// sRGB companding: 8-bit channel to linear intensity
fn expand(channel: u8) -> f64 {
    let c = f64::from(channel) / 255.0;
    if c <= 0.040_45 {
        c / 12.92
    } else {
        libm::pow((c + 0.055) / 1.055, 2.4)
    }
}

/// Inverse sRGB companding: linear intensity to 8-bit channel
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn compress(linear: f64) -> u8 {
    let c = if linear <= 0.003_130_8 {
        linear * 12.92
    } else {
        1.055 * libm::pow(linear, 1.0 / 2.4) - 0.055
    };
    libm::round(c * 255.0).clamp(0.0, 255.0) as u8
}

fn lab_f(t: f64) -> f64 {
    if t > EPSILON {
        libm::cbrt(t)
    } else {
        (KAPPA * t + 16.0) / 116.0
    }
}

fn lab_f_inv(f: f64) -> f64 {
    let cube = f * f * f;
    if cube > EPSILON {
        cube
    } else {
        (116.0 * f - 16.0) / KAPPA
    }
}
