//! Layer blend policies
//!
//! A blender combines the composite color below a layer (`base`) with the
//! layer's own color (`overlay`), weighted by the layer's opacity.

use crate::color::{Rgb, clamp_channel, color_diff, lab_to_rgb, rgb_to_lab};

const BLENDER_NAME_RGB_AVERAGE: &str = "RgbAverage";
const BLENDER_NAME_LAB_AVERAGE: &str = "LabAverage";
const BLENDER_NAME_DARKEN: &str = "Darken";
const BLENDER_NAME_LIGHTEN: &str = "Lighten";
const BLENDER_NAME_ROOT_SUM_SQUARE: &str = "RootSumSquare";

/// Known blend policies
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Blender {
    /// Linear interpolation of the RGB channels
    RgbAverage,
    /// Linear interpolation in Lab space
    #[default]
    LabAverage,
    /// Only ever lowers the lightness of the base
    Darken,
    /// Only ever raises the lightness of the base
    Lighten,
    /// Root of the base squared plus the weighted difference squared
    RootSumSquare,
}

impl Blender {
    pub const ALL: [Self; 5] = [
        Self::RgbAverage,
        Self::LabAverage,
        Self::Darken,
        Self::Lighten,
        Self::RootSumSquare,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RgbAverage => BLENDER_NAME_RGB_AVERAGE,
            Self::LabAverage => BLENDER_NAME_LAB_AVERAGE,
            Self::Darken => BLENDER_NAME_DARKEN,
            Self::Lighten => BLENDER_NAME_LIGHTEN,
            Self::RootSumSquare => BLENDER_NAME_ROOT_SUM_SQUARE,
        }
    }

    pub fn parse_from_str(s: &str) -> Option<Self> {
        match s {
            BLENDER_NAME_RGB_AVERAGE => Some(Self::RgbAverage),
            BLENDER_NAME_LAB_AVERAGE => Some(Self::LabAverage),
            BLENDER_NAME_DARKEN => Some(Self::Darken),
            BLENDER_NAME_LIGHTEN => Some(Self::Lighten),
            BLENDER_NAME_ROOT_SUM_SQUARE => Some(Self::RootSumSquare),
            _ => None,
        }
    }

    /// Blend `overlay` over `base` at `opacity`
    ///
    /// Every policy returns `base` untouched at zero opacity.
    pub fn blend(self, base: Rgb, overlay: Rgb, opacity: f32) -> Rgb {
        if opacity <= 0.0 {
            return base;
        }
        match self {
            Self::RgbAverage => rgb_average(base, overlay, opacity),
            Self::LabAverage => lab_average(base, overlay, opacity),
            Self::Darken => {
                adjust_lightness(base, overlay, opacity, |overlay, base| overlay < base)
            }
            Self::Lighten => {
                adjust_lightness(base, overlay, opacity, |overlay, base| overlay > base)
            }
            Self::RootSumSquare => root_sum_square(base, overlay, opacity),
        }
    }
}

fn rgb_average(base: Rgb, overlay: Rgb, opacity: f32) -> Rgb {
    if opacity >= 1.0 {
        return overlay;
    }
    let lerp = |b: u8, o: u8| {
        let b = f32::from(b);
        clamp_channel(b + (f32::from(o) - b) * opacity)
    };
    Rgb {
        r: lerp(base.r, overlay.r),
        g: lerp(base.g, overlay.g),
        b: lerp(base.b, overlay.b),
    }
}

fn lab_average(base: Rgb, overlay: Rgb, opacity: f32) -> Rgb {
    if opacity >= 1.0 {
        return overlay;
    }
    let base = rgb_to_lab(base);
    lab_to_rgb(base + color_diff(base, rgb_to_lab(overlay), opacity))
}

/// Moves the lightness of `base` toward that of `overlay` when `wanted`
/// approves of the direction.
fn adjust_lightness(
    base: Rgb,
    overlay: Rgb,
    opacity: f32,
    wanted: impl Fn(f32, f32) -> bool,
) -> Rgb {
    let mut lab = rgb_to_lab(base);
    let overlay_lightness = rgb_to_lab(overlay).l;
    if !wanted(overlay_lightness, lab.l) {
        return base;
    }
    lab.l += (overlay_lightness - lab.l) * opacity.min(1.0);
    lab_to_rgb(lab)
}

fn root_sum_square(base: Rgb, overlay: Rgb, opacity: f32) -> Rgb {
    let channel = |b: u8, o: u8| {
        let b = f32::from(b);
        let diff = (f32::from(o) - b) * opacity;
        clamp_channel(libm::sqrtf(b * b + diff * diff).min(255.0))
    };
    Rgb {
        r: channel(base.r, overlay.r),
        g: channel(base.g, overlay.g),
        b: channel(base.b, overlay.b),
    }
}
