use rand::Rng;

use crate::{color::Rgb, error::ValidationError};

/// Round and clamp a floating point channel value into `0..=255`
#[inline]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn clamp_channel(value: f32) -> u8 {
    if value.is_nan() {
        return 0;
    }
    libm::roundf(value).clamp(0.0, 255.0) as u8
}

/// Create an RGB color from a u32 value (0xRRGGBB format)
pub const fn rgb_from_u32(color: u32) -> Rgb {
    Rgb {
        r: ((color >> 16) & 0xFF) as u8,
        g: ((color >> 8) & 0xFF) as u8,
        b: (color & 0xFF) as u8,
    }
}

/// Parse a hexadecimal color
///
/// Accepts short (`abc`) and long (`aabbcc`) forms, with or without
/// a leading `#`.
pub fn rgb_from_hex(hex: &str) -> Result<Rgb, ValidationError> {
    let invalid = || ValidationError::InvalidHexColor(hex.to_owned());
    let digits = hex.trim().trim_start_matches('#');
    if !digits.bytes().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    let value = u32::from_str_radix(digits, 16).map_err(|_| invalid())?;
    match digits.len() {
        // Every short digit is doubled: `f80` becomes `ff8800`
        3 => {
            let r = (value >> 8) & 0xF;
            let g = (value >> 4) & 0xF;
            let b = value & 0xF;
            Ok(rgb_from_u32(((r * 0x11) << 16) | ((g * 0x11) << 8) | (b * 0x11)))
        }
        6 => Ok(rgb_from_u32(value)),
        _ => Err(invalid()),
    }
}

/// Format a color as `#rrggbb`
pub fn rgb_to_hex(color: Rgb) -> String {
    format!("#{:02x}{:02x}{:02x}", color.r, color.g, color.b)
}

/// Generate a random color
///
/// With `saturate` set, a color whose channels are all above 50 gets one
/// channel zeroed. LEDs do not tell near-white colors apart very well.
pub fn random_color(saturate: bool) -> Rgb {
    let mut rng = rand::thread_rng();
    let mut channels: [u8; 3] = [
        rng.gen_range(0..=255),
        rng.gen_range(0..=255),
        rng.gen_range(0..=255),
    ];
    if saturate && channels.iter().all(|&channel| channel > 50) {
        channels[rng.gen_range(0..3)] = 0;
    }
    Rgb::new(channels[0], channels[1], channels[2])
}
