mod lab;
mod utils;

use smart_leds::RGB8;

pub use lab::{Lab, LabDelta, color_diff, lab_to_rgb, rgb_to_lab};
pub use utils::{clamp_channel, random_color, rgb_from_hex, rgb_from_u32, rgb_to_hex};

pub type Rgb = RGB8;

pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };
