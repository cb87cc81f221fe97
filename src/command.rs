//! Output commands
//!
//! Converts loosely typed command requests (as they arrive from the JSON
//! API or plugin scripts) into validated [`Command`]s. Validation happens
//! in full before anything touches an output, so a rejected command never
//! applies partially.

use serde::Deserialize;

use crate::blend::Blender;
use crate::color::{Rgb, rgb_from_hex};
use crate::envelope::Envelope;
use crate::error::ValidationError;
use crate::transition::Transition;

const ACTION_NAME_CONSTANT: &str = "Constant";
const ACTION_NAME_FADE: &str = "Fade";
const ACTION_NAME_BLINK: &str = "Blink";

/// Verbs an output understands
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Action {
    /// Cut over to the new color in a single step
    Constant,
    /// Move to the new color over a number of steps
    #[default]
    Fade,
    /// Move to the new color and back, a number of times
    Blink,
}

impl Action {
    pub const ALL: [Self; 3] = [Self::Constant, Self::Fade, Self::Blink];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Constant => ACTION_NAME_CONSTANT,
            Self::Fade => ACTION_NAME_FADE,
            Self::Blink => ACTION_NAME_BLINK,
        }
    }

    /// Parse an action name, ignoring case
    pub fn parse_from_str(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str().eq_ignore_ascii_case(s))
    }
}

/// A color as accepted by the API: `[r, g, b]` or a hex string
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ColorValue {
    Triplet([u8; 3]),
    Hex(String),
}

impl ColorValue {
    pub fn to_rgb(&self) -> Result<Rgb, ValidationError> {
        match self {
            Self::Triplet([r, g, b]) => Ok(Rgb::new(*r, *g, *b)),
            Self::Hex(hex) => rgb_from_hex(hex),
        }
    }
}

/// Raw command as received from the outside
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CommandRequest {
    pub output: usize,
    pub action: Option<String>,
    pub layer: usize,
    pub color: Option<ColorValue>,
    pub opacity: Option<f32>,
    pub steps: Option<i64>,
    pub blender: Option<String>,
    pub envelope: Option<String>,
    pub count: Option<i64>,
    pub queue: Option<bool>,
}

impl CommandRequest {
    /// Validate every field of the request
    pub fn parse(&self) -> Result<Command, ValidationError> {
        let action = match &self.action {
            Some(name) => Action::parse_from_str(name)
                .ok_or_else(|| ValidationError::UnknownAction(name.clone()))?,
            None => Action::default(),
        };
        let blender = self
            .blender
            .as_deref()
            .map(|name| {
                Blender::parse_from_str(name)
                    .ok_or_else(|| ValidationError::UnknownBlender(name.to_owned()))
            })
            .transpose()?;
        let envelope = self
            .envelope
            .as_deref()
            .map(|name| {
                Envelope::parse_from_str(name)
                    .ok_or_else(|| ValidationError::UnknownEnvelope(name.to_owned()))
            })
            .transpose()?;
        let color = self.color.as_ref().map(ColorValue::to_rgb).transpose()?;
        if let Some(opacity) = self.opacity {
            if !(0.0..=1.0).contains(&opacity) {
                return Err(ValidationError::OpacityOutOfRange(opacity));
            }
        }
        let steps = match self.steps {
            Some(steps) => u32::try_from(steps)
                .ok()
                .filter(|&steps| steps >= 1)
                .ok_or(ValidationError::InvalidSteps(steps))?,
            None => 1,
        };
        let count = match self.count {
            Some(count) => u32::try_from(count)
                .ok()
                .filter(|&count| count >= 1)
                .ok_or(ValidationError::InvalidCount(count))?,
            None => 1,
        };

        Ok(Command {
            output: self.output,
            action,
            options: CommandOptions {
                layer: self.layer,
                color,
                opacity: self.opacity,
                steps,
                blender,
                envelope,
                count,
                queue: self.queue.unwrap_or(true),
            },
        })
    }
}

/// Validated options of an output verb
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOptions {
    /// Layer the transition goes to
    pub layer: usize,
    /// Target color, None keeps the color
    pub color: Option<Rgb>,
    /// Target opacity, None keeps the opacity
    pub opacity: Option<f32>,
    /// Steps per transition (ignored by `Constant`)
    pub steps: u32,
    pub blender: Option<Blender>,
    pub envelope: Option<Envelope>,
    /// Number of blinks (only used by `Blink`)
    pub count: u32,
    /// Wait for pending transitions instead of replacing them
    pub queue: bool,
}

impl Default for CommandOptions {
    fn default() -> Self {
        Self {
            layer: 0,
            color: None,
            opacity: None,
            steps: 1,
            blender: None,
            envelope: None,
            count: 1,
            queue: true,
        }
    }
}

impl CommandOptions {
    /// Options targeting `color` on the bottom layer
    pub fn color(color: Rgb) -> Self {
        Self {
            color: Some(color),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_layer(mut self, layer: usize) -> Self {
        self.layer = layer;
        self
    }

    #[must_use]
    pub const fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = Some(opacity);
        self
    }

    #[must_use]
    pub const fn with_steps(mut self, steps: u32) -> Self {
        self.steps = steps;
        self
    }

    #[must_use]
    pub const fn with_blender(mut self, blender: Blender) -> Self {
        self.blender = Some(blender);
        self
    }

    #[must_use]
    pub const fn with_envelope(mut self, envelope: Envelope) -> Self {
        self.envelope = Some(envelope);
        self
    }

    #[must_use]
    pub const fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    #[must_use]
    pub const fn with_queue(mut self, queue: bool) -> Self {
        self.queue = queue;
        self
    }

    /// Build the transition these options describe
    pub fn transition(&self, steps: u32) -> Result<Transition, ValidationError> {
        let mut transition = Transition::new(steps)?.with_queue(self.queue);
        if let Some(color) = self.color {
            transition = transition.with_color(color);
        }
        if let Some(opacity) = self.opacity {
            transition = transition.with_opacity(opacity);
        }
        if let Some(blender) = self.blender {
            transition = transition.with_blender(blender);
        }
        if let Some(envelope) = self.envelope {
            transition = transition.with_envelope(envelope);
        }
        Ok(transition)
    }
}

/// A validated command for one output
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub output: usize,
    pub action: Action,
    pub options: CommandOptions,
}
