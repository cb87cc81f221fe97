use crate::blend::Blender;
use crate::color::{Lab, Rgb, color_diff, lab_to_rgb, rgb_to_lab};
use crate::envelope::Envelope;
use crate::error::ValidationError;

/// Plan for moving a layer to a new color and/or opacity
///
/// Immutable once built. The starting point is only known when the layer
/// gets to it, see [`Transition::start`].
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// Target color, also kept in Lab space (None keeps the color)
    color: Option<(Rgb, Lab)>,
    /// Target opacity (None keeps the opacity)
    opacity: Option<f32>,
    /// Number of steps of the forward leg
    steps: u32,
    /// Blender installed on the layer when the transition starts
    blender: Option<Blender>,
    /// Envelope installed on the layer when the transition starts
    envelope: Option<Envelope>,
    /// Run back to the starting point after reaching the target
    reverse: bool,
    /// Wait behind already queued transitions instead of replacing them
    queue: bool,
}

impl Transition {
    /// Create a new transition of `steps` steps
    ///
    /// Fails when `steps` is not at least 1.
    pub fn new(steps: u32) -> Result<Self, ValidationError> {
        if steps == 0 {
            return Err(ValidationError::InvalidSteps(0));
        }
        Ok(Self {
            color: None,
            opacity: None,
            steps,
            blender: None,
            envelope: None,
            reverse: false,
            queue: true,
        })
    }

    #[must_use]
    pub fn with_color(mut self, color: Rgb) -> Self {
        self.color = Some((color, rgb_to_lab(color)));
        self
    }

    #[must_use]
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = Some(opacity.clamp(0.0, 1.0));
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

    /// Return to the starting point after reaching the target
    #[must_use]
    pub const fn with_reverse(mut self) -> Self {
        self.reverse = true;
        self
    }

    /// Set whether the transition waits in the queue (`true`) or
    /// replaces everything pending on the layer (`false`)
    #[must_use]
    pub const fn with_queue(mut self, queue: bool) -> Self {
        self.queue = queue;
        self
    }

    /// Target color, if any
    pub fn color(&self) -> Option<Rgb> {
        self.color.map(|(rgb, _)| rgb)
    }

    pub const fn opacity(&self) -> Option<f32> {
        self.opacity
    }

    pub const fn steps(&self) -> u32 {
        self.steps
    }

    /// Steps including the reverse leg
    pub const fn total_steps(&self) -> u32 {
        if self.reverse {
            self.steps.saturating_mul(2)
        } else {
            self.steps
        }
    }

    pub const fn blender(&self) -> Option<Blender> {
        self.blender
    }

    pub const fn envelope(&self) -> Option<Envelope> {
        self.envelope
    }

    pub const fn is_reverse(&self) -> bool {
        self.reverse
    }

    pub const fn is_queued(&self) -> bool {
        self.queue
    }

    /// Start running from the given color and opacity
    ///
    /// `envelope` is used when the transition does not name its own. The
    /// reverse leg mirrors the forward leg with the envelope resolved here.
    pub fn start(&self, color: Rgb, opacity: f32, envelope: Envelope) -> RunningTransition {
        let begin = rgb_to_lab(color);
        let target = self.color.map_or(begin, |(_, lab)| lab);
        RunningTransition {
            origin: color,
            target: self.color.map(|(rgb, _)| rgb),
            begin,
            delta: color_diff(begin, target, 1.0),
            opacity,
            opacity_target: self.opacity.unwrap_or(opacity),
            opacity_delta: self.opacity.unwrap_or(opacity) - opacity,
            envelope: self.envelope.unwrap_or(envelope),
            steps: self.steps,
            step: 0,
            reverse: self.reverse,
        }
    }
}

/// A transition in progress
///
/// Yields one `(color, opacity)` pair per step until exhausted.
#[derive(Debug, Clone)]
pub struct RunningTransition {
    origin: Rgb,
    target: Option<Rgb>,
    begin: Lab,
    delta: Lab,
    opacity: f32,
    opacity_target: f32,
    opacity_delta: f32,
    envelope: Envelope,
    steps: u32,
    step: u32,
    reverse: bool,
}

impl RunningTransition {
    pub const fn envelope(&self) -> Envelope {
        self.envelope
    }

    /// Steps left to run
    pub const fn remaining(&self) -> u32 {
        let total = if self.reverse {
            self.steps.saturating_mul(2)
        } else {
            self.steps
        };
        total.saturating_sub(self.step)
    }

    /// Color and opacity at a given interpolation factor
    ///
    /// The end points come out exactly as given, only the points in
    /// between go through Lab space.
    fn at(&self, factor: f32) -> (Rgb, f32) {
        let color = match self.target {
            None => self.origin,
            Some(_) if factor <= 0.0 => self.origin,
            Some(target) if factor >= 1.0 => target,
            Some(_) => lab_to_rgb(self.begin + self.delta * factor),
        };
        let opacity = if factor >= 1.0 {
            self.opacity_target
        } else {
            (self.opacity + self.opacity_delta * factor).clamp(0.0, 1.0)
        };
        (color, opacity)
    }
}

impl Iterator for RunningTransition {
    type Item = (Rgb, f32);

    fn next(&mut self) -> Option<(Rgb, f32)> {
        if self.remaining() == 0 {
            return None;
        }
        self.step += 1;
        let factor = if self.step <= self.steps {
            self.envelope.factor(self.step, self.steps)
        } else {
            1.0 - self.envelope.factor(self.step - self.steps, self.steps)
        };
        Some(self.at(factor))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining() as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for RunningTransition {}
