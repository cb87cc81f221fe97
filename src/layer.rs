use heapless::Deque;
use serde::Serialize;

use crate::blend::Blender;
use crate::color::{BLACK, Rgb, rgb_to_hex};
use crate::envelope::Envelope;
use crate::error::ValidationError;
use crate::transition::{RunningTransition, Transition};

/// Number of transitions a layer can hold in its queue
pub const LAYER_QUEUE_SIZE: usize = 32;

/// Result of stepping a layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    /// A transition moved the layer one step
    Advanced(Rgb, f32),
    /// Nothing to do, the last value is held
    Holding(Rgb, f32),
}

impl Step {
    pub const fn color(self) -> Rgb {
        match self {
            Self::Advanced(color, _) | Self::Holding(color, _) => color,
        }
    }

    pub const fn opacity(self) -> f32 {
        match self {
            Self::Advanced(_, opacity) | Self::Holding(_, opacity) => opacity,
        }
    }

    pub const fn is_holding(self) -> bool {
        matches!(self, Self::Holding(..))
    }
}

/// One independently animated color in an output's stack
///
/// Transitions are played in order. Once they run out, the last color and
/// opacity are held indefinitely.
#[derive(Debug, Clone)]
pub struct Layer {
    color: Rgb,
    opacity: f32,
    blender: Blender,
    envelope: Envelope,
    queue: Deque<Transition, LAYER_QUEUE_SIZE>,
    current: Option<RunningTransition>,
}

impl Default for Layer {
    fn default() -> Self {
        Self::new()
    }
}

impl Layer {
    /// Create a transparent black layer
    pub const fn new() -> Self {
        Self {
            color: BLACK,
            opacity: 0.0,
            blender: Blender::LabAverage,
            envelope: Envelope::Cosine,
            queue: Deque::new(),
            current: None,
        }
    }

    pub const fn color(&self) -> Rgb {
        self.color
    }

    pub const fn opacity(&self) -> f32 {
        self.opacity
    }

    pub const fn blender(&self) -> Blender {
        self.blender
    }

    pub const fn envelope(&self) -> Envelope {
        self.envelope
    }

    /// Number of transitions waiting behind the current one
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Free room in the queue
    pub fn free_slots(&self) -> usize {
        self.queue.capacity() - self.queue.len()
    }

    /// No transition running and none queued
    pub fn is_idle(&self) -> bool {
        self.current.is_none() && self.queue.is_empty()
    }

    /// Check that `count` transitions would fit
    ///
    /// The first of them starts right away when the layer is idle or when
    /// it replaces the queue, so it does not take a slot.
    pub fn ensure_room(&self, count: usize, queue: bool) -> Result<(), ValidationError> {
        let (needed, free) = if !queue {
            (count.saturating_sub(1), self.queue.capacity())
        } else if self.is_idle() {
            (count.saturating_sub(1), self.free_slots())
        } else {
            (count, self.free_slots())
        };
        if needed > free {
            return Err(ValidationError::QueueFull { needed, free });
        }
        Ok(())
    }

    /// Add a transition to the layer
    ///
    /// A queued transition waits for the ones before it and starts from
    /// whatever color the layer has by then. A non-queued one drops
    /// everything pending and starts right away.
    pub fn append(&mut self, transition: Transition) -> Result<(), ValidationError> {
        if !transition.is_queued() {
            self.queue.clear();
            self.start(&transition);
            return Ok(());
        }
        if self.is_idle() {
            self.start(&transition);
            return Ok(());
        }
        self.queue
            .push_back(transition)
            .map_err(|_| ValidationError::QueueFull {
                needed: 1,
                free: 0,
            })
    }

    /// Reset the layer, immediately disabling its output
    pub fn kill(&mut self) {
        self.color = BLACK;
        self.opacity = 0.0;
        self.queue.clear();
        self.current = None;
    }

    /// Step the layer
    pub fn next(&mut self) -> Step {
        if let Some(current) = &mut self.current {
            if let Some((color, opacity)) = current.next() {
                self.color = color;
                self.opacity = opacity;
                return Step::Advanced(color, opacity);
            }
            self.current = None;
        }

        let Some(transition) = self.queue.pop_front() else {
            return Step::Holding(self.color, self.opacity);
        };
        self.start(&transition);
        // A started transition has at least one step
        match self.current.as_mut().and_then(Iterator::next) {
            Some((color, opacity)) => {
                self.color = color;
                self.opacity = opacity;
                Step::Advanced(color, opacity)
            }
            None => Step::Holding(self.color, self.opacity),
        }
    }

    /// Step the layer and blend its color over `base`
    ///
    /// Uses the blender of the transition that produced this step.
    pub fn next_blended_color(&mut self, base: Rgb) -> Rgb {
        let step = self.next();
        self.blender.blend(base, step.color(), step.opacity())
    }

    /// Snapshot of the layer for reporting
    pub fn info(&self) -> LayerInfo {
        LayerInfo {
            blender: self.blender.as_str(),
            envelope: self.envelope.as_str(),
            color_rgb: [self.color.r, self.color.g, self.color.b],
            color_hex: rgb_to_hex(self.color),
            opacity: self.opacity,
        }
    }

    /// Install a transition, keeping its blender for later ones
    ///
    /// The envelope only applies to the transition that names it.
    fn start(&mut self, transition: &Transition) {
        self.blender = transition.blender().unwrap_or(self.blender);
        self.current = Some(transition.start(self.color, self.opacity, self.envelope));
    }
}

/// Layer state as reported to API consumers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerInfo {
    pub blender: &'static str,
    pub envelope: &'static str,
    pub color_rgb: [u8; 3],
    pub color_hex: String,
    pub opacity: f32,
}
