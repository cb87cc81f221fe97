use serde::Serialize;

use crate::color::{BLACK, Rgb, rgb_to_hex};
use crate::command::{Action, CommandOptions};
use crate::error::ValidationError;
use crate::gamma::GammaTable;
use crate::layer::{Layer, LayerInfo};

/// Maximum number of layers in one output
pub const MAX_LAYERS: usize = 8;

/// Default number of layers of a new output
pub const DEFAULT_LAYERS: usize = 3;

/// One RGB output of the controller
///
/// Holds a stack of layers (index 0 at the bottom) that are composited
/// into a single color on every step.
#[derive(Debug, Clone)]
pub struct Output {
    id: usize,
    layers: heapless::Vec<Layer, MAX_LAYERS>,
    /// Last composited color, before correction
    color: Rgb,
    /// Last color handed out for writing, after correction
    written: Option<Rgb>,
}

impl Output {
    /// Create an output with `layers` layers (clamped to `1..=MAX_LAYERS`)
    pub fn new(id: usize, layers: usize) -> Self {
        let mut stack = heapless::Vec::new();
        for _ in 0..layers.clamp(1, MAX_LAYERS) {
            let _ = stack.push(Layer::new());
        }
        Self {
            id,
            layers: stack,
            color: BLACK,
            written: Some(BLACK),
        }
    }

    /// Position of this output in its controller
    pub const fn id(&self) -> usize {
        self.id
    }

    /// Last composited color
    pub const fn color(&self) -> Rgb {
        self.color
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, index: usize) -> Result<&Layer, ValidationError> {
        let count = self.layers.len();
        self.layers
            .get(index)
            .ok_or(ValidationError::LayerOutOfRange { index, count })
    }

    pub fn layer_mut(&mut self, index: usize) -> Result<&mut Layer, ValidationError> {
        let count = self.layers.len();
        self.layers
            .get_mut(index)
            .ok_or(ValidationError::LayerOutOfRange { index, count })
    }

    /// Composite the next color
    ///
    /// The bottom layer provides the base color, every layer above is
    /// blended over it with its own blender and opacity.
    pub fn next(&mut self) -> Rgb {
        let mut layers = self.layers.iter_mut();
        let base = layers.next().map_or(BLACK, |bottom| bottom.next().color());
        self.color = layers.fold(base, |color, layer| layer.next_blended_color(color));
        self.color
    }

    /// Composite, correct and return the color if it differs from the last
    /// one written
    pub fn write_if_changed(&mut self, gamma: &GammaTable) -> Option<Rgb> {
        let corrected = gamma.correct(self.next());
        if self.written == Some(corrected) {
            return None;
        }
        self.written = Some(corrected);
        Some(corrected)
    }

    /// Forget the last written color so the next step writes again
    pub fn invalidate(&mut self) {
        self.written = None;
    }

    /// Run one of the output verbs
    pub fn apply(&mut self, action: Action, options: &CommandOptions) -> Result<(), ValidationError> {
        match action {
            Action::Constant => self.constant(options),
            Action::Fade => self.fade(options),
            Action::Blink => self.blink(options),
        }
    }

    /// Cut over to the given color in a single step
    pub fn constant(&mut self, options: &CommandOptions) -> Result<(), ValidationError> {
        let transition = options.transition(1)?;
        self.layer_mut(options.layer)?.append(transition)
    }

    /// Move to the given color in `options.steps` steps
    pub fn fade(&mut self, options: &CommandOptions) -> Result<(), ValidationError> {
        let transition = options.transition(options.steps)?;
        self.layer_mut(options.layer)?.append(transition)
    }

    /// Blink to the given color and back, `options.count` times
    ///
    /// Nothing is queued unless all blinks fit the layer's queue.
    pub fn blink(&mut self, options: &CommandOptions) -> Result<(), ValidationError> {
        if options.count == 0 {
            return Err(ValidationError::InvalidCount(0));
        }
        let first = options.transition(options.steps)?.with_reverse();
        let rest = first.clone().with_queue(true);

        let layer = self.layer_mut(options.layer)?;
        layer.ensure_room(options.count as usize, options.queue)?;
        layer.append(first)?;
        for _ in 1..options.count {
            layer.append(rest.clone())?;
        }
        Ok(())
    }

    /// Add a layer on top of the stack
    ///
    /// Returns the index of the new layer.
    pub fn add_layer(&mut self) -> Result<usize, ValidationError> {
        self.layers
            .push(Layer::new())
            .map_err(|_| ValidationError::LayerLimit(MAX_LAYERS))?;
        Ok(self.layers.len() - 1)
    }

    /// Delete the top layer, or the one at `index`
    ///
    /// An output keeps at least one layer.
    pub fn delete_layer(&mut self, index: Option<usize>) -> Result<(), ValidationError> {
        let count = self.layers.len();
        if count == 1 {
            return Err(ValidationError::LastLayer);
        }
        let index = index.unwrap_or(count - 1);
        if index >= count {
            return Err(ValidationError::LayerOutOfRange { index, count });
        }
        self.layers.remove(index);
        Ok(())
    }

    /// Reset every layer to transparent black
    pub fn kill(&mut self) {
        for layer in &mut self.layers {
            layer.kill();
        }
        self.color = BLACK;
    }

    /// Snapshot of the output for reporting
    pub fn info(&self) -> OutputInfo {
        OutputInfo {
            output_number: self.id,
            mixed_color_rgb: [self.color.r, self.color.g, self.color.b],
            mixed_color_hex: rgb_to_hex(self.color),
            layers: self.layers.iter().map(Layer::info).collect(),
        }
    }
}

/// Output state as reported to API consumers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputInfo {
    pub output_number: usize,
    pub mixed_color_rgb: [u8; 3],
    pub mixed_color_hex: String,
    pub layers: Vec<LayerInfo>,
}
