//! Transition envelopes
//!
//! An envelope paces a transition: it yields one interpolation factor per
//! step, climbing to exactly `1.0` on the last step.

use core::f64::consts::PI;

const ENVELOPE_NAME_COSINE: &str = "Cosine";
const ENVELOPE_NAME_LINEAR: &str = "Linear";

/// Known envelopes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Envelope {
    /// Eases in and out following the second half of a cosine period
    #[default]
    Cosine,
    /// Constant speed
    Linear,
}

impl Envelope {
    pub const ALL: [Self; 2] = [Self::Cosine, Self::Linear];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cosine => ENVELOPE_NAME_COSINE,
            Self::Linear => ENVELOPE_NAME_LINEAR,
        }
    }

    pub fn parse_from_str(s: &str) -> Option<Self> {
        match s {
            ENVELOPE_NAME_COSINE => Some(Self::Cosine),
            ENVELOPE_NAME_LINEAR => Some(Self::Linear),
            _ => None,
        }
    }

    /// Factor for `step` out of `steps` (1-based)
    ///
    /// The last step is always exactly `1.0`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn factor(self, step: u32, steps: u32) -> f32 {
        if step >= steps {
            return 1.0;
        }
        let progress = f64::from(step) / f64::from(steps);
        match self {
            Self::Cosine => ((libm::cos(PI + PI * progress) + 1.0) / 2.0) as f32,
            Self::Linear => progress as f32,
        }
    }

    /// All factors of a transition of `steps` steps
    pub const fn factors(self, steps: u32) -> Factors {
        Factors {
            envelope: self,
            step: 0,
            steps,
        }
    }
}

/// Iterator over the factors of an envelope
#[derive(Debug, Clone)]
pub struct Factors {
    envelope: Envelope,
    step: u32,
    steps: u32,
}

impl Iterator for Factors {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.step >= self.steps {
            return None;
        }
        self.step += 1;
        Some(self.envelope.factor(self.step, self.steps))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.steps - self.step) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Factors {}
