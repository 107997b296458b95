//! Feature form state.
//!
//! [`FeatureVector`] holds the raw text the user typed into each slot. It
//! never parses or validates; numeric coercion happens only when a vector is
//! submitted, via [`coerce`].

use thiserror::Error;

/// Numeric form of a feature vector as sent to the prediction service.
///
/// Slots that did not parse are `NaN`, which serializes as JSON `null`.
pub type NumericFeatureVector = Vec<f64>;

/// Returned by [`FeatureVector::try_set`] for an index outside the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("feature slot {index} out of range (form has {arity} slots)")]
pub struct SlotOutOfRange {
    pub index: usize,
    pub arity: usize,
}

/// Ordered, fixed-arity sequence of raw feature text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureVector {
    slots: Vec<String>,
}

impl FeatureVector {
    /// Build a form with `arity` empty slots.
    pub fn new(arity: usize) -> Self {
        Self {
            slots: vec![String::new(); arity],
        }
    }

    pub fn arity(&self) -> usize {
        self.slots.len()
    }

    /// Replace slot `index` with `raw`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= arity`. Callers that take indices from user input
    /// go through [`try_set`](Self::try_set).
    pub fn set(&mut self, index: usize, raw: impl Into<String>) {
        let arity = self.arity();
        assert!(index < arity, "feature slot {index} out of range (arity {arity})");
        self.slots[index] = raw.into();
    }

    /// Checked variant of [`set`](Self::set).
    pub fn try_set(&mut self, index: usize, raw: impl Into<String>) -> Result<(), SlotOutOfRange> {
        match self.slots.get_mut(index) {
            Some(slot) => {
                *slot = raw.into();
                Ok(())
            }
            None => Err(SlotOutOfRange {
                index,
                arity: self.slots.len(),
            }),
        }
    }

    /// Current raw text of every slot, in order.
    pub fn snapshot(&self) -> &[String] {
        &self.slots
    }

    /// Coerce the current text to numbers.
    pub fn to_numeric(&self) -> NumericFeatureVector {
        coerce(&self.slots)
    }

    /// Indices whose text does not coerce to a finite number.
    pub fn invalid_slots(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, raw)| !coerce_one(raw).is_finite())
            .map(|(i, _)| i)
            .collect()
    }
}

/// Per-element numeric coercion: surrounding whitespace is ignored, empty or
/// unparsable text becomes `NaN`.
pub fn coerce(raw: &[String]) -> NumericFeatureVector {
    raw.iter().map(|s| coerce_one(s)).collect()
}

fn coerce_one(raw: &str) -> f64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
