use std::{fmt::Display, ops::Range};

use rand::{seq::index, Rng};
use rand_distr::StandardNormal;
use strum::VariantArray;

use crate::error::SpaceError;

/// The set of actions an agent can take
///
/// Heads inspect the variant to decide the width of their output.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionSpace {
    /// Continuous actions inside a bounded box
    Box(BoxActionSpace),
    /// A finite set of enumerated actions
    Discrete(DiscreteActionSpace),
    /// Up to `k` actions chosen at once out of `n`
    MultiSelect(MultiSelectActionSpace),
}

impl ActionSpace {
    /// Short name used in error messages and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Box(_) => "box",
            Self::Discrete(_) => "discrete",
            Self::MultiSelect(_) => "multi-select",
        }
    }
}

impl From<BoxActionSpace> for ActionSpace {
    fn from(space: BoxActionSpace) -> Self {
        Self::Box(space)
    }
}

impl From<DiscreteActionSpace> for ActionSpace {
    fn from(space: DiscreteActionSpace) -> Self {
        Self::Discrete(space)
    }
}

impl From<MultiSelectActionSpace> for ActionSpace {
    fn from(space: MultiSelectActionSpace) -> Self {
        Self::MultiSelect(space)
    }
}

/// A continuous action space bounded per dimension by `[low, high]`
///
/// Bounds may be infinite.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxActionSpace {
    low: Vec<f32>,
    high: Vec<f32>,
}

impl BoxActionSpace {
    /// Construct a box from per-dimension bounds
    ///
    /// **Errors** if the bound vectors are empty, differ in length, contain NaN, or if any `low[i] > high[i]`
    pub fn new(low: Vec<f32>, high: Vec<f32>) -> Result<Self, SpaceError> {
        if low.len() != high.len() {
            return Err(SpaceError::BoundsLength {
                low: low.len(),
                high: high.len(),
            });
        }
        if low.is_empty() {
            return Err(SpaceError::EmptyBox);
        }
        for (dim, (l, h)) in low.iter().zip(&high).enumerate() {
            if l.is_nan() || h.is_nan() {
                return Err(SpaceError::NanBound { dim });
            }
            if l > h {
                return Err(SpaceError::InvertedBounds { dim });
            }
        }
        Ok(Self { low, high })
    }

    /// Construct a box of `shape` dimensions that all share the same bounds
    pub fn uniform(shape: usize, low: f32, high: f32) -> Result<Self, SpaceError> {
        Self::new(vec![low; shape], vec![high; shape])
    }

    /// Construct a box of `shape` dimensions with no bounds
    pub fn unbounded(shape: usize) -> Result<Self, SpaceError> {
        Self::uniform(shape, f32::NEG_INFINITY, f32::INFINITY)
    }

    /// Number of dimensions of an action
    pub fn shape(&self) -> usize {
        self.low.len()
    }

    pub fn low(&self) -> &[f32] {
        &self.low
    }

    pub fn high(&self) -> &[f32] {
        &self.high
    }

    /// Check that `action` has the right shape and lies inside the bounds
    pub fn contains(&self, action: &[f32]) -> bool {
        action.len() == self.shape()
            && action
                .iter()
                .zip(self.low.iter().zip(&self.high))
                .all(|(x, (l, h))| l <= x && x <= h)
    }

    /// Draw a random action
    ///
    /// Dimensions with finite bounds are sampled uniformly. Other dimensions draw from a standard
    /// normal distribution clipped to whichever bound is finite.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<f32> {
        self.low
            .iter()
            .zip(&self.high)
            .map(|(&l, &h)| {
                if (h - l).is_finite() {
                    rng.gen_range(l..=h)
                } else if l.is_finite() && h.is_finite() {
                    // width overflows f32, interpolate between the bounds instead
                    let u: f32 = rng.gen();
                    (l * (1.0 - u) + h * u).clamp(l, h)
                } else {
                    rng.sample::<f32, _>(StandardNormal).clamp(l, h)
                }
            })
            .collect()
    }
}

/// A finite action space with actions `0..num_actions`
#[derive(Debug, Clone, PartialEq)]
pub struct DiscreteActionSpace {
    num_actions: usize,
    descriptions: Option<Vec<String>>,
}

impl DiscreteActionSpace {
    /// **Errors** if `num_actions` is zero
    pub fn new(num_actions: usize) -> Result<Self, SpaceError> {
        if num_actions == 0 {
            return Err(SpaceError::EmptyDiscrete);
        }
        Ok(Self {
            num_actions,
            descriptions: None,
        })
    }

    /// Construct a space with one action per description
    ///
    /// ```
    /// use rl_heads::space::DiscreteActionSpace;
    ///
    /// let space = DiscreteActionSpace::from_descriptions(["left", "right"]).unwrap();
    /// assert_eq!(space.num_actions(), 2);
    /// assert_eq!(space.description(1), Some("right"));
    /// ```
    pub fn from_descriptions<I, S>(descriptions: I) -> Result<Self, SpaceError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let descriptions = descriptions.into_iter().map(Into::into).collect::<Vec<_>>();
        Self::new(descriptions.len())?.with_descriptions(descriptions)
    }

    /// Construct a space from the variants of an action enum, described by their `Display` text
    pub fn from_variants<A: VariantArray + Display>() -> Result<Self, SpaceError> {
        Self::from_descriptions(A::VARIANTS.iter().map(ToString::to_string))
    }

    /// Attach a description to each action
    ///
    /// **Errors** if the number of descriptions differs from the number of actions
    pub fn with_descriptions(mut self, descriptions: Vec<String>) -> Result<Self, SpaceError> {
        if descriptions.len() != self.num_actions {
            return Err(SpaceError::DescriptionCount {
                actions: self.num_actions,
                descriptions: descriptions.len(),
            });
        }
        self.descriptions = Some(descriptions);
        Ok(self)
    }

    pub fn num_actions(&self) -> usize {
        self.num_actions
    }

    /// The enumerated actions
    pub fn actions(&self) -> Range<usize> {
        0..self.num_actions
    }

    pub fn description(&self, action: usize) -> Option<&str> {
        self.descriptions
            .as_ref()
            .and_then(|d| d.get(action))
            .map(String::as_str)
    }

    pub fn contains(&self, action: usize) -> bool {
        action < self.num_actions
    }

    /// Draw a random action uniformly
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        rng.gen_range(self.actions())
    }
}

/// An action space in which up to `max_selected` of `size` actions are chosen at once
#[derive(Debug, Clone, PartialEq)]
pub struct MultiSelectActionSpace {
    size: usize,
    max_selected: usize,
}

impl MultiSelectActionSpace {
    /// **Errors** unless `1 <= max_selected <= size`
    pub fn new(size: usize, max_selected: usize) -> Result<Self, SpaceError> {
        if max_selected == 0 || max_selected > size {
            return Err(SpaceError::InvalidSelection { size, max_selected });
        }
        Ok(Self { size, max_selected })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn max_selected(&self) -> usize {
        self.max_selected
    }

    /// Check that `selection` marks between 1 and `max_selected` of the `size` actions
    pub fn contains(&self, selection: &[bool]) -> bool {
        let selected = selection.iter().filter(|&&s| s).count();
        selection.len() == self.size && (1..=self.max_selected).contains(&selected)
    }

    /// Draw a random selection of between 1 and `max_selected` actions
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<bool> {
        let amount = rng.gen_range(1..=self.max_selected);
        let mut selection = vec![false; self.size];
        for i in index::sample(rng, self.size, amount).into_iter() {
            selection[i] = true;
        }
        selection
    }
}
