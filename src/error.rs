use std::fmt;

/// Errors raised while building a head or running it
#[derive(Debug, Clone, PartialEq)]
pub enum HeadError {
    /// The head cannot produce outputs for this kind of action space
    UnsupportedActionSpace {
        head: &'static str,
        space: &'static str,
    },
    /// A tensor's trailing dimension did not match what the head was built for
    ShapeMismatch { expected: usize, actual: usize },
    /// Two tensors that must share a batch size do not
    BatchMismatch { expected: usize, actual: usize },
    /// A construction argument is out of range
    InvalidConfig {
        param: &'static str,
        message: String,
    },
}

impl fmt::Display for HeadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedActionSpace { head, space } => {
                write!(f, "{head} does not support {space} action spaces")
            }
            Self::ShapeMismatch { expected, actual } => {
                write!(
                    f,
                    "Dimension mismatch: expected {expected} features, got {actual}"
                )
            }
            Self::BatchMismatch { expected, actual } => {
                write!(f, "Batch size mismatch: expected {expected}, got {actual}")
            }
            Self::InvalidConfig { param, message } => {
                write!(f, "Invalid configuration for `{param}`: {message}")
            }
        }
    }
}

impl std::error::Error for HeadError {}

/// Errors raised while constructing an action space descriptor
#[derive(Debug, Clone, PartialEq)]
pub enum SpaceError {
    /// A discrete space needs at least one action
    EmptyDiscrete,
    /// Number of descriptions differs from the number of actions
    DescriptionCount { actions: usize, descriptions: usize },
    /// `low` and `high` have different lengths
    BoundsLength { low: usize, high: usize },
    /// A box space needs at least one dimension
    EmptyBox,
    /// `low[dim] > high[dim]`
    InvertedBounds { dim: usize },
    /// A bound is NaN
    NanBound { dim: usize },
    /// Multi-select sizes out of range
    InvalidSelection { size: usize, max_selected: usize },
}

impl fmt::Display for SpaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyDiscrete => write!(f, "Discrete action space must have at least one action"),
            Self::DescriptionCount {
                actions,
                descriptions,
            } => write!(
                f,
                "Got {descriptions} action descriptions for {actions} actions"
            ),
            Self::BoundsLength { low, high } => write!(
                f,
                "Box bounds differ in length: low has {low} dimensions, high has {high}"
            ),
            Self::EmptyBox => write!(f, "Box action space must have at least one dimension"),
            Self::InvertedBounds { dim } => {
                write!(f, "Lower bound exceeds upper bound in dimension {dim}")
            }
            Self::NanBound { dim } => write!(f, "Bound is NaN in dimension {dim}"),
            Self::InvalidSelection { size, max_selected } => write!(
                f,
                "Cannot select up to {max_selected} of {size} actions. Must be in the interval [1, {size}]."
            ),
        }
    }
}

impl std::error::Error for SpaceError {}
