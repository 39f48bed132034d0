/// Error types
pub mod error;

/// The head capability and configuration shared by all heads
pub mod head;

/// Implemented heads
pub mod heads;

/// Action space descriptors
pub mod space;

pub use error::{HeadError, SpaceError};
pub use head::{Head, HeadConfig, LossType, ReturnType};
pub use heads::{QHead, QHeadConfig};
pub use space::{ActionSpace, BoxActionSpace, DiscreteActionSpace, MultiSelectActionSpace};
