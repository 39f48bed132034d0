use burn::prelude::*;
use strum::Display;

use crate::error::HeadError;

/// The kind of value a head predicts
///
/// Downstream consumers dispatch on this to decide how to interpret a head's output.
#[derive(Display, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnType {
    /// Expected return of each action taken from the current state
    QActionStateValue,
}

/// A network head: the last stage mapping shared features to a task-specific output
///
/// ### Generics
/// - `B`: A burn backend
pub trait Head<B: Backend> {
    /// The kind of value produced by [`Head::forward`]
    fn return_type(&self) -> ReturnType;

    /// Scale applied to this head's loss relative to other heads
    fn loss_weight(&self) -> f32;

    /// Forward pass through the head
    ///
    /// In shape: `[batch_size, in_features]`
    fn forward(&self, input: Tensor<B, 2>) -> Result<Tensor<B, 2>, HeadError>;
}

/// Configuration shared by all heads
///
/// Only `loss_weight` affects behavior. The remaining fields keep construction uniform across
/// heads and are accepted without validation.
#[derive(Config, Debug)]
pub struct HeadConfig {
    /// Name of the network owning the head. Unused.
    #[config(default = "String::new()")]
    pub network_name: String,
    /// Index of the head within its network. Unused.
    #[config(default = "0")]
    pub head_idx: usize,
    /// Scale of this head's loss when several heads are trained together
    #[config(default = "1.0")]
    pub loss_weight: f32,
    /// Whether the network is local to a worker. Unused.
    #[config(default = "true")]
    pub is_local: bool,
    /// Activation between layers. Unused by single-layer heads.
    #[config(default = "String::from(\"relu\")")]
    pub activation_function: String,
    /// Kind of dense layer to build. Unused, heads always use [`nn::Linear`].
    pub dense_layer: Option<String>,
}

/// Loss function a head is trained with
#[derive(Config, Debug, PartialEq)]
pub enum LossType {
    MeanSquaredError,
    /// Quadratic for errors below `delta`, linear above
    Huber { delta: f32 },
}
