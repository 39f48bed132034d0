use burn::prelude::*;
use log::{debug, trace};
use nn::{
    loss::{HuberLoss, HuberLossConfig, MseLoss, Reduction},
    Linear, LinearConfig,
};

use crate::{
    error::HeadError,
    head::{Head, HeadConfig, LossType, ReturnType},
    space::ActionSpace,
};

/// Configuration for the [`QHead`]
#[derive(Config, Debug)]
pub struct QHeadConfig {
    /// Settings shared with every other head
    #[config(default = "HeadConfig::new()")]
    pub head: HeadConfig,
    /// Loss used by [`QHead::loss`]
    #[config(default = "LossType::MeanSquaredError")]
    pub loss_type: LossType,
}

impl QHeadConfig {
    /// Build a [`QHead`] for `action_space` reading feature vectors of width `d_input`
    ///
    /// **Errors** if the action space is neither a box nor discrete, if `d_input` is zero, or if
    /// the Huber delta is negative or NaN
    pub fn init<B: Backend>(
        &self,
        action_space: &ActionSpace,
        d_input: usize,
        device: &B::Device,
    ) -> Result<QHead<B>, HeadError> {
        let num_actions = num_q_outputs(action_space)?;
        if d_input == 0 {
            return Err(HeadError::InvalidConfig {
                param: "d_input",
                message: String::from("must be at least 1"),
            });
        }
        let huber_delta = match self.loss_type {
            LossType::MeanSquaredError => None,
            LossType::Huber { delta } if delta >= 0.0 => Some(delta),
            LossType::Huber { delta } => {
                return Err(HeadError::InvalidConfig {
                    param: "loss_type",
                    message: format!("Huber delta must be non-negative, got {delta}"),
                })
            }
        };

        debug!(
            "Building QHead {} of network `{}`: {} action space, {} features -> {} Q values",
            self.head.head_idx,
            self.head.network_name,
            action_space.kind(),
            d_input,
            num_actions
        );

        Ok(QHead {
            dense: LinearConfig::new(d_input, num_actions).init(device),
            d_input,
            num_actions,
            loss_weight: self.head.loss_weight,
            huber: huber_delta.map(|delta| HuberLossConfig::new(delta).init(device)),
            huber_delta,
        })
    }
}

/// One Q value per discrete action, or a single value for a continuous action
fn num_q_outputs(action_space: &ActionSpace) -> Result<usize, HeadError> {
    match action_space {
        ActionSpace::Box(_) => Ok(1),
        ActionSpace::Discrete(space) => Ok(space.num_actions()),
        other => Err(HeadError::UnsupportedActionSpace {
            head: "QHead",
            space: other.kind(),
        }),
    }
}

/// Head predicting state-action values with a single linear layer
///
/// ### Generics
/// - `B`: A burn backend
#[derive(Module, Debug)]
pub struct QHead<B: Backend> {
    dense: Linear<B>,
    d_input: usize,
    num_actions: usize,
    loss_weight: f32,
    huber: Option<HuberLoss<B>>,
    huber_delta: Option<f32>,
}

impl<B: Backend> QHead<B> {
    /// Width of the output, one per action
    pub fn num_actions(&self) -> usize {
        self.num_actions
    }

    /// Width of the feature vectors the head reads
    pub fn d_input(&self) -> usize {
        self.d_input
    }

    pub fn loss_type(&self) -> LossType {
        match self.huber_delta {
            Some(delta) => LossType::Huber { delta },
            None => LossType::MeanSquaredError,
        }
    }

    /// The underlying linear layer, with weight shape `[d_input, num_actions]`
    pub fn dense(&self) -> &Linear<B> {
        &self.dense
    }

    /// Weighted loss between predicted and target Q values, averaged over every element
    ///
    /// Both tensors have shape `[batch_size, num_actions]`.
    pub fn loss(
        &self,
        prediction: Tensor<B, 2>,
        target: Tensor<B, 2>,
    ) -> Result<Tensor<B, 1>, HeadError> {
        let [pred_batch, pred_width] = prediction.dims();
        let [target_batch, target_width] = target.dims();
        if pred_width != target_width {
            return Err(HeadError::ShapeMismatch {
                expected: pred_width,
                actual: target_width,
            });
        }
        if pred_batch != target_batch {
            return Err(HeadError::BatchMismatch {
                expected: pred_batch,
                actual: target_batch,
            });
        }

        let loss = match &self.huber {
            None => MseLoss::new().forward(prediction, target, Reduction::Mean),
            Some(huber) => huber.forward(prediction, target, Reduction::Mean),
        };

        Ok(loss * self.loss_weight)
    }
}

impl<B: Backend> Head<B> for QHead<B> {
    fn return_type(&self) -> ReturnType {
        ReturnType::QActionStateValue
    }

    fn loss_weight(&self) -> f32 {
        self.loss_weight
    }

    /// In shape: `[batch_size, d_input]`
    ///
    /// Out shape: `[batch_size, num_actions]`
    fn forward(&self, input: Tensor<B, 2>) -> Result<Tensor<B, 2>, HeadError> {
        let [batch_size, features] = input.dims();
        if features != self.d_input {
            return Err(HeadError::ShapeMismatch {
                expected: self.d_input,
                actual: features,
            });
        }
        trace!("QHead forward on a batch of {batch_size}");

        if batch_size == 0 {
            return Ok(Tensor::zeros([0, self.num_actions], &input.device()));
        }

        Ok(self.dense.forward(input))
    }
}

#[cfg(test)]
mod tests {
    use burn::{
        backend::{Autodiff, NdArray},
        tensor::Distribution,
    };
    use strum::{Display, VariantArray};

    use super::*;
    use crate::space::{BoxActionSpace, DiscreteActionSpace, MultiSelectActionSpace};

    type TestBackend = NdArray;

    #[derive(VariantArray, Display, Clone, Copy, Debug)]
    #[strum(serialize_all = "snake_case")]
    enum Move {
        Left,
        Right,
        Up,
        Down,
    }

    fn discrete(n: usize) -> ActionSpace {
        DiscreteActionSpace::new(n).unwrap().into()
    }

    fn continuous(shape: usize) -> ActionSpace {
        BoxActionSpace::uniform(shape, -1.0, 1.0).unwrap().into()
    }

    fn build(space: &ActionSpace, d_input: usize) -> QHead<TestBackend> {
        QHeadConfig::new()
            .init(space, d_input, &Default::default())
            .unwrap()
    }

    fn random_input(batch_size: usize, features: usize) -> Tensor<TestBackend, 2> {
        Tensor::random(
            [batch_size, features],
            Distribution::Default,
            &Default::default(),
        )
    }

    #[test]
    fn box_space_has_single_output() {
        for shape in [1, 3, 6] {
            let head = build(&continuous(shape), 8);
            assert_eq!(head.num_actions(), 1, "box of shape {shape}");
        }
        let unbounded = ActionSpace::Box(BoxActionSpace::unbounded(2).unwrap());
        let head = build(&unbounded, 8);
        assert_eq!(head.num_actions(), 1, "unbounded box");
    }

    #[test]
    fn discrete_space_has_output_per_action() {
        for n in [1, 2, 7] {
            let head = build(&discrete(n), 8);
            assert_eq!(head.num_actions(), n);
            assert_eq!(head.dense().weight.val().dims(), [8, n]);
        }
    }

    #[test]
    fn multi_select_space_is_rejected() {
        let space = ActionSpace::MultiSelect(MultiSelectActionSpace::new(4, 2).unwrap());
        let result = QHeadConfig::new().init::<TestBackend>(&space, 8, &Default::default());
        assert_eq!(
            result.err(),
            Some(HeadError::UnsupportedActionSpace {
                head: "QHead",
                space: "multi-select"
            })
        );
    }

    #[test]
    fn zero_input_width_is_rejected() {
        let result = QHeadConfig::new().init::<TestBackend>(&discrete(2), 0, &Default::default());
        assert!(matches!(
            result,
            Err(HeadError::InvalidConfig {
                param: "d_input",
                ..
            })
        ));
    }

    #[test]
    fn head_reports_q_values() {
        let head = build(&discrete(3), 4);
        assert_eq!(head.return_type(), ReturnType::QActionStateValue);
        assert_eq!(head.loss_weight(), 1.0);
        assert_eq!(head.loss_type(), LossType::MeanSquaredError);
        assert_eq!(head.d_input(), 4);
    }

    #[test]
    fn unused_config_fields_do_not_change_head() {
        let config = QHeadConfig::new().with_head(
            HeadConfig::new()
                .with_network_name(String::from("main"))
                .with_head_idx(3)
                .with_is_local(false)
                .with_activation_function(String::from("tanh"))
                .with_dense_layer(Some(String::from("noisy"))),
        );
        let head = config
            .init::<TestBackend>(&discrete(5), 12, &Default::default())
            .unwrap();

        assert_eq!(head.num_actions(), 5);
        assert_eq!(head.loss_weight(), 1.0);

        // No activation is applied, so negative Q values survive
        let input = Tensor::from_floats([[-10.0; 12]], &Default::default());
        let output = head.forward(input.clone()).unwrap();
        let expected = input.matmul(head.dense().weight.val())
            + head.dense().bias.as_ref().unwrap().val().unsqueeze::<2>();
        expected.into_data().assert_approx_eq(&output.into_data(), 4);
    }

    #[test]
    fn forward_is_deterministic() {
        let head = build(&discrete(4), 16);
        let input = random_input(8, 16);

        let a = head.forward(input.clone()).unwrap();
        let b = head.forward(input).unwrap();
        assert_eq!(a.into_data().value, b.into_data().value);
    }

    #[test]
    fn forward_preserves_batch_size() {
        let head = build(&discrete(3), 5);
        for batch_size in [0, 1, 2, 33] {
            let output = head.forward(random_input(batch_size, 5)).unwrap();
            assert_eq!(output.dims(), [batch_size, 3]);
        }
    }

    #[test]
    fn forward_is_affine() {
        let head = build(&discrete(4), 6);
        let input = random_input(5, 6);

        let weight = head.dense().weight.val();
        let bias = head.dense().bias.as_ref().unwrap().val();
        let expected = input.clone().matmul(weight) + bias.unsqueeze::<2>();

        let output = head.forward(input).unwrap();
        expected.into_data().assert_approx_eq(&output.into_data(), 4);
    }

    #[test]
    fn four_directions() {
        let space = ActionSpace::Discrete(DiscreteActionSpace::from_variants::<Move>().unwrap());
        let head = build(&space, 16);

        let output = head.forward(random_input(8, 16)).unwrap();
        assert_eq!(output.dims(), [8, 4]);
    }

    #[test]
    fn continuous_single_state() {
        let head = build(&continuous(2), 32);

        let output = head.forward(random_input(1, 32)).unwrap();
        assert_eq!(output.dims(), [1, 1]);
    }

    #[test]
    fn mismatched_features_are_rejected() {
        let head = build(&discrete(4), 16);

        let result = head.forward(random_input(8, 10));
        assert_eq!(
            result.err(),
            Some(HeadError::ShapeMismatch {
                expected: 16,
                actual: 10
            })
        );
    }

    #[test]
    fn mse_loss_is_weighted() {
        let config = QHeadConfig::new().with_head(HeadConfig::new().with_loss_weight(0.5));
        let head = config
            .init::<TestBackend>(&discrete(2), 3, &Default::default())
            .unwrap();
        let device = Default::default();

        let prediction = Tensor::<TestBackend, 2>::zeros([2, 2], &device);
        let target = Tensor::<TestBackend, 2>::ones([2, 2], &device);
        let loss = head.loss(prediction, target).unwrap().into_scalar();
        assert!((loss - 0.5).abs() < 1e-6, "loss was {loss}");
    }

    #[test]
    fn huber_loss_is_linear_for_large_errors() {
        let config = QHeadConfig::new().with_loss_type(LossType::Huber { delta: 1.0 });
        let head = config
            .init::<TestBackend>(&discrete(2), 3, &Default::default())
            .unwrap();
        assert_eq!(head.loss_type(), LossType::Huber { delta: 1.0 });
        let device = Default::default();

        // errors of 3 and 0.5: (0.5 + 2) and 0.125
        let prediction = Tensor::<TestBackend, 2>::from_floats([[3.0, 0.5]], &device);
        let target = Tensor::<TestBackend, 2>::zeros([1, 2], &device);
        let loss = head.loss(prediction, target).unwrap().into_scalar();
        assert!((loss - (2.5 + 0.125) / 2.0).abs() < 1e-6, "loss was {loss}");
    }

    #[test]
    fn loss_rejects_mismatched_shapes() {
        let head = build(&discrete(2), 3);
        let device = Default::default();

        let result = head.loss(
            Tensor::zeros([2, 2], &device),
            Tensor::zeros([2, 3], &device),
        );
        assert_eq!(
            result.err(),
            Some(HeadError::ShapeMismatch {
                expected: 2,
                actual: 3
            })
        );

        let result = head.loss(
            Tensor::zeros([2, 2], &device),
            Tensor::zeros([4, 2], &device),
        );
        assert_eq!(
            result.err(),
            Some(HeadError::BatchMismatch {
                expected: 2,
                actual: 4
            })
        );
    }

    #[test]
    fn invalid_huber_delta_is_rejected() {
        for delta in [-1.0, f32::NAN] {
            let config = QHeadConfig::new().with_loss_type(LossType::Huber { delta });
            let result = config.init::<TestBackend>(&discrete(2), 3, &Default::default());
            assert!(
                matches!(
                    result,
                    Err(HeadError::InvalidConfig {
                        param: "loss_type",
                        ..
                    })
                ),
                "delta {delta} accepted"
            );
        }

        let config = QHeadConfig::new().with_loss_type(LossType::Huber { delta: 0.0 });
        assert!(config
            .init::<TestBackend>(&discrete(2), 3, &Default::default())
            .is_ok());
    }

    #[test]
    fn loss_backpropagates_to_dense_weights() {
        type TrainBackend = Autodiff<NdArray>;
        let device = Default::default();
        let head = QHeadConfig::new()
            .init::<TrainBackend>(&discrete(3), 4, &device)
            .unwrap();

        let input = Tensor::<TrainBackend, 2>::random([6, 4], Distribution::Default, &device);
        let prediction = head.forward(input).unwrap();
        let target = Tensor::<TrainBackend, 2>::ones([6, 3], &device);
        let grads = head.loss(prediction, target).unwrap().backward();

        let weight_grad = head.dense().weight.val().grad(&grads);
        assert!(weight_grad.is_some_and(|g| g.dims() == [4, 3]));
    }
}
