use serde::{Deserialize, Serialize};
use tch::Tensor;

/// Activation function of hidden layers.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Copy)]
pub enum Activation {
    /// Rectified linear unit.
    Relu,

    /// Hyperbolic tangent.
    Tanh,
}

impl Default for Activation {
    fn default() -> Self {
        Self::Relu
    }
}

impl Activation {
    /// Applies the activation function.
    pub fn forward(&self, xs: &Tensor) -> Tensor {
        match self {
            Self::Relu => xs.relu(),
            Self::Tanh => xs.tanh(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`Mlp`](super::Mlp).
pub struct MlpConfig {
    pub(crate) in_dim: i64,
    pub(crate) units: Vec<i64>,
    pub(crate) out_dim: i64,
    pub(crate) activation_out: bool,
    #[serde(default)]
    pub(crate) activation: Activation,
    #[serde(default)]
    pub(crate) dropout: f64,
}

impl MlpConfig {
    /// Creates configuration of MLP.
    ///
    /// * `activation_out` - If `true`, activation function is added in the final layer.
    pub fn new(in_dim: i64, units: Vec<i64>, out_dim: i64, activation_out: bool) -> Self {
        Self {
            in_dim,
            units,
            out_dim,
            activation_out,
            activation: Activation::Relu,
            dropout: 0.0,
        }
    }

    /// Sets the activation function of hidden layers.
    pub fn activation(mut self, v: Activation) -> Self {
        self.activation = v;
        self
    }

    /// Sets the dropout probability applied after hidden layers in training mode.
    pub fn dropout(mut self, v: f64) -> Self {
        self.dropout = v;
        self
    }

    /// Returns the output dimension.
    pub fn get_out_dim(&self) -> i64 {
        self.out_dim
    }
}
