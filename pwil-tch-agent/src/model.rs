//! Definition of interfaces of neural networks.
use anyhow::Result;
use std::path::Path;
use tch::{nn, Tensor};

/// Base interface.
pub trait ModelBase {
    /// Trains the network given a loss.
    fn backward_step(&mut self, loss: &Tensor) -> Result<()>;

    /// Returns `var_store`.
    fn get_var_store(&self) -> &nn::VarStore;

    /// Save parameters of the neural network.
    fn save<T: AsRef<Path>>(&self, path: T) -> Result<()>;

    /// Load parameters of the neural network.
    fn load<T: AsRef<Path>>(&mut self, path: T) -> Result<()>;
}

/// Neural network model that can be initialized with a [`nn::Path`] and configuration.
///
/// Modules composing a network share a single [`nn::VarStore`]; each is
/// built under its own sub-path so that variable names do not collide.
pub trait SubModel {
    /// Configuration from which [`SubModel`] is constructed.
    type Config;

    /// Input of the [`SubModel`].
    type Input;

    /// Output of the [`SubModel`].
    type Output;

    /// Builds [`SubModel`] under `path` with [`SubModel::Config`].
    fn build(path: &nn::Path, config: Self::Config) -> Self;

    /// A generalized forward function in evaluation mode.
    fn forward(&self, input: &Self::Input) -> Self::Output {
        self.forward_t(input, false)
    }

    /// Forward function with an explicit train flag.
    fn forward_t(&self, input: &Self::Input, train: bool) -> Self::Output;
}
