//! Action spaces and action distributions.
//!
//! The kind of an action space and of the distribution of a policy is chosen
//! once, when they are constructed, and carried as enum variants.
use anyhow::Result;
use pwil_core::error::PwilError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use tch::{Kind, Reduction, Tensor};

/// Action space of an environment.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub enum ActionSpace {
    /// `n` discrete actions, given as indices.
    Discrete {
        /// The number of actions.
        n: i64,
    },

    /// Real vectors of dimension `dim`.
    Continuous {
        /// Dimension of actions.
        dim: i64,
    },
}

impl ActionSpace {
    /// Dimension of the representation returned by [`ActionSpace::action_repr`].
    pub fn repr_dim(&self) -> i64 {
        match self {
            Self::Discrete { n } => *n,
            Self::Continuous { dim } => *dim,
        }
    }

    /// Converts a batch of actions into float vectors fed to networks.
    ///
    /// Discrete actions, indices of shape `[N]` or `[N, 1]`, become one-hot vectors.
    pub fn action_repr(&self, action: &Tensor) -> Tensor {
        match self {
            Self::Discrete { n } => action
                .to_kind(Kind::Int64)
                .reshape([-1])
                .one_hot(*n)
                .to_kind(Kind::Float),
            Self::Continuous { .. } => action.to_kind(Kind::Float),
        }
    }
}

/// Kind of a probability distribution over actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistKind {
    /// Diagonal Gaussian.
    Normal,

    /// Categorical.
    Categorical,
}

impl FromStr for DistKind {
    type Err = PwilError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(Self::Normal),
            "categorical" => Ok(Self::Categorical),
            _ => Err(PwilError::UnsupportedDistribution(s.to_string())),
        }
    }
}

impl fmt::Display for DistKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Categorical => write!(f, "categorical"),
        }
    }
}

/// A batch of action distributions.
pub enum ActionDist {
    /// Diagonal Gaussian.
    Normal {
        /// Mean.
        mean: Tensor,
        /// Standard deviation.
        std: Tensor,
    },

    /// Categorical distribution given by unnormalized log probabilities.
    Categorical {
        /// Logits.
        logits: Tensor,
    },
}

impl ActionDist {
    /// Kind of the distribution.
    pub fn kind(&self) -> DistKind {
        match self {
            Self::Normal { .. } => DistKind::Normal,
            Self::Categorical { .. } => DistKind::Categorical,
        }
    }

    /// A sample through which gradients flow to the parameters.
    ///
    /// Gaussians are sampled with the reparameterization trick.
    /// For categorical distributions the logits are returned.
    pub fn reparam_sample(&self) -> Tensor {
        match self {
            Self::Normal { mean, std } => mean + std * mean.randn_like(),
            Self::Categorical { logits } => logits.shallow_clone(),
        }
    }
}

/// Loss between predicted and demonstrated actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionLoss {
    /// Cross entropy with action indices.
    CrossEntropy,

    /// Mean squared error.
    Mse,
}

/// Pairs an action space with the distribution kind of a policy and the loss
/// matching them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActionHead {
    space: ActionSpace,
    kind: DistKind,
    loss: ActionLoss,
}

impl ActionHead {
    /// Creates a head.
    ///
    /// Discrete spaces take categorical distributions and continuous spaces
    /// take Gaussians. Other pairs are rejected.
    pub fn new(space: ActionSpace, kind: DistKind) -> Result<Self> {
        let loss = match (space, kind) {
            (ActionSpace::Discrete { .. }, DistKind::Categorical) => ActionLoss::CrossEntropy,
            (ActionSpace::Continuous { .. }, DistKind::Normal) => ActionLoss::Mse,
            _ => {
                return Err(PwilError::UnsupportedDistribution(format!(
                    "{} for {:?}",
                    kind, space
                ))
                .into())
            }
        };

        Ok(Self { space, kind, loss })
    }

    /// The action space.
    pub fn space(&self) -> ActionSpace {
        self.space
    }

    /// The loss kind.
    pub fn loss(&self) -> ActionLoss {
        self.loss
    }

    /// Loss between a predicted distribution and demonstrated actions.
    pub fn action_loss(&self, pred: &ActionDist, true_actions: &Tensor) -> Result<Tensor> {
        if pred.kind() != self.kind {
            return Err(PwilError::UnsupportedDistribution(format!(
                "expected {}, got {}",
                self.kind,
                pred.kind()
            ))
            .into());
        }

        let sample = pred.reparam_sample();
        let loss = match self.loss {
            ActionLoss::CrossEntropy => {
                sample.cross_entropy_for_logits(&true_actions.reshape([-1]).to_kind(Kind::Int64))
            }
            ActionLoss::Mse => {
                sample.mse_loss(&true_actions.to_kind(Kind::Float), Reduction::Mean)
            }
        };

        Ok(loss)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::convert::TryFrom;
    use crate::util::to_vec_f32;
    use tch::Device;

    #[test]
    fn test_action_repr() -> Result<()> {
        let space = ActionSpace::Discrete { n: 3 };
        let a = Tensor::from_slice(&[2.0f32, 0.0]).reshape([2, 1]);
        let r = space.action_repr(&a);
        assert_eq!(r.size(), vec![2, 3]);
        assert_eq!(to_vec_f32(&r)?, vec![0.0, 0.0, 1.0, 1.0, 0.0, 0.0]);

        let space = ActionSpace::Continuous { dim: 2 };
        let a = Tensor::from_slice(&[0.5f64, -0.5]).reshape([1, 2]);
        assert_eq!(space.action_repr(&a).kind(), Kind::Float);
        assert_eq!(space.repr_dim(), 2);
        Ok(())
    }

    #[test]
    fn test_action_repr_non_contiguous() -> Result<()> {
        let space = ActionSpace::Discrete { n: 3 };
        // [1, 3] transposed to a strided [3, 1] batch.
        let a = Tensor::from_slice(&[2i64, 0, 1]).reshape([1, 3]).transpose(0, 1);
        assert!(!a.is_contiguous());
        let r = space.action_repr(&a);
        assert_eq!(to_vec_f32(&r)?, vec![0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);

        let head = ActionHead::new(space, DistKind::Categorical)?;
        let logits = Tensor::zeros([3, 3], (Kind::Float, Device::Cpu));
        let dist = ActionDist::Categorical { logits };
        let loss = head.action_loss(&dist, &a)?;
        assert!((f32::try_from(&loss)? - 3f32.ln()).abs() < 1e-5);
        Ok(())
    }

    #[test]
    fn test_dist_kind_parse() {
        assert_eq!("normal".parse::<DistKind>(), Ok(DistKind::Normal));
        assert_eq!("categorical".parse::<DistKind>(), Ok(DistKind::Categorical));
        assert_eq!(
            "beta".parse::<DistKind>(),
            Err(PwilError::UnsupportedDistribution("beta".to_string()))
        );
    }

    #[test]
    fn test_incoherent_head() {
        assert!(ActionHead::new(ActionSpace::Discrete { n: 2 }, DistKind::Normal).is_err());
        assert!(ActionHead::new(ActionSpace::Continuous { dim: 2 }, DistKind::Categorical).is_err());
    }

    #[test]
    fn test_action_loss() -> Result<()> {
        let head = ActionHead::new(ActionSpace::Discrete { n: 2 }, DistKind::Categorical)?;
        assert_eq!(head.loss(), ActionLoss::CrossEntropy);
        let logits = Tensor::from_slice(&[0.0f32, 0.0]).reshape([1, 2]);
        let dist = ActionDist::Categorical { logits };
        let loss = head.action_loss(&dist, &Tensor::from_slice(&[1i64]))?;
        assert!((f32::try_from(&loss)? - 2f32.ln()).abs() < 1e-5);

        let head = ActionHead::new(ActionSpace::Continuous { dim: 2 }, DistKind::Normal)?;
        let mean = Tensor::ones([4, 2], (Kind::Float, Device::Cpu));
        let dist = ActionDist::Normal {
            std: mean.zeros_like(),
            mean,
        };
        let loss = head.action_loss(&dist, &Tensor::ones([4, 2], (Kind::Float, Device::Cpu)))?;
        assert_eq!(f32::try_from(&loss)?, 0.0);

        let wrong = ActionDist::Categorical {
            logits: Tensor::zeros([1, 2], (Kind::Float, Device::Cpu)),
        };
        assert!(head.action_loss(&wrong, &Tensor::zeros([1, 2], (Kind::Float, Device::Cpu))).is_err());
        Ok(())
    }
}
