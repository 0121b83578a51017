//! Online mean and variance of states.
use crate::storage::ObsFilter;
use anyhow::Result;
use pwil_core::error::PwilError;
use tch::{Device, Kind, Tensor};

/// Lower bound of the variance used for normalization.
pub const VAR_FLOOR: f64 = 1e-2;

fn normalize(x: &Tensor, mean: &Tensor, var: &Tensor) -> Tensor {
    let inv_std = var.clamp_min(VAR_FLOOR).rsqrt();
    // (x - mean) * inv_std as a single fused multiply-add
    (-mean * &inv_std).addcmul(x, &inv_std)
}

/// Exact running mean and variance of each feature channel.
///
/// Batches are merged with the parallel variance algorithm of Chan et al.,
/// so the statistics equal those of the concatenation of all batches seen so
/// far, up to floating point error.
pub struct RunningMoments {
    mean: Tensor,
    var: Tensor,
    count: f64,
}

impl RunningMoments {
    /// Creates statistics of `dim` channels with zero count.
    pub fn new(dim: i64, device: Device) -> Self {
        Self {
            mean: Tensor::zeros([1, dim], (Kind::Float, device)),
            var: Tensor::zeros([1, dim], (Kind::Float, device)),
            count: 0.0,
        }
    }

    /// Merges a batch of shape `[batch_size, dim]` into the statistics.
    pub fn update(&mut self, x: &Tensor) -> Result<()> {
        let dim = self.mean.size()[1];
        if x.dim() != 2 || x.size()[1] != dim {
            return Err(PwilError::ShapeMismatch(format!(
                "expected [_, {}], got {:?}",
                dim,
                x.size()
            ))
            .into());
        }
        let n = x.size()[0];
        if n == 0 {
            return Ok(());
        }

        tch::no_grad(|| {
            let x = x.to_device(self.mean.device()).to_kind(Kind::Float);
            let dims = [0i64];
            let batch_mean = x.mean_dim(Some(dims.as_slice()), true, Kind::Float);
            let batch_var = (&x - &batch_mean)
                .square()
                .mean_dim(Some(dims.as_slice()), true, Kind::Float);

            let (c1, c2) = (self.count, n as f64);
            let total = c1 + c2;
            let delta = &batch_mean - &self.mean;
            let m2 = &self.var * c1 + batch_var * c2 + delta.square() * (c1 * c2 / total);

            self.var = m2 / total;
            self.mean = (&self.mean * c1 + batch_mean * c2) / total;
            self.count = total;
        });

        Ok(())
    }

    /// Returns `(x - mean) / sqrt(max(var, 1e-2))`.
    pub fn normalize(&self, x: &Tensor) -> Tensor {
        normalize(x, &self.mean, &self.var)
    }

    /// Running mean, of shape `[1, dim]`.
    pub fn mean(&self) -> &Tensor {
        &self.mean
    }

    /// Running variance, of shape `[1, dim]`.
    pub fn var(&self) -> &Tensor {
        &self.var
    }

    /// The number of samples merged so far.
    pub fn count(&self) -> f64 {
        self.count
    }

    /// Returns a normalizer with the current statistics.
    pub fn freeze(&self) -> FrozenMoments {
        FrozenMoments::new(self.mean.copy(), self.var.copy())
    }
}

impl ObsFilter for RunningMoments {
    fn filter(&mut self, state: &Tensor, update: bool) -> Result<Tensor> {
        if update {
            self.update(state)?;
        }
        Ok(self.normalize(state))
    }
}

/// Normalizer with fixed mean and variance.
pub struct FrozenMoments {
    mean: Tensor,
    var: Tensor,
}

impl FrozenMoments {
    /// Creates a normalizer. 1-dimensional statistics are treated as a single row.
    pub fn new(mean: Tensor, var: Tensor) -> Self {
        let row = |t: Tensor| if t.dim() == 1 { t.unsqueeze(0) } else { t };
        Self {
            mean: row(mean),
            var: row(var),
        }
    }

    /// Returns `(x - mean) / sqrt(max(var, 1e-2))`.
    pub fn normalize(&self, x: &Tensor) -> Tensor {
        normalize(x, &self.mean, &self.var)
    }
}

impl ObsFilter for FrozenMoments {
    fn filter(&mut self, state: &Tensor, _update: bool) -> Result<Tensor> {
        Ok(self.normalize(state))
    }
}
