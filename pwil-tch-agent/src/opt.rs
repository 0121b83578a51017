//! Optimizers.
//!
//! [`tch::nn::Optimizer`] does not expose its internal state, so the Adam
//! optimizer used for the discriminator keeps its moment estimates itself.
//! This makes the optimizer state part of a checkpoint, saved and restored
//! next to the network weights.
use anyhow::{Context, Result};
use log::{info, trace};
use pwil_core::error::PwilError;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, path::Path};
use tch::{nn::VarStore, Tensor};

/// Configures an optimizer for training neural networks.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub enum OptimizerConfig {
    /// Adam optimizer.
    Adam {
        /// Learning rate.
        lr: f64,
        #[serde(default = "default_beta1")]
        /// Decay of the first moment estimate.
        beta1: f64,
        #[serde(default = "default_beta2")]
        /// Decay of the second moment estimate.
        beta2: f64,
        #[serde(default = "default_eps")]
        /// Added to the denominator of the update.
        eps: f64,
    },
}

fn default_beta1() -> f64 {
    0.9
}

fn default_beta2() -> f64 {
    0.999
}

fn default_eps() -> f64 {
    1e-8
}

impl OptimizerConfig {
    /// Adam with default betas and the given learning rate.
    pub fn adam(lr: f64) -> Self {
        Self::Adam {
            lr,
            beta1: default_beta1(),
            beta2: default_beta2(),
            eps: default_eps(),
        }
    }

    /// Override learning rate.
    pub fn learning_rate(self, lr: f64) -> Self {
        match self {
            Self::Adam {
                beta1, beta2, eps, ..
            } => Self::Adam {
                lr,
                beta1,
                beta2,
                eps,
            },
        }
    }

    /// Constructs an optimizer bound to the trainable variables of `vs`.
    pub fn build(&self, vs: &VarStore) -> Result<Adam> {
        match self {
            Self::Adam {
                lr,
                beta1,
                beta2,
                eps,
            } => Ok(Adam::new(vs, *lr, *beta1, *beta2, *eps)),
        }
    }
}

/// Adam optimizer with checkpointable state.
pub struct Adam {
    lr: f64,
    beta1: f64,
    beta2: f64,
    eps: f64,
    step: i64,
    // first and second moments keyed by variable name
    moments: HashMap<String, (Tensor, Tensor)>,
}

impl Adam {
    fn new(vs: &VarStore, lr: f64, beta1: f64, beta2: f64, eps: f64) -> Self {
        let moments = vs
            .variables()
            .into_iter()
            .filter(|(_, v)| v.requires_grad())
            .map(|(k, v)| (k, (v.zeros_like(), v.zeros_like())))
            .collect();

        Self {
            lr,
            beta1,
            beta2,
            eps,
            step: 0,
            moments,
        }
    }

    /// Current learning rate.
    pub fn lr(&self) -> f64 {
        self.lr
    }

    /// Sets the learning rate.
    pub fn set_lr(&mut self, lr: f64) {
        self.lr = lr;
    }

    /// The number of steps taken so far.
    pub fn step_count(&self) -> i64 {
        self.step
    }

    /// Zeroes the gradients of the variables in `vs`.
    pub fn zero_grad(&self, vs: &VarStore) {
        for mut v in vs.trainable_variables() {
            v.zero_grad();
        }
    }

    /// Computes gradients of `loss` and applies a step to the variables in `vs`.
    pub fn backward_step(&mut self, vs: &VarStore, loss: &Tensor) -> Result<()> {
        self.zero_grad(vs);
        loss.f_backward()?;
        self.step(vs)
    }

    /// Applies a step with the gradients currently held by the variables in `vs`.
    pub fn step(&mut self, vs: &VarStore) -> Result<()> {
        self.step += 1;
        let bc1 = 1.0 - self.beta1.powi(self.step as i32);
        let bc2 = 1.0 - self.beta2.powi(self.step as i32);
        let (beta1, beta2, eps, lr) = (self.beta1, self.beta2, self.eps, self.lr);

        tch::no_grad(|| -> Result<()> {
            for (name, mut var) in vs.variables() {
                let grad = var.grad();
                if !grad.defined() {
                    continue;
                }
                let (m, v) = self
                    .moments
                    .get_mut(&name)
                    .with_context(|| format!("No optimizer state for {}", name))?;
                *m = &*m * beta1 + &grad * (1.0 - beta1);
                *v = &*v * beta2 + (&grad * &grad) * (1.0 - beta2);
                let update = (&*m / bc1) / ((&*v / bc2).sqrt() + eps) * lr;
                let _ = var.f_sub_(&update)?;
            }
            Ok(())
        })?;
        trace!("Adam step {}", self.step);

        Ok(())
    }

    /// Saves the moments and the step count.
    pub fn save<T: AsRef<Path>>(&self, path: T) -> Result<()> {
        let mut named: Vec<(String, Tensor)> = vec![("step".to_string(), Tensor::from_slice(&[self.step]))];
        for (k, (m, v)) in self.moments.iter() {
            named.push((format!("m.{}", k), m.shallow_clone()));
            named.push((format!("v.{}", k), v.shallow_clone()));
        }
        Tensor::save_multi(&named, &path)?;
        info!("Save optimizer state to {:?}", path.as_ref());
        Ok(())
    }

    /// Loads the moments and the step count.
    ///
    /// The state is replaced only when every moment in the file matches a
    /// variable of this optimizer with the same shape.
    pub fn load<T: AsRef<Path>>(&mut self, path: T) -> Result<()> {
        let device = self
            .moments
            .values()
            .next()
            .map(|(m, _)| m.device())
            .unwrap_or(tch::Device::Cpu);
        let named: HashMap<String, Tensor> = Tensor::load_multi(&path)?.into_iter().collect();
        let step = named
            .get("step")
            .context("Optimizer state has no key step")?;
        let step = step.f_int64_value(&[0])?;

        let mut moments = HashMap::new();
        for (k, (m_old, _)) in self.moments.iter() {
            let get = |key: String| -> Result<Tensor> {
                let t = named
                    .get(&key)
                    .with_context(|| format!("Optimizer state has no key {}", key))?;
                if t.size() != m_old.size() {
                    return Err(PwilError::ShapeMismatch(key).into());
                }
                Ok(t.to_device(device))
            };
            moments.insert(k.clone(), (get(format!("m.{}", k))?, get(format!("v.{}", k))?));
        }

        self.moments = moments;
        self.step = step;
        info!("Load optimizer state from {:?}", path.as_ref());
        Ok(())
    }

    /// Returns `true` if both optimizers hold identical state.
    pub fn state_eq(&self, other: &Adam) -> bool {
        self.step == other.step
            && self.moments.len() == other.moments.len()
            && self.moments.iter().all(|(k, (m, v))| match other.moments.get(k) {
                Some((m_, v_)) => m.equal(m_) && v.equal(v_),
                None => false,
            })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::convert::TryFrom;
    use tch::{nn, Device, Kind};
    use tempdir::TempDir;

    fn quadratic() -> (VarStore, Tensor) {
        let vs = VarStore::new(Device::Cpu);
        let w = vs.root().var("w", &[2], nn::Init::Const(1.0));
        (vs, w)
    }

    #[test]
    fn test_first_step_moves_by_lr() -> Result<()> {
        let (vs, w) = quadratic();
        let mut opt = OptimizerConfig::adam(0.1).build(&vs)?;
        let loss = (&w * &w).sum(Kind::Float);
        opt.backward_step(&vs, &loss)?;

        // The first bias-corrected Adam step has magnitude lr.
        let w: Vec<f32> = Vec::try_from(&w)?;
        assert!((w[0] - 0.9).abs() < 1e-5);
        assert!((w[1] - 0.9).abs() < 1e-5);
        assert_eq!(opt.step_count(), 1);
        Ok(())
    }

    #[test]
    fn test_save_load_state() -> Result<()> {
        let (vs, w) = quadratic();
        let mut opt = OptimizerConfig::adam(0.1).build(&vs)?;
        for _ in 0..3 {
            let loss = (&w * &w).sum(Kind::Float);
            opt.backward_step(&vs, &loss)?;
        }

        let dir = TempDir::new("adam")?;
        let path = dir.path().join("opt.pt.tch");
        opt.save(&path)?;

        let (vs2, _) = quadratic();
        let mut opt2 = OptimizerConfig::adam(0.1).build(&vs2)?;
        assert!(!opt.state_eq(&opt2));
        opt2.load(&path)?;
        assert!(opt.state_eq(&opt2));
        assert_eq!(opt2.step_count(), 3);
        Ok(())
    }

    #[test]
    fn test_load_rejects_mismatched_shapes() -> Result<()> {
        let (vs, _) = quadratic();
        let opt = OptimizerConfig::adam(0.1).build(&vs)?;
        let dir = TempDir::new("adam")?;
        let path = dir.path().join("opt.pt.tch");
        opt.save(&path)?;

        let vs2 = VarStore::new(Device::Cpu);
        let _ = vs2.root().var("w", &[3], nn::Init::Const(1.0));
        let mut opt2 = OptimizerConfig::adam(0.1).build(&vs2)?;
        assert!(opt2.load(&path).is_err());
        assert_eq!(opt2.step_count(), 0);
        Ok(())
    }

    #[test]
    fn test_load_reports_missing_key() -> Result<()> {
        let (vs, _) = quadratic();
        let opt = OptimizerConfig::adam(0.1).build(&vs)?;
        let dir = TempDir::new("adam")?;
        let path = dir.path().join("opt.pt.tch");
        opt.save(&path)?;

        let vs2 = VarStore::new(Device::Cpu);
        let _ = vs2.root().var("u", &[2], nn::Init::Const(1.0));
        let mut opt2 = OptimizerConfig::adam(0.1).build(&vs2)?;
        let err = opt2.load(&path).unwrap_err();
        assert!(err.to_string().contains("Optimizer state has no key m.u"));
        assert!(err.downcast_ref::<PwilError>().is_none());
        Ok(())
    }
}
