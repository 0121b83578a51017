//! Sinkhorn-style transport distance between two sequences of scores.
use anyhow::Result;
use pwil_core::error::PwilError;
use serde::{Deserialize, Serialize};
use tch::{Kind, Tensor};

/// Configuration of [`wasserstein_distance`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct SinkhornConfig {
    /// The number of scaling iterations.
    #[serde(default = "default_n_iters")]
    pub n_iters: usize,

    /// Added to the denominators of the scaling updates.
    #[serde(default = "default_eps")]
    pub eps: f64,
}

fn default_n_iters() -> usize {
    5
}

fn default_eps() -> f64 {
    1e-8
}

impl Default for SinkhornConfig {
    fn default() -> Self {
        Self {
            n_iters: default_n_iters(),
            eps: default_eps(),
        }
    }
}

impl SinkhornConfig {
    /// Sets the number of iterations.
    pub fn n_iters(mut self, v: usize) -> Self {
        self.n_iters = v;
        self
    }

    /// Sets the stabilizing constant.
    pub fn eps(mut self, v: f64) -> Self {
        self.eps = v;
        self
    }
}

fn column(t: &Tensor) -> Tensor {
    match t.dim() {
        1 => t.unsqueeze(-1),
        _ => t.shallow_clone(),
    }
}

/// Approximate transport distance between scores `p` and `q`, one value per sample.
///
/// `p` and `q` are scores of `N` samples, of shape `[N]` or `[N, 1]`.
/// The scaling vectors `u` and `v` start at `1/N` and are updated as
///
/// ```text
/// v <- q / (sum_1(p * u) + eps)
/// u <- 1 / (sum_1(p * v) + eps)
/// ```
///
/// where `sum_1` sums over the second axis with broadcasting. The result is
/// `sum_1(u * (p * v^T) * q)`, of shape `[N, 1]`.
///
/// This scales each sample independently and is not the transport plan between
/// the empirical distributions of `p` and `q`.
pub fn wasserstein_distance(p: &Tensor, q: &Tensor, config: &SinkhornConfig) -> Result<Tensor> {
    let (p, q) = (column(p), column(q));
    if p.size() != q.size() || p.dim() != 2 {
        return Err(
            PwilError::ShapeMismatch(format!("p {:?}, q {:?}", p.size(), q.size())).into(),
        );
    }

    let n = p.size()[0];
    let eps = config.eps;
    let dims = [1i64];
    let sum_1 = |t: Tensor| t.sum_dim_intlist(Some(dims.as_slice()), true, Kind::Float);
    let mut u = Tensor::ones([n], (Kind::Float, p.device())) / n as f64;
    let mut v = Tensor::ones([n], (Kind::Float, p.device())) / n as f64;

    for _ in 0..config.n_iters {
        v = &q / (sum_1(&p * &u) + eps);
        u = (sum_1(&p * &v) + eps).reciprocal();
    }

    let v_t = match v.dim() {
        1 => v,
        _ => v.transpose(0, 1),
    };
    let transport = &u * (&p * v_t);

    Ok(sum_1(transport * &q))
}
