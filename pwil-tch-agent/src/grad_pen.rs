//! Gradient penalty on interpolations of expert and agent samples.
use anyhow::{Context, Result};
use tch::{Kind, Tensor};

fn mix(alpha: &Tensor, expert: &Tensor, agent: &Tensor) -> Tensor {
    let mut shape = vec![alpha.size()[0]];
    shape.resize(expert.dim(), 1);
    let alpha = alpha.view(shape.as_slice()).expand_as(expert);
    let mixed = agent + (expert - agent) * alpha;

    // leaf tensor whose gradient is taken
    mixed.detach().set_requires_grad(true)
}

/// Computes `mean((|grad_x D(x, a)|_2 - 1)^2)` at random interpolations of
/// expert and agent samples.
///
/// Each pair of samples is mixed with its own coefficient drawn from `[0, 1)`.
/// Actions are mixed and fed to `disc_fn` only when both `expert_action` and
/// `agent_action` are given. The gradient with respect to the mixed states is
/// computed with `create_graph`, so the returned penalty can itself be
/// differentiated with respect to the parameters of the discriminator.
pub fn gradient_penalty<F>(
    disc_fn: F,
    expert_state: &Tensor,
    expert_action: Option<&Tensor>,
    agent_state: &Tensor,
    agent_action: Option<&Tensor>,
) -> Result<Tensor>
where
    F: Fn(&Tensor, Option<&Tensor>) -> Result<Tensor>,
{
    let n = expert_state.size()[0];
    let alpha = Tensor::rand([n, 1], (Kind::Float, expert_state.device()));
    let mixed_state = mix(&alpha, expert_state, agent_state);
    let mixed_action = match (expert_action, agent_action) {
        (Some(e), Some(a)) => Some(mix(&alpha, e, a)),
        _ => None,
    };

    let mut inputs = vec![mixed_state.shallow_clone()];
    if let Some(a) = mixed_action.as_ref() {
        inputs.push(a.shallow_clone());
    }

    let disc = disc_fn(&mixed_state, mixed_action.as_ref())?;
    let grads = Tensor::f_run_backward(&[disc.sum(Kind::Float)], &inputs, true, true)?;
    let grad = grads
        .into_iter()
        .next()
        .context("No gradient with respect to the mixed states")?;

    let dims = [1i64];
    let norm = grad
        .flatten(1, -1)
        .square()
        .sum_dim_intlist(Some(dims.as_slice()), false, Kind::Float)
        .sqrt();

    Ok((norm - 1.0).square().mean(Kind::Float))
}
