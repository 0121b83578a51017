use anyhow::Result;
use pwil_core::{
    record::Record, Algorithm, NestedAlgorithm, NestedAlgorithmConfig, RewardMode,
};
use pwil_tch_agent::{
    action::ActionSpace,
    discriminator::{DiscriminatorConfig, MODEL_FILE, OPT_FILE},
    model::ModelBase,
    moments::RunningMoments,
    pwil::{Pwil, PwilConfig},
    storage::{RolloutStorage, Transition, VecExpertDataset, VecRolloutStorage},
};
use std::{convert::TryFrom, fs, path::Path};
use tch::{Device, Kind, Tensor};
use tempdir::TempDir;
use test_log::test;

const DIM_OBS: i64 = 2;
const DIM_ACT: i64 = 1;
const N_TRANSITIONS: usize = 20;
const N_EXPERT: i64 = 32;
const BATCH_SIZE: usize = 4;

fn transitions() -> Vec<Transition> {
    (0..N_TRANSITIONS)
        .map(|i| {
            let x = i as f32 / N_TRANSITIONS as f32;
            let mask = if i % 5 == 4 { 0.0 } else { 1.0 };
            Transition::new(&[x, -x], &[x * 2.0 - 1.0], mask).raw_state(&[x * 10.0, -x * 10.0])
        })
        .collect()
}

fn storage() -> Result<VecRolloutStorage> {
    VecRolloutStorage::from_transitions(&transitions(), 42)
}

fn expert() -> Result<VecExpertDataset> {
    let states = Tensor::randn([N_EXPERT, DIM_OBS], (Kind::Float, Device::Cpu)) + 1.0;
    let actions = Tensor::randn([N_EXPERT, DIM_ACT], (Kind::Float, Device::Cpu));
    Ok(VecExpertDataset::new(states, actions, BATCH_SIZE)?.shuffle(0))
}

fn config(mode: RewardMode, seed: i64) -> PwilConfig {
    PwilConfig::default()
        .discriminator_config(DiscriminatorConfig::default().state_dim(DIM_OBS))
        .action_space(ActionSpace::Continuous { dim: DIM_ACT })
        .reward_mode(mode)
        .action_input(true)
        .seed(seed)
}

/// Policy update recording the rewards it finds in the storage.
struct Policy;

impl Algorithm<VecRolloutStorage> for Policy {
    fn name(&self) -> &str {
        "policy"
    }

    fn update(&mut self, storage: &mut VecRolloutStorage) -> Result<Record> {
        let sum = f32::try_from(storage.rewards().sum(Kind::Float))?;
        Ok(Record::from_scalar("reward_sum", sum))
    }

    fn save_params(&self, path: &Path) -> Result<()> {
        fs::write(path.join("policy.txt"), "policy")?;
        Ok(())
    }

    fn load_params(&mut self, path: &Path) -> Result<()> {
        fs::read_to_string(path.join("policy.txt"))?;
        Ok(())
    }
}

#[test]
fn test_nested_training_loop() -> Result<()> {
    let pwil = Pwil::build(
        config(RewardMode::Pwil, 1).disc_grad_pen(10.0).reward_norm(true),
        expert()?,
    )?;
    let nested_config = NestedAlgorithmConfig::default().policy_updates_per_iter(2);
    let mut nested = NestedAlgorithm::<VecRolloutStorage>::build(
        &nested_config,
        Box::new(pwil),
        Box::new(Policy),
    )?;
    let mut storage = storage()?;

    for i in 1..=3 {
        let record = nested.update(&mut storage)?;
        assert!(record.get_scalar("pwil/primal_wass_reward")?.is_finite());
        assert!(record.get_scalar("pwil/grad_pen")? >= 0.0);
        assert!(record.get_scalar("pwil/reward_mean")?.is_finite());
        assert_eq!(record.get_scalar("iter")?, i as f32);

        // the policy phase sees the relabelled rewards
        let sum = f32::try_from(storage.rewards().sum(Kind::Float))?;
        assert_eq!(record.get_scalar("policy/reward_sum")?, sum);
        assert_ne!(sum, 0.0);
    }
    assert_eq!(nested.n_iters(), 3);

    let dir = TempDir::new("nested")?;
    nested.save_params(dir.path())?;
    assert!(dir.path().join("reward").join(MODEL_FILE).exists());
    assert!(dir.path().join("reward").join(OPT_FILE).exists());
    assert!(dir.path().join("policy").join("policy.txt").exists());
    nested.load_params(dir.path())?;
    Ok(())
}

#[test]
fn test_skipped_training_still_relabels() -> Result<()> {
    let short = transitions()[..BATCH_SIZE - 1].to_vec();
    let mut storage = VecRolloutStorage::from_transitions(&short, 0)?;
    let mut pwil = Pwil::build(config(RewardMode::Raw, 0), expert()?)?;

    let record = pwil.update(&mut storage)?;
    assert!(record.get_scalar("primal_wass_reward").is_err());
    assert!(record.get_scalar("reward_mean").is_ok());
    assert_eq!(pwil.n_updates(), 1);
    Ok(())
}

#[test]
fn test_checkpoint_reproduces_rewards() -> Result<()> {
    let mut storage = storage()?;
    let mut pwil = Pwil::build(config(RewardMode::Pwil, 1), expert()?)?;
    pwil.update(&mut storage)?;

    // move the weights and the optimizer state away from initialization
    let (s, a) = (storage.get_obs(0)?.obs, storage.action(0)?);
    let loss = pwil
        .discriminator()
        .forward(&s, Some(&a))?
        .square()
        .mean(Kind::Float);
    pwil.discriminator_mut().backward_step(&loss)?;

    let dir = TempDir::new("pwil")?;
    Algorithm::<VecRolloutStorage>::save_params(&pwil, dir.path())?;

    let mut pwil2 = Pwil::build(config(RewardMode::Pwil, 2), expert()?)?;
    Algorithm::<VecRolloutStorage>::load_params(&mut pwil2, dir.path())?;
    assert!(pwil2.discriminator().opt().state_eq(pwil.discriminator().opt()));

    for step in 0..storage.n_steps() {
        let r1 = pwil.compute_reward(step, &storage)?;
        let r2 = pwil2.compute_reward(step, &storage)?;
        assert!(r1.equal(&r2));
    }
    Ok(())
}

#[test]
fn test_raw_mode_uses_score() -> Result<()> {
    let storage = storage()?;
    for state_norm in [true, false] {
        let mut pwil = Pwil::build(config(RewardMode::Raw, 3).state_norm(state_norm), expert()?)?;
        let obs = storage.get_obs(7)?;
        let state = match state_norm {
            true => obs.obs,
            false => obs.raw_obs,
        };
        let reward = pwil.compute_reward(7, &storage)?;
        let score = pwil
            .discriminator()
            .forward(&state, Some(&storage.action(7)?))?;
        assert!(reward.equal(&score));
    }
    Ok(())
}

#[test]
fn test_discrete_actions_and_state_filter() -> Result<()> {
    let transitions = (0..8)
        .map(|i| Transition::new(&[i as f32, 0.0], &[(i % 3) as i64], 1.0))
        .collect::<Vec<_>>();
    let mut storage = VecRolloutStorage::from_transitions(&transitions, 0)?;
    let states = Tensor::randn([8, DIM_OBS], (Kind::Float, Device::Cpu)) * 5.0;
    let actions = Tensor::from_slice(&[0i64, 1, 2, 0, 1, 2, 0, 1]).unsqueeze(-1);

    let mut moments = RunningMoments::new(DIM_OBS, Device::Cpu);
    moments.update(&states)?;
    let expert = VecExpertDataset::new(states, actions, BATCH_SIZE)?;
    let config = config(RewardMode::Airl, 4).action_space(ActionSpace::Discrete { n: 3 });
    let mut pwil = Pwil::build(config, expert)?.with_expert_moments(moments);

    let record = pwil.update(&mut storage)?;
    assert!(record.get_scalar("primal_wass_reward")?.is_finite());
    assert!(record.get_scalar("encoder.ln0.weight_mean").is_ok());
    Ok(())
}

#[test]
fn test_unknown_reward_mode_is_rejected() -> Result<()> {
    let dir = TempDir::new("pwil_config")?;
    let path = dir.path().join("pwil_config.yaml");
    config(RewardMode::Pwil, 0).save(&path)?;

    let yaml = fs::read_to_string(&path)?.replace("reward_mode: pwil", "reward_mode: foo");
    fs::write(&path, yaml)?;
    let err = match PwilConfig::load(&path) {
        Ok(_) => panic!("reward mode foo was accepted"),
        Err(e) => e,
    };
    assert!(err.to_string().contains("Unrecognized reward mode: foo"));
    Ok(())
}
