use super::MlpConfig;
use crate::model::SubModel;
use tch::{nn, nn::ModuleT, Device, Tensor};

/// Multilayer perceptron.
pub struct Mlp {
    device: Device,
    seq: nn::SequentialT,
}

impl Mlp {
    fn create_net(p: &nn::Path, config: &MlpConfig) -> nn::SequentialT {
        let mut seq = nn::seq_t();
        let mut in_dim = config.in_dim;
        let activation = config.activation;
        let dropout = config.dropout;

        for (i, &out_dim) in config.units.iter().enumerate() {
            seq = seq.add(nn::linear(
                p / format!("{}{}", "ln", i),
                in_dim,
                out_dim,
                Default::default(),
            ));
            seq = seq.add_fn(move |x| activation.forward(x));
            if dropout > 0.0 {
                seq = seq.add_fn_t(move |x, train| x.dropout(dropout, train));
            }
            in_dim = out_dim;
        }

        seq = seq.add(nn::linear(
            p / format!("{}{}", "ln", config.units.len()),
            in_dim,
            config.out_dim,
            Default::default(),
        ));

        if config.activation_out {
            seq = seq.add_fn(move |x| activation.forward(x));
        }

        seq
    }
}

impl SubModel for Mlp {
    type Config = MlpConfig;
    type Input = Tensor;
    type Output = Tensor;

    fn forward_t(&self, x: &Self::Input, train: bool) -> Tensor {
        self.seq.forward_t(&x.to(self.device), train)
    }

    fn build(path: &nn::Path, config: Self::Config) -> Self {
        let device = path.device();
        let seq = Self::create_net(path, &config);

        Self { device, seq }
    }
}
