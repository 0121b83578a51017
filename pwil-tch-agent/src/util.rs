//! Utilities.
use anyhow::Result;
use num_traits::cast::AsPrimitive;
use pwil_core::record::{Record, RecordValue};
use std::convert::TryFrom;
use tch::{nn::VarStore, Kind, Tensor};

/// Returns the mean and standard deviation of the parameters.
pub fn param_stats(var_store: &VarStore) -> Result<Record> {
    let mut record = Record::empty();

    for (k, v) in var_store.variables() {
        let m = f32::try_from(v.mean(Kind::Float))?;
        record.insert(format!("{}_mean", &k), RecordValue::Scalar(m));

        let s = f32::try_from(v.std(false))?;
        record.insert(format!("{}_std", k), RecordValue::Scalar(s));
    }

    Ok(record)
}

/// Converts a slice of numbers to a float tensor.
///
/// If `add_batch_dim` is `true`, a leading dimension of size 1 is added.
pub fn slice_to_tensor<T>(v: &[T], add_batch_dim: bool) -> Tensor
where
    T: AsPrimitive<f32>,
{
    let v = v.iter().map(|e| e.as_()).collect::<Vec<f32>>();
    let t = Tensor::from_slice(&v);

    match add_batch_dim {
        true => t.unsqueeze(0),
        false => t,
    }
}

/// Returns the elements of a tensor as a flat vector of `f32`.
pub fn to_vec_f32(t: &Tensor) -> Result<Vec<f32>> {
    Ok(Vec::<f32>::try_from(&t.to_kind(Kind::Float).flatten(0, -1))?)
}
