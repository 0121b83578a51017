//! Types and traits for recording training metrics.
//!
//! Each phase of a training iteration returns a [`Record`], a key-value
//! container of [`RecordValue`]s. The records of both phases are merged by
//! [`NestedAlgorithm`](crate::NestedAlgorithm) and handed to an optional
//! [`Recorder`], the sink of an experiment-tracking backend.
//!
//! ```rust
//! use pwil_core::record::{Record, RecordValue};
//!
//! let mut record = Record::from_scalar("primal_wass_reward", -0.25);
//! record.insert("reward_mean", RecordValue::Scalar(0.1));
//! assert_eq!(record.get_scalar("primal_wass_reward").unwrap(), -0.25);
//! ```
mod base;
mod buffered_recorder;
mod recorder;

pub use base::{Record, RecordValue};
pub use buffered_recorder::BufferedRecorder;
pub use recorder::Recorder;
