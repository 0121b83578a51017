//! Discriminator scoring states, optionally with actions.
mod base;
mod config;
pub use base::{Discriminator, MODEL_FILE, OPT_FILE};
pub use config::DiscriminatorConfig;
