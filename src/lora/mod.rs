//! Low-rank adaptation of dense linear layers
//!
//! LoRA enables parameter-efficient fine-tuning by adding trainable low-rank
//! decomposition matrices to a frozen dense transform. The adapted layer
//! keeps the correction separate during training and folds it into the base
//! weight for inference.

mod config;
mod layer;
mod select;

pub use config::LoraConfig;
pub use layer::{LoraLinear, MergeState};
pub use select::mark_only_lora_as_trainable;
