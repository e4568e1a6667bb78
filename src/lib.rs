//! # Adaptar: Low-Rank Adaptation for Linear Layers
//!
//! Adaptar provides LoRA (Low-Rank Adaptation) building blocks for
//! parameter-efficient fine-tuning: a dense linear layer augmented with a
//! trainable low-rank correction, merge/unmerge between training and
//! inference representations, and selective freezing of everything except
//! the adapter factors.
//!
//! ## Architecture
//!
//! - **tensor**: Parameter tensors with gradient bookkeeping and flat-storage
//!   matrix kernels
//! - **nn**: Dense linear layer, dropout, initializers, and the `Module`
//!   parameter-traversal trait
//! - **lora**: Adapted layer, configuration, and trainable-parameter
//!   selection
//! - **io**: Model saving and loading (JSON, SafeTensors formats)

pub mod io;
pub mod lora;
pub mod nn;
pub mod tensor;

pub mod error;

// Re-export commonly used types
pub use error::{Error, Result};
pub use lora::{mark_only_lora_as_trainable, LoraConfig, LoraLinear};
pub use nn::{Linear, Module};
pub use tensor::Tensor;
