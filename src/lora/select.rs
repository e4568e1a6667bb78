//! Trainable-parameter selection
//!
//! Before training, every parameter of the model is frozen except the
//! adapter factors, so gradient-based optimization touches only the
//! low-rank correction.

use crate::nn::Module;

/// Name fragments that identify adapter factor parameters
const FACTOR_MARKERS: [&str; 2] = ["lora_a", "lora_b"];

/// Freeze every parameter except the adapter factors
///
/// Walks the model's named parameters and sets `requires_grad = true`
/// exactly for names containing a factor marker, `false` for everything
/// else. Merge state and parameter values are untouched. Returns the model
/// for chaining.
pub fn mark_only_lora_as_trainable<M: Module + ?Sized>(model: &mut M) -> &mut M {
    model.visit_parameters("", &mut |name, param| {
        let trainable = FACTOR_MARKERS.iter().any(|marker| name.contains(marker));
        param.set_requires_grad(trainable);
    });
    model
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lora::{LoraConfig, LoraLinear};
    use crate::nn::{qualify, Linear};
    use crate::tensor::Tensor;

    /// Two-layer model: one adapted projection, one plain dense head
    struct TinyModel {
        proj: LoraLinear,
        head: Linear,
    }

    impl TinyModel {
        fn new() -> Self {
            let config = LoraConfig::new(4, 4.0).unwrap();
            Self {
                proj: LoraLinear::new(8, 8, true, &config).unwrap(),
                head: Linear::new(8, 2, true).unwrap(),
            }
        }
    }

    impl Module for TinyModel {
        fn visit_parameters(&mut self, prefix: &str, visitor: &mut dyn FnMut(&str, &mut Tensor)) {
            self.proj.visit_parameters(&qualify(prefix, "proj"), visitor);
            self.head.visit_parameters(&qualify(prefix, "head"), visitor);
        }
    }

    #[test]
    fn test_only_factors_trainable() {
        let mut model = TinyModel::new();
        mark_only_lora_as_trainable(&mut model);

        let mut trainable = Vec::new();
        let mut frozen = Vec::new();
        model.visit_parameters("", &mut |name, param| {
            if param.requires_grad() {
                trainable.push(name.to_string());
            } else {
                frozen.push(name.to_string());
            }
        });

        assert_eq!(trainable, vec!["proj.lora_a", "proj.lora_b"]);
        assert_eq!(
            frozen,
            vec!["proj.weight", "proj.bias", "head.weight", "head.bias"]
        );
    }

    #[test]
    fn test_exactly_two_trainable_tensors() {
        let mut model = TinyModel::new();
        mark_only_lora_as_trainable(&mut model);
        assert_eq!(model.num_trainable(), 2);
    }

    #[test]
    fn test_previously_trainable_weights_frozen() {
        let mut model = TinyModel::new();
        assert!(model.head.weight().requires_grad());

        mark_only_lora_as_trainable(&mut model);
        assert!(!model.head.weight().requires_grad());
        assert!(!model.proj.base().weight().requires_grad());
    }

    #[test]
    fn test_selection_is_idempotent() {
        let mut model = TinyModel::new();
        mark_only_lora_as_trainable(&mut model);
        mark_only_lora_as_trainable(&mut model);
        assert_eq!(model.num_trainable(), 2);
    }

    #[test]
    fn test_merge_state_and_values_untouched() {
        let mut model = TinyModel::new();
        let weight_before = model.proj.base().weight().data().to_owned();

        mark_only_lora_as_trainable(&mut model);

        assert!(!model.proj.is_merged());
        assert_eq!(model.proj.base().weight().data(), &weight_before);
    }

    #[test]
    fn test_model_without_adapters_fully_frozen() {
        let mut head = Linear::new(4, 2, true).unwrap();
        mark_only_lora_as_trainable(&mut head);
        assert_eq!(head.num_trainable(), 0);
    }
}
