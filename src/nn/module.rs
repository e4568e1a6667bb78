//! Parameter traversal seam
//!
//! A model is an arbitrary graph of named parameters; `Module` is the
//! minimal surface needed to walk it. Parameter names are dot-separated
//! (e.g. `"encoder.q_proj.lora_a"`).

use crate::tensor::Tensor;

/// Anything that exposes named parameters for traversal
pub trait Module {
    /// Visit every parameter with its qualified name
    fn visit_parameters(&mut self, prefix: &str, visitor: &mut dyn FnMut(&str, &mut Tensor));

    /// Collect cloned snapshots of all named parameters
    fn named_parameters(&mut self) -> Vec<(String, Tensor)> {
        let mut params = Vec::new();
        self.visit_parameters("", &mut |name, tensor| {
            params.push((name.to_string(), tensor.clone()));
        });
        params
    }

    /// Count parameters currently marked trainable
    fn num_trainable(&mut self) -> usize {
        let mut count = 0;
        self.visit_parameters("", &mut |_, tensor| {
            if tensor.requires_grad() {
                count += 1;
            }
        });
        count
    }
}

/// Join a prefix and a parameter name with a dot
pub fn qualify(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}
