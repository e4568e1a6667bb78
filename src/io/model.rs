//! Model structure for serialization

use crate::lora::LoraConfig;
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metadata describing a saved parameter set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Model name/identifier
    pub name: String,

    /// Architecture tag (e.g. "lora_linear", "mlp")
    pub architecture: String,

    /// Format version
    pub version: String,

    /// Adapter hyper-parameters, when the checkpoint carries LoRA factors
    pub adapter: Option<LoraConfig>,

    /// Whether the correction was folded into the weights at save time
    pub merged: Option<bool>,

    /// Custom metadata fields
    pub custom: HashMap<String, serde_json::Value>,
}

impl ModelMetadata {
    /// Create new metadata with minimal fields
    pub fn new(name: impl Into<String>, architecture: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            architecture: architecture.into(),
            version: "0.1.0".to_string(),
            adapter: None,
            merged: None,
            custom: HashMap::new(),
        }
    }

    /// Record the adapter configuration and merge state of the checkpoint
    pub fn with_adapter(mut self, config: LoraConfig, merged: bool) -> Self {
        self.adapter = Some(config);
        self.merged = Some(merged);
        self
    }

    /// Add custom metadata field
    pub fn with_custom(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.custom.insert(key.into(), value);
        self
    }

    /// Flatten into the string map SafeTensors metadata supports
    pub(crate) fn to_string_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("name".to_string(), self.name.clone());
        map.insert("architecture".to_string(), self.architecture.clone());
        map.insert("version".to_string(), self.version.clone());
        if let Some(config) = &self.adapter {
            map.insert("lora_rank".to_string(), config.rank.to_string());
            map.insert("lora_alpha".to_string(), config.alpha.to_string());
            map.insert("lora_dropout".to_string(), config.dropout.to_string());
        }
        if let Some(merged) = self.merged {
            map.insert("merged".to_string(), merged.to_string());
        }
        map
    }

    /// Rebuild from a SafeTensors metadata map
    pub(crate) fn from_string_map(map: Option<&HashMap<String, String>>) -> Self {
        let get = |key: &str| map.and_then(|m| m.get(key).cloned());

        let mut metadata = Self::new(
            get("name").unwrap_or_else(|| "unknown".to_string()),
            get("architecture").unwrap_or_else(|| "unknown".to_string()),
        );
        if let Some(version) = get("version") {
            metadata.version = version;
        }

        let rank = get("lora_rank").and_then(|v| v.parse::<usize>().ok());
        let alpha = get("lora_alpha").and_then(|v| v.parse::<f32>().ok());
        if let (Some(rank), Some(alpha)) = (rank, alpha) {
            let dropout = get("lora_dropout")
                .and_then(|v| v.parse::<f32>().ok())
                .unwrap_or(0.0);
            metadata.adapter = Some(LoraConfig {
                rank,
                alpha,
                dropout,
            });
        }
        metadata.merged = get("merged").and_then(|v| v.parse::<bool>().ok());

        metadata
    }
}

/// Information about a saved parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterInfo {
    /// Parameter name (e.g. "q_proj.lora_a")
    pub name: String,

    /// Logical shape; `[len]` when no richer shape was registered
    pub shape: Vec<usize>,

    /// Data type (currently always "f32")
    pub dtype: String,

    /// Whether this parameter requires gradients
    pub requires_grad: bool,
}

/// Serializable model state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelState {
    /// Model metadata
    pub metadata: ModelMetadata,

    /// Parameter information
    pub parameters: Vec<ParameterInfo>,

    /// Flattened parameter data
    pub data: Vec<f32>,
}

/// High-level model abstraction for I/O
#[derive(Clone)]
pub struct Model {
    /// Model metadata
    pub metadata: ModelMetadata,

    /// Model parameters
    pub parameters: Vec<(String, Tensor)>,

    /// Logical shapes registered per parameter name
    shapes: HashMap<String, Vec<usize>>,
}

impl Model {
    /// Create a new model
    pub fn new(metadata: ModelMetadata, parameters: Vec<(String, Tensor)>) -> Self {
        Self {
            metadata,
            parameters,
            shapes: HashMap::new(),
        }
    }

    /// Register the logical shape of a parameter
    ///
    /// The product of the dimensions must match the parameter's flat length.
    pub fn with_shape(mut self, name: &str, shape: Vec<usize>) -> Self {
        if let Some(tensor) = self.get_parameter(name) {
            assert_eq!(
                shape.iter().product::<usize>(),
                tensor.len(),
                "Shape {shape:?} does not cover parameter {name}"
            );
            self.shapes.insert(name.to_string(), shape);
        }
        self
    }

    /// Logical shape of a parameter: registered shape, or `[len]`
    pub fn shape_of(&self, name: &str) -> Option<Vec<usize>> {
        let tensor = self.get_parameter(name)?;
        Some(
            self.shapes
                .get(name)
                .cloned()
                .unwrap_or_else(|| vec![tensor.len()]),
        )
    }

    /// Get parameter by name
    pub fn get_parameter(&self, name: &str) -> Option<&Tensor> {
        self.parameters
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t)
    }

    /// Get mutable parameter by name
    pub fn get_parameter_mut(&mut self, name: &str) -> Option<&mut Tensor> {
        self.parameters
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t)
    }

    /// Convert model to serializable state
    pub fn to_state(&self) -> ModelState {
        let mut data = Vec::new();
        let parameters: Vec<ParameterInfo> = self
            .parameters
            .iter()
            .map(|(name, tensor)| {
                let shape = self
                    .shapes
                    .get(name)
                    .cloned()
                    .unwrap_or_else(|| vec![tensor.len()]);
                data.extend(tensor.data().iter().copied());

                ParameterInfo {
                    name: name.clone(),
                    shape,
                    dtype: "f32".to_string(),
                    requires_grad: tensor.requires_grad(),
                }
            })
            .collect();

        ModelState {
            metadata: self.metadata.clone(),
            parameters,
            data,
        }
    }

    /// Create model from serializable state
    pub fn from_state(state: ModelState) -> Self {
        let mut data_offset = 0;
        let mut shapes = HashMap::new();
        let parameters: Vec<(String, Tensor)> = state
            .parameters
            .into_iter()
            .map(|param_info| {
                let size: usize = param_info.shape.iter().product();
                let param_data = state.data[data_offset..data_offset + size].to_vec();
                data_offset += size;

                shapes.insert(param_info.name.clone(), param_info.shape);
                let tensor = Tensor::from_vec(param_data, param_info.requires_grad);
                (param_info.name, tensor)
            })
            .collect();

        Self {
            metadata: state.metadata,
            parameters,
            shapes,
        }
    }
}
