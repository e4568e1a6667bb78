//! Model saving functionality

use super::format::{ModelFormat, SaveConfig};
use super::model::Model;
use crate::{Error, Result};
use safetensors::tensor::{Dtype, TensorView};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Save a model to a file
///
/// # Arguments
///
/// * `model` - The model to save
/// * `path` - Output file path
/// * `config` - Save configuration (format, options)
///
/// # Example
///
/// ```no_run
/// use adaptar::io::{save_model, Model, ModelFormat, ModelMetadata, SaveConfig};
/// use adaptar::Tensor;
///
/// let params = vec![
///     ("weight".to_string(), Tensor::from_vec(vec![1.0, 2.0], true)),
/// ];
/// let model = Model::new(ModelMetadata::new("my-adapter", "lora_linear"), params);
/// let config = SaveConfig::new(ModelFormat::Json);
///
/// save_model(&model, "adapter.json", &config).unwrap();
/// ```
pub fn save_model(model: &Model, path: impl AsRef<Path>, config: &SaveConfig) -> Result<()> {
    let path = path.as_ref();

    match config.format {
        ModelFormat::SafeTensors => save_safetensors(model, path),
        ModelFormat::Json => {
            let state = model.to_state();
            let data = if config.pretty {
                serde_json::to_string_pretty(&state)
                    .map_err(|e| Error::Serialization(format!("JSON serialization failed: {e}")))?
            } else {
                serde_json::to_string(&state)
                    .map_err(|e| Error::Serialization(format!("JSON serialization failed: {e}")))?
            };
            let mut file = File::create(path)?;
            file.write_all(data.as_bytes())?;
            Ok(())
        }
    }
}

/// Save model in SafeTensors format (HuggingFace compatible)
fn save_safetensors(model: &Model, path: &Path) -> Result<()> {
    // Collect tensor data with proper lifetime management
    let tensor_data: Vec<(String, Vec<u8>, Vec<usize>)> = model
        .parameters
        .iter()
        .map(|(name, tensor)| {
            let values: Vec<f32> = tensor.data().iter().copied().collect();
            let bytes: Vec<u8> = bytemuck::cast_slice(&values).to_vec();
            let shape = model.shape_of(name).unwrap_or_else(|| vec![tensor.len()]);
            (name.clone(), bytes, shape)
        })
        .collect();

    // Create TensorViews from collected data
    let views: Vec<(&str, TensorView<'_>)> = tensor_data
        .iter()
        .map(|(name, bytes, shape)| {
            let view = TensorView::new(Dtype::F32, shape.clone(), bytes)
                .map_err(|e| Error::Serialization(format!("Tensor view failed: {e}")))?;
            Ok((name.as_str(), view))
        })
        .collect::<Result<_>>()?;

    let metadata = model.metadata.to_string_map();

    let safetensor_bytes = safetensors::serialize(views, Some(metadata))
        .map_err(|e| Error::Serialization(format!("SafeTensors serialization failed: {e}")))?;

    std::fs::write(path, safetensor_bytes)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{Model, ModelMetadata};
    use crate::lora::LoraConfig;
    use crate::Tensor;
    use tempfile::NamedTempFile;

    fn adapter_params() -> Vec<(String, Tensor)> {
        vec![
            (
                "weight".to_string(),
                Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], false),
            ),
            (
                "lora_a".to_string(),
                Tensor::from_vec(vec![0.1, 0.2, 0.3], true),
            ),
            (
                "lora_b".to_string(),
                Tensor::from_vec(vec![0.0, 0.0], true),
            ),
        ]
    }

    #[test]
    fn test_save_model_json() {
        let model = Model::new(
            ModelMetadata::new("test-adapter", "lora_linear"),
            adapter_params(),
        );
        let config = SaveConfig::new(ModelFormat::Json);

        let temp_file = NamedTempFile::new().unwrap();
        save_model(&model, temp_file.path(), &config).unwrap();

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert!(!content.is_empty());
        assert!(content.contains("test-adapter"));
        assert!(content.contains("lora_a"));
    }

    #[test]
    fn test_save_model_json_pretty_vs_compact() {
        let model = Model::new(
            ModelMetadata::new("pretty-test", "linear"),
            vec![("w".to_string(), Tensor::from_vec(vec![1.0], false))],
        );

        let temp_pretty = NamedTempFile::new().unwrap();
        save_model(
            &model,
            temp_pretty.path(),
            &SaveConfig::new(ModelFormat::Json).with_pretty(true),
        )
        .unwrap();
        let pretty = std::fs::read_to_string(temp_pretty.path()).unwrap();
        assert!(pretty.contains('\n'));

        let temp_compact = NamedTempFile::new().unwrap();
        save_model(
            &model,
            temp_compact.path(),
            &SaveConfig::new(ModelFormat::Json).with_pretty(false),
        )
        .unwrap();
        let compact = std::fs::read_to_string(temp_compact.path()).unwrap();
        assert_eq!(compact.lines().count(), 1);
    }

    #[test]
    fn test_save_model_empty_params() {
        let model = Model::new(ModelMetadata::new("empty", "test"), vec![]);
        let config = SaveConfig::new(ModelFormat::Json);

        let temp_file = NamedTempFile::new().unwrap();
        save_model(&model, temp_file.path(), &config).unwrap();

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert!(content.contains("empty"));
    }

    #[test]
    fn test_save_model_invalid_path() {
        let model = Model::new(
            ModelMetadata::new("test", "test"),
            vec![("w".to_string(), Tensor::from_vec(vec![1.0], false))],
        );
        let config = SaveConfig::new(ModelFormat::Json);

        let result = save_model(&model, "/nonexistent/directory/model.json", &config);
        assert!(result.is_err());
    }

    #[test]
    fn test_save_model_safetensors() {
        let model = Model::new(
            ModelMetadata::new("safetensor-test", "lora_linear"),
            adapter_params(),
        );
        let config = SaveConfig::new(ModelFormat::SafeTensors);

        let temp_file = NamedTempFile::new().unwrap();
        save_model(&model, temp_file.path(), &config).unwrap();

        // SafeTensors files start with an 8-byte header length
        let content = std::fs::read(temp_file.path()).unwrap();
        assert!(content.len() > 8);
    }

    #[test]
    fn test_save_safetensors_can_be_loaded_back() {
        let model = Model::new(
            ModelMetadata::new("roundtrip-test", "lora_linear"),
            adapter_params(),
        )
        .with_shape("weight", vec![3, 2]);
        let config = SaveConfig::new(ModelFormat::SafeTensors);

        let temp_file = NamedTempFile::new().unwrap();
        save_model(&model, temp_file.path(), &config).unwrap();

        let data = std::fs::read(temp_file.path()).unwrap();
        let loaded = safetensors::SafeTensors::deserialize(&data).unwrap();

        let names = loaded.names();
        assert!(names.contains(&"weight"));
        assert!(names.contains(&"lora_a"));
        assert!(names.contains(&"lora_b"));

        // Registered logical shape survives
        let weight = loaded.tensor("weight").unwrap();
        assert_eq!(weight.shape(), &[3, 2]);
        let weight_data: &[f32] = bytemuck::cast_slice(weight.data());
        assert_eq!(weight_data, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_save_safetensors_adapter_metadata() {
        let meta = ModelMetadata::new("meta-model", "lora_linear")
            .with_adapter(LoraConfig::new(4, 8.0).unwrap(), true);
        let model = Model::new(
            meta,
            vec![("w".to_string(), Tensor::from_vec(vec![1.0], false))],
        );
        let config = SaveConfig::new(ModelFormat::SafeTensors);

        let temp_file = NamedTempFile::new().unwrap();
        save_model(&model, temp_file.path(), &config).unwrap();

        let data = std::fs::read(temp_file.path()).unwrap();
        let (_, st_metadata) = safetensors::SafeTensors::read_metadata(&data).unwrap();

        let metadata = st_metadata.metadata();
        let meta = metadata.as_ref().unwrap();
        assert_eq!(meta.get("name").unwrap(), "meta-model");
        assert_eq!(meta.get("lora_rank").unwrap(), "4");
        assert_eq!(meta.get("merged").unwrap(), "true");
    }

    #[test]
    fn test_save_safetensors_invalid_path() {
        let model = Model::new(
            ModelMetadata::new("test", "test"),
            vec![("w".to_string(), Tensor::from_vec(vec![1.0], false))],
        );
        let config = SaveConfig::new(ModelFormat::SafeTensors);

        let result = save_model(&model, "/nonexistent/directory/model.safetensors", &config);
        assert!(result.is_err());
    }
}
