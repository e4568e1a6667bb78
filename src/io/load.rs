//! Model loading functionality

use super::format::ModelFormat;
use super::model::{Model, ModelMetadata, ModelState};
use crate::{Error, Result, Tensor};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Load a model from a file
///
/// The format is automatically detected from the file extension.
///
/// # Example
///
/// ```no_run
/// use adaptar::io::load_model;
///
/// let model = load_model("adapter.safetensors").unwrap();
/// println!("Loaded model: {}", model.metadata.name);
/// ```
pub fn load_model(path: impl AsRef<Path>) -> Result<Model> {
    let path = path.as_ref();

    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::Serialization("File has no extension".to_string()))?;

    let format = ModelFormat::from_extension(ext)
        .ok_or_else(|| Error::Serialization(format!("Unsupported file extension: {ext}")))?;

    if format == ModelFormat::SafeTensors {
        return load_safetensors(path);
    }

    let mut file = File::open(path)?;
    let mut content = String::new();
    file.read_to_string(&mut content)?;

    let state: ModelState = serde_json::from_str(&content)
        .map_err(|e| Error::Serialization(format!("JSON deserialization failed: {e}")))?;

    Ok(Model::from_state(state))
}

/// Load model from SafeTensors format (HuggingFace compatible)
fn load_safetensors(path: &Path) -> Result<Model> {
    let data = std::fs::read(path)
        .map_err(|e| Error::Serialization(format!("Failed to read file: {e}")))?;

    let (_, st_metadata) = safetensors::SafeTensors::read_metadata(&data)
        .map_err(|e| Error::Serialization(format!("SafeTensors parsing failed: {e}")))?;

    let custom_meta = st_metadata.metadata();
    let metadata = ModelMetadata::from_string_map(custom_meta.as_ref());

    let safetensors = safetensors::SafeTensors::deserialize(&data)
        .map_err(|e| Error::Serialization(format!("SafeTensors parsing failed: {e}")))?;

    // SafeTensors carries no trainability flag; everything loads frozen and
    // callers re-run the selector afterwards
    let mut parameters = Vec::new();
    let mut shapes = Vec::new();
    for name in safetensors.names() {
        let tensor_view = safetensors
            .tensor(name)
            .map_err(|e| Error::Serialization(format!("Missing tensor {name}: {e}")))?;
        let values: &[f32] = bytemuck::cast_slice(tensor_view.data());
        shapes.push((name.to_string(), tensor_view.shape().to_vec()));
        parameters.push((name.to_string(), Tensor::from_vec(values.to_vec(), false)));
    }

    let mut model = Model::new(metadata, parameters);
    for (name, shape) in shapes {
        model = model.with_shape(&name, shape);
    }
    Ok(model)
}
