//! The model half of C9 (spec §4.9): decodes each image, resizes with
//! bilinear filtering to 480×480, normalises to 0..1, batches into
//! `[N,H,W,3]`, runs one forward pass, L2-normalises each output row.
//! `embed_batch` is deliberately synchronous and takes `&mut self` — the
//! spec requires the model call stay non-reentrant to avoid per-scope
//! tensor leaks in the underlying runtime, and the caller (the stdio loop
//! in `main.rs`) never invokes it concurrently with itself.

use std::path::Path;

use hof_domain_models::EMBEDDING_DIMENSIONS;
use image::imageops::FilterType;
use ndarray::Array4;
use ort::session::Session;
use ort::value::Value;
use thiserror::Error;

/// Square input resolution the model expects (spec §4.9).
const MODEL_INPUT_SIZE: u32 = 480;

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("failed to load model from {path}: {source}")]
    ModelLoad {
        path: String,
        #[source]
        source: ort::Error,
    },

    #[error("image {index} is not a decodable image: {source}")]
    InvalidImage {
        index: usize,
        #[source]
        source: image::ImageError,
    },

    #[error("model inference failed: {0}")]
    Inference(#[from] ort::Error),

    #[error("model produced {got} output rows for a batch of {expected}")]
    BatchSizeMismatch { expected: usize, got: usize },

    #[error("model output row has {got} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// Owns the loaded ONNX session for the feature-vector model. One instance
/// per worker process, constructed once at startup.
pub struct InferenceEngine {
    session: Session,
}

impl InferenceEngine {
    pub fn load(model_path: &Path) -> Result<Self, InferenceError> {
        let session = Session::builder()
            .and_then(|builder| builder.commit_from_file(model_path))
            .map_err(|source| InferenceError::ModelLoad {
                path: model_path.display().to_string(),
                source,
            })?;
        Ok(Self { session })
    }

    /// Runs one inference batch, returning one `EMBEDDING_DIMENSIONS`-long
    /// unit vector per input image, in input order.
    pub fn embed_batch(&mut self, images_data: &[Vec<u8>]) -> Result<Vec<Vec<f32>>, InferenceError> {
        let batch = decode_and_stack(images_data)?;
        let input = Value::from_array(batch)?;

        let outputs = self.session.run(ort::inputs![input])?;
        let (shape, data) = outputs[0].try_extract_raw_tensor::<f32>()?;

        let batch_size = images_data.len();
        let rows = shape.first().copied().unwrap_or(0) as usize;
        if rows != batch_size {
            return Err(InferenceError::BatchSizeMismatch {
                expected: batch_size,
                got: rows,
            });
        }

        let dims = shape.get(1).copied().unwrap_or(0) as usize;
        if dims != EMBEDDING_DIMENSIONS {
            return Err(InferenceError::DimensionMismatch {
                expected: EMBEDDING_DIMENSIONS,
                got: dims,
            });
        }

        let mut vectors = Vec::with_capacity(batch_size);
        for row in data.chunks_exact(dims) {
            vectors.push(l2_normalize(row));
        }
        Ok(vectors)
    }
}

fn decode_and_stack(images_data: &[Vec<u8>]) -> Result<Array4<f32>, InferenceError> {
    let size = MODEL_INPUT_SIZE as usize;
    let mut batch = Array4::<f32>::zeros((images_data.len(), size, size, 3));

    for (index, bytes) in images_data.iter().enumerate() {
        let decoded = image::load_from_memory(bytes)
            .map_err(|source| InferenceError::InvalidImage { index, source })?;
        let resized = decoded.resize_exact(MODEL_INPUT_SIZE, MODEL_INPUT_SIZE, FilterType::Triangle);
        let rgb = resized.to_rgb8();

        for (y, row) in rgb.rows().enumerate() {
            for (x, pixel) in row.enumerate() {
                for (channel, value) in pixel.0.iter().enumerate() {
                    batch[[index, y, x, channel]] = f32::from(*value) / 255.0;
                }
            }
        }
    }

    Ok(batch)
}

fn l2_normalize(row: &[f32]) -> Vec<f32> {
    let norm = row.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        return row.to_vec();
    }
    row.iter().map(|v| v / norm).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn l2_normalize_produces_a_unit_vector() {
        let normalized = l2_normalize(&[3.0, 4.0]);
        let norm = normalized.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn l2_normalize_of_an_all_zero_row_stays_zero() {
        assert_eq!(l2_normalize(&[0.0, 0.0, 0.0]), vec![0.0, 0.0, 0.0]);
    }
}
