use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use typeshare::typeshare;

use crate::errors::CoreError;

/// Dimensionality of the feature vectors produced by the similarity worker's
/// model (spec §4.9) and indexed by `hof-similarity-engine`.
pub const EMBEDDING_DIMENSIONS: usize = 1280;

/// A stored feature vector for a screenshot. `id` is the screenshot's
/// [`ObjectId`] rendered as a 16-hex-character string so it doubles as the
/// u64 key the in-memory vector index uses internally (spec §4.9).
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureEmbedding {
    #[serde(rename = "_id")]
    pub id: String,

    pub screenshot_id: ObjectId,
    pub vector: Vec<f32>,
}

impl FeatureEmbedding {
    pub fn new(screenshot_id: ObjectId, vector: Vec<f32>) -> Result<Self, CoreError> {
        if vector.len() != EMBEDDING_DIMENSIONS {
            return Err(CoreError::Internal(format!(
                "expected a {EMBEDDING_DIMENSIONS}-dimension embedding, got {}",
                vector.len()
            )));
        }
        Ok(Self {
            id: object_id_to_index_key(&screenshot_id),
            screenshot_id,
            vector,
        })
    }

    /// The index key this embedding is stored under in the similarity
    /// engine's vector index.
    pub fn index_key(&self) -> Result<u64, CoreError> {
        parse_index_key(&self.id)
    }
}

/// An [`ObjectId`]'s 12 bytes, truncated to its low 8 bytes, as a u64 —
/// the key type `usearch` indexes on.
pub fn object_id_to_index_key(id: &ObjectId) -> String {
    hex::encode(&id.bytes()[4..12])
}

pub fn parse_index_key(key: &str) -> Result<u64, CoreError> {
    let bytes = hex::decode(key)
        .map_err(|err| CoreError::Internal(format!("malformed embedding id {key}: {err}")))?;
    if bytes.len() != 8 {
        return Err(CoreError::Internal(format!(
            "embedding id {key} does not decode to 8 bytes"
        )));
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes);
    Ok(u64::from_be_bytes(buf))
}

/// The inverse of [`parse_index_key`]: turns a vector index key back into
/// the 16-hex `FeatureEmbedding::id` it was parsed from, so a search hit
/// (only ever a bare `u64` key) can be resolved back to its stored row.
pub fn index_key_to_id(key: u64) -> String {
    hex::encode(key.to_be_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_dimension_vector() {
        let result = FeatureEmbedding::new(ObjectId::new(), vec![0.0; 4]);
        assert!(result.is_err());
    }

    #[test]
    fn index_key_roundtrips_through_hex() {
        let embedding = FeatureEmbedding::new(ObjectId::new(), vec![0.0; EMBEDDING_DIMENSIONS])
            .expect("valid embedding");
        let key = embedding.index_key().expect("parseable key");
        assert_eq!(parse_index_key(&embedding.id).unwrap(), key);
    }

    #[test]
    fn index_key_to_id_reverses_parse_index_key() {
        let embedding = FeatureEmbedding::new(ObjectId::new(), vec![0.0; EMBEDDING_DIMENSIONS])
            .expect("valid embedding");
        let key = embedding.index_key().expect("parseable key");
        assert_eq!(index_key_to_id(key), embedding.id);
    }
}
