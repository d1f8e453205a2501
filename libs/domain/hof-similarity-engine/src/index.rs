//! The in-memory cosine vector index of spec §4.9: built once from every
//! stored embedding, packed into `usearch`'s native contiguous storage,
//! keyed by the embedding id parsed as a `u64` (spec §3's `FeatureEmbedding`).

use hof_domain_models::FeatureEmbedding;
use usearch::{Index, IndexOptions, MetricKind, ScalarKind};

use crate::errors::SimilarityError;

/// Builds a fresh index from every row currently in storage. Called exactly
/// once, behind [`crate::engine::SimilarityEngine`]'s lazy latch.
pub fn build(embeddings: &[FeatureEmbedding]) -> Result<Index, SimilarityError> {
    let dimensions = hof_domain_models::EMBEDDING_DIMENSIONS;

    let options = IndexOptions {
        dimensions,
        metric: MetricKind::Cos,
        quantization: ScalarKind::F32,
        connectivity: 0,
        expansion_add: 0,
        expansion_search: 0,
        multi: false,
    };

    let index = Index::new(&options).map_err(|err| SimilarityError::Index(err.to_string()))?;
    index
        .reserve(embeddings.len().max(1))
        .map_err(|err| SimilarityError::Index(err.to_string()))?;

    for embedding in embeddings {
        let key = embedding.index_key()?;
        index
            .add(key, &embedding.vector)
            .map_err(|err| SimilarityError::Index(err.to_string()))?;
    }

    Ok(index)
}

#[cfg(test)]
mod tests {
    use bson::oid::ObjectId;
    use hof_domain_models::EMBEDDING_DIMENSIONS;

    use super::*;

    fn unit_vector(hot: usize) -> Vec<f32> {
        let mut vector = vec![0.0; EMBEDDING_DIMENSIONS];
        vector[hot] = 1.0;
        vector
    }

    #[test]
    fn builds_an_empty_index_without_error() {
        let index = build(&[]).expect("empty index builds fine");
        assert_eq!(index.size(), 0);
    }

    #[test]
    fn finds_the_nearest_neighbour_by_cosine_distance() {
        let near_a = FeatureEmbedding::new(ObjectId::new(), unit_vector(0)).unwrap();
        let near_b = FeatureEmbedding::new(ObjectId::new(), unit_vector(1)).unwrap();
        let query_key = near_a.index_key().unwrap();

        let index = build(&[near_a.clone(), near_b]).expect("index builds");
        let matches = index.search(&near_a.vector, 2).expect("search succeeds");

        assert_eq!(matches.keys[0], query_key);
        assert!(matches.distances[0] < matches.distances[1]);
    }
}
