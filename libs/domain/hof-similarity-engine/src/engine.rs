use std::sync::Arc;

use bson::oid::ObjectId;
use hof_domain_models::{index_key_to_id, FeatureEmbedding};
use hof_infra_blobstore::BlobStoreGateway;
use hof_infra_persistence::EmbeddingRepository;
use hof_infra_similarity_transport::WorkerChannel;
use tokio::sync::OnceCell;
use tracing::instrument;
use usearch::Index;

use crate::errors::SimilarityError;

/// Up to this many neighbours are ever returned by
/// [`SimilarityEngine::find_similar_screenshots`] (spec §4.9).
const MAX_RESULTS: usize = 20;

/// Where to source the raw image bytes for one embedding update: a blob
/// already uploaded to C2, or bytes the caller already has in hand (e.g.
/// the freshly-produced FHD buffer from an ingest in progress).
pub enum EmbeddingSource {
    Blob(String),
    Inline(Vec<u8>),
}

pub struct EmbeddingInput {
    pub screenshot_id: ObjectId,
    pub source: EmbeddingSource,
}

/// What to find neighbours of: an existing screenshot's stored embedding,
/// or a fresh image that hasn't been embedded yet.
pub enum SimilarityQuery {
    ScreenshotId(ObjectId),
    ImageBytes(Vec<u8>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarScreenshot {
    pub screenshot_id: ObjectId,
    pub distance: f32,
}

/// C9's engine half: embedding upsert/delete through the sidecar worker,
/// and a lazily-built cosine vector index for nearest-neighbour search.
pub struct SimilarityEngine {
    embeddings: EmbeddingRepository,
    blobs: BlobStoreGateway,
    worker: Arc<WorkerChannel>,
    index: OnceCell<Index>,
}

impl SimilarityEngine {
    pub fn new(
        embeddings: EmbeddingRepository,
        blobs: BlobStoreGateway,
        worker: Arc<WorkerChannel>,
    ) -> Self {
        Self {
            embeddings,
            blobs,
            worker,
            index: OnceCell::new(),
        }
    }

    /// Runs one inference batch across `inputs` and upserts the resulting
    /// embeddings. Only updates the vector index in place when it has
    /// already been materialised (spec §4.9) — an index nobody has queried
    /// yet will pick up the new rows on its first lazy build instead.
    #[instrument(skip(self, inputs))]
    pub async fn batch_update_embeddings(
        &self,
        batch_name: &str,
        inputs: Vec<EmbeddingInput>,
    ) -> Result<usize, SimilarityError> {
        if inputs.is_empty() {
            return Ok(0);
        }

        let mut buffers = Vec::with_capacity(inputs.len());
        for input in &inputs {
            let bytes = match &input.source {
                EmbeddingSource::Inline(bytes) => bytes.clone(),
                EmbeddingSource::Blob(name) => self.blobs.download_to_buffer(name).await?,
            };
            buffers.push(bytes);
        }

        tracing::debug!(batch = batch_name, count = inputs.len(), "requesting embeddings");
        let vectors = self.worker.request(buffers).await?;
        if vectors.len() != inputs.len() {
            return Err(SimilarityError::VectorCountMismatch {
                expected: inputs.len(),
                got: vectors.len(),
            });
        }

        let mut updated = 0;
        for (input, vector) in inputs.into_iter().zip(vectors.into_iter()) {
            let embedding = FeatureEmbedding::new(input.screenshot_id, vector)?;
            self.embeddings
                .upsert(input.screenshot_id, &embedding.id, embedding.vector.clone())
                .await?;

            if let Some(index) = self.index.get() {
                let key = embedding.index_key()?;
                let _ = index.remove(key);
                index
                    .add(key, &embedding.vector)
                    .map_err(|err| SimilarityError::Index(err.to_string()))?;
            }
            updated += 1;
        }

        Ok(updated)
    }

    /// Deletes the stored embedding for `screenshot_id`, and removes its key
    /// from the index if one has been built. A screenshot with no embedding
    /// row is a silent no-op (spec §4.10.2 deletes the embedding
    /// unconditionally as one step of a larger delete).
    #[instrument(skip(self))]
    pub async fn delete_embedding(&self, screenshot_id: ObjectId) -> Result<(), SimilarityError> {
        let Some(embedding) = self.embeddings.find_by_screenshot_id(screenshot_id).await? else {
            return Ok(());
        };

        self.embeddings.delete_by_screenshot_id(screenshot_id).await?;
        self.forget_index_entry(&embedding.id)
    }

    /// Removes `embedding_id`'s key from the index, if built. For callers
    /// that deleted the embedding row themselves (e.g. the screenshot
    /// engine's transactional delete, spec §4.10.2) and only need the index
    /// side effect applied afterwards.
    pub fn forget_index_entry(&self, embedding_id: &str) -> Result<(), SimilarityError> {
        if let Some(index) = self.index.get() {
            let key = hof_domain_models::embedding::parse_index_key(embedding_id)?;
            let _ = index.remove(key);
        }
        Ok(())
    }

    /// Up to [`MAX_RESULTS`] nearest neighbours under cosine distance,
    /// skipping the query itself and anything beyond `max_distance`
    /// (spec §4.9). Builds the index on first call if it hasn't been yet.
    #[instrument(skip(self))]
    pub async fn find_similar_screenshots(
        &self,
        query: SimilarityQuery,
        max_distance: f32,
    ) -> Result<Vec<SimilarScreenshot>, SimilarityError> {
        let index = self.ensure_index().await?;

        let (query_key, query_vector) = match query {
            SimilarityQuery::ScreenshotId(screenshot_id) => {
                let embedding = self
                    .embeddings
                    .find_by_screenshot_id(screenshot_id)
                    .await?
                    .ok_or(SimilarityError::NoEmbedding(screenshot_id))?;
                (Some(embedding.index_key()?), embedding.vector)
            }
            SimilarityQuery::ImageBytes(bytes) => {
                let mut vectors = self.worker.request(vec![bytes]).await?;
                let vector = vectors.pop().ok_or(SimilarityError::VectorCountMismatch {
                    expected: 1,
                    got: 0,
                })?;
                (None, vector)
            }
        };

        // Ask for one extra in case the query itself is a member of the index.
        let matches = index
            .search(&query_vector, MAX_RESULTS + 1)
            .map_err(|err| SimilarityError::Index(err.to_string()))?;

        let mut hits: Vec<(u64, f32)> = matches
            .keys
            .into_iter()
            .zip(matches.distances)
            .filter(|&(key, _)| Some(key) != query_key)
            .filter(|&(_, distance)| distance <= max_distance)
            .collect();
        hits.sort_by(|a, b| a.1.total_cmp(&b.1));
        hits.truncate(MAX_RESULTS);

        let mut results = Vec::with_capacity(hits.len());
        for (key, distance) in hits {
            let id = index_key_to_id(key);
            if let Some(embedding) = self.embeddings.find_by_id(&id).await? {
                results.push(SimilarScreenshot {
                    screenshot_id: embedding.screenshot_id,
                    distance,
                });
            }
        }
        Ok(results)
    }

    async fn ensure_index(&self) -> Result<&Index, SimilarityError> {
        self.index
            .get_or_try_init(|| async {
                let embeddings = self.embeddings.load_all().await?;
                crate::index::build(&embeddings)
            })
            .await
    }
}
