use bson::doc;
use bson::oid::ObjectId;
use hof_domain_models::FeatureEmbedding;
use mongodb::options::FindOneAndUpdateOptions;
use mongodb::{ClientSession, Collection};
use tracing::instrument;

use crate::client::MongoGateway;
use crate::errors::PersistenceError;

#[derive(Clone)]
pub struct EmbeddingRepository {
    collection: Collection<FeatureEmbedding>,
}

impl EmbeddingRepository {
    pub fn new(gateway: &MongoGateway) -> Self {
        Self {
            collection: gateway.collection("embeddings"),
        }
    }

    #[instrument(skip(self, vector))]
    pub async fn upsert(
        &self,
        screenshot_id: ObjectId,
        id: &str,
        vector: Vec<f32>,
    ) -> Result<(), PersistenceError> {
        self.collection
            .find_one_and_update(
                doc! { "screenshotId": screenshot_id },
                doc! {
                    "$set": { "vector": vector },
                    "$setOnInsert": { "_id": id, "screenshotId": screenshot_id },
                },
            )
            .with_options(FindOneAndUpdateOptions::builder().upsert(true).build())
            .await
            .map_err(PersistenceError::Query)?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete_by_screenshot_id(
        &self,
        screenshot_id: ObjectId,
    ) -> Result<(), PersistenceError> {
        self.collection
            .delete_one(doc! { "screenshotId": screenshot_id })
            .await
            .map_err(PersistenceError::Query)?;
        Ok(())
    }

    /// Same as [`Self::delete_by_screenshot_id`], but inside the screenshot
    /// delete transaction (spec §4.10.2) so the embedding row and the
    /// screenshot row vanish atomically.
    #[instrument(skip(self, session))]
    pub async fn delete_by_screenshot_id_in_session(
        &self,
        screenshot_id: ObjectId,
        session: &mut ClientSession,
    ) -> Result<(), PersistenceError> {
        self.collection
            .delete_one(doc! { "screenshotId": screenshot_id })
            .session(&mut *session)
            .await
            .map_err(PersistenceError::Query)?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn find_by_screenshot_id(
        &self,
        screenshot_id: ObjectId,
    ) -> Result<Option<FeatureEmbedding>, PersistenceError> {
        self.collection
            .find_one(doc! { "screenshotId": screenshot_id })
            .await
            .map_err(PersistenceError::Query)
    }

    #[instrument(skip(self))]
    pub async fn find_by_id(
        &self,
        id: &str,
    ) -> Result<Option<FeatureEmbedding>, PersistenceError> {
        self.collection
            .find_one(doc! { "_id": id })
            .await
            .map_err(PersistenceError::Query)
    }

    /// Loads every stored embedding, for the similarity engine's lazy
    /// one-time index build (spec §4.9).
    #[instrument(skip(self))]
    pub async fn load_all(&self) -> Result<Vec<FeatureEmbedding>, PersistenceError> {
        let mut cursor = self
            .collection
            .find(doc! {})
            .await
            .map_err(PersistenceError::Query)?;

        let mut embeddings = Vec::new();
        while let Some(embedding) = futures_util::TryStreamExt::try_next(&mut cursor)
            .await
            .map_err(PersistenceError::Query)?
        {
            embeddings.push(embedding);
        }
        Ok(embeddings)
    }

    #[instrument(skip(self))]
    pub async fn find_screenshot_ids(
        &self,
        ids: &[String],
    ) -> Result<Vec<FeatureEmbedding>, PersistenceError> {
        let mut cursor = self
            .collection
            .find(doc! { "_id": { "$in": ids } })
            .await
            .map_err(PersistenceError::Query)?;

        let mut embeddings = Vec::new();
        while let Some(embedding) = futures_util::TryStreamExt::try_next(&mut cursor)
            .await
            .map_err(PersistenceError::Query)?
        {
            embeddings.push(embedding);
        }
        Ok(embeddings)
    }
}
