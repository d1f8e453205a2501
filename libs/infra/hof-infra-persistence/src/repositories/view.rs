use bson::doc;
use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use hof_domain_models::View;
use mongodb::options::FindOneAndUpdateOptions;
use mongodb::{ClientSession, Collection};
use tracing::instrument;
use uuid::Uuid;

use crate::client::MongoGateway;
use crate::errors::PersistenceError;

#[derive(Clone)]
pub struct ViewRepository {
    collection: Collection<View>,
}

impl ViewRepository {
    pub fn new(gateway: &MongoGateway) -> Self {
        Self {
            collection: gateway.collection("views"),
        }
    }

    /// Upserts `(screenshotId, creatorId)`, bumping `viewedAt` on a re-view.
    /// Returns `true` when the pair didn't exist before (a genuinely new
    /// view, which is what drives `uniqueViewsCount`).
    #[instrument(skip(self))]
    pub async fn upsert_viewed(
        &self,
        screenshot_id: ObjectId,
        creator_id: Uuid,
        viewed_at: DateTime<Utc>,
    ) -> Result<bool, PersistenceError> {
        let result = self
            .collection
            .find_one_and_update(
                doc! { "screenshotId": screenshot_id, "creatorId": creator_id.to_string() },
                doc! {
                    "$set": { "viewedAt": bson::DateTime::from_chrono(viewed_at) },
                    "$setOnInsert": {
                        "screenshotId": screenshot_id,
                        "creatorId": creator_id.to_string(),
                    },
                },
            )
            .with_options(
                FindOneAndUpdateOptions::builder()
                    .upsert(true)
                    .return_document(mongodb::options::ReturnDocument::Before)
                    .build(),
            )
            .await
            .map_err(PersistenceError::Query)?;

        Ok(result.is_none())
    }

    #[instrument(skip(self))]
    pub async fn screenshot_ids_viewed_by(
        &self,
        creator_id: Uuid,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<ObjectId>, PersistenceError> {
        let mut filter = doc! { "creatorId": creator_id.to_string() };
        if let Some(since) = since {
            filter.insert("viewedAt", doc! { "$gte": bson::DateTime::from_chrono(since) });
        }

        let mut cursor = self
            .collection
            .find(filter)
            .await
            .map_err(PersistenceError::Query)?;

        let mut ids = Vec::new();
        while let Some(view) = futures_util::TryStreamExt::try_next(&mut cursor)
            .await
            .map_err(PersistenceError::Query)?
        {
            ids.push(view.screenshot_id);
        }
        Ok(ids)
    }

    /// Every view row across `screenshot_ids`, for the merge operation
    /// (spec §4.10.5).
    #[instrument(skip(self))]
    pub async fn find_by_screenshot_ids(
        &self,
        screenshot_ids: &[ObjectId],
    ) -> Result<Vec<View>, PersistenceError> {
        let mut cursor = self
            .collection
            .find(doc! { "screenshotId": { "$in": screenshot_ids } })
            .await
            .map_err(PersistenceError::Query)?;

        let mut views = Vec::new();
        while let Some(view) = futures_util::TryStreamExt::try_next(&mut cursor)
            .await
            .map_err(PersistenceError::Query)?
        {
            views.push(view);
        }
        Ok(views)
    }

    /// Re-parents one view row to `screenshot_id` (merge, spec §4.10.5).
    #[instrument(skip(self))]
    pub async fn reparent(
        &self,
        id: ObjectId,
        screenshot_id: ObjectId,
    ) -> Result<(), PersistenceError> {
        self.collection
            .update_one(doc! { "_id": id }, doc! { "$set": { "screenshotId": screenshot_id } })
            .await
            .map_err(PersistenceError::Query)?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: ObjectId) -> Result<(), PersistenceError> {
        self.collection
            .delete_one(doc! { "_id": id })
            .await
            .map_err(PersistenceError::Query)?;
        Ok(())
    }

    /// Same as [`Self::reparent`], inside the merge transaction (spec §4.10.5).
    #[instrument(skip(self, session))]
    pub async fn reparent_in_session(
        &self,
        id: ObjectId,
        screenshot_id: ObjectId,
        session: &mut ClientSession,
    ) -> Result<(), PersistenceError> {
        self.collection
            .update_one(doc! { "_id": id }, doc! { "$set": { "screenshotId": screenshot_id } })
            .session(&mut *session)
            .await
            .map_err(PersistenceError::Query)?;
        Ok(())
    }

    /// Same as [`Self::delete`], inside the merge transaction (spec §4.10.5).
    #[instrument(skip(self, session))]
    pub async fn delete_in_session(
        &self,
        id: ObjectId,
        session: &mut ClientSession,
    ) -> Result<(), PersistenceError> {
        self.collection
            .delete_one(doc! { "_id": id })
            .session(&mut *session)
            .await
            .map_err(PersistenceError::Query)?;
        Ok(())
    }

    /// Same as [`Self::find_by_screenshot_ids`], inside the merge
    /// transaction (spec §4.10.5).
    #[instrument(skip(self, session))]
    pub async fn find_by_screenshot_ids_in_session(
        &self,
        screenshot_ids: &[ObjectId],
        session: &mut ClientSession,
    ) -> Result<Vec<View>, PersistenceError> {
        let mut cursor = self
            .collection
            .find(doc! { "screenshotId": { "$in": screenshot_ids } })
            .session(&mut *session)
            .await
            .map_err(PersistenceError::Query)?;

        let mut views = Vec::new();
        while let Some(view) = cursor
            .next(session)
            .await
            .transpose()
            .map_err(PersistenceError::Query)?
        {
            views.push(view);
        }
        Ok(views)
    }
}
