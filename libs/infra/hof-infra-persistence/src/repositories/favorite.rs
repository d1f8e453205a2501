use bson::doc;
use bson::oid::ObjectId;
use hof_domain_models::Favorite;
use mongodb::{ClientSession, Collection};
use tracing::instrument;
use uuid::Uuid;

use crate::client::MongoGateway;
use crate::errors::PersistenceError;

#[derive(Clone)]
pub struct FavoriteRepository {
    collection: Collection<Favorite>,
}

impl FavoriteRepository {
    pub fn new(gateway: &MongoGateway) -> Self {
        Self {
            collection: gateway.collection("favorites"),
        }
    }

    /// Any favorite row matching the OR-of-identity rule (spec §4.7) for
    /// this screenshot.
    #[instrument(skip(self, ips, hwids))]
    pub async fn find_by_identity(
        &self,
        screenshot_id: ObjectId,
        creator_id: Uuid,
        ips: &[String],
        hwids: &[String],
    ) -> Result<Option<Favorite>, PersistenceError> {
        self.collection
            .find_one(doc! {
                "screenshotId": screenshot_id,
                "$or": [
                    { "creatorId": creator_id.to_string() },
                    { "hwid": { "$in": hwids } },
                    { "ip": { "$in": ips } },
                ],
            })
            .await
            .map_err(PersistenceError::Query)
    }

    #[instrument(skip(self, favorite))]
    pub async fn insert(&self, favorite: &Favorite) -> Result<ObjectId, PersistenceError> {
        let result = self
            .collection
            .insert_one(favorite)
            .await
            .map_err(PersistenceError::Query)?;
        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| PersistenceError::NotFound("missing inserted _id".to_string()))
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: ObjectId) -> Result<(), PersistenceError> {
        let result = self
            .collection
            .delete_one(doc! { "_id": id })
            .await
            .map_err(PersistenceError::Query)?;
        if result.deleted_count == 0 {
            return Err(PersistenceError::NotFound(id.to_hex()));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn count_for_screenshot(
        &self,
        screenshot_id: ObjectId,
    ) -> Result<u64, PersistenceError> {
        self.collection
            .count_documents(doc! { "screenshotId": screenshot_id })
            .await
            .map_err(PersistenceError::Query)
    }

    /// Every favorite row across `screenshot_ids`, for the merge operation
    /// (spec §4.10.5).
    #[instrument(skip(self))]
    pub async fn find_by_screenshot_ids(
        &self,
        screenshot_ids: &[ObjectId],
    ) -> Result<Vec<Favorite>, PersistenceError> {
        let mut cursor = self
            .collection
            .find(doc! { "screenshotId": { "$in": screenshot_ids } })
            .await
            .map_err(PersistenceError::Query)?;

        let mut favorites = Vec::new();
        while let Some(favorite) = futures_util::TryStreamExt::try_next(&mut cursor)
            .await
            .map_err(PersistenceError::Query)?
        {
            favorites.push(favorite);
        }
        Ok(favorites)
    }

    /// Re-parents one favorite row to `screenshot_id` (merge, spec §4.10.5).
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
    /// transaction so the read observes the same snapshot the subsequent
    /// writes commit against (spec §4.10.5).
    #[instrument(skip(self, session))]
    pub async fn find_by_screenshot_ids_in_session(
        &self,
        screenshot_ids: &[ObjectId],
        session: &mut ClientSession,
    ) -> Result<Vec<Favorite>, PersistenceError> {
        let mut cursor = self
            .collection
            .find(doc! { "screenshotId": { "$in": screenshot_ids } })
            .session(&mut *session)
            .await
            .map_err(PersistenceError::Query)?;

        let mut favorites = Vec::new();
        while let Some(favorite) = cursor
            .next(session)
            .await
            .transpose()
            .map_err(PersistenceError::Query)?
        {
            favorites.push(favorite);
        }
        Ok(favorites)
    }
}
