use bson::oid::ObjectId;
use bson::{doc, Document};
use chrono::{DateTime, Utc};
use hof_domain_models::screenshot::BlobNames;
use hof_domain_models::Screenshot;
use mongodb::options::FindOptions;
use mongodb::{ClientSession, Collection};
use tracing::instrument;
use uuid::Uuid;

use crate::aggregation::run_aggregation;
use crate::client::MongoGateway;
use crate::errors::PersistenceError;
use crate::repositories::creator::is_duplicate_key_error;

#[derive(Clone)]
pub struct ScreenshotRepository {
    collection: Collection<Screenshot>,
}

impl ScreenshotRepository {
    pub fn new(gateway: &MongoGateway) -> Self {
        Self {
            collection: gateway.collection("screenshots"),
        }
    }

    /// The raw `Document`-typed view of the same collection, for the
    /// server-side aggregation pipelines the selection algorithms (§4.10.4)
    /// and the stats reconciler (§4.8) build directly.
    pub fn raw_collection(&self) -> Collection<Document> {
        self.collection.clone_with_type()
    }

    #[instrument(skip(self, screenshot, session))]
    pub async fn insert_in_session(
        &self,
        screenshot: &Screenshot,
        session: &mut ClientSession,
    ) -> Result<ObjectId, PersistenceError> {
        let result = self
            .collection
            .insert_one(screenshot)
            .session(&mut *session)
            .await
            .map_err(PersistenceError::Query)?;

        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| PersistenceError::NotFound("missing inserted _id".to_string()))
    }

    #[instrument(skip(self, session))]
    pub async fn set_blobs_in_session(
        &self,
        id: ObjectId,
        blobs: &BlobNames,
        session: &mut ClientSession,
    ) -> Result<(), PersistenceError> {
        let update = bson::to_document(blobs).map_err(PersistenceError::Encoding)?;
        let result = self
            .collection
            .update_one(doc! { "_id": id }, doc! { "$set": { "blobs": update } })
            .session(&mut *session)
            .await
            .map_err(PersistenceError::Query)?;

        if result.matched_count == 0 {
            return Err(PersistenceError::NotFound(id.to_hex()));
        }
        Ok(())
    }

    #[instrument(skip(self, session))]
    pub async fn delete_in_session(
        &self,
        id: ObjectId,
        session: &mut ClientSession,
    ) -> Result<(), PersistenceError> {
        let result = self
            .collection
            .delete_one(doc! { "_id": id })
            .session(&mut *session)
            .await
            .map_err(PersistenceError::Query)?;

        if result.deleted_count == 0 {
            return Err(PersistenceError::NotFound(id.to_hex()));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn find_by_id(&self, id: ObjectId) -> Result<Option<Screenshot>, PersistenceError> {
        self.collection
            .find_one(doc! { "_id": id })
            .await
            .map_err(PersistenceError::Query)
    }

    /// Count of screenshots created by this identity within the last 24
    /// hours, for the upload quota check (spec §4.10.1 step 1).
    ///
    /// The `ip` clause intentionally matches against `known_hwids`, not
    /// `known_ips` — a long-standing quirk of the upload-quota check,
    /// preserved rather than silently corrected.
    #[instrument(skip(self, known_ips, known_hwids))]
    pub async fn count_recent_uploads(
        &self,
        creator_id: Uuid,
        known_ips: &[String],
        known_hwids: &[String],
        since: DateTime<Utc>,
    ) -> Result<u64, PersistenceError> {
        let _ = known_ips;
        let filter = doc! {
            "createdAt": { "$gte": bson::DateTime::from_chrono(since) },
            "$or": [
                { "creatorId": creator_id.to_string() },
                { "hwid": { "$in": known_hwids } },
                { "ip": { "$in": known_hwids } },
            ],
        };
        self.collection
            .count_documents(filter)
            .await
            .map_err(PersistenceError::Query)
    }

    /// The creation time of the oldest screenshot within the quota window,
    /// used to compute `not_before` on a rate-limit refusal. Same `ip`-vs-
    /// `known_hwids` quirk as [`Self::count_recent_uploads`].
    #[instrument(skip(self, known_ips, known_hwids))]
    pub async fn oldest_recent_upload_at(
        &self,
        creator_id: Uuid,
        known_ips: &[String],
        known_hwids: &[String],
        since: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, PersistenceError> {
        let _ = known_ips;
        let filter = doc! {
            "createdAt": { "$gte": bson::DateTime::from_chrono(since) },
            "$or": [
                { "creatorId": creator_id.to_string() },
                { "hwid": { "$in": known_hwids } },
                { "ip": { "$in": known_hwids } },
            ],
        };
        let options = mongodb::options::FindOneOptions::builder()
            .sort(doc! { "createdAt": 1 })
            .build();
        let oldest = self
            .collection
            .find_one(filter)
            .with_options(options)
            .await
            .map_err(PersistenceError::Query)?;
        Ok(oldest.map(|screenshot| screenshot.created_at))
    }

    #[instrument(skip(self))]
    pub async fn mark_reported(
        &self,
        id: ObjectId,
        reporter_creator_id: Uuid,
    ) -> Result<(), PersistenceError> {
        let result = self
            .collection
            .update_one(
                doc! { "_id": id, "isApproved": false },
                doc! { "$set": { "isReported": true, "reportedById": reporter_creator_id.to_string() } },
            )
            .await
            .map_err(PersistenceError::Query)?;

        if result.matched_count == 0 {
            return Err(PersistenceError::NotFound(id.to_hex()));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn unmark_reported(&self, id: ObjectId) -> Result<(), PersistenceError> {
        let result = self
            .collection
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "isApproved": true, "isReported": false }, "$unset": { "reportedById": "" } },
            )
            .await
            .map_err(PersistenceError::Query)?;

        if result.matched_count == 0 {
            return Err(PersistenceError::NotFound(id.to_hex()));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn increment_views_count(&self, id: ObjectId) -> Result<(), PersistenceError> {
        self.collection
            .update_one(doc! { "_id": id }, doc! { "$inc": { "viewsCount": 1 } })
            .await
            .map_err(PersistenceError::Query)?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn increment_favorites_count(
        &self,
        id: ObjectId,
        delta: i32,
    ) -> Result<(), PersistenceError> {
        self.collection
            .update_one(doc! { "_id": id }, doc! { "$inc": { "favoritesCount": delta } })
            .await
            .map_err(PersistenceError::Query)?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn set_counters(
        &self,
        id: ObjectId,
        views_count: u32,
        unique_views_count: u32,
        favorites_count: u32,
        favoriting_percentage: u32,
    ) -> Result<(), PersistenceError> {
        self.collection
            .update_one(
                doc! { "_id": id },
                doc! { "$set": {
                    "viewsCount": views_count,
                    "uniqueViewsCount": unique_views_count,
                    "favoritesCount": favorites_count,
                    "favoritingPercentage": favoriting_percentage,
                } },
            )
            .await
            .map_err(PersistenceError::Query)?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn set_per_day_averages(
        &self,
        id: ObjectId,
        views_per_day: f64,
        favorites_per_day: f64,
        favoriting_percentage: u32,
    ) -> Result<(), PersistenceError> {
        self.collection
            .update_one(
                doc! { "_id": id },
                doc! { "$set": {
                    "viewsPerDay": views_per_day,
                    "favoritesPerDay": favorites_per_day,
                    "favoritingPercentage": favoriting_percentage,
                } },
            )
            .await
            .map_err(PersistenceError::Query)?;
        Ok(())
    }

    pub fn duplicate_key(err: &mongodb::error::Error) -> bool {
        is_duplicate_key_error(err)
    }

    /// Uniform sample of one non-reported screenshot, for the `random`
    /// selection algorithm (spec §4.10.4).
    #[instrument(skip(self, exclude_ids))]
    pub async fn sample_random(
        &self,
        exclude_ids: &[ObjectId],
    ) -> Result<Option<Screenshot>, PersistenceError> {
        let pipeline = vec![
            doc! { "$match": { "isReported": false, "_id": { "$nin": exclude_ids } } },
            doc! { "$sample": { "size": 1 } },
        ];
        let mut rows: Vec<Screenshot> = run_aggregation(&self.raw_collection(), pipeline).await?;
        Ok(rows.pop())
    }

    /// The top `limit` non-reported, non-excluded screenshots matching
    /// `extra_filter`, sorted by `sort` — the shared shape behind the
    /// `trending`/`recent`/`archeologist` algorithms of spec §4.10.4, which
    /// uniform-sample one of these in application code afterwards.
    #[instrument(skip(self, extra_filter, sort, exclude_ids))]
    pub async fn top_candidates(
        &self,
        mut extra_filter: Document,
        sort: Document,
        exclude_ids: &[ObjectId],
        limit: i64,
    ) -> Result<Vec<Screenshot>, PersistenceError> {
        extra_filter.insert("isReported", false);
        extra_filter.insert("_id", doc! { "$nin": exclude_ids });

        let options = FindOptions::builder().sort(sort).limit(limit).build();
        let mut cursor = self
            .collection
            .find(extra_filter)
            .with_options(options)
            .await
            .map_err(PersistenceError::Query)?;

        let mut rows = Vec::new();
        while let Some(row) = futures_util::TryStreamExt::try_next(&mut cursor)
            .await
            .map_err(PersistenceError::Query)?
        {
            rows.push(row);
        }
        Ok(rows)
    }

    /// The oldest, least-viewed non-reported screenshot by `creator_id` —
    /// the tail end of the `supporter` algorithm once a supporter creator
    /// has been chosen (spec §4.10.4).
    #[instrument(skip(self))]
    pub async fn oldest_least_viewed_by_creator(
        &self,
        creator_id: Uuid,
    ) -> Result<Option<Screenshot>, PersistenceError> {
        let filter = doc! { "creatorId": creator_id.to_string(), "isReported": false };
        let options = mongodb::options::FindOneOptions::builder()
            .sort(doc! { "viewsCount": 1, "createdAt": 1 })
            .build();
        self.collection
            .find_one(filter)
            .with_options(options)
            .await
            .map_err(PersistenceError::Query)
    }
}
