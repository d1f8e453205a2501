use bson::doc;
use hof_domain_models::Creator;
use mongodb::options::FindOneAndUpdateOptions;
use mongodb::Collection;
use serde::de::Error as _;
use tracing::instrument;
use uuid::Uuid;

use crate::aggregation::run_aggregation;
use crate::client::MongoGateway;
use crate::errors::PersistenceError;

#[derive(Clone)]
pub struct CreatorRepository {
    collection: Collection<Creator>,
}

impl CreatorRepository {
    pub fn new(gateway: &MongoGateway) -> Self {
        Self {
            collection: gateway.collection("creators"),
        }
    }

    #[instrument(skip(self))]
    pub async fn find_by_creator_id(
        &self,
        creator_id: Uuid,
    ) -> Result<Option<Creator>, PersistenceError> {
        self.collection
            .find_one(doc! { "creatorId": creator_id.to_string() })
            .await
            .map_err(PersistenceError::Query)
    }

    /// Finds every creator matching `creatorId`, `creatorName` or
    /// `creatorNameSlug` — the disjunctive lookup the `mod` auth flow uses
    /// to distinguish "no match" / "one match" / "name collision" (spec §4.5).
    #[instrument(skip(self, creator_name, creator_name_slug))]
    pub async fn find_matching_identity_or_name(
        &self,
        creator_id: Uuid,
        creator_name: Option<&str>,
        creator_name_slug: Option<&str>,
    ) -> Result<Vec<Creator>, PersistenceError> {
        let mut or_clauses = vec![doc! { "creatorId": creator_id.to_string() }];
        if let Some(name) = creator_name {
            or_clauses.push(doc! { "creatorName": name });
        }
        if let Some(slug) = creator_name_slug {
            or_clauses.push(doc! { "creatorNameSlug": slug });
        }

        let mut cursor = self
            .collection
            .find(doc! { "$or": or_clauses })
            .await
            .map_err(PersistenceError::Query)?;

        let mut creators = Vec::new();
        while let Some(creator) = futures_util::TryStreamExt::try_next(&mut cursor)
            .await
            .map_err(PersistenceError::Query)?
        {
            creators.push(creator);
        }
        Ok(creators)
    }

    #[instrument(skip(self, creator))]
    pub async fn insert(&self, creator: &Creator) -> Result<bson::oid::ObjectId, PersistenceError> {
        let result = self.collection.insert_one(creator).await.map_err(|err| {
            if is_duplicate_key_error(&err) {
                PersistenceError::Conflict(
                    "a creator with this creatorId/name/slug already exists".to_string(),
                )
            } else {
                PersistenceError::Query(err)
            }
        })?;

        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| PersistenceError::Mapping(bson::de::Error::custom("missing inserted _id")))
    }

    #[instrument(skip(self, creator))]
    pub async fn replace(&self, creator: &Creator) -> Result<(), PersistenceError> {
        let id = creator
            .id
            .ok_or_else(|| PersistenceError::NotFound("creator has no id".to_string()))?;

        let result = self
            .collection
            .find_one_and_update(
                doc! { "_id": id },
                doc! { "$set": bson::to_document(creator)? },
            )
            .with_options(FindOneAndUpdateOptions::default())
            .await
            .map_err(|err| {
                if is_duplicate_key_error(&err) {
                    PersistenceError::Conflict("update collides with another creator".to_string())
                } else {
                    PersistenceError::Query(err)
                }
            })?;

        if result.is_none() {
            return Err(PersistenceError::NotFound(id.to_hex()));
        }
        Ok(())
    }

    /// Persists the outcome of a background name-translation job. Scoped by
    /// `creatorId` rather than `_id` since the job only ever carries the
    /// externally-issued id forward.
    #[instrument(skip(self, translated))]
    pub async fn set_translated_name(
        &self,
        creator_id: Uuid,
        translated: &hof_domain_models::TranslatedName,
    ) -> Result<(), PersistenceError> {
        let result = self
            .collection
            .update_one(
                doc! { "creatorId": creator_id.to_string() },
                doc! { "$set": { "translatedName": bson::to_bson(translated)? } },
            )
            .await
            .map_err(PersistenceError::Query)?;

        if result.matched_count == 0 {
            return Err(PersistenceError::NotFound(creator_id.to_string()));
        }
        Ok(())
    }

    /// Uniform sample of one supporter creator, for the `supporter`
    /// selection algorithm (spec §4.10.4).
    #[instrument(skip(self))]
    pub async fn sample_supporter(&self) -> Result<Option<Creator>, PersistenceError> {
        let pipeline = vec![
            doc! { "$match": { "isSupporter": true } },
            doc! { "$sample": { "size": 1 } },
        ];
        let mut rows: Vec<Creator> =
            run_aggregation(&self.collection.clone_with_type(), pipeline).await?;
        Ok(rows.pop())
    }
}

pub(crate) fn is_duplicate_key_error(err: &mongodb::error::Error) -> bool {
    matches!(
        *err.kind,
        mongodb::error::ErrorKind::Write(mongodb::error::WriteFailure::WriteError(
            mongodb::error::WriteError { code: 11000, .. }
        ))
    )
}
