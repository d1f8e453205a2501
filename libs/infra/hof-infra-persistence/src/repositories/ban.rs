use bson::doc;
use hof_domain_models::Ban;
use mongodb::Collection;
use tracing::instrument;
use uuid::Uuid;

use crate::client::MongoGateway;
use crate::errors::PersistenceError;

#[derive(Clone)]
pub struct BanRepository {
    collection: Collection<Ban>,
}

impl BanRepository {
    pub fn new(gateway: &MongoGateway) -> Self {
        Self {
            collection: gateway.collection("bans"),
        }
    }

    /// The OR-over-provided-keys ban lookup of spec §4.4.
    #[instrument(skip(self))]
    pub async fn find_matching(
        &self,
        creator_id: Option<Uuid>,
        ip: Option<&str>,
        hwid: Option<&str>,
    ) -> Result<Option<Ban>, PersistenceError> {
        let mut or_clauses = Vec::new();
        if let Some(creator_id) = creator_id {
            or_clauses.push(doc! { "creatorId": creator_id.to_string() });
        }
        if let Some(ip) = ip {
            or_clauses.push(doc! { "ip": ip });
        }
        if let Some(hwid) = hwid {
            or_clauses.push(doc! { "hwid": hwid });
        }
        if or_clauses.is_empty() {
            return Ok(None);
        }

        self.collection
            .find_one(doc! { "$or": or_clauses })
            .await
            .map_err(PersistenceError::Query)
    }

    #[instrument(skip(self, bans))]
    pub async fn insert_many(&self, bans: &[Ban]) -> Result<(), PersistenceError> {
        if bans.is_empty() {
            return Ok(());
        }
        self.collection
            .insert_many(bans)
            .await
            .map_err(PersistenceError::Query)?;
        Ok(())
    }
}
