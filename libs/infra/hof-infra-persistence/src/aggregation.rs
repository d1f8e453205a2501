use bson::Document;
use futures_util::TryStreamExt;
use mongodb::Collection;
use serde::de::DeserializeOwned;

use crate::errors::PersistenceError;

/// Runs a raw aggregation pipeline against `collection` and deserializes
/// every output document as `T`. Used by the weighted-selection algorithms
/// (spec §4.10.4) and the stats reconciler's join-and-diff pipeline
/// (spec §4.8), both of which need server-side sampling/sorting that typed
/// repository methods don't expose.
pub async fn run_aggregation<T>(
    collection: &Collection<Document>,
    pipeline: Vec<Document>,
) -> Result<Vec<T>, PersistenceError>
where
    T: DeserializeOwned,
{
    let mut cursor = collection.aggregate(pipeline).await?;
    let mut results = Vec::new();
    while let Some(doc) = cursor.try_next().await? {
        results.push(bson::from_document(doc)?);
    }
    Ok(results)
}
