//! Delete (spec §4.10.2): embedding, screenshot row and blobs all vanish
//! together, with the blob removal the only step allowed to fail the caller
//! after commit.

use bson::oid::ObjectId;
use hof_domain_models::CoreError;
use hof_infra_blobstore::client::UploadedNames;
use hof_infra_persistence::{EmbeddingRepository, PersistenceError, ScreenshotRepository};
use mongodb::ClientSession;
use tracing::instrument;

use crate::engine::{persistence_error, ScreenshotEngine};

#[instrument(skip(engine))]
pub(crate) async fn delete(engine: &ScreenshotEngine, id: ObjectId) -> Result<(), CoreError> {
    let screenshot = engine
        .screenshots
        .find_by_id(id)
        .await
        .map_err(persistence_error)?
        .ok_or_else(|| CoreError::NotFoundById(id.to_hex()))?;

    let embedding_id = engine
        .embeddings
        .find_by_screenshot_id(id)
        .await
        .map_err(persistence_error)?
        .map(|embedding| embedding.id);

    hof_infra_persistence::with_transaction(&engine.gateway, |session| {
        let screenshots = engine.screenshots.clone();
        let embeddings = engine.embeddings.clone();
        async move { delete_row_in_session(&screenshots, &embeddings, id, session).await }
    })
    .await
    .map_err(|err| match err {
        PersistenceError::NotFound(message) => CoreError::NotFoundById(message),
        other => persistence_error(other),
    })?;

    if !screenshot.blobs.is_empty() {
        let names = UploadedNames {
            thumbnail: screenshot.blobs.thumbnail,
            fhd: screenshot.blobs.fhd,
            four_k: screenshot.blobs.four_k,
        };
        engine
            .blobs
            .delete_images(&names)
            .await
            .map_err(|err| CoreError::Internal(err.to_string()))?;
    }

    if let Some(embedding_id) = embedding_id {
        engine
            .similarity
            .forget_index_entry(&embedding_id)
            .map_err(|err| CoreError::Internal(err.to_string()))?;
    }

    Ok(())
}

/// Deletes the embedding row (if any) and the screenshot row for `id`
/// within `session`. Shared between the single-screenshot delete path and
/// merge's per-source cleanup (spec §4.10.5), both of which need the same
/// two writes inside one larger transaction.
pub(crate) async fn delete_row_in_session(
    screenshots: &ScreenshotRepository,
    embeddings: &EmbeddingRepository,
    id: ObjectId,
    session: &mut ClientSession,
) -> Result<(), PersistenceError> {
    embeddings.delete_by_screenshot_id_in_session(id, session).await?;
    screenshots.delete_in_session(id, session).await
}
