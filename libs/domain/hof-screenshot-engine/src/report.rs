//! Report / un-report (spec §4.10.3).

use bson::oid::ObjectId;
use hof_domain_models::CoreError;
use hof_infra_persistence::PersistenceError;
use tracing::instrument;
use uuid::Uuid;

use crate::engine::{persistence_error, ScreenshotEngine};

#[instrument(skip(engine))]
pub(crate) async fn mark_reported(
    engine: &ScreenshotEngine,
    id: ObjectId,
    reporter_creator_id: Uuid,
) -> Result<(), CoreError> {
    let screenshot = engine
        .screenshots
        .find_by_id(id)
        .await
        .map_err(persistence_error)?
        .ok_or_else(|| CoreError::NotFoundById(id.to_hex()))?;

    if screenshot.is_approved {
        return Err(CoreError::ScreenshotAlreadyApproved);
    }

    engine
        .screenshots
        .mark_reported(id, reporter_creator_id)
        .await
        .map_err(|err| match err {
            PersistenceError::NotFound(message) => CoreError::NotFoundById(message),
            other => persistence_error(other),
        })
}

#[instrument(skip(engine))]
pub(crate) async fn unmark_reported(engine: &ScreenshotEngine, id: ObjectId) -> Result<(), CoreError> {
    engine
        .screenshots
        .unmark_reported(id)
        .await
        .map_err(|err| match err {
            PersistenceError::NotFound(message) => CoreError::NotFoundById(message),
            other => persistence_error(other),
        })
}
