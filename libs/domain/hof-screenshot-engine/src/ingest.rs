//! Ingest (spec §4.10.1): validate, enforce the 24h upload quota, process
//! the image, persist inside one transaction, then schedule the two
//! post-commit background jobs.

use std::collections::{BTreeMap, BTreeSet};

use bson::oid::ObjectId;
use chrono::{DateTime, Duration, Utc};
use hof_domain_models::screenshot::{BlobNames, CITY_MILESTONE_MAX, CITY_POPULATION_MAX};
use hof_domain_models::validation::validate_city_name;
use hof_domain_models::{CoreError, Creator, Screenshot};
use hof_infra_blobstore::client::{ImageBytes, UploadedNames};
use hof_infra_blobstore::naming::{blob_name, ImageVariant};
use hof_infra_image::ImageError;
use hof_infra_persistence::{with_transaction, PersistenceError};
use hof_similarity_engine::{EmbeddingInput, EmbeddingSource};
use tracing::instrument;

use crate::engine::{persistence_error, ScreenshotEngine};

/// Inputs to [`ScreenshotEngine::ingest`]. Milestone and population arrive
/// as signed integers — a negative value must be rejected explicitly rather
/// than wrapping into the stored unsigned fields.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub creator: Creator,
    pub city_name: String,
    pub city_milestone: i64,
    pub city_population: i64,
    pub paradox_mod_ids: BTreeSet<u64>,
    pub render_settings: BTreeMap<String, f64>,
    pub metadata: bson::Document,
    pub created_at: DateTime<Utc>,
    pub file_bytes: Vec<u8>,
    pub healthcheck: bool,
}

#[instrument(skip(engine, request), fields(healthcheck = request.healthcheck))]
pub(crate) async fn ingest(
    engine: &ScreenshotEngine,
    request: IngestRequest,
) -> Result<Screenshot, CoreError> {
    validate_city_name(&request.city_name)?;
    validate_milestone(request.city_milestone)?;
    validate_population(request.city_population)?;
    enforce_upload_quota(engine, &request).await?;

    let creator_name = request.creator.creator_name.clone();
    let buffers = hof_infra_image::process(
        &request.file_bytes,
        creator_name.as_deref(),
        &request.city_name,
        engine.jpeg_quality,
        request.created_at,
    )
    .map_err(|err| match err {
        ImageError::InvalidFormat(message) => CoreError::InvalidImageFormat(message),
        ImageError::Processing(message) => CoreError::Internal(message),
    })?;

    let ip = request
        .creator
        .most_recent_ip()
        .ok_or_else(|| CoreError::Internal("creator has no known ip to ingest with".to_string()))?
        .to_string();
    let hwid = request
        .creator
        .most_recent_hwid()
        .map(str::to_string)
        .unwrap_or_default();

    let base_row = Screenshot {
        id: None,
        creator_id: request.creator.creator_id,
        city_name: request.city_name.clone(),
        city_milestone: request.city_milestone as u8,
        city_population: request.city_population as u32,
        blobs: BlobNames::default(),
        hwid,
        ip,
        paradox_mod_ids: request.paradox_mod_ids.clone(),
        render_settings: request.render_settings.clone(),
        metadata: request.metadata.clone(),
        is_approved: false,
        is_reported: request.healthcheck,
        reported_by_id: None,
        favorites_count: 0,
        views_count: 0,
        unique_views_count: 0,
        favoriting_percentage: 0,
        views_per_day: None,
        favorites_per_day: None,
        created_at: request.created_at,
    };

    let fhd_bytes = buffers.fhd.clone();
    let creator_id = request.creator.creator_id;
    let city_name = request.city_name.clone();
    let healthcheck = request.healthcheck;

    let outcome = with_transaction(&engine.gateway, |session| {
        let screenshots = engine.screenshots.clone();
        let embeddings = engine.embeddings.clone();
        let blobs = engine.blobs.clone();
        let row = base_row.clone();
        let creator_name = creator_name.clone();
        let city_name = city_name.clone();
        let thumbnail = buffers.thumbnail.clone();
        let fhd = buffers.fhd.clone();
        let four_k = buffers.four_k.clone();

        async move {
            let id = screenshots.insert_in_session(&row, session).await?;
            let id_hex = id.to_hex();

            let names = UploadedNames {
                thumbnail: blob_name(
                    creator_id,
                    &id_hex,
                    &city_name,
                    creator_name.as_deref(),
                    row.created_at,
                    ImageVariant::Thumbnail,
                ),
                fhd: blob_name(
                    creator_id,
                    &id_hex,
                    &city_name,
                    creator_name.as_deref(),
                    row.created_at,
                    ImageVariant::Fhd,
                ),
                four_k: blob_name(
                    creator_id,
                    &id_hex,
                    &city_name,
                    creator_name.as_deref(),
                    row.created_at,
                    ImageVariant::FourK,
                ),
            };

            blobs
                .upload_images(
                    creator_id,
                    &id_hex,
                    &names,
                    ImageBytes { thumbnail, fhd, four_k },
                )
                .await
                .map_err(|err| PersistenceError::External(err.to_string()))?;

            let blob_names = BlobNames {
                thumbnail: names.thumbnail,
                fhd: names.fhd,
                four_k: names.four_k,
            };
            screenshots.set_blobs_in_session(id, &blob_names, session).await?;

            if healthcheck {
                embeddings.delete_by_screenshot_id_in_session(id, session).await?;
                screenshots.delete_in_session(id, session).await?;
            }

            Ok((id, blob_names))
        }
    })
    .await
    .map_err(persistence_error)?;

    let (id, blob_names) = outcome;

    if healthcheck {
        // The row and embedding are already gone (deleted in-session above);
        // the blob store isn't transactional, so the three uploaded blobs
        // are only removed here, post-commit, mirroring the normal delete
        // path's blob cleanup (spec §4.10.1 step 3(d), §4.10.2).
        let names = UploadedNames {
            thumbnail: blob_names.thumbnail,
            fhd: blob_names.fhd,
            four_k: blob_names.four_k,
        };
        engine
            .blobs
            .delete_images(&names)
            .await
            .map_err(|err| CoreError::Internal(err.to_string()))?;

        return Ok(Screenshot {
            id: None,
            blobs: BlobNames::default(),
            ..base_row
        });
    }

    let mut stored = base_row;
    stored.id = Some(id);
    stored.blobs = blob_names;

    schedule_post_ingest_jobs(engine, &stored, fhd_bytes);

    Ok(stored)
}

fn validate_milestone(milestone: i64) -> Result<(), CoreError> {
    if (0..=i64::from(CITY_MILESTONE_MAX)).contains(&milestone) {
        Ok(())
    } else {
        Err(CoreError::InvalidPayload(format!(
            "cityMilestone must be between 0 and {CITY_MILESTONE_MAX}, got {milestone}"
        )))
    }
}

fn validate_population(population: i64) -> Result<(), CoreError> {
    if (0..=i64::from(CITY_POPULATION_MAX)).contains(&population) {
        Ok(())
    } else {
        Err(CoreError::InvalidPayload(format!(
            "cityPopulation must be between 0 and {CITY_POPULATION_MAX}, got {population}"
        )))
    }
}

/// §4.10.1 step 1. The `ip` clause intentionally matches against
/// `known_hwids`, preserving the upstream quirk documented on
/// [`hof_infra_persistence::ScreenshotRepository::count_recent_uploads`].
async fn enforce_upload_quota(
    engine: &ScreenshotEngine,
    request: &IngestRequest,
) -> Result<(), CoreError> {
    let since = request.created_at - Duration::hours(24);
    let count = engine
        .screenshots
        .count_recent_uploads(
            request.creator.creator_id,
            &request.creator.ips,
            &request.creator.hwids,
            since,
        )
        .await
        .map_err(persistence_error)?;

    if count < u64::from(engine.limit_per_24h) {
        return Ok(());
    }

    let oldest = engine
        .screenshots
        .oldest_recent_upload_at(
            request.creator.creator_id,
            &request.creator.ips,
            &request.creator.hwids,
            since,
        )
        .await
        .map_err(persistence_error)?
        .unwrap_or(request.created_at);

    Err(CoreError::RateLimitExceeded {
        not_before: oldest + Duration::hours(24),
    })
}

fn schedule_post_ingest_jobs(engine: &ScreenshotEngine, screenshot: &Screenshot, fhd_bytes: Vec<u8>) {
    let screenshot_id = screenshot.id.expect("stored screenshot always has an id");

    let translator = engine.city_translator.clone();
    let city_name = screenshot.city_name.clone();
    engine.jobs.spawn("translate-city-name", async move {
        translator
            .translate(&city_name)
            .await
            .map(|_translated| ())
            .map_err(|err| err.to_string())
    });

    let similarity = engine.similarity.clone();
    engine.jobs.spawn("embed-new-screenshot", async move {
        similarity
            .batch_update_embeddings(
                "post-ingest",
                vec![EmbeddingInput {
                    screenshot_id,
                    source: EmbeddingSource::Inline(fhd_bytes),
                }],
            )
            .await
            .map(|_count| ())
            .map_err(|err| err.to_string())
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_boundary_milestones() {
        assert!(validate_milestone(0).is_ok());
        assert!(validate_milestone(20).is_ok());
        assert!(validate_milestone(21).is_err());
    }

    #[test]
    fn rejects_a_negative_population() {
        assert!(validate_population(-1).is_err());
    }

    #[test]
    fn accepts_zero_and_the_max_population() {
        assert!(validate_population(0).is_ok());
        assert!(validate_population(5_000_000).is_ok());
        assert!(validate_population(5_000_001).is_err());
    }
}
