use std::sync::Arc;

use bson::oid::ObjectId;
use hof_background_jobs::BackgroundJobs;
use hof_creator_registry::NameTranslator;
use hof_domain_models::{CoreError, Screenshot};
use hof_infra_blobstore::BlobStoreGateway;
use hof_infra_persistence::{
    CreatorRepository, EmbeddingRepository, FavoriteRepository, MongoGateway, PersistenceError,
    ScreenshotRepository, ViewRepository,
};
use hof_similarity_engine::SimilarityEngine;
use hof_stats_reconciler::StatsReconciler;
use hof_view_tracker::ViewTracker;
use rand::Rng;
use uuid::Uuid;

use crate::ingest::IngestRequest;
use crate::selection::{SelectedScreenshot, SelectionRequest};
use crate::{delete, ingest, merge, report, selection};

/// C10: the screenshot lifecycle — ingest, delete, report/un-report,
/// weighted selection and merge — wired against every repository and
/// collaborator a write path needs.
#[derive(Clone)]
pub struct ScreenshotEngine {
    pub(crate) screenshots: ScreenshotRepository,
    pub(crate) favorites: FavoriteRepository,
    pub(crate) views: ViewRepository,
    pub(crate) embeddings: EmbeddingRepository,
    pub(crate) creators: CreatorRepository,
    pub(crate) gateway: MongoGateway,
    pub(crate) blobs: BlobStoreGateway,
    pub(crate) similarity: Arc<SimilarityEngine>,
    pub(crate) view_tracker: ViewTracker,
    pub(crate) stats: StatsReconciler,
    pub(crate) jobs: BackgroundJobs,
    pub(crate) city_translator: Arc<dyn NameTranslator>,
    pub(crate) jpeg_quality: u8,
    pub(crate) limit_per_24h: u32,
    pub(crate) recency_threshold_days: u32,
}

impl ScreenshotEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        screenshots: ScreenshotRepository,
        favorites: FavoriteRepository,
        views: ViewRepository,
        embeddings: EmbeddingRepository,
        creators: CreatorRepository,
        gateway: MongoGateway,
        blobs: BlobStoreGateway,
        similarity: Arc<SimilarityEngine>,
        view_tracker: ViewTracker,
        stats: StatsReconciler,
        jobs: BackgroundJobs,
        city_translator: Arc<dyn NameTranslator>,
        jpeg_quality: u8,
        limit_per_24h: u32,
        recency_threshold_days: u32,
    ) -> Self {
        Self {
            screenshots,
            favorites,
            views,
            embeddings,
            creators,
            gateway,
            blobs,
            similarity,
            view_tracker,
            stats,
            jobs,
            city_translator,
            jpeg_quality,
            limit_per_24h,
            recency_threshold_days,
        }
    }

    /// §4.10.1.
    pub async fn ingest(&self, request: IngestRequest) -> Result<Screenshot, CoreError> {
        ingest::ingest(self, request).await
    }

    /// §4.10.2.
    pub async fn delete(&self, id: ObjectId) -> Result<(), CoreError> {
        delete::delete(self, id).await
    }

    /// §4.10.3.
    pub async fn mark_reported(
        &self,
        id: ObjectId,
        reporter_creator_id: Uuid,
    ) -> Result<(), CoreError> {
        report::mark_reported(self, id, reporter_creator_id).await
    }

    /// §4.10.3.
    pub async fn unmark_reported(&self, id: ObjectId) -> Result<(), CoreError> {
        report::unmark_reported(self, id).await
    }

    /// §4.10.4. `rng` is threaded through explicitly rather than seeded
    /// internally so selection is reproducible under test.
    pub async fn select(
        &self,
        request: SelectionRequest,
        rng: &mut impl Rng,
    ) -> Result<SelectedScreenshot, CoreError> {
        selection::select(self, request, rng).await
    }

    /// §4.10.5.
    pub async fn merge(&self, target_id: ObjectId, source_ids: &[ObjectId]) -> Result<(), CoreError> {
        merge::merge(self, target_id, source_ids).await
    }

    pub fn view_tracker(&self) -> &ViewTracker {
        &self.view_tracker
    }
}

pub(crate) fn persistence_error(err: PersistenceError) -> CoreError {
    CoreError::Internal(err.to_string())
}
