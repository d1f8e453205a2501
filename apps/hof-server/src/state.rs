//! Composition root: wires [`hof_config::Config`] into one live instance of
//! every gateway and domain engine the spec names, plus the background-job
//! queue and the similarity sidecar process. The HTTP router is built
//! against this struct in the excluded web layer; nothing here depends on
//! it.

use std::sync::Arc;

use hof_ban_registry::BanRegistry;
use hof_config::Config;
use hof_creator_registry::{CreatorRegistry, NoopTranslator};
use hof_favorite_tracker::FavoriteTracker;
use hof_infra_blobstore::BlobStoreGateway;
use hof_infra_persistence::{
    BanRepository, CreatorRepository, EmbeddingRepository, FavoriteRepository, MongoGateway,
    ScreenshotRepository, ViewRepository,
};
use hof_infra_similarity_transport::WorkerChannel;
use hof_screenshot_engine::{AuthorizationGuard, ScreenshotEngine};
use hof_similarity_engine::SimilarityEngine;
use hof_stats_reconciler::{DirtySet, PerDayAverages, StatsReconciler};
use hof_view_tracker::ViewTracker;
use tokio::task::JoinHandle;
use tracing::info;

use crate::blob_client;

/// Every long-lived collaborator the excluded HTTP layer needs a handle to,
/// plus the background task handles kept alive for the process lifetime.
pub struct AppState {
    pub gateway: MongoGateway,
    pub blobs: BlobStoreGateway,
    pub ban_registry: BanRegistry,
    pub creator_registry: CreatorRegistry,
    pub view_tracker: ViewTracker,
    pub favorite_tracker: FavoriteTracker,
    pub stats_reconciler: StatsReconciler,
    pub similarity_engine: Arc<SimilarityEngine>,
    pub screenshot_engine: ScreenshotEngine,
    pub auth_guard: AuthorizationGuard,
    pub per_day_averages: PerDayAverages,
    _background_jobs: JoinHandle<()>,
    _similarity_worker: Arc<WorkerChannel>,
}

impl AppState {
    pub async fn bootstrap(config: &Config) -> anyhow::Result<Self> {
        info!("connecting to persistence gateway");
        let gateway = MongoGateway::connect(&config.database_url, "hall_of_fame").await?;

        info!("building blob store client");
        let s3_client = blob_client::build_client(&config.blob.connection_url).await?;
        let blobs = BlobStoreGateway::new(s3_client, config.blob.container.clone(), config.blob.cdn_base.clone());

        let screenshots = ScreenshotRepository::new(&gateway);
        let favorites = FavoriteRepository::new(&gateway);
        let views = ViewRepository::new(&gateway);
        let embeddings = EmbeddingRepository::new(&gateway);
        let creators = CreatorRepository::new(&gateway);
        let bans = BanRepository::new(&gateway);

        let (background_jobs, background_jobs_handle) = hof_background_jobs::BackgroundJobs::start();

        info!(bin = %config.similarity_worker_bin, "spawning similarity worker sidecar");
        let similarity_worker = Arc::new(WorkerChannel::spawn(
            &config.similarity_worker_bin,
            &[config.similarity_model_path.clone()],
        )?);

        let similarity_engine = Arc::new(SimilarityEngine::new(
            embeddings.clone(),
            blobs.clone(),
            similarity_worker.clone(),
        ));

        let ban_registry = BanRegistry::new(bans, creators.clone());
        let creator_registry = CreatorRegistry::new(
            creators.clone(),
            Arc::new(NoopTranslator),
            background_jobs.clone(),
        );
        let view_tracker = ViewTracker::new(views.clone(), screenshots.clone());
        let favorite_tracker = FavoriteTracker::new(favorites.clone(), screenshots.clone());

        let dirty_set = Arc::new(DirtySet::new());
        let stats_reconciler = StatsReconciler::new(screenshots.clone(), dirty_set);
        // "nice" mode (spec §4.8) is unconditional here: this is the cron's
        // only caller, and spreading writes out over an hourly full-table
        // pass is worth 100ms/row against never competing with request
        // traffic for write bandwidth.
        let per_day_averages = PerDayAverages::new(screenshots.clone(), true);

        let auth_guard = AuthorizationGuard::new(ban_registry.clone(), creator_registry.clone());

        let screenshot_engine = ScreenshotEngine::new(
            screenshots,
            favorites,
            views,
            embeddings,
            creators,
            gateway.clone(),
            blobs.clone(),
            similarity_engine.clone(),
            view_tracker.clone(),
            stats_reconciler.clone(),
            background_jobs,
            Arc::new(NoopTranslator),
            config.screenshots.jpeg_quality,
            config.screenshots.limit_per_24h,
            config.screenshots.recency_threshold_days,
        );

        Ok(Self {
            gateway,
            blobs,
            ban_registry,
            creator_registry,
            view_tracker,
            favorite_tracker,
            stats_reconciler,
            similarity_engine,
            screenshot_engine,
            auth_guard,
            per_day_averages,
            _background_jobs: background_jobs_handle,
            _similarity_worker: similarity_worker,
        })
    }
}
