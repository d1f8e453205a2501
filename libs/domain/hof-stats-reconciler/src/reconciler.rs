use bson::doc;
use bson::oid::ObjectId;
use bson::Document;
use futures_util::future::try_join_all;
use hof_infra_persistence::{run_aggregation, PersistenceError, ScreenshotRepository};
use serde::Deserialize;
use tracing::instrument;

use crate::dirty::DirtySet;

/// C8: joins each screenshot against its views and favorites and rewrites
/// only the counters that drifted from the stored value.
#[derive(Clone)]
pub struct StatsReconciler {
    screenshots: ScreenshotRepository,
    dirty: std::sync::Arc<DirtySet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReconciledRow {
    #[serde(rename = "_id")]
    id: ObjectId,
    views_count: u32,
    unique_views_count: u32,
    favorites_count: u32,
    favoriting_percentage: u32,
    stored_views_count: u32,
    stored_unique_views_count: u32,
    stored_favorites_count: u32,
    stored_favoriting_percentage: u32,
}

impl ReconciledRow {
    fn drifted(&self) -> bool {
        self.views_count != self.stored_views_count
            || self.unique_views_count != self.stored_unique_views_count
            || self.favorites_count != self.stored_favorites_count
            || self.favoriting_percentage != self.stored_favoriting_percentage
    }
}

impl StatsReconciler {
    pub fn new(screenshots: ScreenshotRepository, dirty: std::sync::Arc<DirtySet>) -> Self {
        Self { screenshots, dirty }
    }

    /// Enqueues `id` for the next five-minute drain.
    pub fn request_stats_update(&self, id: ObjectId) {
        self.dirty.mark(id);
    }

    /// Drains the dirty set and reconciles exactly those ids. A no-op when
    /// nothing is dirty — skips the aggregation round-trip entirely.
    #[instrument(skip(self))]
    pub async fn reconcile_dirty(&self) -> Result<usize, PersistenceError> {
        let ids = self.dirty.drain();
        if ids.is_empty() {
            return Ok(0);
        }
        self.reconcile(Some(doc! { "_id": { "$in": ids } })).await
    }

    /// Reconciles every screenshot, dirty or not (the daily 00:02 UTC cron).
    #[instrument(skip(self))]
    pub async fn reconcile_all(&self) -> Result<usize, PersistenceError> {
        self.reconcile(None).await
    }

    /// Reconciles exactly `ids`, immediately rather than waiting for the
    /// next dirty-set drain — used by merge (spec §4.10.5) to settle the
    /// target's counters right after the source screenshots are folded in.
    #[instrument(skip(self))]
    pub async fn reconcile_ids(&self, ids: &[ObjectId]) -> Result<usize, PersistenceError> {
        if ids.is_empty() {
            return Ok(0);
        }
        self.reconcile(Some(doc! { "_id": { "$in": ids } })).await
    }

    async fn reconcile(&self, filter: Option<Document>) -> Result<usize, PersistenceError> {
        let rows: Vec<ReconciledRow> =
            run_aggregation(&self.screenshots.raw_collection(), reconciliation_pipeline(filter))
                .await?;

        let drifted: Vec<&ReconciledRow> = rows.iter().filter(|row| row.drifted()).collect();
        let writes = drifted.iter().map(|row| {
            self.screenshots.set_counters(
                row.id,
                row.views_count,
                row.unique_views_count,
                row.favorites_count,
                row.favoriting_percentage,
            )
        });
        try_join_all(writes).await?;

        Ok(drifted.len())
    }
}

fn reconciliation_pipeline(filter: Option<Document>) -> Vec<Document> {
    let mut stages = Vec::new();
    if let Some(filter) = filter {
        stages.push(doc! { "$match": filter });
    }
    stages.extend([
        doc! { "$lookup": {
            "from": "views",
            "localField": "_id",
            "foreignField": "screenshotId",
            "as": "views",
        } },
        doc! { "$lookup": {
            "from": "favorites",
            "localField": "_id",
            "foreignField": "screenshotId",
            "as": "favorites",
        } },
        doc! { "$project": {
            "storedViewsCount": { "$ifNull": ["$viewsCount", 0] },
            "storedUniqueViewsCount": { "$ifNull": ["$uniqueViewsCount", 0] },
            "storedFavoritesCount": { "$ifNull": ["$favoritesCount", 0] },
            "storedFavoritingPercentage": { "$ifNull": ["$favoritingPercentage", 0] },
            "viewsCount": { "$size": "$views" },
            "uniqueViewsCount": { "$size": { "$setUnion": ["$views.creatorId", []] } },
            "favoritesCount": { "$size": "$favorites" },
        } },
        doc! { "$addFields": {
            "favoritingPercentage": {
                "$cond": [
                    { "$gt": ["$uniqueViewsCount", 0] },
                    { "$round": [
                        { "$multiply": [
                            { "$divide": ["$favoritesCount", "$uniqueViewsCount"] },
                            100,
                        ] },
                        0,
                    ] },
                    0,
                ],
            },
        } },
    ]);
    stages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(views: u32, unique: u32, favorites: u32, pct: u32, stored_pct: u32) -> ReconciledRow {
        ReconciledRow {
            id: ObjectId::new(),
            views_count: views,
            unique_views_count: unique,
            favorites_count: favorites,
            favoriting_percentage: pct,
            stored_views_count: views,
            stored_unique_views_count: unique,
            stored_favorites_count: favorites,
            stored_favoriting_percentage: stored_pct,
        }
    }

    #[test]
    fn row_with_matching_counters_does_not_drift() {
        assert!(!row(10, 8, 2, 25, 25).drifted());
    }

    #[test]
    fn row_with_stale_percentage_drifts() {
        assert!(row(10, 8, 2, 25, 20).drifted());
    }
}
