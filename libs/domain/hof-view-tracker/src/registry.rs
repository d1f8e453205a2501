use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use bson::oid::ObjectId;
use chrono::{Duration as ChronoDuration, Utc};
use hof_infra_persistence::{PersistenceError, ScreenshotRepository, ViewRepository};
use moka::future::Cache;
use tracing::instrument;
use uuid::Uuid;

/// Weighted by total cached ids rather than creator count, approximating
/// the "100 creators, ~10k ids total" shape of spec §4.6 with a single cap.
const MAX_TOTAL_IDS: u64 = 10_000;
const TTL: Duration = Duration::from_secs(2 * 60 * 60);

/// C6: eager view recording plus a per-creator viewed-set cache.
#[derive(Clone)]
pub struct ViewTracker {
    views: ViewRepository,
    screenshots: ScreenshotRepository,
    cache: Cache<Uuid, Arc<HashSet<ObjectId>>>,
}

impl ViewTracker {
    pub fn new(views: ViewRepository, screenshots: ScreenshotRepository) -> Self {
        Self {
            views,
            screenshots,
            cache: Cache::builder()
                .weigher(|_, value: &Arc<HashSet<ObjectId>>| value.len() as u32)
                .max_capacity(MAX_TOTAL_IDS)
                .time_to_live(TTL)
                .build(),
        }
    }

    /// Records a view and eagerly bumps `viewsCount` on every call — a
    /// re-view counts too, unlike `uniqueViewsCount`, which only the stats
    /// reconciler computes (a distinct-creator aggregate, not a running
    /// counter this method could maintain correctly on its own). Updates
    /// the cached viewed-set in place if that creator is already memoised.
    #[instrument(skip(self))]
    pub async fn mark_viewed(
        &self,
        screenshot_id: ObjectId,
        creator_id: Uuid,
    ) -> Result<(), PersistenceError> {
        self.views
            .upsert_viewed(screenshot_id, creator_id, Utc::now())
            .await?;
        self.screenshots.increment_views_count(screenshot_id).await?;

        if let Some(cached) = self.cache.get(&creator_id).await {
            if let Some(updated) = with_id_inserted(&cached, screenshot_id) {
                self.cache.insert(creator_id, Arc::new(updated)).await;
            }
        }

        Ok(())
    }

    /// The set of screenshots `creatorId` has viewed within `max_age_days`
    /// (open-ended when `None` or `0`). Only the open-ended query is
    /// cache-eligible — a bounded window's answer drifts with the clock and
    /// can't be kept coherent by `mark_viewed`'s in-place update.
    #[instrument(skip(self))]
    pub async fn viewed_screenshot_ids(
        &self,
        creator_id: Uuid,
        max_age_days: Option<u32>,
    ) -> Result<HashSet<ObjectId>, PersistenceError> {
        let open_ended = matches!(max_age_days, None | Some(0));

        if open_ended {
            if let Some(cached) = self.cache.get(&creator_id).await {
                return Ok((*cached).clone());
            }
        }

        let since = max_age_days
            .filter(|&days| days > 0)
            .map(|days| Utc::now() - ChronoDuration::days(i64::from(days)));
        let ids = self.views.screenshot_ids_viewed_by(creator_id, since).await?;
        let set: HashSet<ObjectId> = ids.into_iter().collect();

        if open_ended {
            self.cache.insert(creator_id, Arc::new(set.clone())).await;
        }

        Ok(set)
    }
}

/// `None` when `id` is already in `set` (no cache write needed).
fn with_id_inserted(set: &HashSet<ObjectId>, id: ObjectId) -> Option<HashSet<ObjectId>> {
    if set.contains(&id) {
        return None;
    }
    let mut updated = set.clone();
    updated.insert(id);
    Some(updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_id_inserted_is_noop_when_already_present() {
        let mut set = HashSet::new();
        set.insert(ObjectId::new());
        let id = *set.iter().next().unwrap();
        assert!(with_id_inserted(&set, id).is_none());
    }

    #[test]
    fn with_id_inserted_adds_a_new_id() {
        let set = HashSet::new();
        let id = ObjectId::new();
        let updated = with_id_inserted(&set, id).expect("should insert");
        assert!(updated.contains(&id));
    }
}
