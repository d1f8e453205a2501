use bson::doc;
use bson::oid::ObjectId;
use chrono::{DateTime, TimeZone, Utc};
use futures_util::TryStreamExt;
use hof_infra_persistence::{PersistenceError, ScreenshotRepository};
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::time::Duration;
use tracing::instrument;

/// §4.8's launch-date anchors: no screenshot has views before this date...
static VIEWS_LAUNCH: Lazy<DateTime<Utc>> =
    Lazy::new(|| Utc.with_ymd_and_hms(2024, 9, 23, 0, 0, 0).unwrap());
/// ...and none has favorites before this (slightly later) one.
static FAVORITES_LAUNCH: Lazy<DateTime<Utc>> =
    Lazy::new(|| Utc.with_ymd_and_hms(2024, 10, 5, 0, 0, 0).unwrap());

const NICE_SLEEP: Duration = Duration::from_millis(100);
/// A per-day average is only rewritten when it drifts by more than this —
/// otherwise every hourly pass would rewrite every row by floating rounding
/// noise alone.
const DRIFT_THRESHOLD: f64 = 0.1;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CounterSnapshot {
    #[serde(rename = "_id")]
    id: ObjectId,
    created_at: DateTime<Utc>,
    #[serde(default)]
    views_count: u32,
    #[serde(default)]
    unique_views_count: u32,
    #[serde(default)]
    favorites_count: u32,
    #[serde(default)]
    views_per_day: f64,
    #[serde(default)]
    favorites_per_day: f64,
    #[serde(default)]
    favoriting_percentage: u32,
}

#[derive(Debug, PartialEq)]
struct RecomputedAverages {
    views_per_day: f64,
    favorites_per_day: f64,
    favoriting_percentage: u32,
}

/// Recomputes `viewsPerDay`/`favoritesPerDay`/`favoritingPercentage` for one
/// screenshot, returning `None` when nothing drifted enough to write.
fn recompute(now: DateTime<Utc>, snapshot: &CounterSnapshot) -> Option<RecomputedAverages> {
    let views_days = days_since(now, snapshot.created_at.max(*VIEWS_LAUNCH));
    let favorites_days = days_since(now, snapshot.created_at.max(*FAVORITES_LAUNCH));

    let views_per_day = round1(f64::from(snapshot.views_count) / views_days);
    let favorites_per_day = round1(f64::from(snapshot.favorites_count) / favorites_days);
    let favoriting_percentage = if snapshot.unique_views_count > 0 {
        round_pct(f64::from(snapshot.favorites_count) / f64::from(snapshot.unique_views_count) * 100.0)
    } else {
        0
    };

    let drifted = (views_per_day - snapshot.views_per_day).abs() > DRIFT_THRESHOLD
        || (favorites_per_day - snapshot.favorites_per_day).abs() > DRIFT_THRESHOLD
        || favoriting_percentage != snapshot.favoriting_percentage;

    if !drifted {
        return None;
    }

    Some(RecomputedAverages { views_per_day, favorites_per_day, favoriting_percentage })
}

/// Whole days elapsed since `since`, floored at 1 so a screenshot created
/// today never divides by zero.
fn days_since(now: DateTime<Utc>, since: DateTime<Utc>) -> f64 {
    ((now - since).num_days() as f64).max(1.0)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn round_pct(value: f64) -> u32 {
    value.round().max(0.0) as u32
}

/// The hourly (minute-0) per-day-average recomputation of spec §4.8.
#[derive(Clone)]
pub struct PerDayAverages {
    screenshots: ScreenshotRepository,
    nice: bool,
}

impl PerDayAverages {
    /// `nice` sleeps [`NICE_SLEEP`] between writes to spread out the load
    /// of a full-table recomputation pass.
    pub fn new(screenshots: ScreenshotRepository, nice: bool) -> Self {
        Self { screenshots, nice }
    }

    #[instrument(skip(self))]
    pub async fn recompute_all(&self) -> Result<usize, PersistenceError> {
        let now = Utc::now();
        let filter = doc! { "$or": [
            { "viewsCount": { "$gt": 0 } },
            { "favoritesCount": { "$gt": 0 } },
        ] };

        let mut cursor = self.screenshots.raw_collection().find(filter).await?;
        let mut written = 0;

        while let Some(document) = cursor.try_next().await? {
            let snapshot: CounterSnapshot = bson::from_document(document)?;
            if let Some(update) = recompute(now, &snapshot) {
                self.screenshots
                    .set_per_day_averages(
                        snapshot.id,
                        update.views_per_day,
                        update.favorites_per_day,
                        update.favoriting_percentage,
                    )
                    .await?;
                written += 1;

                if self.nice {
                    tokio::time::sleep(NICE_SLEEP).await;
                }
            }
        }

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(created_at: DateTime<Utc>, views: u32, favorites: u32) -> CounterSnapshot {
        CounterSnapshot {
            id: ObjectId::new(),
            created_at,
            views_count: views,
            unique_views_count: views,
            favorites_count: favorites,
            views_per_day: 0.0,
            favorites_per_day: 0.0,
            favoriting_percentage: 0,
        }
    }

    #[test]
    fn a_screenshot_created_today_divides_by_one_day() {
        let now = *VIEWS_LAUNCH + chrono::Duration::days(30);
        let snap = snapshot(now, 20, 4);
        let update = recompute(now, &snap).expect("should drift from zeroed stored values");
        assert_eq!(update.views_per_day, 20.0);
        assert_eq!(update.favorites_per_day, 4.0);
        assert_eq!(update.favoriting_percentage, 20);
    }

    #[test]
    fn views_and_favorites_use_their_own_launch_anchor() {
        // created before both launches: each counter divides by days since
        // *its own* anchor, not the screenshot's own createdAt. Favorites'
        // anchor is 12 days later than views', so for equal raw counts the
        // favorites-per-day rate comes out higher.
        let created = *VIEWS_LAUNCH - chrono::Duration::days(100);
        let now = *FAVORITES_LAUNCH + chrono::Duration::days(10);
        let snap = snapshot(created, 20, 20);
        let update = recompute(now, &snap).unwrap();
        assert!(update.favorites_per_day > update.views_per_day);
    }

    #[test]
    fn no_write_when_nothing_drifted() {
        let now = *FAVORITES_LAUNCH + chrono::Duration::days(10);
        let mut snap = snapshot(*VIEWS_LAUNCH, 22, 20);
        snap.views_per_day = 1.0;
        snap.favorites_per_day = 2.0;
        snap.favoriting_percentage = 91;
        assert!(recompute(now, &snap).is_none());
    }
}
