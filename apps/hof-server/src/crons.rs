//! The three scheduled jobs of spec §4.8, each run as its own `tokio::spawn`
//! loop ticking on a fixed-period or next-midnight timer. None of these
//! jobs propagate failures anywhere but the log — a missed reconciliation
//! pass is caught by the next tick, or by the following day's full sweep.

use std::time::Duration;

use chrono::{NaiveTime, TimeZone, Timelike, Utc};
use hof_stats_reconciler::{PerDayAverages, StatsReconciler};
use tracing::{error, info};

/// The dirty-set drain of spec §4.8: runs every five minutes.
pub fn spawn_dirty_drain(stats: StatsReconciler) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(5 * 60));
        loop {
            ticker.tick().await;
            match stats.reconcile_dirty().await {
                Ok(count) => info!(count, "dirty-set reconciliation drained"),
                Err(err) => error!(error = %err, "dirty-set reconciliation failed"),
            }
        }
    });
}

/// The daily full reconciliation of spec §4.8: every day at 00:02 UTC.
pub fn spawn_daily_reconciliation(stats: StatsReconciler) {
    tokio::spawn(async move {
        loop {
            sleep_until_next(2, 0).await;
            match stats.reconcile_all().await {
                Ok(count) => info!(count, "daily full reconciliation complete"),
                Err(err) => error!(error = %err, "daily full reconciliation failed"),
            }
        }
    });
}

/// The hourly per-day-average recompute of spec §4.8: every hour at
/// minute 0.
pub fn spawn_hourly_averages(averages: PerDayAverages) {
    tokio::spawn(async move {
        loop {
            sleep_until_next_hour().await;
            match averages.recompute_all().await {
                Ok(count) => info!(count, "per-day averages recomputed"),
                Err(err) => error!(error = %err, "per-day averages recompute failed"),
            }
        }
    });
}

/// Sleeps until the next wall-clock `hour:minute` UTC, today if it hasn't
/// passed yet, tomorrow otherwise.
async fn sleep_until_next(hour: u32, minute: u32) {
    let now = Utc::now();
    let target_time = NaiveTime::from_hms_opt(hour, minute, 0).expect("valid hour/minute");
    let mut target_date = now.date_naive();
    if now.time() >= target_time {
        target_date = target_date.succ_opt().expect("date does not overflow");
    }
    let target = Utc.from_utc_datetime(&target_date.and_time(target_time));
    let wait = (target - now).to_std().unwrap_or(Duration::ZERO);
    tokio::time::sleep(wait).await;
}

/// Sleeps until the next wall-clock minute-0, i.e. the top of the next
/// hour.
async fn sleep_until_next_hour() {
    let now = Utc::now();
    let next_hour = now
        .date_naive()
        .and_hms_opt(now.hour(), 0, 0)
        .expect("valid hour")
        + chrono::Duration::hours(1);
    let target = Utc.from_utc_datetime(&next_hour);
    let wait = (target - now).to_std().unwrap_or(Duration::ZERO);
    tokio::time::sleep(wait).await;
}
