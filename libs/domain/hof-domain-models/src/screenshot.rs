use std::collections::{BTreeMap, BTreeSet};

use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typeshare::typeshare;
use uuid::Uuid;

pub const CITY_MILESTONE_MAX: u8 = 20;
pub const CITY_POPULATION_MAX: u32 = 5_000_000;

/// The three resized/re-encoded variants produced by the image processor
/// (spec §4.3) and stored as blob names on the screenshot row.
#[typeshare]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobNames {
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub fhd: String,
    #[serde(default)]
    pub four_k: String,
}

impl BlobNames {
    pub fn is_empty(&self) -> bool {
        self.thumbnail.is_empty() && self.fhd.is_empty() && self.four_k.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        !self.thumbnail.is_empty() && !self.fhd.is_empty() && !self.four_k.is_empty()
    }
}

#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Screenshot {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub creator_id: Uuid,

    pub city_name: String,
    pub city_milestone: u8,
    pub city_population: u32,

    #[serde(default)]
    pub blobs: BlobNames,

    /// The uploader's HWID/IP at the time of ingest, used by the 24h quota
    /// check and abuse-control tooling — not necessarily the creator's
    /// *current* most-recent identifiers.
    pub hwid: String,
    pub ip: String,

    #[serde(default)]
    pub paradox_mod_ids: BTreeSet<u64>,
    #[serde(default)]
    pub render_settings: BTreeMap<String, f64>,
    #[serde(default)]
    pub metadata: bson::Document,

    #[serde(default)]
    pub is_approved: bool,
    #[serde(default)]
    pub is_reported: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reported_by_id: Option<Uuid>,

    #[serde(default)]
    pub favorites_count: u32,
    #[serde(default)]
    pub views_count: u32,
    #[serde(default)]
    pub unique_views_count: u32,
    #[serde(default)]
    pub favoriting_percentage: u32,

    /// Reconciled hourly (spec §4.8); absent on a freshly-ingested row until
    /// the first reconciliation pass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub views_per_day: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favorites_per_day: Option<f64>,

    pub created_at: DateTime<Utc>,
}

impl Screenshot {
    /// `favoritingPercentage = round(100 * favoritesCount / uniqueViewsCount)`
    /// when `uniqueViewsCount > 0`, else 0 (spec §3 invariant).
    pub fn compute_favoriting_percentage(favorites_count: u32, unique_views_count: u32) -> u32 {
        if unique_views_count == 0 {
            return 0;
        }
        ((favorites_count as f64 * 100.0) / unique_views_count as f64).round() as u32
    }

    pub fn recompute_favoriting_percentage(&mut self) {
        self.favoriting_percentage =
            Self::compute_favoriting_percentage(self.favorites_count, self.unique_views_count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn favoriting_percentage_is_zero_with_no_unique_views() {
        assert_eq!(Screenshot::compute_favoriting_percentage(5, 0), 0);
    }

    #[test]
    fn favoriting_percentage_rounds_to_nearest_integer() {
        assert_eq!(Screenshot::compute_favoriting_percentage(1, 3), 33);
        assert_eq!(Screenshot::compute_favoriting_percentage(2, 3), 67);
    }
}
