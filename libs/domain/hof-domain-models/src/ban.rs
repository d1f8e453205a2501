use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typeshare::typeshare;
use uuid::Uuid;

/// A ban entry keys on at least one of `creator_id`/`ip`/`hwid` (spec §3);
/// the registry (`hof-ban-registry`) checks all three independently.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ban {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hwid: Option<String>,

    pub reason: String,
    pub banned_at: DateTime<Utc>,
}

impl Ban {
    /// A ban row with none of the three keys set can never match anything
    /// and is rejected at construction (spec §3 invariant).
    pub fn is_well_formed(&self) -> bool {
        self.creator_id.is_some() || self.ip.is_some() || self.hwid.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(reason: &str) -> Ban {
        Ban {
            id: None,
            creator_id: None,
            ip: None,
            hwid: None,
            reason: reason.to_string(),
            banned_at: Utc::now(),
        }
    }

    #[test]
    fn rejects_ban_with_no_keys() {
        assert!(!base("spam").is_well_formed());
    }

    #[test]
    fn accepts_ban_with_one_key() {
        let mut ban = base("spam");
        ban.ip = Some("1.2.3.4".to_string());
        assert!(ban.is_well_formed());
    }
}
