use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typeshare::typeshare;
use uuid::Uuid;

/// Creators keep at most this many of their most recent IPs/HWIDs (spec §3).
pub const MAX_RECENT_IDENTIFIERS: usize = 3;

#[typeshare]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreatorIdProvider {
    Paradox,
    Local,
}

#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslatedName {
    pub locale: String,
    pub latinized: String,
    pub translated: String,
    pub needs_translation: bool,
}

#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Social {
    pub platform: String,
    pub link: String,
    pub clicks: u64,
}

#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Creator {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub creator_id: Uuid,
    pub creator_id_provider: CreatorIdProvider,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator_name_slug: Option<String>,

    /// Newest first, deduplicated, capped at [`MAX_RECENT_IDENTIFIERS`].
    pub ips: Vec<String>,
    /// Newest first, deduplicated, capped at [`MAX_RECENT_IDENTIFIERS`].
    pub hwids: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_supporter: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_creator_id_reset: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translated_name: Option<TranslatedName>,

    #[serde(default)]
    pub socials: Vec<Social>,

    pub created_at: DateTime<Utc>,
}

impl Creator {
    pub fn new(
        creator_id: Uuid,
        creator_id_provider: CreatorIdProvider,
        creator_name: Option<String>,
        creator_name_slug: Option<String>,
        ip: Option<String>,
        hwid: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            creator_id,
            creator_id_provider,
            creator_name,
            creator_name_slug,
            ips: ip.into_iter().collect(),
            hwids: hwid.into_iter().collect(),
            is_supporter: None,
            allow_creator_id_reset: None,
            translated_name: None,
            socials: Vec::new(),
            created_at: now,
        }
    }

    /// Prepends `ip` to [`Self::ips`] if it isn't already the most recent
    /// entry, deduplicating and clamping to [`MAX_RECENT_IDENTIFIERS`].
    pub fn remember_ip(&mut self, ip: &str) {
        prepend_dedup_clamp(&mut self.ips, ip);
    }

    /// Prepends `hwid` to [`Self::hwids`], same rule as [`Self::remember_ip`].
    pub fn remember_hwid(&mut self, hwid: &str) {
        prepend_dedup_clamp(&mut self.hwids, hwid);
    }

    /// The creator's current (most recent) IP, if any was ever recorded.
    pub fn most_recent_ip(&self) -> Option<&str> {
        self.ips.first().map(String::as_str)
    }

    /// The creator's current (most recent) HWID, if any was ever recorded.
    pub fn most_recent_hwid(&self) -> Option<&str> {
        self.hwids.first().map(String::as_str)
    }

    /// True if `ip` or `hwid` matches one of this creator's known
    /// identifiers — the "OR of identity" rule used throughout §4.4/§4.7.
    pub fn owns_identity(&self, ip: Option<&str>, hwid: Option<&str>) -> bool {
        ip.is_some_and(|ip| self.ips.iter().any(|known| known == ip))
            || hwid.is_some_and(|hwid| self.hwids.iter().any(|known| known == hwid))
    }
}

fn prepend_dedup_clamp(list: &mut Vec<String>, value: &str) {
    if list.first().map(String::as_str) == Some(value) {
        return;
    }
    list.retain(|existing| existing != value);
    list.insert(0, value.to_string());
    list.truncate(MAX_RECENT_IDENTIFIERS);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remember_ip_dedupes_and_clamps() {
        let mut creator = Creator::new(
            Uuid::new_v4(),
            CreatorIdProvider::Paradox,
            None,
            None,
            Some("1.1.1.1".into()),
            None,
            Utc::now(),
        );
        creator.remember_ip("2.2.2.2");
        creator.remember_ip("3.3.3.3");
        creator.remember_ip("4.4.4.4");
        creator.remember_ip("1.1.1.1"); // resurface an old one

        assert_eq!(creator.ips, vec!["1.1.1.1", "4.4.4.4", "3.3.3.3"]);
    }

    #[test]
    fn remember_ip_is_a_noop_when_already_most_recent() {
        let mut creator = Creator::new(
            Uuid::new_v4(),
            CreatorIdProvider::Paradox,
            None,
            None,
            Some("1.1.1.1".into()),
            None,
            Utc::now(),
        );
        creator.remember_ip("1.1.1.1");
        assert_eq!(creator.ips, vec!["1.1.1.1"]);
    }
}
