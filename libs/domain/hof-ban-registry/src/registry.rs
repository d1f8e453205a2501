use std::time::Duration;

use chrono::Utc;
use hof_domain_models::{Ban, CoreError, Creator};
use hof_infra_persistence::{BanRepository, CreatorRepository, PersistenceError};
use moka::future::Cache;
use tracing::instrument;
use uuid::Uuid;

use crate::reason::normalize;

const MAX_ENTRIES: u64 = 200;
const TTL: Duration = Duration::from_secs(5 * 60);

/// A cached ban verdict for one identifier: confirmed clear, or confirmed
/// banned with the message to raise (spec §4.4 caches both outcomes).
#[derive(Debug, Clone)]
enum BanState {
    Clear,
    BannedIdentity(String),
    BannedCreator(String),
}

/// C4: TTL-LRU-cached ban checks, backed by [`BanRepository`].
#[derive(Clone)]
pub struct BanRegistry {
    bans: BanRepository,
    creators: CreatorRepository,
    cache: Cache<String, BanState>,
}

fn ip_key(ip: &str) -> String {
    format!("ip:{ip}")
}

fn hwid_key(hwid: &str) -> String {
    format!("hwid:{hwid}")
}

fn creator_key(creator_id: Uuid) -> String {
    format!("creator:{creator_id}")
}

impl BanRegistry {
    pub fn new(bans: BanRepository, creators: CreatorRepository) -> Self {
        Self {
            bans,
            creators,
            cache: Cache::builder().max_capacity(MAX_ENTRIES).time_to_live(TTL).build(),
        }
    }

    /// Raises if `ip` or `hwid` is banned. Short-circuits on a cache hit for
    /// either key (spec §4.4); otherwise performs one OR'd lookup and caches
    /// both the positive and negative outcome.
    #[instrument(skip(self))]
    pub async fn ensure_not_banned(&self, ip: &str, hwid: Option<&str>) -> Result<(), CoreError> {
        if let Some(state) = self.cache.get(&ip_key(ip)).await {
            return Self::raise(state);
        }
        if let Some(hwid) = hwid {
            if let Some(state) = self.cache.get(&hwid_key(hwid)).await {
                return Self::raise(state);
            }
        }

        let found = self
            .bans
            .find_matching(None, Some(ip), hwid)
            .await
            .map_err(persistence_error)?;

        match found {
            Some(ban) => {
                let state = self.resolve_state(&ban).await?;
                self.cache.insert(ip_key(ip), state.clone()).await;
                if let Some(hwid) = hwid {
                    self.cache.insert(hwid_key(hwid), state.clone()).await;
                }
                Self::raise(state)
            }
            None => {
                self.cache.insert(ip_key(ip), BanState::Clear).await;
                if let Some(hwid) = hwid {
                    self.cache.insert(hwid_key(hwid), BanState::Clear).await;
                }
                Ok(())
            }
        }
    }

    /// Raises if `creator` is banned by its `creatorId`. A banned creator's
    /// row set always includes a `creatorId`-keyed ban (spec §4.4
    /// `banCreator`), so checking that one key is sufficient.
    #[instrument(skip(self, creator))]
    pub async fn ensure_creator_not_banned(&self, creator: &Creator) -> Result<(), CoreError> {
        let key = creator_key(creator.creator_id);
        if let Some(state) = self.cache.get(&key).await {
            return Self::raise(state);
        }

        let found = self
            .bans
            .find_matching(Some(creator.creator_id), None, None)
            .await
            .map_err(persistence_error)?;

        match found {
            Some(ban) => {
                let state = self.resolve_state(&ban).await?;
                self.cache.insert(key, state.clone()).await;
                Self::raise(state)
            }
            None => {
                self.cache.insert(key, BanState::Clear).await;
                Ok(())
            }
        }
    }

    /// Bans every known identifier of `creator` in one batch: its
    /// `creatorId`, each known IP and each known HWID. Invalidates each
    /// cache key before writing so a concurrent reader can't observe a
    /// stale "clear" verdict once this returns.
    #[instrument(skip(self, creator))]
    pub async fn ban_creator(&self, creator: &Creator, reason: &str) -> Result<(), CoreError> {
        let reason = normalize(reason);
        let now = Utc::now();

        let mut rows = Vec::with_capacity(1 + creator.ips.len() + creator.hwids.len());
        self.cache.invalidate(&creator_key(creator.creator_id)).await;
        rows.push(Ban {
            id: None,
            creator_id: Some(creator.creator_id),
            ip: None,
            hwid: None,
            reason: reason.clone(),
            banned_at: now,
        });

        for ip in &creator.ips {
            self.cache.invalidate(&ip_key(ip)).await;
            rows.push(Ban {
                id: None,
                creator_id: None,
                ip: Some(ip.clone()),
                hwid: None,
                reason: reason.clone(),
                banned_at: now,
            });
        }

        for hwid in &creator.hwids {
            self.cache.invalidate(&hwid_key(hwid)).await;
            rows.push(Ban {
                id: None,
                creator_id: None,
                ip: None,
                hwid: Some(hwid.clone()),
                reason: reason.clone(),
                banned_at: now,
            });
        }

        self.bans.insert_many(&rows).await.map_err(persistence_error)
    }

    async fn resolve_state(&self, ban: &Ban) -> Result<BanState, CoreError> {
        if let Some(creator_id) = ban.creator_id {
            let creator = self
                .creators
                .find_by_creator_id(creator_id)
                .await
                .map_err(persistence_error)?;
            let name = creator
                .and_then(|c| c.creator_name)
                .unwrap_or_else(|| creator_id.to_string());
            Ok(BanState::BannedCreator(format!("creator {name} is banned: {}", ban.reason)))
        } else {
            Ok(BanState::BannedIdentity(format!("identity is banned: {}", ban.reason)))
        }
    }

    fn raise(state: BanState) -> Result<(), CoreError> {
        match state {
            BanState::Clear => Ok(()),
            BanState::BannedIdentity(message) => Err(CoreError::BannedIdentity(message)),
            BanState::BannedCreator(message) => Err(CoreError::BannedCreator(message)),
        }
    }
}

fn persistence_error(err: PersistenceError) -> CoreError {
    CoreError::Internal(err.to_string())
}
