use bson::oid::ObjectId;
use chrono::Utc;
use futures_util::future::try_join_all;
use hof_domain_models::{CoreError, Creator, Favorite};
use hof_infra_persistence::{FavoriteRepository, PersistenceError, ScreenshotRepository};
use tracing::instrument;

/// C7: "one identity, one favorite" — every lookup is the OR of
/// `creatorId`/`ip ∈ c.ips`/`hwid ∈ c.hwids` scoped to a screenshot.
#[derive(Clone)]
pub struct FavoriteTracker {
    favorites: FavoriteRepository,
    screenshots: ScreenshotRepository,
}

impl FavoriteTracker {
    pub fn new(favorites: FavoriteRepository, screenshots: ScreenshotRepository) -> Self {
        Self { favorites, screenshots }
    }

    #[instrument(skip(self, creator))]
    pub async fn is_favorite(
        &self,
        screenshot_id: ObjectId,
        creator: &Creator,
    ) -> Result<bool, CoreError> {
        Ok(self.find_existing(screenshot_id, creator).await?.is_some())
    }

    /// Batched variant of [`Self::is_favorite`], returning booleans in
    /// input order. Lookups run concurrently since they're independent.
    #[instrument(skip(self, creator))]
    pub async fn are_favorites(
        &self,
        screenshot_ids: &[ObjectId],
        creator: &Creator,
    ) -> Result<Vec<bool>, CoreError> {
        try_join_all(screenshot_ids.iter().map(|&id| self.is_favorite(id, creator)))
            .await
    }

    /// Raises [`CoreError::AlreadyFavorited`] if any known identity of
    /// `creator` already has a row for `screenshot_id`; otherwise inserts
    /// one using the creator's most recent ip/hwid and bumps
    /// `favoritesCount`.
    #[instrument(skip(self, creator))]
    pub async fn add_favorite(
        &self,
        screenshot_id: ObjectId,
        creator: &Creator,
    ) -> Result<(), CoreError> {
        if self.find_existing(screenshot_id, creator).await?.is_some() {
            return Err(CoreError::AlreadyFavorited);
        }

        let ip = creator
            .most_recent_ip()
            .ok_or_else(|| CoreError::Internal("creator has no known ip to favorite with".to_string()))?;

        let favorite = Favorite {
            id: None,
            screenshot_id,
            creator_id: creator.creator_id,
            ip: ip.to_string(),
            hwid: creator.most_recent_hwid().map(str::to_string),
            favorited_at: Utc::now(),
        };

        self.favorites.insert(&favorite).await.map_err(persistence_error)?;
        self.screenshots
            .increment_favorites_count(screenshot_id, 1)
            .await
            .map_err(persistence_error)
    }

    /// The mirror of [`Self::add_favorite`]: raises
    /// [`CoreError::NotFavorited`] when no identity of `creator` has a row.
    #[instrument(skip(self, creator))]
    pub async fn remove_favorite(
        &self,
        screenshot_id: ObjectId,
        creator: &Creator,
    ) -> Result<(), CoreError> {
        let existing = self
            .find_existing(screenshot_id, creator)
            .await?
            .ok_or(CoreError::NotFavorited)?;

        let id = existing
            .id
            .ok_or_else(|| CoreError::Internal("favorite row has no id".to_string()))?;

        self.favorites.delete(id).await.map_err(persistence_error)?;
        self.screenshots
            .increment_favorites_count(screenshot_id, -1)
            .await
            .map_err(persistence_error)
    }

    async fn find_existing(
        &self,
        screenshot_id: ObjectId,
        creator: &Creator,
    ) -> Result<Option<Favorite>, CoreError> {
        self.favorites
            .find_by_identity(screenshot_id, creator.creator_id, &creator.ips, &creator.hwids)
            .await
            .map_err(persistence_error)
    }
}

fn persistence_error(err: PersistenceError) -> CoreError {
    CoreError::Internal(err.to_string())
}
