//! Merge (spec §4.10.5): folds a set of source screenshots into one
//! target, inside a single transaction — favorites and views are
//! deduplicated by favoriter/viewer identity (earliest timestamp wins) and
//! re-parented, the source rows are deleted, and the target's counters are
//! reconciled once the merge commits.

use std::collections::BTreeMap;

use bson::oid::ObjectId;
use hof_domain_models::{CoreError, Favorite, View};
use hof_infra_blobstore::client::UploadedNames;
use hof_infra_persistence::{FavoriteRepository, PersistenceError, ViewRepository};
use mongodb::ClientSession;
use tracing::instrument;
use uuid::Uuid;

use crate::delete::delete_row_in_session;
use crate::engine::{persistence_error, ScreenshotEngine};

#[instrument(skip(engine, source_ids))]
pub(crate) async fn merge(
    engine: &ScreenshotEngine,
    target_id: ObjectId,
    source_ids: &[ObjectId],
) -> Result<(), CoreError> {
    if source_ids.is_empty() {
        return Ok(());
    }

    let mut source_screenshots = Vec::with_capacity(source_ids.len());
    let mut source_embedding_ids = Vec::new();
    for &id in source_ids {
        let screenshot = engine
            .screenshots
            .find_by_id(id)
            .await
            .map_err(persistence_error)?
            .ok_or_else(|| CoreError::NotFoundById(id.to_hex()))?;
        source_screenshots.push(screenshot);

        if let Some(embedding) = engine
            .embeddings
            .find_by_screenshot_id(id)
            .await
            .map_err(persistence_error)?
        {
            source_embedding_ids.push(embedding.id);
        }
    }

    let mut all_ids = Vec::with_capacity(source_ids.len() + 1);
    all_ids.push(target_id);
    all_ids.extend_from_slice(source_ids);

    let source_ids_owned = source_ids.to_vec();

    hof_infra_persistence::with_transaction(&engine.gateway, |session| {
        let favorites = engine.favorites.clone();
        let views = engine.views.clone();
        let screenshots = engine.screenshots.clone();
        let embeddings = engine.embeddings.clone();
        let all_ids = all_ids.clone();
        let source_ids_owned = source_ids_owned.clone();

        async move {
            merge_favorites_in_session(&favorites, target_id, &all_ids, session).await?;
            merge_views_in_session(&views, target_id, &all_ids, session).await?;

            for source_id in source_ids_owned {
                delete_row_in_session(&screenshots, &embeddings, source_id, session).await?;
            }

            Ok(())
        }
    })
    .await
    .map_err(|err| match err {
        PersistenceError::NotFound(message) => CoreError::NotFoundById(message),
        other => persistence_error(other),
    })?;

    for screenshot in source_screenshots {
        if screenshot.blobs.is_empty() {
            continue;
        }
        let names = UploadedNames {
            thumbnail: screenshot.blobs.thumbnail,
            fhd: screenshot.blobs.fhd,
            four_k: screenshot.blobs.four_k,
        };
        engine
            .blobs
            .delete_images(&names)
            .await
            .map_err(|err| CoreError::Internal(err.to_string()))?;
    }

    for embedding_id in source_embedding_ids {
        engine
            .similarity
            .forget_index_entry(&embedding_id)
            .map_err(|err| CoreError::Internal(err.to_string()))?;
    }

    engine
        .stats
        .reconcile_ids(&[target_id])
        .await
        .map_err(persistence_error)?;

    Ok(())
}

/// Groups every favorite row across `all_ids` by favoriter identity — the
/// OR of `creatorId`, `hwid`, `ip` (spec §4.10.5, §3's Favorite invariant),
/// not `creatorId` alone — keeps the one with the earliest `favoritedAt`
/// per group, re-parents it to `target_id` if it wasn't already there, and
/// drops the rest. Two rows from distinct `creatorId`s that share an `ip`
/// or `hwid` are the same identity and must collapse to one favorite, the
/// same multi-account guard `hof-favorite-tracker` enforces at add-time.
async fn merge_favorites_in_session(
    favorites: &FavoriteRepository,
    target_id: ObjectId,
    all_ids: &[ObjectId],
    session: &mut ClientSession,
) -> Result<(), PersistenceError> {
    let rows = favorites.find_by_screenshot_ids_in_session(all_ids, session).await?;

    for mut group in group_favorites_by_identity(rows) {
        group.sort_by_key(|favorite| favorite.favorited_at);
        let mut rest = group.split_off(1);
        let keeper = group.pop().expect("group is never empty");
        let keeper_id = keeper.id.expect("persisted favorite has an id");

        if keeper.screenshot_id != target_id {
            favorites.reparent_in_session(keeper_id, target_id, session).await?;
        }

        for duplicate in rest.drain(..) {
            let duplicate_id = duplicate.id.expect("persisted favorite has an id");
            favorites.delete_in_session(duplicate_id, session).await?;
        }
    }

    Ok(())
}

/// Partitions `rows` into identity groups under the OR-of-{creatorId, ip,
/// hwid} relation: two rows are in the same group if they match directly,
/// or transitively through a chain of such matches (e.g. row A and row C
/// share no field directly but both match row B). Union-find over the row
/// indices, unioning on each shared key as it's first seen.
fn group_favorites_by_identity(rows: Vec<Favorite>) -> Vec<Vec<Favorite>> {
    let mut parent: Vec<usize> = (0..rows.len()).collect();

    fn find(parent: &mut [usize], mut x: usize) -> usize {
        while parent[x] != x {
            parent[x] = parent[parent[x]];
            x = parent[x];
        }
        x
    }

    fn union(parent: &mut [usize], a: usize, b: usize) {
        let (ra, rb) = (find(parent, a), find(parent, b));
        if ra != rb {
            parent[ra] = rb;
        }
    }

    let mut by_creator: BTreeMap<Uuid, usize> = BTreeMap::new();
    let mut by_ip: BTreeMap<String, usize> = BTreeMap::new();
    let mut by_hwid: BTreeMap<String, usize> = BTreeMap::new();

    for (index, row) in rows.iter().enumerate() {
        match by_creator.entry(row.creator_id) {
            std::collections::btree_map::Entry::Occupied(entry) => union(&mut parent, *entry.get(), index),
            std::collections::btree_map::Entry::Vacant(entry) => {
                entry.insert(index);
            }
        }
        match by_ip.entry(row.ip.clone()) {
            std::collections::btree_map::Entry::Occupied(entry) => union(&mut parent, *entry.get(), index),
            std::collections::btree_map::Entry::Vacant(entry) => {
                entry.insert(index);
            }
        }
        if let Some(hwid) = &row.hwid {
            match by_hwid.entry(hwid.clone()) {
                std::collections::btree_map::Entry::Occupied(entry) => union(&mut parent, *entry.get(), index),
                std::collections::btree_map::Entry::Vacant(entry) => {
                    entry.insert(index);
                }
            }
        }
    }

    let mut groups: BTreeMap<usize, Vec<Favorite>> = BTreeMap::new();
    for (index, row) in rows.into_iter().enumerate() {
        let root = find(&mut parent, index);
        groups.entry(root).or_default().push(row);
    }
    groups.into_values().collect()
}

/// Same dedupe-by-identity-keep-earliest rule as
/// [`merge_favorites_in_session`], applied to views, where identity is
/// simply `creatorId` (spec §3's View uniqueness invariant).
async fn merge_views_in_session(
    views: &ViewRepository,
    target_id: ObjectId,
    all_ids: &[ObjectId],
    session: &mut ClientSession,
) -> Result<(), PersistenceError> {
    let rows = views.find_by_screenshot_ids_in_session(all_ids, session).await?;
    let mut groups: BTreeMap<Uuid, Vec<View>> = BTreeMap::new();
    for row in rows {
        groups.entry(row.creator_id).or_default().push(row);
    }

    for (_creator_id, mut group) in groups {
        group.sort_by_key(|view| view.viewed_at);
        let mut rest = group.split_off(1);
        let keeper = group.pop().expect("group is never empty");
        let keeper_id = keeper.id.expect("persisted view has an id");

        if keeper.screenshot_id != target_id {
            views.reparent_in_session(keeper_id, target_id, session).await?;
        }

        for duplicate in rest.drain(..) {
            let duplicate_id = duplicate.id.expect("persisted view has an id");
            views.delete_in_session(duplicate_id, session).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn favorite(
        screenshot_id: ObjectId,
        creator_id: Uuid,
        ip: &str,
        hwid: Option<&str>,
        minutes_ago: i64,
    ) -> Favorite {
        Favorite {
            id: Some(ObjectId::new()),
            screenshot_id,
            creator_id,
            ip: ip.to_string(),
            hwid: hwid.map(str::to_string),
            favorited_at: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    #[test]
    fn earliest_favorite_per_creator_wins() {
        let target = ObjectId::new();
        let source = ObjectId::new();
        let creator = Uuid::new_v4();

        let target_fav = favorite(target, creator, "1.2.3.4", None, 10);
        let source_fav = favorite(source, creator, "1.2.3.4", None, 5);

        let mut group = vec![source_fav.clone(), target_fav.clone()];
        group.sort_by_key(|favorite| favorite.favorited_at);
        assert_eq!(group[0].screenshot_id, target);
    }

    #[test]
    fn distinct_creator_ids_sharing_an_ip_collapse_to_one_group() {
        let target = ObjectId::new();
        let source = ObjectId::new();

        let a = favorite(target, Uuid::new_v4(), "9.9.9.9", None, 10);
        let b = favorite(source, Uuid::new_v4(), "9.9.9.9", None, 5);

        let groups = group_favorites_by_identity(vec![a, b]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 2);
    }

    #[test]
    fn distinct_creator_ids_sharing_a_hwid_collapse_to_one_group() {
        let target = ObjectId::new();
        let source = ObjectId::new();

        let a = favorite(target, Uuid::new_v4(), "1.1.1.1", Some("H1"), 10);
        let b = favorite(source, Uuid::new_v4(), "2.2.2.2", Some("H1"), 5);

        let groups = group_favorites_by_identity(vec![a, b]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 2);
    }

    #[test]
    fn unrelated_identities_stay_in_separate_groups() {
        let target = ObjectId::new();
        let source = ObjectId::new();

        let a = favorite(target, Uuid::new_v4(), "1.1.1.1", Some("H1"), 10);
        let b = favorite(source, Uuid::new_v4(), "2.2.2.2", Some("H2"), 5);

        let groups = group_favorites_by_identity(vec![a, b]);
        assert_eq!(groups.len(), 2);
    }
}
