//! Weighted random selection (spec §4.10.4): one of the five algorithms in
//! the closed set `{random, trending, recent, archeologist, supporter}` is
//! drawn by weight, retried with that algorithm's weight zeroed whenever it
//! comes up empty, until either one succeeds or every weight has been
//! exhausted — at which point the caller falls back to pure `random`
//! ignoring the excluded-ids set and the result is tagged `random_default`.

use bson::doc;
use bson::oid::ObjectId;
use chrono::{Duration, Utc};
use hof_domain_models::{CoreError, Screenshot};
use rand::Rng;
use uuid::Uuid;

use crate::engine::{persistence_error, ScreenshotEngine};

const TOP_CANDIDATES_LIMIT: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Algorithm {
    Random,
    Trending,
    Recent,
    Archeologist,
    Supporter,
}

impl Algorithm {
    fn tag(self) -> &'static str {
        match self {
            Algorithm::Random => "random",
            Algorithm::Trending => "trending",
            Algorithm::Recent => "recent",
            Algorithm::Archeologist => "archeologist",
            Algorithm::Supporter => "supporter",
        }
    }
}

/// The per-algorithm weights of spec §4.10.4, in the fixed declaration
/// order the spec's closed set names them — this is the "insertion order"
/// the outer loop walks when drawing.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectionWeights {
    pub random: u32,
    pub trending: u32,
    pub recent: u32,
    pub archeologist: u32,
    pub supporter: u32,
}

impl SelectionWeights {
    fn ordered(self) -> [(Algorithm, u32); 5] {
        [
            (Algorithm::Random, self.random),
            (Algorithm::Trending, self.trending),
            (Algorithm::Recent, self.recent),
            (Algorithm::Archeologist, self.archeologist),
            (Algorithm::Supporter, self.supporter),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct SelectionRequest {
    pub weights: SelectionWeights,
    pub creator_id: Option<Uuid>,
    /// Window, in days, for the viewed-ids exclusion set (spec §4.10.4);
    /// defaults to 60 when unset.
    pub view_max_age_days: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct SelectedScreenshot {
    pub screenshot: Screenshot,
    pub algorithm: String,
}

const DEFAULT_VIEW_MAX_AGE_DAYS: u32 = 60;

pub(crate) async fn select(
    engine: &ScreenshotEngine,
    request: SelectionRequest,
    rng: &mut impl Rng,
) -> Result<SelectedScreenshot, CoreError> {
    let exclude_ids: Vec<ObjectId> = match request.creator_id {
        Some(creator_id) => {
            let max_age = request.view_max_age_days.or(Some(DEFAULT_VIEW_MAX_AGE_DAYS));
            engine
                .view_tracker
                .viewed_screenshot_ids(creator_id, max_age)
                .await
                .map_err(persistence_error)?
                .into_iter()
                .collect()
        }
        None => Vec::new(),
    };

    let mut weights = request.weights.ordered();

    loop {
        let sum: u32 = weights.iter().map(|&(_, weight)| weight).sum();
        if sum == 0 {
            return fall_back_to_random(engine, rng).await;
        }

        let mut r = rng.gen_range(0..sum);
        let mut drawn = None;
        for &(algorithm, weight) in &weights {
            if weight == 0 {
                continue;
            }
            if r < weight {
                drawn = Some(algorithm);
                break;
            }
            r -= weight;
        }
        let Some(algorithm) = drawn else {
            return fall_back_to_random(engine, rng).await;
        };

        let outcome = run_algorithm(engine, algorithm, &exclude_ids, rng).await?;
        if let Some(screenshot) = outcome {
            return Ok(SelectedScreenshot {
                screenshot,
                algorithm: algorithm.tag().to_string(),
            });
        }

        for entry in &mut weights {
            if entry.0 == algorithm {
                entry.1 = 0;
            }
        }
    }
}

async fn fall_back_to_random(
    engine: &ScreenshotEngine,
    rng: &mut impl Rng,
) -> Result<SelectedScreenshot, CoreError> {
    let screenshot = run_random(engine, &[], rng)
        .await?
        .ok_or_else(|| CoreError::NotFoundById("no screenshots available to select".to_string()))?;
    Ok(SelectedScreenshot {
        screenshot,
        algorithm: "random_default".to_string(),
    })
}

async fn run_algorithm(
    engine: &ScreenshotEngine,
    algorithm: Algorithm,
    exclude_ids: &[ObjectId],
    rng: &mut impl Rng,
) -> Result<Option<Screenshot>, CoreError> {
    match algorithm {
        Algorithm::Random => run_random(engine, exclude_ids, rng).await,
        Algorithm::Trending => run_trending(engine, exclude_ids, rng).await,
        Algorithm::Recent => run_recent(engine, exclude_ids, rng).await,
        Algorithm::Archeologist => run_archeologist(engine, exclude_ids, rng).await,
        Algorithm::Supporter => run_supporter(engine, rng).await,
    }
}

async fn run_random(
    engine: &ScreenshotEngine,
    exclude_ids: &[ObjectId],
    _rng: &mut impl Rng,
) -> Result<Option<Screenshot>, CoreError> {
    engine
        .screenshots
        .sample_random(exclude_ids)
        .await
        .map_err(persistence_error)
}

async fn run_trending(
    engine: &ScreenshotEngine,
    exclude_ids: &[ObjectId],
    rng: &mut impl Rng,
) -> Result<Option<Screenshot>, CoreError> {
    let candidates = engine
        .screenshots
        .top_candidates(
            doc! { "favoritingPercentage": { "$gt": 1 } },
            doc! { "favoritingPercentage": -1 },
            exclude_ids,
            TOP_CANDIDATES_LIMIT,
        )
        .await
        .map_err(persistence_error)?;
    Ok(uniform_pick(candidates, rng))
}

async fn run_recent(
    engine: &ScreenshotEngine,
    exclude_ids: &[ObjectId],
    rng: &mut impl Rng,
) -> Result<Option<Screenshot>, CoreError> {
    let cutoff = Utc::now() - Duration::days(i64::from(engine.recency_threshold_days));
    let candidates = engine
        .screenshots
        .top_candidates(
            doc! { "createdAt": { "$gte": bson::DateTime::from_chrono(cutoff) } },
            doc! { "viewsCount": 1, "createdAt": 1 },
            exclude_ids,
            TOP_CANDIDATES_LIMIT,
        )
        .await
        .map_err(persistence_error)?;
    Ok(uniform_pick(candidates, rng))
}

async fn run_archeologist(
    engine: &ScreenshotEngine,
    exclude_ids: &[ObjectId],
    rng: &mut impl Rng,
) -> Result<Option<Screenshot>, CoreError> {
    let cutoff = Utc::now() - Duration::days(i64::from(engine.recency_threshold_days));
    let candidates = engine
        .screenshots
        .top_candidates(
            doc! { "createdAt": { "$lt": bson::DateTime::from_chrono(cutoff) } },
            doc! { "viewsCount": 1, "createdAt": 1 },
            exclude_ids,
            TOP_CANDIDATES_LIMIT,
        )
        .await
        .map_err(persistence_error)?;
    Ok(uniform_pick(candidates, rng))
}

async fn run_supporter(
    engine: &ScreenshotEngine,
    _rng: &mut impl Rng,
) -> Result<Option<Screenshot>, CoreError> {
    let Some(creator) = engine.creators.sample_supporter().await.map_err(persistence_error)? else {
        return Ok(None);
    };
    engine
        .screenshots
        .oldest_least_viewed_by_creator(creator.creator_id)
        .await
        .map_err(persistence_error)
}

fn uniform_pick(mut candidates: Vec<Screenshot>, rng: &mut impl Rng) -> Option<Screenshot> {
    if candidates.is_empty() {
        return None;
    }
    let index = rng.gen_range(0..candidates.len());
    Some(candidates.swap_remove(index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordered_weights_preserve_declaration_order() {
        let weights = SelectionWeights {
            random: 1,
            trending: 2,
            recent: 3,
            archeologist: 4,
            supporter: 5,
        };
        let tags: Vec<&str> = weights.ordered().iter().map(|&(a, _)| a.tag()).collect();
        assert_eq!(tags, ["random", "trending", "recent", "archeologist", "supporter"]);
    }

    #[test]
    fn uniform_pick_returns_none_for_an_empty_pool() {
        let mut rng = rand::thread_rng();
        assert!(uniform_pick(Vec::new(), &mut rng).is_none());
    }
}
