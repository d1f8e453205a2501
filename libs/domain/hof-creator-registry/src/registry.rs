use std::sync::Arc;

use chrono::{DateTime, Utc};
use hof_background_jobs::BackgroundJobs;
use hof_domain_models::validation::{creator_name_slug, validate_creator_name};
use hof_domain_models::{Creator, CreatorIdProvider, CoreError};
use hof_infra_persistence::{CreatorRepository, PersistenceError};
use tracing::instrument;
use uuid::Uuid;

use crate::translator::NameTranslator;

/// The `CreatorID <uuid4>` scheme of spec §6.
#[derive(Debug, Clone)]
pub struct SimpleAuth {
    pub creator_id: Uuid,
    pub ip: String,
}

/// The `Creator name=...&id=...&provider=...&hwid=...` scheme of spec §6.
#[derive(Debug, Clone)]
pub struct ModAuth {
    pub creator_id: Uuid,
    pub creator_id_provider: CreatorIdProvider,
    pub creator_name: Option<String>,
    pub hwid: String,
    pub ip: String,
}

/// C5: authenticates and provisions creators from the two header schemes.
#[derive(Clone)]
pub struct CreatorRegistry {
    creators: CreatorRepository,
    translator: Arc<dyn NameTranslator>,
    jobs: BackgroundJobs,
}

impl CreatorRegistry {
    pub fn new(
        creators: CreatorRepository,
        translator: Arc<dyn NameTranslator>,
        jobs: BackgroundJobs,
    ) -> Self {
        Self { creators, translator, jobs }
    }

    /// The `simple` flow: look up by `creatorId` only, remembering `ip` if
    /// it isn't already the most recent entry.
    #[instrument(skip(self))]
    pub async fn authenticate_simple(&self, auth: &SimpleAuth) -> Result<Creator, CoreError> {
        let mut creator = self
            .creators
            .find_by_creator_id(auth.creator_id)
            .await
            .map_err(persistence_error)?
            .ok_or(CoreError::CreatorNotFound)?;

        if creator.most_recent_ip() != Some(auth.ip.as_str()) {
            creator.remember_ip(&auth.ip);
            self.creators.replace(&creator).await.map_err(persistence_error)?;
        }

        Ok(creator)
    }

    /// The `mod` flow of spec §4.5, including the retry-once-on-conflict
    /// recovery from a concurrent creation race.
    #[instrument(skip(self, auth))]
    pub async fn authenticate_mod(&self, auth: &ModAuth) -> Result<Creator, CoreError> {
        self.authenticate_mod_inner(auth, Utc::now(), false).await
    }

    fn authenticate_mod_inner<'a>(
        &'a self,
        auth: &'a ModAuth,
        now: DateTime<Utc>,
        retried: bool,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Creator, CoreError>> + Send + 'a>>
    {
        Box::pin(async move {
            if let Some(name) = &auth.creator_name {
                if !name.is_empty() {
                    validate_creator_name(name)?;
                }
            }
            let slug = auth
                .creator_name
                .as_deref()
                .filter(|n| !n.is_empty())
                .and_then(|n| creator_name_slug(Some(n)));

            let matches = self
                .creators
                .find_matching_identity_or_name(
                    auth.creator_id,
                    auth.creator_name.as_deref().filter(|n| !n.is_empty()),
                    slug.as_deref(),
                )
                .await
                .map_err(persistence_error)?;

            match matches.len() {
                0 => match self.create_new(auth, slug.clone(), now).await {
                    Ok(creator) => Ok(creator),
                    Err(CoreError::Conflict(_)) if !retried => {
                        self.authenticate_mod_inner(auth, now, true).await
                    }
                    Err(err) => Err(err),
                },
                1 => {
                    let existing = matches.into_iter().next().expect("len checked above");
                    self.authenticate_existing(auth, existing, slug, now).await
                }
                2 => Err(incorrect_creator_id_for_collision(auth, matches)),
                n => Err(CoreError::Internal(format!(
                    "{n} creators matched a single creatorId/name/slug lookup"
                ))),
            }
        })
    }

    async fn create_new(
        &self,
        auth: &ModAuth,
        slug: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Creator, CoreError> {
        let creator = Creator::new(
            auth.creator_id,
            auth.creator_id_provider,
            auth.creator_name.clone().filter(|n| !n.is_empty()),
            slug,
            Some(auth.ip.clone()),
            Some(auth.hwid.clone()),
            now,
        );

        self.creators.insert(&creator).await.map_err(|err| match err {
            PersistenceError::Conflict(message) => CoreError::Conflict(message),
            other => persistence_error(other),
        })?;

        if creator.creator_name.is_some() {
            self.schedule_translation(&creator);
        }

        Ok(creator)
    }

    async fn authenticate_existing(
        &self,
        auth: &ModAuth,
        mut creator: Creator,
        slug: Option<String>,
        _now: DateTime<Utc>,
    ) -> Result<Creator, CoreError> {
        if creator.creator_id != auth.creator_id && !creator.allow_creator_id_reset.unwrap_or(false)
        {
            return Err(CoreError::IncorrectCreatorId(format!(
                "creatorId is already claimed by creator {}",
                creator.creator_name.as_deref().unwrap_or("(anonymous)")
            )));
        }

        let name_changed = auth.creator_name.as_deref().filter(|n| !n.is_empty())
            != creator.creator_name.as_deref();

        if name_changed {
            creator.creator_name = auth.creator_name.clone().filter(|n| !n.is_empty());
            creator.creator_name_slug = slug;
        }

        creator.remember_ip(&auth.ip);
        creator.remember_hwid(&auth.hwid);
        creator.allow_creator_id_reset = Some(false);
        creator.creator_id = auth.creator_id;
        creator.creator_id_provider = auth.creator_id_provider;

        self.creators.replace(&creator).await.map_err(|err| match err {
            PersistenceError::Conflict(message) => CoreError::Conflict(message),
            other => persistence_error(other),
        })?;

        if name_changed {
            self.schedule_translation(&creator);
        }

        Ok(creator)
    }

    fn schedule_translation(&self, creator: &Creator) {
        let Some(name) = creator.creator_name.clone() else { return };
        let creator_id = creator.creator_id;
        let translator = self.translator.clone();
        let creators = self.creators.clone();

        self.jobs.spawn("translate-creator-name", async move {
            let translated = translator.translate(&name).await?;
            creators.set_translated_name(creator_id, &translated).await?;
            Ok::<(), crate::errors::TranslationError>(())
        });
    }
}

/// Picks the row whose name/slug — not its `creatorId` — is the one the
/// caller is trying to claim, so the error names the actual conflict.
fn incorrect_creator_id_for_collision(auth: &ModAuth, matches: Vec<Creator>) -> CoreError {
    let conflicting = matches
        .iter()
        .find(|c| c.creator_id != auth.creator_id)
        .unwrap_or(&matches[0]);

    CoreError::IncorrectCreatorId(format!(
        "the name/slug is already claimed by creator {}",
        conflicting.creator_name.as_deref().unwrap_or("(anonymous)")
    ))
}

fn persistence_error(err: PersistenceError) -> CoreError {
    CoreError::Internal(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incorrect_creator_id_names_the_conflicting_row() {
        let auth = ModAuth {
            creator_id: Uuid::new_v4(),
            creator_id_provider: CreatorIdProvider::Local,
            creator_name: Some("Alice".to_string()),
            hwid: "hw-1".to_string(),
            ip: "1.1.1.1".to_string(),
        };

        let mine = Creator::new(
            auth.creator_id,
            CreatorIdProvider::Local,
            None,
            None,
            None,
            None,
            Utc::now(),
        );
        let other = Creator::new(
            Uuid::new_v4(),
            CreatorIdProvider::Local,
            Some("Alice".to_string()),
            Some("alice".to_string()),
            None,
            None,
            Utc::now(),
        );

        let err = incorrect_creator_id_for_collision(&auth, vec![mine, other]);
        assert!(matches!(err, CoreError::IncorrectCreatorId(message) if message.contains("Alice")));
    }
}
