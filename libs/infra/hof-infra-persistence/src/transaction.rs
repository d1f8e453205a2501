use std::future::Future;

use mongodb::ClientSession;

use crate::client::MongoGateway;
use crate::errors::PersistenceError;

/// Runs `body` inside a MongoDB multi-document transaction, committing on
/// success and aborting on error. Used by operations that touch more than
/// one collection and must be all-or-nothing — e.g. screenshot deletion,
/// which removes the screenshot row, its favorites/views and its embedding
/// together (spec §4.10.2).
pub async fn with_transaction<F, Fut, T>(
    gateway: &MongoGateway,
    body: F,
) -> Result<T, PersistenceError>
where
    F: FnOnce(&mut ClientSession) -> Fut,
    Fut: Future<Output = Result<T, PersistenceError>>,
{
    let mut session = gateway
        .database()
        .client()
        .start_session()
        .await
        .map_err(PersistenceError::Query)?;

    session
        .start_transaction()
        .await
        .map_err(PersistenceError::Query)?;

    let result = body(&mut session).await;

    match result {
        Ok(value) => {
            session
                .commit_transaction()
                .await
                .map_err(PersistenceError::Query)?;
            Ok(value)
        }
        Err(err) => {
            let _ = session.abort_transaction().await;
            Err(err)
        }
    }
}
