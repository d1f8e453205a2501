use mongodb::{Client, Database};
use tracing::{info, instrument};

use crate::errors::PersistenceError;

/// Thin wrapper around a [`mongodb::Client`] that owns the database handle
/// every repository borrows from. Cloning is cheap — the underlying driver
/// pools connections internally.
#[derive(Clone)]
pub struct MongoGateway {
    database: Database,
}

impl MongoGateway {
    #[instrument(skip(connection_url))]
    pub async fn connect(
        connection_url: &str,
        database_name: &str,
    ) -> Result<Self, PersistenceError> {
        if connection_url.is_empty() {
            return Err(PersistenceError::Connection(
                "database connection url is empty".to_string(),
            ));
        }

        let client = Client::with_uri_str(connection_url)
            .await
            .map_err(|err| PersistenceError::Connection(err.to_string()))?;

        let database = client.database(database_name);
        let gateway = Self { database };
        gateway.probe().await?;

        info!(database = database_name, "connected to persistence gateway");
        Ok(gateway)
    }

    /// Verifies connectivity by requesting database statistics, run once at
    /// startup. A bare connect (or a `ping`) can succeed against a driver
    /// that never actually reaches the server; `dbStats` forces a real
    /// round trip against the target database.
    pub async fn probe(&self) -> Result<(), PersistenceError> {
        self.database
            .run_command(bson::doc! { "dbStats": 1 })
            .await
            .map_err(PersistenceError::Query)?;
        Ok(())
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn collection<T>(&self, name: &str) -> mongodb::Collection<T>
    where
        T: serde::Serialize + serde::de::DeserializeOwned + Send + Sync,
    {
        self.database.collection::<T>(name)
    }
}
