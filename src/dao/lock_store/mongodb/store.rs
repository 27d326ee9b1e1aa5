use std::sync::Arc;

use futures::future::BoxFuture;
use mongodb::{
    Client, Collection, Database,
    bson::{DateTime, doc},
    error::{Error as MongoError, ErrorKind, WriteFailure},
};
use tokio::sync::RwLock;
use tracing::debug;

use super::{
    config::MongoConfig,
    connection::{establish_connection, ping},
    error::{MongoDaoError, MongoResult},
    models::{MongoLockDocument, free_lock, lock_id},
};
use crate::dao::{lock_store::GameLock, models::LockRecord, storage::StorageResult};

const LOCK_COLLECTION_NAME: &str = "game_locks";
const DUPLICATE_KEY_CODE: i32 = 11000;

/// Game lock stored as a single document keyed by the game instance identifier.
#[derive(Clone)]
pub struct MongoGameLock {
    inner: Arc<MongoInner>,
    game_id: Arc<str>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    #[allow(dead_code)]
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        ping(&database)
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

/// A conditional upsert that finds the record held inserts a second `_id` and is rejected.
fn is_duplicate_key(err: &MongoError) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY_CODE
    )
}

impl MongoGameLock {
    /// Connect to MongoDB and bind the lock to `game_id`.
    pub async fn connect(config: MongoConfig, game_id: impl Into<Arc<str>>) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        Ok(Self {
            inner,
            game_id: game_id.into(),
        })
    }

    async fn collection(&self) -> Collection<MongoLockDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoLockDocument>(LOCK_COLLECTION_NAME)
    }

    async fn record(&self) -> MongoResult<Option<LockRecord>> {
        let collection = self.collection().await;
        let document = collection
            .find_one(lock_id(&self.game_id))
            .await
            .map_err(|source| MongoDaoError::ReadLock {
                id: self.game_id.to_string(),
                source,
            })?;
        Ok(document.map(Into::into))
    }

    async fn try_acquire(&self) -> MongoResult<bool> {
        let collection = self.collection().await;
        let result = collection
            .update_one(
                free_lock(&self.game_id),
                doc! { "$set": { "state": "running", "updated_at": DateTime::now() } },
            )
            .upsert(true)
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(err) if is_duplicate_key(&err) => {
                debug!(game_id = %self.game_id, "game lock already held");
                Ok(false)
            }
            Err(source) => Err(MongoDaoError::AcquireLock {
                id: self.game_id.to_string(),
                source,
            }),
        }
    }

    async fn release(&self) -> MongoResult<()> {
        let collection = self.collection().await;
        collection
            .update_one(
                lock_id(&self.game_id),
                doc! {
                    "$unset": { "state": "" },
                    "$set": { "updated_at": DateTime::now() },
                },
            )
            .await
            .map_err(|source| MongoDaoError::ReleaseLock {
                id: self.game_id.to_string(),
                source,
            })?;
        Ok(())
    }
}

impl GameLock for MongoGameLock {
    fn is_running(&self) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let record = store.record().await?;
            Ok(record.is_some_and(|record| record.is_running()))
        })
    }

    fn try_acquire(&self) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.try_acquire().await.map_err(Into::into) })
    }

    fn release(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.release().await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
