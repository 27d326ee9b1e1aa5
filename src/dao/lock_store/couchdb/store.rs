use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::{debug, warn};

use crate::dao::{lock_store::GameLock, models::LockState, storage::StorageResult};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{CouchLockDocument, lock_doc_id},
};

const RELEASE_ATTEMPTS: u32 = 3;

/// Game lock kept in a single CouchDB document, guarded by its revision.
#[derive(Clone)]
pub struct CouchGameLock {
    client: Client,
    base_url: Arc<str>,
    database: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
    doc_id: Arc<str>,
}

impl CouchGameLock {
    /// Reach CouchDB, create the database when missing and bind the lock to `game_id`.
    pub async fn connect(config: CouchConfig, game_id: &str) -> CouchResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let auth = config
            .username
            .zip(config.password)
            .map(|(u, p)| (Arc::<str>::from(u), Arc::<str>::from(p)));

        let lock = Self {
            client,
            base_url: Arc::from(config.base_url.trim_end_matches('/')),
            database: Arc::from(config.database),
            auth,
            doc_id: Arc::from(lock_doc_id(game_id)),
        };

        lock.ensure_database().await?;
        Ok(lock)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.auth {
            Some((ref user, ref pass)) => builder.basic_auth(user.as_ref(), Some(pass.as_ref())),
            None => builder,
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}/{}", self.base_url, self.database, path);
        self.authorized(self.client.request(method, url))
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let database = self.database.to_string();
        let url = format!("{}/{}", self.base_url, self.database);

        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(|source| CouchDaoError::DatabaseQuery {
                database: database.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let create = self
                    .authorized(self.client.put(&url))
                    .send()
                    .await
                    .map_err(|source| CouchDaoError::DatabaseCreate {
                        database: database.clone(),
                        source,
                    })?;
                // 412 means another instance created it first.
                if create.status().is_success()
                    || create.status() == StatusCode::PRECONDITION_FAILED
                {
                    Ok(())
                } else {
                    Err(CouchDaoError::DatabaseStatus {
                        database,
                        status: create.status(),
                    })
                }
            }
            other => Err(CouchDaoError::DatabaseStatus {
                database,
                status: other,
            }),
        }
    }

    async fn get_document(&self) -> CouchResult<Option<CouchLockDocument>> {
        let response = self
            .request(Method::GET, &self.doc_id)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: self.doc_id.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response
                .json::<CouchLockDocument>()
                .await
                .map(Some)
                .map_err(|source| CouchDaoError::DecodeResponse {
                    path: self.doc_id.to_string(),
                    source,
                }),
            other => Err(CouchDaoError::RequestStatus {
                path: self.doc_id.to_string(),
                status: other,
            }),
        }
    }

    /// Write the document. Returns `false` when its revision is stale.
    async fn put_document(&self, document: &CouchLockDocument) -> CouchResult<bool> {
        let response = self
            .request(Method::PUT, &self.doc_id)
            .json(document)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: self.doc_id.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::CONFLICT => Ok(false),
            status if status.is_success() => Ok(true),
            other => Err(CouchDaoError::RequestStatus {
                path: self.doc_id.to_string(),
                status: other,
            }),
        }
    }

    async fn ping(&self) -> CouchResult<()> {
        let response = self
            .authorized(self.client.get(format!("{}/_up", self.base_url)))
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: "_up".to_owned(),
                source,
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(CouchDaoError::RequestStatus {
                path: "_up".to_owned(),
                status: response.status(),
            })
        }
    }

    async fn is_running(&self) -> CouchResult<bool> {
        Ok(self
            .get_document()
            .await?
            .is_some_and(|document| document.is_running()))
    }

    async fn try_acquire(&self) -> CouchResult<bool> {
        let mut document = match self.get_document().await? {
            Some(document) if document.is_running() => return Ok(false),
            Some(document) => document,
            None => CouchLockDocument::new(&self.doc_id),
        };

        document.state = Some(LockState::Running);
        document.acquired_at = OffsetDateTime::now_utc().format(&Rfc3339).ok();

        let acquired = self.put_document(&document).await?;
        if !acquired {
            debug!(doc_id = %self.doc_id, "lost the race for the game lock");
        }
        Ok(acquired)
    }

    async fn release(&self) -> CouchResult<()> {
        for attempt in 1..=RELEASE_ATTEMPTS {
            let Some(mut document) = self.get_document().await? else {
                return Ok(());
            };
            if !document.is_running() {
                return Ok(());
            }

            document.state = None;
            document.acquired_at = None;
            if self.put_document(&document).await? {
                return Ok(());
            }
            warn!(doc_id = %self.doc_id, attempt, "conflict while releasing game lock");
        }

        Err(CouchDaoError::ReleaseConflict {
            path: self.doc_id.to_string(),
            attempts: RELEASE_ATTEMPTS,
        })
    }
}

impl GameLock for CouchGameLock {
    fn is_running(&self) -> BoxFuture<'static, StorageResult<bool>> {
        let lock = self.clone();
        Box::pin(async move { lock.is_running().await.map_err(Into::into) })
    }

    fn try_acquire(&self) -> BoxFuture<'static, StorageResult<bool>> {
        let lock = self.clone();
        Box::pin(async move { lock.try_acquire().await.map_err(Into::into) })
    }

    fn release(&self) -> BoxFuture<'static, StorageResult<()>> {
        let lock = self.clone();
        Box::pin(async move { lock.release().await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let lock = self.clone();
        Box::pin(async move { lock.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let lock = self.clone();
        Box::pin(async move { lock.ensure_database().await.map_err(Into::into) })
    }
}
