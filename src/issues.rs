//! Issue CRUD built on the request executor.
//!
//! The repository owns no state beyond in-flight bookkeeping: it validates
//! input locally, maps paths, and interprets classified results. It never
//! retries; that is the executor's job.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::api::error::{ApiError, Result};
use crate::api::executor::{RequestExecutor, RetryConfig};
use crate::api::session::SessionManager;
use crate::api::transport::{HttpTransport, Method, Transport};
use crate::api::types::{CreateReceipt, CurrentUser, FieldPatch, Issue, IssueDraft};
use crate::config::{Credentials, Settings};

/// API path prefix shared by all issue endpoints.
const API_PREFIX: &str = "/rest/api/3";

/// Create, read, update, and delete issues.
pub struct IssueRepository<T> {
    executor: Arc<RequestExecutor<T>>,
    /// Serializes mutating calls on the same issue key, so a concurrent
    /// update and delete cannot interleave.
    key_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl IssueRepository<HttpTransport> {
    /// Wire up transport, session manager, and executor from configuration.
    pub fn connect(credentials: Credentials, settings: &Settings) -> Result<Self> {
        let timeout = settings.request_timeout().max(Duration::from_secs(1));
        let transport = Arc::new(
            HttpTransport::new(timeout).map_err(|e| ApiError::Network(e.to_string()))?,
        );
        let credentials = Arc::new(credentials);
        let session = Arc::new(SessionManager::new(credentials.clone(), transport.clone()));
        let executor = RequestExecutor::new(&credentials, transport, session)
            .with_retry(RetryConfig::from(settings))
            .with_max_in_flight(settings.max_in_flight);
        Ok(Self::new(Arc::new(executor)))
    }
}

impl<T: Transport> IssueRepository<T> {
    pub fn new(executor: Arc<RequestExecutor<T>>) -> Self {
        Self {
            executor,
            key_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Create a new issue and return it with its server-assigned key.
    ///
    /// Obviously invalid drafts (empty summary or project key) fail locally
    /// without a network round trip.
    #[instrument(skip(self, draft), fields(project = %draft.project_key))]
    pub async fn create(&self, draft: IssueDraft) -> Result<Issue> {
        if let Err(msg) = draft.validate() {
            return Err(ApiError::Validation(msg));
        }

        let receipt: CreateReceipt = self
            .executor
            .send_as(
                Method::Post,
                &format!("{}/issue", API_PREFIX),
                Some(draft.to_envelope()),
            )
            .await?;

        debug!(issue_key = %receipt.key, "issue created");
        Ok(draft.into_issue(receipt.key))
    }

    /// Fetch the current state of an issue.
    #[instrument(skip(self), fields(issue_key = %key))]
    pub async fn get(&self, key: &str) -> Result<Issue> {
        validate_key(key)?;
        self.executor
            .send_as(Method::Get, &issue_path(key), None)
            .await
            .map_err(|e| match e {
                ApiError::NotFound(_) => {
                    ApiError::NotFound(format!("issue '{}' not found", key))
                }
                other => other,
            })
    }

    /// Apply a partial field update. Idempotent; no prior fetch required.
    #[instrument(skip(self, patch), fields(issue_key = %key))]
    pub async fn update(&self, key: &str, patch: FieldPatch) -> Result<()> {
        validate_key(key)?;
        if patch.is_empty() {
            return Err(ApiError::Validation("update patch has no fields".to_string()));
        }

        let lock = self.lock_for(key).await;
        let _guard = lock.lock().await;
        self.executor
            .send(Method::Put, &issue_path(key), Some(patch.to_envelope()))
            .await
            .map_err(|e| match e {
                ApiError::NotFound(_) => {
                    ApiError::NotFound(format!("issue '{}' not found", key))
                }
                other => other,
            })?;
        Ok(())
    }

    /// Remove an issue. Deleting a key that is already gone is a success:
    /// the end state is the same either way.
    #[instrument(skip(self), fields(issue_key = %key))]
    pub async fn delete(&self, key: &str) -> Result<()> {
        validate_key(key)?;

        let lock = self.lock_for(key).await;
        let _guard = lock.lock().await;
        match self.executor.send(Method::Delete, &issue_path(key), None).await {
            Ok(_) => Ok(()),
            Err(ApiError::NotFound(_)) => {
                debug!(issue_key = %key, "issue already absent");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Get the current authenticated user.
    #[instrument(skip(self))]
    pub async fn current_user(&self) -> Result<CurrentUser> {
        self.executor
            .send_as(Method::Get, &format!("{}/myself", API_PREFIX), None)
            .await
    }

    /// Verify the URL, credentials, and access by fetching the current user.
    #[instrument(skip(self))]
    pub async fn validate_connection(&self) -> Result<CurrentUser> {
        let user = self.current_user().await?;
        info!(user = %user.display_name, "connection validated");
        Ok(user)
    }

    async fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.key_locks.lock().await;
        // Sweep entries no caller still holds, so the map does not grow
        // with every key ever touched.
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(ApiError::Validation("issue key cannot be empty".to_string()));
    }
    Ok(())
}

fn issue_path(key: &str) -> String {
    format!("{}/issue/{}", API_PREFIX, urlencoding::encode(key))
}
