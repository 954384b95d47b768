//! Place API client: list children, poll operations, update instances.
//!
//! Every request goes through [`RemoteClient::send`], which owns the 429
//! recovery path: sleep the cooldown, rebuild the connection, reissue the same
//! request. That path never touches the poll or update retry budgets.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde_json::Value;

use scs_core::{InstanceId, OperationHandle, ProjectConfig, RemoteNode, ScriptKind};

use crate::backoff::RetryPolicy;
use crate::error::RemoteError;
use crate::transport::{ApiRequest, Transport};
use crate::wire::{ListChildrenResponse, Operation, UpdateInstanceBody};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Immutable coordinates of the place being synced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub base_url: String,
    pub universe_id: String,
    pub place_id: String,
}

impl RemoteConfig {
    pub fn new(
        base_url: impl Into<String>,
        universe_id: impl Into<String>,
        place_id: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            universe_id: universe_id.into(),
            place_id: place_id.into(),
        }
    }

    pub fn from_project(config: &ProjectConfig) -> Self {
        Self::new(&config.base_url, &config.universe_id, &config.place_id)
    }

    /// `{base}/universes/{u}/places/{p}/instances/{id}`
    pub fn instance_url(&self, id: &InstanceId) -> String {
        format!(
            "{}/universes/{}/places/{}/instances/{}",
            self.base_url, self.universe_id, self.place_id, id
        )
    }

    /// `{base}/universes/{u}/places/{p}/instances/{id}:listChildren`
    pub fn list_children_url(&self, id: &InstanceId) -> String {
        format!("{}:listChildren", self.instance_url(id))
    }

    /// `{base}/{operation path}`
    pub fn operation_url(&self, handle: &OperationHandle) -> String {
        format!("{}/{}", self.base_url, handle.0.trim_start_matches('/'))
    }
}

// ---------------------------------------------------------------------------
// Sleeping
// ---------------------------------------------------------------------------

/// Blocking pause used between polls, retries and rate-limit cooldowns.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// [`Sleeper`] backed by `std::thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Shared, thread-safe handle to the remote place.
pub struct RemoteClient {
    config: RemoteConfig,
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl RemoteClient {
    pub fn new(config: RemoteConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            policy: RetryPolicy::default(),
            sleeper: Arc::new(ThreadSleeper),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Issue `request`, recovering from 429 responses.
    ///
    /// Returns the decoded JSON body of a 2xx response (`Value::Null` for an
    /// empty body).
    pub fn send(&self, request: &ApiRequest) -> Result<Value, RemoteError> {
        let mut cooldowns = 0u32;
        loop {
            let response = self.transport.send(request)?;

            if response.is_rate_limited() {
                if cooldowns >= self.policy.max_rate_limit_retries {
                    return Err(RemoteError::RateLimited {
                        url: request.url.clone(),
                        retries: cooldowns,
                    });
                }
                cooldowns += 1;
                tracing::warn!(
                    url = %request.url,
                    cooldown_ms = self.policy.rate_limit_cooldown.as_millis() as u64,
                    attempt = cooldowns,
                    "rate limited, cooling down",
                );
                self.sleeper.sleep(self.policy.rate_limit_cooldown);
                self.transport.reconnect();
                continue;
            }

            if !response.is_success() {
                return Err(RemoteError::Status {
                    url: request.url.clone(),
                    status: response.status,
                    body: response.body,
                });
            }

            if response.body.trim().is_empty() {
                return Ok(Value::Null);
            }
            return serde_json::from_str(&response.body).map_err(|source| RemoteError::Decode {
                url: request.url.clone(),
                source,
            });
        }
    }

    /// Fetch the current state of a long-running operation.
    pub fn get_operation(&self, handle: &OperationHandle) -> Result<Operation, RemoteError> {
        let url = self.config.operation_url(handle);
        let value = self.send(&ApiRequest::get(&url))?;
        serde_json::from_value(value).map_err(|source| RemoteError::Decode { url, source })
    }

    /// Poll `handle` until it reports `done`.
    ///
    /// Sleeps before every fetch, doubling the delay each time. Gives up with
    /// [`RemoteError::Timeout`] once the poll budget is spent.
    pub fn poll(&self, handle: &OperationHandle) -> Result<Value, RemoteError> {
        let backoff = self.policy.poll;
        for (attempt, delay) in backoff.delays().enumerate() {
            self.sleeper.sleep(delay);
            let operation = self.get_operation(handle)?;
            if operation.done {
                tracing::debug!(handle = %handle, polls = attempt + 1, "operation done");
                return operation.into_result(handle);
            }
            tracing::debug!(
                handle = %handle,
                attempt = attempt + 1,
                next_delay_ms = backoff.delay(attempt as u32 + 1).as_millis() as u64,
                "operation pending",
            );
        }
        Err(RemoteError::Timeout {
            handle: handle.clone(),
            attempts: backoff.max_attempts,
        })
    }

    /// List the immediate children of `parent`.
    ///
    /// The listing is itself a long-running operation; an already-finished
    /// response is used as-is, anything else is polled.
    pub fn list_children(&self, parent: &InstanceId) -> Result<Vec<RemoteNode>, RemoteError> {
        let url = self.config.list_children_url(parent);
        let value = self.send(&ApiRequest::get(&url))?;
        let operation: Operation =
            serde_json::from_value(value).map_err(|source| RemoteError::Decode {
                url: url.clone(),
                source,
            })?;

        let handle = operation.handle();
        let response = match (operation.done, handle) {
            (true, handle) => {
                let handle = handle.unwrap_or_else(|| OperationHandle::from(url.as_str()));
                operation.into_result(&handle)?
            }
            (false, Some(handle)) => self.poll(&handle)?,
            (false, None) => return Err(RemoteError::MissingOperationPath { url }),
        };

        let listing: ListChildrenResponse =
            serde_json::from_value(response).map_err(|source| RemoteError::Decode { url, source })?;
        Ok(listing
            .instances
            .into_iter()
            .map(|entry| entry.into_node())
            .collect())
    }

    /// Replace the source of script `id` with `content`. One attempt.
    pub fn update(
        &self,
        id: &InstanceId,
        kind: ScriptKind,
        content: &str,
    ) -> Result<Value, RemoteError> {
        let body = serde_json::to_string(&UpdateInstanceBody::new(kind, content))?;
        self.send(&ApiRequest::patch(self.config.instance_url(id), body))
    }

    /// [`update`](Self::update), retried on any failure with the update
    /// backoff. Returns the last error once attempts are exhausted.
    pub fn update_with_retry(
        &self,
        id: &InstanceId,
        kind: ScriptKind,
        content: &str,
    ) -> Result<Value, RemoteError> {
        let backoff = self.policy.update;
        let attempts = backoff.max_attempts.max(1);
        let mut attempt = 0u32;
        loop {
            match self.update(id, kind, content) {
                Ok(value) => return Ok(value),
                Err(err) => {
                    attempt += 1;
                    if attempt >= attempts {
                        return Err(err);
                    }
                    let delay = backoff.delay(attempt - 1);
                    tracing::warn!(
                        instance = %id,
                        attempt,
                        retry_in_ms = delay.as_millis() as u64,
                        error = %err,
                        "update failed, retrying",
                    );
                    self.sleeper.sleep(delay);
                }
            }
        }
    }
}

impl std::fmt::Debug for RemoteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteClient")
            .field("config", &self.config)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_follow_cloud_v2_layout() {
        let config = RemoteConfig::new("https://apis.example.com/cloud/v2/", "11", "22");
        let id = InstanceId::from("abc");
        assert_eq!(
            config.instance_url(&id),
            "https://apis.example.com/cloud/v2/universes/11/places/22/instances/abc"
        );
        assert_eq!(
            config.list_children_url(&InstanceId::root()),
            "https://apis.example.com/cloud/v2/universes/11/places/22/instances/root:listChildren"
        );
        assert_eq!(
            config.operation_url(&OperationHandle::from("universes/11/operations/op1")),
            "https://apis.example.com/cloud/v2/universes/11/operations/op1"
        );
    }

    #[test]
    fn from_project_copies_coordinates() {
        let project = ProjectConfig::new("7", "8");
        let config = RemoteConfig::from_project(&project);
        assert_eq!(config.universe_id, "7");
        assert_eq!(config.place_id, "8");
        assert_eq!(config.base_url, scs_core::config::DEFAULT_BASE_URL);
    }
}
