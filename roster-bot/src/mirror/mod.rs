//! Best-effort replication of the player table to a remote repository.
//!
//! The remote file moves `Absent -> Present(h1) -> Present(h2) -> ...`; an
//! update must present the handle of the version it replaces, so a stale
//! handle is rejected instead of overwriting someone else's commit.

pub mod github;
#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Opaque version token of the remote file (a blob SHA on GitHub).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionHandle(pub String);

impl fmt::Display for VersionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of checking whether the tracked file exists remotely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteLookup {
    Found(VersionHandle),
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Created(VersionHandle),
    Updated(VersionHandle),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorError {
    /// Credentials rejected
    Auth(String),
    /// Request never got a response
    Network(String),
    /// Update rejected because the presented handle is not the current one
    Conflict(String),
    Timeout { secs: u64 },
    /// Any other non-success response
    Api { status: u16, body: String },
    /// Response body could not be understood
    Decode(String),
}

impl fmt::Display for MirrorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MirrorError::Auth(msg) => write!(f, "Mirror authentication failed: {}", msg),
            MirrorError::Network(msg) => write!(f, "Mirror unreachable: {}", msg),
            MirrorError::Conflict(msg) => write!(f, "Mirror rejected stale version: {}", msg),
            MirrorError::Timeout { secs } => write!(f, "Mirror publish exceeded {}s", secs),
            MirrorError::Api { status, body } => write!(f, "Mirror API error ({}): {}", status, body),
            MirrorError::Decode(msg) => write!(f, "Invalid response from mirror: {}", msg),
        }
    }
}

impl std::error::Error for MirrorError {}

/// Minimal file API of a remote content repository.
#[async_trait]
pub trait ContentsApi: Send + Sync {
    async fn lookup(&self, path: &str) -> Result<RemoteLookup, MirrorError>;

    /// Create the file when `handle` is None, otherwise replace the version
    /// identified by `handle`. Returns the handle of the new version.
    async fn put(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
        handle: Option<&VersionHandle>,
    ) -> Result<VersionHandle, MirrorError>;
}

/// Commit message for a publish at `now`.
pub fn commit_message(creating: bool, now: DateTime<Utc>) -> String {
    let verb = if creating { "Initial" } else { "Update" };
    format!("{} player data - {} UTC", verb, now.format("%Y-%m-%d %H:%M:%S"))
}

pub struct Mirror {
    api: Arc<dyn ContentsApi>,
    path: String,
    timeout: Duration,
}

impl Mirror {
    pub fn new(api: Arc<dyn ContentsApi>, path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            api,
            path: path.into(),
            timeout,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Push the full table, creating the remote file on first run.
    pub async fn publish(&self, snapshot: &[u8]) -> Result<PublishOutcome, MirrorError> {
        match tokio::time::timeout(self.timeout, self.publish_inner(snapshot)).await {
            Ok(result) => result,
            Err(_) => Err(MirrorError::Timeout {
                secs: self.timeout.as_secs(),
            }),
        }
    }

    async fn publish_inner(&self, snapshot: &[u8]) -> Result<PublishOutcome, MirrorError> {
        let now = Utc::now();
        let outcome = match self.api.lookup(&self.path).await? {
            RemoteLookup::Found(handle) => {
                log::debug!("Mirror: {} found at {}, updating", self.path, handle);
                let message = commit_message(false, now);
                let new = self.api.put(&self.path, snapshot, &message, Some(&handle)).await?;
                PublishOutcome::Updated(new)
            }
            RemoteLookup::NotFound => {
                log::info!("Mirror: {} not found, creating", self.path);
                let message = commit_message(true, now);
                let new = self.api.put(&self.path, snapshot, &message, None).await?;
                PublishOutcome::Created(new)
            }
        };
        log::info!("Mirror: Published {} bytes to {}", snapshot.len(), self.path);
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryContents;
    use super::*;
    use chrono::TimeZone;

    fn mirror(api: &Arc<MemoryContents>) -> Mirror {
        Mirror::new(api.clone(), "players.csv", Duration::from_secs(5))
    }

    #[test]
    fn test_commit_message_format() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(commit_message(true, at), "Initial player data - 2024-03-09 14:05:07 UTC");
        assert_eq!(commit_message(false, at), "Update player data - 2024-03-09 14:05:07 UTC");
    }

    #[tokio::test]
    async fn test_first_publish_creates() {
        let api = Arc::new(MemoryContents::new());
        let outcome = mirror(&api).publish(b"header\n").await.unwrap();

        assert!(matches!(outcome, PublishOutcome::Created(_)));
        assert_eq!(api.content("players.csv").as_deref(), Some(&b"header\n"[..]));
        let puts = api.puts();
        assert_eq!(puts.len(), 1);
        assert!(puts[0].handle.is_none());
        assert_eq!(puts[0].path, "players.csv");
        assert!(puts[0].message.starts_with("Initial player data - "));
    }

    #[tokio::test]
    async fn test_later_publish_updates_with_latest_handle() {
        let api = Arc::new(MemoryContents::new());
        let mirror = mirror(&api);

        let first = mirror.publish(b"v1").await.unwrap();
        let second = mirror.publish(b"v2").await.unwrap();
        let third = mirror.publish(b"v3").await.unwrap();

        let (PublishOutcome::Created(h1), PublishOutcome::Updated(h2), PublishOutcome::Updated(h3)) =
            (first, second, third)
        else {
            panic!("Expected create followed by updates");
        };
        let puts = api.puts();
        assert_eq!(puts[1].handle.as_ref(), Some(&h1));
        assert_eq!(puts[2].handle.as_ref(), Some(&h2));
        assert!(puts[2].message.starts_with("Update player data - "));
        assert_eq!(api.current_handle("players.csv"), Some(h3));
        assert_eq!(api.content("players.csv").as_deref(), Some(&b"v3"[..]));
    }

    #[tokio::test]
    async fn test_stale_handle_is_conflict() {
        let api = Arc::new(MemoryContents::new());
        let mirror = mirror(&api);
        mirror.publish(b"v1").await.unwrap();

        // Someone else commits between our lookup and our update
        api.commit_behind_our_back_on_next_lookup();
        let err = mirror.publish(b"v2").await.unwrap_err();

        assert!(matches!(err, MirrorError::Conflict(_)));
        assert_ne!(api.content("players.csv").as_deref(), Some(&b"v2"[..]));
    }

    #[tokio::test]
    async fn test_lookup_failure_is_surfaced() {
        let api = Arc::new(MemoryContents::new());
        api.fail_next(MirrorError::Auth("bad credentials".to_string()));

        let err = mirror(&api).publish(b"v1").await.unwrap_err();
        assert_eq!(err, MirrorError::Auth("bad credentials".to_string()));
        assert!(api.puts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_publish_times_out() {
        let api = Arc::new(MemoryContents::new());
        api.set_delay(Duration::from_secs(60));

        let mirror = Mirror::new(api.clone(), "players.csv", Duration::from_secs(2));
        let err = mirror.publish(b"v1").await.unwrap_err();
        assert_eq!(err, MirrorError::Timeout { secs: 2 });
    }
}
