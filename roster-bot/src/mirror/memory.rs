//! In-memory `ContentsApi` for tests. Enforces version handles the way the
//! real contents API does and records every write.

use super::{ContentsApi, MirrorError, RemoteLookup, VersionHandle};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct PutCall {
    pub path: String,
    pub message: String,
    pub handle: Option<VersionHandle>,
    pub content: Vec<u8>,
}

#[derive(Default)]
struct State {
    files: HashMap<String, (Vec<u8>, VersionHandle)>,
    next_version: u64,
    puts: Vec<PutCall>,
    fail_next: Option<MirrorError>,
    sneak_commit: bool,
    delay: Option<Duration>,
}

impl State {
    fn bump(&mut self) -> VersionHandle {
        self.next_version += 1;
        VersionHandle(format!("sha-{}", self.next_version))
    }
}

#[derive(Default)]
pub struct MemoryContents {
    state: Mutex<State>,
}

impl MemoryContents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn puts(&self) -> Vec<PutCall> {
        self.state.lock().unwrap().puts.clone()
    }

    pub fn content(&self, path: &str) -> Option<Vec<u8>> {
        self.state.lock().unwrap().files.get(path).map(|(c, _)| c.clone())
    }

    pub fn current_handle(&self, path: &str) -> Option<VersionHandle> {
        self.state.lock().unwrap().files.get(path).map(|(_, h)| h.clone())
    }

    /// Make the next call (lookup or put) fail with `err`.
    pub fn fail_next(&self, err: MirrorError) {
        self.state.lock().unwrap().fail_next = Some(err);
    }

    /// After the next lookup returns, a foreign commit replaces the file so the
    /// handle just handed out is stale.
    pub fn commit_behind_our_back_on_next_lookup(&self) {
        self.state.lock().unwrap().sneak_commit = true;
    }

    pub fn set_delay(&self, delay: Duration) {
        self.state.lock().unwrap().delay = Some(delay);
    }

    async fn pause(&self) {
        let delay = self.state.lock().unwrap().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl ContentsApi for MemoryContents {
    async fn lookup(&self, path: &str) -> Result<RemoteLookup, MirrorError> {
        self.pause().await;
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.fail_next.take() {
            return Err(err);
        }
        let found = state.files.get(path).map(|(_, h)| h.clone());
        if state.sneak_commit {
            state.sneak_commit = false;
            let handle = state.bump();
            state
                .files
                .insert(path.to_string(), (b"foreign".to_vec(), handle));
        }
        Ok(match found {
            Some(handle) => RemoteLookup::Found(handle),
            None => RemoteLookup::NotFound,
        })
    }

    async fn put(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
        handle: Option<&VersionHandle>,
    ) -> Result<VersionHandle, MirrorError> {
        self.pause().await;
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.fail_next.take() {
            return Err(err);
        }
        state.puts.push(PutCall {
            path: path.to_string(),
            message: message.to_string(),
            handle: handle.cloned(),
            content: content.to_vec(),
        });

        let current = state.files.get(path).map(|(_, h)| h.clone());
        match (current, handle) {
            (None, None) => {}
            (Some(current), Some(given)) if &current == given => {}
            (Some(_), None) => {
                return Err(MirrorError::Conflict(format!("{} already exists", path)));
            }
            (None, Some(given)) => {
                return Err(MirrorError::Conflict(format!("{} does not exist at {}", path, given)));
            }
            (Some(current), Some(given)) => {
                return Err(MirrorError::Conflict(format!(
                    "{} is at {}, not {}",
                    path, current, given
                )));
            }
        }

        let new = state.bump();
        state.files.insert(path.to_string(), (content.to_vec(), new.clone()));
        Ok(new)
    }
}
