//! Turns channel messages into stored, mirrored player records.

use crate::extractor::{self, PairingMode};
use crate::mirror::{Mirror, MirrorError, PublishOutcome};
use crate::store::{Store, StoreError};
use roster_types::{Ack, InboundMessage, Record};
use std::fmt;
use tokio::sync::Mutex;

#[derive(Debug)]
pub enum IngestError {
    /// Nothing was written
    Store(StoreError),
    /// `stored` rows are durable locally but the remote copy is behind
    Mirror { stored: usize, source: MirrorError },
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestError::Store(e) => write!(f, "{}", e),
            IngestError::Mirror { stored, source } => {
                write!(f, "{} row(s) stored locally, mirror failed: {}", stored, source)
            }
        }
    }
}

impl std::error::Error for IngestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IngestError::Store(e) => Some(e),
            IngestError::Mirror { source, .. } => Some(source),
        }
    }
}

impl From<StoreError> for IngestError {
    fn from(e: StoreError) -> Self {
        IngestError::Store(e)
    }
}

pub struct Ingestor {
    channel_name: String,
    pairing: PairingMode,
    store: Store,
    mirror: Mirror,
    /// Serializes append + publish across concurrently dispatched events
    write_lock: Mutex<()>,
}

impl Ingestor {
    pub fn new(channel_name: String, pairing: PairingMode, store: Store, mirror: Mirror) -> Self {
        Self {
            channel_name,
            pairing,
            store,
            mirror,
            write_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn is_target_channel(&self, channel_name: &str) -> bool {
        channel_name == self.channel_name
    }

    /// Process one message. `Ok(None)` means the message was not for us and
    /// must not be acknowledged at all.
    pub async fn handle(&self, message: &InboundMessage) -> Result<Option<Ack>, IngestError> {
        if !self.is_target_channel(&message.channel_name) {
            return Ok(None);
        }

        let candidates = extractor::extract_with(&message.text, self.pairing);
        if candidates.is_empty() {
            log::debug!("Ingest: No friend code / IGN pair from {}", message.author_id);
            return Ok(Some(Ack::Negative));
        }

        let records: Vec<Record> = candidates
            .into_iter()
            .map(|c| {
                Record::new(
                    c.friend_code,
                    c.in_game_name,
                    message.author_id.as_str(),
                    message.author_role.as_str(),
                )
            })
            .collect();

        let _guard = self.write_lock.lock().await;

        self.store.append(&records)?;
        let snapshot = self.store.snapshot()?;

        let outcome = self
            .mirror
            .publish(&snapshot)
            .await
            .map_err(|source| IngestError::Mirror {
                stored: records.len(),
                source,
            })?;
        let (PublishOutcome::Created(version) | PublishOutcome::Updated(version)) = outcome;

        log::info!(
            "Ingest: Stored and mirrored {} record(s) from {} ({}), remote now at {}",
            records.len(),
            message.author_id,
            message.author_role,
            version
        );
        Ok(Some(Ack::Positive))
    }
}
