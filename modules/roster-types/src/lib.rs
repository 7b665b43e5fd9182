//! Shared types for the roster bot and anything reading its player table.

use serde::{Deserialize, Serialize};

// =====================================================
// Domain Types
// =====================================================

/// Column names of the player table, in on-disk order.
pub const HEADER: [&str; 4] = ["friendcode", "ign", "discord_id", "discord_role"];

/// One registered player, as stored in the CSV table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "friendcode")]
    pub friend_code: String,
    #[serde(rename = "ign")]
    pub in_game_name: String,
    #[serde(rename = "discord_id")]
    pub author_id: String,
    #[serde(rename = "discord_role")]
    pub author_role: String,
}

impl Record {
    pub fn new(
        friend_code: impl Into<String>,
        in_game_name: impl Into<String>,
        author_id: impl Into<String>,
        author_role: impl Into<String>,
    ) -> Self {
        Self {
            friend_code: friend_code.into(),
            in_game_name: in_game_name.into(),
            author_id: author_id.into(),
            author_role: author_role.into(),
        }
    }

    /// Fields in header order.
    pub fn fields(&self) -> [&str; 4] {
        [
            self.friend_code.as_str(),
            self.in_game_name.as_str(),
            self.author_id.as_str(),
            self.author_role.as_str(),
        ]
    }

    /// Build a record from a raw table row. Returns None unless the row has
    /// exactly four fields and a non-empty friend code and name.
    pub fn from_fields<'a, I>(fields: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut it = fields.into_iter();
        let record = Record::new(it.next()?, it.next()?, it.next()?, it.next()?);
        if it.next().is_some() || record.friend_code.is_empty() || record.in_game_name.is_empty() {
            return None;
        }
        Some(record)
    }
}

// =====================================================
// Chat Boundary Types
// =====================================================

/// A chat message as seen by the ingest coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Stable author identifier (Discord user id as a decimal string)
    pub author_id: String,
    /// Name of the author's highest role at the time of posting
    pub author_role: String,
    pub channel_name: String,
    pub text: String,
}

/// Acknowledgement returned to the chat side for a processed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ack {
    /// At least one record was stored and mirrored
    Positive,
    /// No valid friend code / IGN pair was found
    Negative,
}

impl Ack {
    /// Reaction emoji used to render this acknowledgement.
    pub fn emoji(self) -> char {
        match self {
            Ack::Positive => '✅',
            Ack::Negative => '❌',
        }
    }
}
