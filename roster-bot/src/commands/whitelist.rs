//! Whitelist command - every registered friend code, deduplicated

use crate::store::{Store, StoreError};
use std::collections::HashSet;

/// Friend codes in first-seen order, each once.
pub fn friend_codes(store: &Store) -> Result<Vec<String>, StoreError> {
    let mut seen = HashSet::new();
    Ok(store
        .records()?
        .into_iter()
        .filter(|r| seen.insert(r.friend_code.clone()))
        .map(|r| r.friend_code)
        .collect())
}

pub fn execute(store: &Store) -> Result<String, StoreError> {
    let codes = friend_codes(store)?;
    if codes.is_empty() {
        return Ok("No friend codes registered yet.".to_string());
    }
    Ok(format!("{} friend code(s):\n{}", codes.len(), codes.join("\n")))
}
