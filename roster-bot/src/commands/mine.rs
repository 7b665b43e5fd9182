//! Mine command - lists the author's registered entries

use crate::store::{Store, StoreError};

pub fn execute(author_id: &str, store: &Store) -> Result<String, StoreError> {
    let entries: Vec<String> = store
        .records()?
        .into_iter()
        .filter(|r| r.author_id == author_id)
        .map(|r| format!("- `{}` {}", r.friend_code, r.in_game_name))
        .collect();

    if entries.is_empty() {
        return Ok("You have no registered entries.".to_string());
    }

    Ok(format!(
        "You have {} registered entr{}:\n{}",
        entries.len(),
        if entries.len() == 1 { "y" } else { "ies" },
        entries.join("\n")
    ))
}
