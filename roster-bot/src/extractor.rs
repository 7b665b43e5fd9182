//! Friend code / IGN extraction from free-form chat text.

use once_cell::sync::Lazy;
use regex::Regex;

/// `SW-` prefix is optional and discarded; only the digit body is captured.
static FRIEND_CODE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:SW-)?([0-9]{4}-[0-9]{4}-[0-9]{4})").unwrap());

static IGN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)IGN:?\s*([A-Za-z0-9_]+)").unwrap());

/// Default word window for adjacent pairing.
pub const DEFAULT_ADJACENT_WINDOW: usize = 3;

/// How friend codes are associated with names found in the same message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PairingMode {
    /// Zip both match lists by index, truncating to the shorter one.
    #[default]
    Positional,
    /// Pair codes and names by smallest gap first, where a gap holds at most
    /// `window` words and no other code or name. Unpaired codes are dropped.
    Adjacent { window: usize },
}

impl PairingMode {
    /// Parse `positional`, `adjacent` or `adjacent:N`.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_lowercase();
        match value.split_once(':') {
            None if value == "positional" => Some(PairingMode::Positional),
            None if value == "adjacent" => Some(PairingMode::Adjacent {
                window: DEFAULT_ADJACENT_WINDOW,
            }),
            Some(("adjacent", n)) => n
                .trim()
                .parse()
                .ok()
                .map(|window| PairingMode::Adjacent { window }),
            _ => None,
        }
    }
}

/// A friend code and in-game name found in one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub friend_code: String,
    pub in_game_name: String,
}

/// Captured value plus the byte span of the whole match.
struct Hit<'a> {
    value: &'a str,
    start: usize,
    end: usize,
}

fn scan<'a>(pattern: &Regex, text: &'a str) -> Vec<Hit<'a>> {
    pattern
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let value = caps.get(1)?;
            Some(Hit {
                value: value.as_str(),
                start: whole.start(),
                end: whole.end(),
            })
        })
        .collect()
}

/// Extract candidate pairs using positional pairing.
pub fn extract(text: &str) -> Vec<Candidate> {
    extract_with(text, PairingMode::Positional)
}

/// Extract candidate pairs with an explicit pairing mode. Never fails; text
/// without matches yields an empty list.
pub fn extract_with(text: &str, mode: PairingMode) -> Vec<Candidate> {
    let codes = scan(&FRIEND_CODE_PATTERN, text);
    let names = scan(&IGN_PATTERN, text);

    log::debug!(
        "Extractor: {} friend code(s), {} name(s), mode {:?}",
        codes.len(),
        names.len(),
        mode
    );

    let pairs: Vec<(&Hit, &Hit)> = match mode {
        PairingMode::Positional => codes.iter().zip(names.iter()).collect(),
        PairingMode::Adjacent { window } => pair_adjacent(text, &codes, &names, window),
    };

    pairs
        .into_iter()
        .map(|(code, name)| Candidate {
            friend_code: code.value.to_string(),
            in_game_name: name.value.to_string(),
        })
        .collect()
}

fn pair_adjacent<'h, 'a>(
    text: &str,
    codes: &'h [Hit<'a>],
    names: &'h [Hit<'a>],
    window: usize,
) -> Vec<(&'h Hit<'a>, &'h Hit<'a>)> {
    // A gap may not run across any other code or name
    let crosses_match = |start: usize, end: usize| {
        codes
            .iter()
            .chain(names.iter())
            .any(|hit| hit.start < end && hit.end > start)
    };

    // (gap bytes, code index, name index)
    let mut links = Vec::new();
    for (ci, code) in codes.iter().enumerate() {
        for (ni, name) in names.iter().enumerate() {
            let (start, end) = if name.start >= code.end {
                (code.end, name.start)
            } else if name.end <= code.start {
                (name.end, code.start)
            } else {
                continue;
            };
            let gap = &text[start..end];
            if gap.split_whitespace().count() > window || crosses_match(start, end) {
                continue;
            }
            links.push((gap.len(), ci, ni));
        }
    }

    // Closest links win first; ties go to the earlier code
    links.sort_unstable();
    let mut code_used = vec![false; codes.len()];
    let mut name_used = vec![false; names.len()];
    let mut chosen = Vec::new();
    for (_, ci, ni) in links {
        if !code_used[ci] && !name_used[ni] {
            code_used[ci] = true;
            name_used[ni] = true;
            chosen.push((ci, ni));
        }
    }

    chosen.sort_unstable();
    chosen
        .into_iter()
        .map(|(ci, ni)| (&codes[ci], &names[ni]))
        .collect()
}
