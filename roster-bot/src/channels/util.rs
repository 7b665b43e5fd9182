//! Shared helpers for chat replies.

/// Split a reply into chunks of at most `max_len` bytes. Splits on line
/// boundaries, blank lines included; longer lines are hard-split on char
/// boundaries. A zero `max_len` disables splitting.
pub fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if max_len == 0 || text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    // Whether `current` holds a line yet, which may itself be blank
    let mut open = false;

    for line in text.lines() {
        let needed = if open { current.len() + 1 + line.len() } else { line.len() };
        if needed <= max_len {
            if open {
                current.push('\n');
            }
            current.push_str(line);
            open = true;
            continue;
        }

        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }

        let mut remaining = line;
        while remaining.len() > max_len {
            let mut cut = max_len;
            while !remaining.is_char_boundary(cut) {
                cut -= 1;
            }
            if cut == 0 {
                // A single char wider than the limit goes out whole
                cut = remaining.chars().next().map_or(remaining.len(), char::len_utf8);
            }
            chunks.push(remaining[..cut].to_string());
            remaining = &remaining[cut..];
        }
        current.push_str(remaining);
        open = true;
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}
