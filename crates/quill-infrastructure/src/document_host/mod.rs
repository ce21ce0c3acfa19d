//! DocumentHost implementations.
//!
//! - `memory`: a fully in-memory host (tests, headless runs)
//! - `fs`: a directory-backed host used by the reference shell

mod fs;
mod memory;

pub use fs::FsDocumentHost;
pub use memory::InMemoryDocumentHost;

/// Loose name match used by document lookup.
///
/// Every word of `query` must appear in the normalized file name, so
/// "heist outline" finds `Heist-Outline.md`.
pub(crate) fn loosely_matches(query: &str, display_name: &str) -> bool {
    let normalize = |s: &str| {
        s.to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { ' ' })
            .collect::<String>()
    };
    let haystack = normalize(display_name);
    let words: Vec<&str> = haystack.split_whitespace().collect();
    let query = normalize(query);
    let mut tokens = query.split_whitespace().peekable();
    tokens.peek().is_some() && tokens.all(|token| words.contains(&token))
}

#[cfg(test)]
mod tests {
    use super::loosely_matches;

    #[test]
    fn loose_matching_ignores_case_and_separators() {
        assert!(loosely_matches("heist outline", "Heist-Outline.md"));
        assert!(loosely_matches("pilot", "pilot_draft.fountain"));
        assert!(!loosely_matches("pilot outline", "pilot_draft.fountain"));
        assert!(!loosely_matches("", "anything.md"));
    }
}
