//! Profanity screening for user-authored text

use std::collections::HashSet;
use std::sync::OnceLock;

const BLOCKED_WORDS: &[&str] = &[
    "arse", "arsehole", "asshole", "bastard", "bitch", "bollocks", "bullshit", "crap", "cunt",
    "damn", "dick", "dickhead", "fag", "faggot", "fuck", "fucked", "fucker", "fucking", "motherfucker",
    "nigger", "piss", "pissed", "prick", "pussy", "shit", "shitty", "slut", "twat", "wanker",
    "whore",
];

fn blocked() -> &'static HashSet<&'static str> {
    static WORDS: OnceLock<HashSet<&'static str>> = OnceLock::new();
    WORDS.get_or_init(|| BLOCKED_WORDS.iter().copied().collect())
}

/// True if any word of any input is on the block list.
///
/// Matching is per whole word and case-insensitive, so "Scunthorpe" passes.
pub fn is_profane(texts: &[&str]) -> bool {
    let words = blocked();
    texts.iter().any(|text| {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .any(|w| words.contains(w.to_lowercase().as_str()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text() {
        assert!(!is_profane(&["A quiet walk in the park", "Nothing to see"]));
        assert!(!is_profane(&[]));
        assert!(!is_profane(&["Scunthorpe United", "classic assessment"]));
    }

    #[test]
    fn test_profane_any_field() {
        assert!(is_profane(&["Fine title", "what the SHIT is this"]));
        assert!(is_profane(&["damn!", ""]));
    }
}
