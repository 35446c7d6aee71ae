//! Placeholder team-name detection.
//!
//! Bracket sheets list synthetic progression slots ("Winner QF1",
//! "3rd Place", seed codes like "B2") alongside real rosters. These are
//! flagged once at insertion and never re-evaluated.

use regex::Regex;
use std::sync::OnceLock;

fn ordinal_place() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+(st|nd|rd|th)\b").unwrap())
}

fn seed_code() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z]\d$").unwrap())
}

pub fn is_placeholder(name: &str) -> bool {
    let n = name.trim().to_ascii_lowercase();
    if n.is_empty() {
        return false;
    }
    n.starts_with("winner ")
        || n.starts_with("loser ")
        || n.contains("runner up")
        || n.contains("runner-up")
        || ordinal_place().is_match(&n)
        || seed_code().is_match(&n)
}

#[cfg(test)]
mod tests {
    use super::is_placeholder;

    #[test]
    fn bracket_slots_are_placeholders() {
        assert!(is_placeholder("3rd Place"));
        assert!(is_placeholder("Winner QF1"));
        assert!(is_placeholder("Loser SF2"));
        assert!(is_placeholder("B2"));
        assert!(is_placeholder("Runner Up Pool A"));
    }

    #[test]
    fn real_names_are_not() {
        assert!(!is_placeholder("Wildcats"));
        assert!(!is_placeholder("St Winifred's"));
        assert!(!is_placeholder("B52 Bombers"));
        assert!(!is_placeholder(""));
    }
}
