//! Removal of the source-citation markers assistants append to retrieved facts.

use regex::Regex;
use std::sync::OnceLock;

/// Matches markers such as `【3:1†source】`.
const CITATION_PATTERN: &str = r"【[0-9]+:[0-9]+†source】";

fn citation_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(CITATION_PATTERN).expect("citation pattern is a valid regex"))
}

/// Strips every citation marker from `text`, leaving all other characters as they are.
///
/// Removal repeats until no marker is left, so markers that only form once an
/// inner marker is gone are stripped too.
pub fn remove_citations(text: &str) -> String {
    let mut cleaned = text.to_string();
    loop {
        let next = citation_regex().replace_all(&cleaned, "").into_owned();
        if next == cleaned {
            return cleaned;
        }
        cleaned = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removes_all_markers() {
        let raw = "Revenue grew 10%【3:1†source】 last year【3:2†source】.";
        assert_eq!(remove_citations(raw), "Revenue grew 10% last year.");
    }

    #[test]
    fn test_whitespace_around_markers_is_untouched() {
        let raw = "A 【0:0†source】 B\n【12:345†source】\tC";
        assert_eq!(remove_citations(raw), "A  B\n\tC");
    }

    #[test]
    fn test_idempotent() {
        let raw = "x【1:2†source】y";
        let once = remove_citations(raw);
        assert_eq!(remove_citations(&once), once);
        assert_eq!(remove_citations("already clean"), "already clean");
    }

    #[test]
    fn test_nested_markers_are_fully_removed() {
        let raw = "Margin 12%【1:【2:3†source】2†source】.";
        let once = remove_citations(raw);
        assert_eq!(once, "Margin 12%.");
        assert_eq!(remove_citations(&once), once);
    }

    #[test]
    fn test_near_misses_are_kept() {
        // Ascii brackets, missing dagger, non-numeric ids, other labels.
        for text in [
            "[3:1†source]",
            "【3:1source】",
            "【a:1†source】",
            "【3:1†sources】",
            "【3†source】",
        ] {
            assert_eq!(remove_citations(text), text);
        }
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(remove_citations(""), "");
    }
}
