// Heuristic pre-filter over extracted syllabus text
//
// Skipping the inference call when no M/D-style token exists trades recall for
// never paying for a completion that cannot produce dated events.

use once_cell::sync::Lazy;
use regex::Regex;

static SEMESTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(20\d{2})(SP|SU|FA|WI)").expect("semester regex"));

static DATE_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})/(\d{1,2})\b").expect("date token regex"));

/// Fallback label when the text carries no recognizable semester token.
pub const FALLBACK_SEMESTER: &str = "2025SP";

/// Guess the semester label from a "YYYY + 2-letter term code" token.
/// Heuristic only; used for logging, never authoritative.
pub fn detect_semester(text: &str) -> String {
    SEMESTER_RE
        .find(text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| FALLBACK_SEMESTER.to_string())
}

/// Whether the text contains any M/D-style date token.
pub fn has_date_tokens(text: &str) -> bool {
    DATE_TOKEN_RE.is_match(text)
}

/// Count of date tokens, for logging.
pub fn date_token_count(text: &str) -> usize {
    DATE_TOKEN_RE.find_iter(text).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_semester() {
        assert_eq!(detect_semester("CS 101 Syllabus 2024FA"), "2024FA");
        assert_eq!(detect_semester("Spring term 2025SP schedule"), "2025SP");
    }

    #[test]
    fn test_detect_semester_falls_back() {
        assert_eq!(detect_semester("no term code here"), FALLBACK_SEMESTER);
    }

    #[test]
    fn test_date_tokens_present() {
        let text = "Midterm Exam 10/30 in Room 101. HW 1 due 10/14.";
        assert!(has_date_tokens(text));
        assert_eq!(date_token_count(text), 2);
    }

    #[test]
    fn test_no_date_tokens() {
        assert!(!has_date_tokens("Office hours by appointment. Grading: 60% exams."));
        // A lone slash between words is not a date token.
        assert!(!has_date_tokens("pass/fail grading"));
    }
}
