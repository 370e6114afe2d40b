// Two-stage parser for model completions
//
// Stage one is a strict JSON parse of the whole completion. Stage two tolerates
// explanatory prose around the payload by reparsing the first bracketed array
// substring. Neither stage failing is an error at this layer.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

static ARRAY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\[.*\]").expect("array regex"));

/// One loosely-typed object out of the model's JSON array. Every field is
/// optional; default substitution happens during coercion, not here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawEvent {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug)]
pub enum ParseOutcome {
    /// The completion was the JSON array itself.
    Strict(Vec<RawEvent>),
    /// The array was recovered from inside surrounding prose.
    Recovered(Vec<RawEvent>),
    /// No parseable array anywhere in the completion.
    Unparseable,
}

impl ParseOutcome {
    pub fn into_events(self) -> Vec<RawEvent> {
        match self {
            ParseOutcome::Strict(events) | ParseOutcome::Recovered(events) => events,
            ParseOutcome::Unparseable => Vec::new(),
        }
    }
}

pub fn parse_events(completion: &str) -> ParseOutcome {
    if let Ok(events) = serde_json::from_str::<Vec<RawEvent>>(completion) {
        return ParseOutcome::Strict(events);
    }

    if let Some(found) = ARRAY_RE.find(completion) {
        if let Ok(events) = serde_json::from_str::<Vec<RawEvent>>(found.as_str()) {
            return ParseOutcome::Recovered(events);
        }
    }

    ParseOutcome::Unparseable
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARRAY: &str = r#"[
        {"title": "Midterm Exam", "date": "2025-10-30", "category": "Exam", "location": "Room 101"},
        {"title": "HW 1 due", "date": "2025-10-14", "category": "HW", "location": null}
    ]"#;

    #[test]
    fn test_strict_parse() {
        let outcome = parse_events(ARRAY);
        assert!(matches!(outcome, ParseOutcome::Strict(_)));
        let events = outcome.into_events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].title.as_deref(), Some("Midterm Exam"));
        assert_eq!(events[1].location, None);
    }

    #[test]
    fn test_prose_wrapped_array_recovers_same_events() {
        let wrapped = format!("Here are the extracted events:\n\n{ARRAY}\n\nLet me know if you need more.");
        let outcome = parse_events(&wrapped);
        assert!(matches!(outcome, ParseOutcome::Recovered(_)));

        let strict = parse_events(ARRAY).into_events();
        let recovered = outcome.into_events();
        assert_eq!(recovered.len(), strict.len());
        for (a, b) in recovered.iter().zip(strict.iter()) {
            assert_eq!(a.title, b.title);
            assert_eq!(a.date, b.date);
            assert_eq!(a.category, b.category);
        }
    }

    #[test]
    fn test_unparseable_output() {
        assert!(matches!(
            parse_events("I could not find any events in this syllabus."),
            ParseOutcome::Unparseable
        ));
        assert!(matches!(
            parse_events("broken [ {\"title\": } ] json"),
            ParseOutcome::Unparseable
        ));
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let events = parse_events(r#"[{"title": "Quiz 1", "weight": "10%"}]"#).into_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title.as_deref(), Some("Quiz 1"));
        assert!(events[0].date.is_none());
    }
}
