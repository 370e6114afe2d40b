// Syllabus-to-event extraction pipeline
//
// Single pass: document bytes -> plain text -> heuristic gate -> one inference
// call -> lenient parse -> typed candidate events. No persistence, no
// deduplication, no retry; emission order follows the model's output.

pub mod gate;
pub mod parse;
pub mod text;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::LlmConfig;
use crate::llm::{LLMProviderConfig, LLM};
use crate::models::{CandidateEvent, EventCategory};
use crate::types::{AppError, AppResult, LLMMessage, LLMRequest};

use parse::{parse_events, ParseOutcome, RawEvent};

/// Only the head of the syllabus goes into the prompt.
const MAX_PROMPT_CHARS: usize = 4000;
/// Cap on completion length.
const MAX_COMPLETION_TOKENS: u32 = 1000;
/// Held near zero for determinism.
const TEMPERATURE: f32 = 0.1;
/// Substitute date when the model omits or malforms one.
const FALLBACK_DATE_OFFSET_DAYS: i64 = 30;

const PROMPT_HEADER: &str = "\
Parse this syllabus and extract all events (exams, assignments, projects, etc.) with dates.

Return a JSON array of events, each with:
- title: string
- date: ISO date string (YYYY-MM-DD)
- category: one of \"Exam\", \"Quiz\", \"HW\", \"Project\", \"Presentation\", \"Class\", \"Other\"
- location: string or null

If an event has no explicit year, assume the current academic year.

Syllabus text:
";

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("document contains no extractable text")]
    EmptyInput,

    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("unreadable document: {0}")]
    InvalidDocument(String),

    #[error("inference request failed: {0}")]
    Inference(String),
}

/// Best-effort syllabus extractor. Built once at startup from explicit
/// configuration and shared through `AppState`.
pub struct SyllabusExtractor {
    llm: Option<LLM>,
    model: String,
}

impl SyllabusExtractor {
    pub fn new(config: &LlmConfig) -> AppResult<Self> {
        let llm = if config.openai_api_key.is_empty() {
            // Missing credential is only fatal once an inference call is
            // actually needed.
            None
        } else {
            Some(LLM::new(LLMProviderConfig {
                name: "openai".to_string(),
                api_key: config.openai_api_key.clone(),
            })?)
        };

        Ok(Self {
            llm,
            model: config.model.clone(),
        })
    }

    /// Build an extractor around an existing LLM handle.
    pub fn with_llm(llm: LLM, model: impl Into<String>) -> Self {
        Self {
            llm: Some(llm),
            model: model.into(),
        }
    }

    /// Turn an uploaded document into candidate events.
    pub async fn extract(
        &self,
        bytes: &[u8],
        media_type: &str,
    ) -> Result<Vec<CandidateEvent>, ExtractionError> {
        let text = text::extract_text(bytes, media_type)?;
        self.extract_from_text(&text).await
    }

    async fn extract_from_text(&self, text: &str) -> Result<Vec<CandidateEvent>, ExtractionError> {
        let semester = gate::detect_semester(text);
        debug!(%semester, chars = text.len(), "syllabus text acquired");

        if !gate::has_date_tokens(text) {
            info!("no date tokens found, skipping inference");
            return Ok(Vec::new());
        }
        debug!(date_tokens = gate::date_token_count(text), "heuristic gate passed");

        let llm = self
            .llm
            .as_ref()
            .ok_or_else(|| ExtractionError::Inference("OPENAI_API_KEY not configured".into()))?;

        let request = LLMRequest {
            model: self.model.clone(),
            messages: vec![LLMMessage::user(build_prompt(text))],
            max_tokens: Some(MAX_COMPLETION_TOKENS),
            temperature: Some(TEMPERATURE),
        };

        let response = llm.create_chat_completion(&request).await.map_err(|e| {
            let msg = match e {
                AppError::LLMApi(msg) => msg,
                other => other.to_string(),
            };
            ExtractionError::Inference(msg)
        })?;

        let raw_events = match parse_events(&response.content) {
            ParseOutcome::Strict(events) => events,
            ParseOutcome::Recovered(events) => {
                debug!("recovered event array from prose-wrapped completion");
                events
            }
            ParseOutcome::Unparseable => {
                warn!("model completion carried no parseable event array");
                Vec::new()
            }
        };

        let fallback = fallback_date(Utc::now());
        let mut events = Vec::with_capacity(raw_events.len());
        for raw in raw_events {
            match coerce_event(raw, fallback) {
                Ok(event) => events.push(event),
                Err(e) => warn!(error = %e, "dropping malformed candidate event"),
            }
        }

        info!(count = events.len(), "syllabus extraction complete");
        Ok(events)
    }
}

fn build_prompt(text: &str) -> String {
    format!("{PROMPT_HEADER}{}", truncate_chars(text, MAX_PROMPT_CHARS))
}

fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((index, _)) => &s[..index],
        None => s,
    }
}

fn fallback_date(now: DateTime<Utc>) -> NaiveDate {
    (now + Duration::days(FALLBACK_DATE_OFFSET_DAYS)).date_naive()
}

/// Map one loosely-typed model object onto a typed candidate event.
///
/// Title and location get default substitution; a malformed date falls back to
/// `fallback`; an unknown category is the one coercion that drops the object.
fn coerce_event(
    raw: RawEvent,
    fallback: NaiveDate,
) -> Result<CandidateEvent, crate::models::UnknownCategory> {
    let title = raw
        .title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| "Untitled Event".to_string());

    let date = match raw.date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        Some(value) => parse_event_date(value).unwrap_or(fallback),
        None => fallback,
    };

    let category = match raw.category.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        Some(value) => value.parse::<EventCategory>()?,
        None => EventCategory::Other,
    };

    let location = raw.location.filter(|l| !l.trim().is_empty());

    Ok(CandidateEvent {
        title,
        date,
        category,
        location,
    })
}

/// ISO-8601 date coercion: full RFC 3339 timestamps (trailing `Z` = UTC),
/// then bare dates, then bare datetimes.
fn parse_event_date(value: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.date());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::provider::LLMAdapter;
    use crate::types::{AppResult, LLMResponse, TokenUsage};
    use async_trait::async_trait;
    use chrono::Datelike;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct StubAdapter {
        content: String,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl LLMAdapter for StubAdapter {
        async fn create_chat_completion(&self, _request: &LLMRequest) -> AppResult<LLMResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(LLMResponse {
                content: self.content.clone(),
                finish_reason: "stop".to_string(),
                usage: TokenUsage::default(),
            })
        }
    }

    struct FailingAdapter;

    #[async_trait]
    impl LLMAdapter for FailingAdapter {
        async fn create_chat_completion(&self, _request: &LLMRequest) -> AppResult<LLMResponse> {
            Err(AppError::LLMApi("401 invalid api key".to_string()))
        }
    }

    fn extractor_with(content: &str) -> (SyllabusExtractor, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let adapter = StubAdapter {
            content: content.to_string(),
            calls: Arc::clone(&calls),
        };
        let llm = LLM::with_adapter(Box::new(adapter), "stub");
        (SyllabusExtractor::with_llm(llm, "gpt-3.5-turbo"), calls)
    }

    #[tokio::test]
    async fn test_no_date_tokens_skips_inference() {
        let (extractor, calls) = extractor_with("[]");
        let events = extractor
            .extract_from_text("Grading policy: exams are worth sixty percent.")
            .await
            .unwrap();
        assert!(events.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_scenario_midterm_and_homework() {
        let year = Utc::now().year();
        let completion = format!(
            r#"[
                {{"title": "Midterm Exam", "date": "{year}-10-30", "category": "Exam", "location": "Room 101"}},
                {{"title": "HW 1 due", "date": "{year}-10-14", "category": "HW"}}
            ]"#
        );
        let (extractor, calls) = extractor_with(&completion);

        let events = extractor
            .extract_from_text("2025FA schedule: Midterm Exam 10/30, HW 1 due 10/14")
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].category, EventCategory::Exam);
        assert_eq!(events[0].date.year(), year);
        assert_eq!(events[0].location.as_deref(), Some("Room 101"));
        assert_eq!(events[1].category, EventCategory::Hw);
        assert_eq!(events[1].date.year(), year);
        assert_eq!(events[1].location, None);
    }

    #[tokio::test]
    async fn test_inference_failure_propagates() {
        let llm = LLM::with_adapter(Box::new(FailingAdapter), "stub");
        let extractor = SyllabusExtractor::with_llm(llm, "gpt-3.5-turbo");

        let err = extractor
            .extract_from_text("Quiz 2 on 11/5")
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Inference(_)));
    }

    #[tokio::test]
    async fn test_missing_api_key_is_inference_failure() {
        let extractor = SyllabusExtractor::new(&LlmConfig {
            openai_api_key: String::new(),
            model: "gpt-3.5-turbo".to_string(),
        })
        .unwrap();

        let err = extractor
            .extract_from_text("Final Exam 12/12")
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Inference(_)));
    }

    #[tokio::test]
    async fn test_unparseable_completion_yields_empty_result() {
        let (extractor, _) = extractor_with("Sorry, I cannot find any events.");
        let events = extractor.extract_from_text("Quiz on 9/9").await.unwrap();
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_empty_upload_never_reaches_inference() {
        let (extractor, calls) = extractor_with("[]");
        let err = extractor
            .extract(&[], crate::config::PDF_MEDIA_TYPE)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::EmptyInput));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_coerce_defaults() {
        let fallback = NaiveDate::from_ymd_opt(2025, 11, 1).unwrap();
        let event = coerce_event(RawEvent::default(), fallback).unwrap();
        assert_eq!(event.title, "Untitled Event");
        assert_eq!(event.date, fallback);
        assert_eq!(event.category, EventCategory::Other);
        assert_eq!(event.location, None);
    }

    #[test]
    fn test_coerce_malformed_date_uses_fallback() {
        let fallback = NaiveDate::from_ymd_opt(2025, 11, 1).unwrap();
        let raw = RawEvent {
            title: Some("Project kickoff".into()),
            date: Some("sometime in October".into()),
            category: Some("Project".into()),
            location: None,
        };
        let event = coerce_event(raw, fallback).unwrap();
        assert_eq!(event.date, fallback);
        assert_eq!(event.category, EventCategory::Project);
    }

    #[test]
    fn test_coerce_trailing_z_treated_as_utc() {
        let fallback = NaiveDate::from_ymd_opt(2025, 11, 1).unwrap();
        let raw = RawEvent {
            title: Some("Presentation".into()),
            date: Some("2025-10-30T15:00:00Z".into()),
            category: Some("Presentation".into()),
            location: None,
        };
        let event = coerce_event(raw, fallback).unwrap();
        assert_eq!(event.date, NaiveDate::from_ymd_opt(2025, 10, 30).unwrap());
    }

    #[test]
    fn test_coerce_unknown_category_drops_event() {
        let fallback = NaiveDate::from_ymd_opt(2025, 11, 1).unwrap();
        let raw = RawEvent {
            title: Some("Field trip".into()),
            date: Some("2025-10-30".into()),
            category: Some("Excursion".into()),
            location: None,
        };
        assert!(coerce_event(raw, fallback).is_err());
    }

    #[test]
    fn test_coerce_blank_location_becomes_none() {
        let fallback = NaiveDate::from_ymd_opt(2025, 11, 1).unwrap();
        let raw = RawEvent {
            title: Some("Class".into()),
            date: Some("2025-09-02".into()),
            category: Some("Class".into()),
            location: Some("   ".into()),
        };
        let event = coerce_event(raw, fallback).unwrap();
        assert_eq!(event.location, None);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let s = "日本語のシラバス".repeat(1000);
        let truncated = truncate_chars(&s, MAX_PROMPT_CHARS);
        assert_eq!(truncated.chars().count(), MAX_PROMPT_CHARS);
        assert!(s.starts_with(truncated));
    }

    #[test]
    fn test_fallback_date_is_thirty_days_out() {
        let now = DateTime::parse_from_rfc3339("2025-10-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(
            fallback_date(now),
            NaiveDate::from_ymd_opt(2025, 10, 31).unwrap()
        );
    }
}
