//! Integration tests for the formatting pipeline and the filler contract.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use redocx::filler::{parse_response, prompt};
use redocx::{
    BlockKind, Error, ErrorKind, FillRequest, FilledBlock, FixedFiller, FormatRequest, Pipeline,
    RetryPolicy, SlotFiller, TemplateCache,
};

use common::{caption_table_template, legal_template};

/// Answers with a JSON string per call, cycling through `answers`.
struct JsonFiller {
    answers: Vec<&'static str>,
    calls: AtomicUsize,
    corrections: Arc<AtomicUsize>,
}

impl JsonFiller {
    fn new(answers: Vec<&'static str>) -> Self {
        Self {
            answers,
            calls: AtomicUsize::new(0),
            corrections: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl SlotFiller for JsonFiller {
    fn name(&self) -> &str {
        "json"
    }

    fn fill(&self, request: &FillRequest) -> redocx::Result<Vec<FilledBlock>> {
        if request.correction().is_some() {
            self.corrections.fetch_add(1, Ordering::SeqCst);
        }
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        parse_response(self.answers[call % self.answers.len()])
    }
}

/// Never answers in time.
struct Unreachable;

impl SlotFiller for Unreachable {
    fn name(&self) -> &str {
        "unreachable"
    }

    fn fill(&self, _request: &FillRequest) -> redocx::Result<Vec<FilledBlock>> {
        std::thread::sleep(Duration::from_millis(200));
        Ok(Vec::new())
    }
}

fn fast_policy() -> RetryPolicy {
    RetryPolicy::new()
        .with_timeout(Duration::from_millis(50))
        .with_backoff(Duration::from_millis(1), Duration::from_millis(2))
}

#[test]
fn test_json_answer_end_to_end() {
    let answer = r#"```json
[
  {"kind": "caption", "text": "SUPREME COURT OF THE STATE OF NEW YORK", "slot": 1},
  {"kind": "allegation", "text": "2. That plaintiff is a resident of Kings County.", "slot": 2},
  {"kind": "allegation", "text": "2. That plaintiff is a resident of Kings County.", "slot": 2},
  {"kind": "signature", "text": "Jane Roe, Esq.", "slot": 3}
]
```"#;
    let pipeline = Pipeline::builder()
        .filler(JsonFiller::new(vec![answer]))
        .retry_policy(fast_policy())
        .build()
        .unwrap();

    let output = pipeline.run(&legal_template(), "raw text").unwrap();
    assert_eq!(output.stats.paragraphs, 3);
    assert_eq!(
        output.preview,
        "SUPREME COURT OF THE STATE OF NEW YORK\n\nThat plaintiff is a resident of Kings County.\n\nJane Roe, Esq."
    );
}

#[test]
fn test_malformed_twice_is_fatal() {
    let bad = r#"[{"kind": "caption", "text": "x", "slot": 42}]"#;
    let filler = JsonFiller::new(vec![bad]);
    let corrections = Arc::clone(&filler.corrections);
    let pipeline = Pipeline::builder()
        .filler(filler)
        .retry_policy(fast_policy())
        .build()
        .unwrap();

    let result = pipeline.run(&legal_template(), "raw text");
    let err = result.unwrap_err();
    assert!(matches!(err, Error::ClassificationMalformed(_)));
    assert_eq!(err.kind(), ErrorKind::ClassificationMalformed);
    assert_eq!(corrections.load(Ordering::SeqCst), 1);
}

#[test]
fn test_corrective_retry_recovers() {
    let bad = r#"[{"kind": "footnote", "text": "x"}]"#;
    let good = r#"{"blocks": [{"kind": "heading", "text": "COMPLAINT"}]}"#;
    let pipeline = Pipeline::builder()
        .filler(JsonFiller::new(vec![bad, good]))
        .retry_policy(fast_policy())
        .build()
        .unwrap();

    let output = pipeline.run(&legal_template(), "raw text").unwrap();
    assert_eq!(output.preview, "COMPLAINT");
}

#[test]
fn test_timeout_is_unavailable() {
    let pipeline = Pipeline::builder()
        .filler(Unreachable)
        .retry_policy(fast_policy().with_max_attempts(2))
        .build()
        .unwrap();

    let err = pipeline.run(&legal_template(), "raw text").unwrap_err();
    assert!(matches!(err, Error::ClassificationUnavailable(_)));
    assert!(err.kind().is_retryable());
}

#[test]
fn test_table_reference_to_missing_table_is_malformed() {
    let bad = r#"[{"kind": "table_cell", "text": "x", "table_id": "parties", "row": 0, "col": 0}]"#;
    let pipeline = Pipeline::builder()
        .filler(JsonFiller::new(vec![bad]))
        .retry_policy(fast_policy())
        .build()
        .unwrap();

    let err = pipeline.run(&caption_table_template(), "raw").unwrap_err();
    assert!(matches!(err, Error::ClassificationMalformed(_)));
}

#[test]
fn test_batch_with_shared_cache() {
    let cache = Arc::new(TemplateCache::new());
    let pipeline = Pipeline::builder()
        .filler(FixedFiller::new(vec![FilledBlock::new(
            BlockKind::Heading,
            "VERIFIED COMPLAINT",
        )]))
        .cache(Arc::clone(&cache))
        .build()
        .unwrap();

    let requests = vec![
        FormatRequest::new(legal_template(), "one"),
        FormatRequest::new(caption_table_template(), "two"),
        FormatRequest::new(legal_template(), "three"),
        FormatRequest::new(b"garbage".to_vec(), "four"),
    ];
    let results = pipeline.run_batch(&requests);

    assert!(results[0].is_ok());
    assert!(results[1].is_ok());
    assert!(results[2].is_ok());
    assert!(matches!(results[3], Err(Error::TemplateInvalid(_))));
    assert_eq!(cache.len(), 2);
    assert_eq!(cache.stats().hits, 1);
}

#[test]
fn test_prompt_lists_slots() {
    let template = redocx::parse_template_bytes(&caption_table_template()).unwrap();
    let request = FillRequest::new(Arc::new(template.blueprint), "JOHN DOE against RICHARD ROE");
    let text = prompt::user_prompt(&request);

    assert!(text.contains("caption_table"));
    assert!(text.contains("table_cell"));
    assert!(text.contains("JOHN DOE against RICHARD ROE"));
    assert!(prompt::system_prompt().contains("signature_line"));
}
