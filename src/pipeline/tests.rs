// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;
use crate::carrier::models::{DocumentQuery, ShipDateWindow, TrackingResponse};
use crate::carrier::{AuthService, DocumentApi, TrackingApi};
use crate::error::AuthError;
use crate::merge::UnavailableTool;
use crate::merge::assembler::fixtures::{marked_pdf_bytes, page_markers};
use crate::progress;
use crate::types::{AccessToken, Event, Identifier, ProgressEvent, TrackingStatus};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::NaiveDate;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;

struct FakeAuth {
    reject: bool,
}

#[async_trait]
impl AuthService for FakeAuth {
    async fn fetch_token(&self, _purpose: CredentialPurpose) -> std::result::Result<AccessToken, AuthError> {
        if self.reject {
            Err(AuthError::Rejected {
                status: 401,
                message: "invalid client".to_string(),
            })
        } else {
            Ok(AccessToken::new("test-token"))
        }
    }
}

/// Status codes per identifier; identifiers without an entry always fail
#[derive(Default)]
struct FakeTracking {
    codes: HashMap<String, String>,
    queried: Mutex<Vec<(String, Option<ShipDateWindow>)>>,
}

#[async_trait]
impl TrackingApi for FakeTracking {
    async fn query(
        &self,
        identifier: &Identifier,
        _token: &AccessToken,
        window: Option<ShipDateWindow>,
    ) -> Result<TrackingResponse> {
        self.queried
            .lock()
            .unwrap()
            .push((identifier.to_string(), window));
        let Some(code) = self.codes.get(identifier.as_str()) else {
            return Err(Error::Api {
                status: 503,
                message: "unavailable".to_string(),
            });
        };
        Ok(serde_json::from_value(json!({
            "output": { "completeTrackResults": [{
                "trackingNumber": identifier.as_str(),
                "trackResults": [{
                    "latestStatusDetail": { "derivedCode": code },
                    "scanEvents": [{ "exceptionDescription": "held at depot" }]
                }]
            }]}
        }))
        .unwrap())
    }
}

/// Documents per identifier; identifiers without an entry always fail
#[derive(Default)]
struct FakeDocuments {
    payloads: HashMap<String, Option<String>>,
    queried: Mutex<Vec<String>>,
}

#[async_trait]
impl DocumentApi for FakeDocuments {
    async fn query(&self, query: &DocumentQuery, _token: &AccessToken) -> Result<Option<String>> {
        self.queried
            .lock()
            .unwrap()
            .push(query.identifier.to_string());
        match self.payloads.get(query.identifier.as_str()) {
            Some(payload) => Ok(payload.clone()),
            None => Err(Error::Api {
                status: 500,
                message: "document service down".to_string(),
            }),
        }
    }
}

fn pdf_payload(marker: &str) -> Option<String> {
    Some(STANDARD.encode(marked_pdf_bytes(&[marker])))
}

struct Harness {
    _dir: TempDir,
    config: Config,
    tracking: Arc<FakeTracking>,
    documents: Arc<FakeDocuments>,
    reject_auth: bool,
}

impl Harness {
    fn new(tracking: FakeTracking, documents: FakeDocuments) -> Self {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.retry.max_attempts = 2;
        config.retry.base_delay = Duration::from_millis(1);
        config.pipeline.rate_limit_pause = Duration::ZERO;
        config.pipeline.pod_dir = dir.path().join("pods");
        config.pipeline.results_dir = dir.path().join("results");
        config.merge.temp_dir = dir.path().join("scratch");
        std::fs::create_dir_all(&config.merge.temp_dir).unwrap();

        Self {
            _dir: dir,
            config,
            tracking: Arc::new(tracking),
            documents: Arc::new(documents),
            reject_auth: false,
        }
    }

    async fn pipeline(&self) -> Pipeline {
        let services = CarrierServices {
            auth: Arc::new(FakeAuth {
                reject: self.reject_auth,
            }),
            tracking: self.tracking.clone(),
            documents: self.documents.clone(),
        };
        Pipeline::with_parts(self.config.clone(), services, Arc::new(UnavailableTool))
            .await
            .unwrap()
    }

    fn tracked(&self) -> Vec<String> {
        self.tracking
            .queried
            .lock()
            .unwrap()
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }

    fn fetched(&self) -> Vec<String> {
        self.documents.queried.lock().unwrap().clone()
    }
}

fn codes(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(id, code)| (id.to_string(), code.to_string()))
        .collect()
}

fn statuses(events: &[Event]) -> Vec<&ProgressEvent> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::Status(status) => Some(status),
            Event::Complete(_) => None,
        })
        .collect()
}

fn summary(events: &[Event]) -> &CompletionSummary {
    match events.last() {
        Some(Event::Complete(summary)) => summary,
        other => panic!("expected terminal event last, got {:?}", other),
    }
}

#[test]
fn test_run_state_transitions() {
    use RunState::*;
    assert!(Init.can_advance_to(Authenticating));
    assert!(Authenticating.can_advance_to(Failed));
    assert!(Authenticating.can_advance_to(Processing(0)));
    assert!(Processing(0).can_advance_to(Processing(1)));
    assert!(Processing(4).can_advance_to(Merging));
    assert!(Processing(4).can_advance_to(Done));
    assert!(Merging.can_advance_to(Done));

    assert!(!Init.can_advance_to(Processing(0)));
    assert!(!Processing(0).can_advance_to(Processing(2)));
    assert!(!Processing(1).can_advance_to(Failed));
    assert!(!Merging.can_advance_to(Failed));
    assert!(!Done.can_advance_to(Init));

    assert!(Done.is_terminal());
    assert!(Failed.is_terminal());
    assert!(!Merging.is_terminal());
    assert_eq!(Processing(3).to_string(), "processing(3)");
}

#[tokio::test]
async fn test_delivered_identifiers_are_merged_in_order() {
    let harness = Harness::new(
        FakeTracking {
            codes: codes(&[("111", "DL"), ("222", "IT"), ("333", "DL")]),
            ..Default::default()
        },
        FakeDocuments {
            payloads: [("111", pdf_payload("A")), ("333", pdf_payload("C"))]
                .into_iter()
                .map(|(id, p)| (id.to_string(), p))
                .collect(),
            ..Default::default()
        },
    );
    let pipeline = harness.pipeline().await;
    let (reporter, mut observer) = progress::channel();

    let result = pipeline
        .run(RunRequest::new("PRJ 7", ["111", "222", "333"]), reporter)
        .await
        .unwrap();

    assert_eq!(harness.tracked(), vec!["111", "222", "333"]);
    assert_eq!(harness.fetched(), vec!["111", "333"]);

    let ids: Vec<_> = result.statuses.iter().map(|s| s.identifier.as_str()).collect();
    assert_eq!(ids, vec!["111", "222", "333"]);
    assert_eq!(result.statuses[1].status, TrackingStatus::Carrier("IT".to_string()));
    assert_eq!(result.statuses[1].reason, "Held at depot");
    assert_eq!(result.documents.len(), 2);

    let merged = result.merged_output.clone().unwrap();
    assert_eq!(merged, harness.config.pipeline.results_dir.join("PRJ_7-POD.pdf"));
    assert_eq!(page_markers(&merged), vec!["A", "C"]);

    let events = observer.drain();
    let summary = summary(&events);
    assert!(summary.success);
    assert_eq!(summary.merged_document_count, 2);
    assert!(summary.has_merged_output);
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
}

#[tokio::test]
async fn test_progress_schedule() {
    let harness = Harness::new(
        FakeTracking {
            codes: codes(&[("1", "IT"), ("2", "IT"), ("3", "IT"), ("4", "IT")]),
            ..Default::default()
        },
        FakeDocuments::default(),
    );
    let pipeline = harness.pipeline().await;
    let (reporter, mut observer) = progress::channel();

    pipeline
        .run(RunRequest::new("P", ["1", "2", "3", "4"]), reporter)
        .await
        .unwrap();

    let events = observer.drain();
    let percents: Vec<u8> = statuses(&events).iter().filter_map(|s| s.progress).collect();
    assert_eq!(percents, vec![0, 5, 10, 20, 35, 50, 65, 80, 98, 100]);
    assert!(percents.windows(2).all(|w| w[0] <= w[1]));

    let messages: Vec<_> = statuses(&events).iter().map(|s| s.message.clone()).collect();
    assert_eq!(messages[0], "Starting tracking process...");
    assert!(messages.contains(&"Found 4 tracking numbers to process".to_string()));
    assert!(messages.contains(&"Processing (2/4): 2".to_string()));
    assert_eq!(messages.last().unwrap(), "Processing complete!");
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_pause_between_identifiers_only() {
    let mut harness = Harness::new(
        FakeTracking {
            codes: codes(&[("1", "IT"), ("2", "IT"), ("3", "IT")]),
            ..Default::default()
        },
        FakeDocuments::default(),
    );
    harness.config.pipeline.rate_limit_pause = Duration::from_millis(600);
    let pipeline = harness.pipeline().await;

    let started = tokio::time::Instant::now();
    pipeline
        .run(
            RunRequest::new("P", ["1", "2", "3"]),
            ProgressReporter::detached(),
        )
        .await
        .unwrap();

    // Two gaps for three identifiers, none after the last
    assert_eq!(started.elapsed(), Duration::from_millis(1200));
}

#[tokio::test]
async fn test_lookup_failure_yields_error_status_and_run_continues() {
    let harness = Harness::new(
        FakeTracking {
            codes: codes(&[("ok", "DL")]),
            ..Default::default()
        },
        FakeDocuments {
            payloads: [("ok".to_string(), pdf_payload("OK"))].into_iter().collect(),
            ..Default::default()
        },
    );
    let pipeline = harness.pipeline().await;
    let (reporter, mut observer) = progress::channel();

    let result = pipeline
        .run(RunRequest::new("P", ["broken", "ok"]), reporter)
        .await
        .unwrap();

    // Two attempts for the failing identifier, one for the other
    assert_eq!(harness.tracked(), vec!["broken", "broken", "ok"]);
    let broken = result.status_of(&Identifier::new("broken")).unwrap();
    assert_eq!(broken.status, TrackingStatus::Error);
    assert!(broken.reason.starts_with("API error: "));
    assert!(result.merged_output.is_some());

    let events = observer.drain();
    assert!(statuses(&events).iter().any(|s| s.severity == Severity::Warning
        && s.message.starts_with("Tracking API failed for broken (Attempt 1/2)")));
    assert!(summary(&events).success);
}

#[tokio::test]
async fn test_pod_failures_do_not_stop_the_run() {
    let harness = Harness::new(
        FakeTracking {
            codes: codes(&[("down", "DL"), ("empty", "DL"), ("good", "DL")]),
            ..Default::default()
        },
        FakeDocuments {
            payloads: [("empty", None), ("good", pdf_payload("G"))]
                .into_iter()
                .map(|(id, p)| (id.to_string(), p))
                .collect(),
            ..Default::default()
        },
    );
    let pipeline = harness.pipeline().await;
    let (reporter, mut observer) = progress::channel();

    let result = pipeline
        .run(RunRequest::new("P", ["down", "empty", "good"]), reporter)
        .await
        .unwrap();

    assert_eq!(result.delivered_count(), 3);
    assert_eq!(result.documents.len(), 1);
    assert_eq!(result.documents[0].identifier.as_str(), "good");
    assert_eq!(page_markers(result.merged_output.as_ref().unwrap()), vec!["G"]);

    let events = observer.drain();
    let messages: Vec<_> = statuses(&events).iter().map(|s| s.message.clone()).collect();
    assert!(messages.iter().any(|m| m.starts_with("Failed to download POD for down")));
    assert!(messages.contains(&"No POD document available for empty".to_string()));
    assert_eq!(summary(&events).merged_document_count, 1);
}

#[tokio::test]
async fn test_duplicates_are_processed_once() {
    let harness = Harness::new(
        FakeTracking {
            codes: codes(&[("1", "IT"), ("2", "IT")]),
            ..Default::default()
        },
        FakeDocuments::default(),
    );
    let pipeline = harness.pipeline().await;
    let (reporter, mut observer) = progress::channel();

    let result = pipeline
        .run(RunRequest::new("P", ["1", "2", " 1 "]), reporter)
        .await
        .unwrap();

    assert_eq!(result.statuses.len(), 2);
    assert_eq!(harness.tracked(), vec!["1", "2"]);

    let events = observer.drain();
    assert!(statuses(&events).iter().any(|s| s.severity == Severity::Warning
        && s.message == "Duplicate tracking number 1 ignored"));
}

#[tokio::test]
async fn test_reference_date_reaches_carrier_queries() {
    let harness = Harness::new(
        FakeTracking {
            codes: codes(&[("1", "IT")]),
            ..Default::default()
        },
        FakeDocuments::default(),
    );
    let pipeline = harness.pipeline().await;
    let date = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();

    pipeline
        .run(
            RunRequest::new("P", ["1"]).with_reference_date(date),
            ProgressReporter::detached(),
        )
        .await
        .unwrap();

    let queried = harness.tracking.queried.lock().unwrap().clone();
    assert_eq!(queried[0].1, Some(ShipDateWindow::single_day(date)));
}

#[tokio::test]
async fn test_auth_failure_aborts_with_failed_summary() {
    let mut harness = Harness::new(
        FakeTracking {
            codes: codes(&[("1", "DL")]),
            ..Default::default()
        },
        FakeDocuments::default(),
    );
    harness.reject_auth = true;
    let pipeline = harness.pipeline().await;
    let (reporter, mut observer) = progress::channel();

    let err = pipeline
        .run(RunRequest::new("P", ["1"]), reporter)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Auth(AuthError::Rejected { status: 401, .. })));
    assert!(harness.tracked().is_empty());

    let events = observer.drain();
    let summary = summary(&events);
    assert!(!summary.success);
    assert!(!summary.has_merged_output);
    assert!(summary.error.as_deref().unwrap().contains("invalid client"));
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
}

#[tokio::test]
async fn test_merge_failure_still_completes() {
    let harness = Harness::new(
        FakeTracking {
            codes: codes(&[("1", "DL")]),
            ..Default::default()
        },
        FakeDocuments {
            payloads: [("1".to_string(), Some(STANDARD.encode(b"not a pdf at all")))]
                .into_iter()
                .collect(),
            ..Default::default()
        },
    );
    let pipeline = harness.pipeline().await;
    let (reporter, mut observer) = progress::channel();

    let result = pipeline
        .run(RunRequest::new("P", ["1"]), reporter)
        .await
        .unwrap();

    assert_eq!(result.documents.len(), 1);
    assert!(result.documents[0].path.exists());
    assert_eq!(result.merged_output, None);

    let events = observer.drain();
    assert!(statuses(&events).iter().any(|s| s.severity == Severity::Warning
        && s.message.starts_with("Failed to merge PDFs")));
    let summary = summary(&events);
    assert!(summary.success);
    assert_eq!(summary.merged_document_count, 1);
    assert!(!summary.has_merged_output);
}

#[tokio::test]
async fn test_empty_request_completes_without_merging() {
    let harness = Harness::new(FakeTracking::default(), FakeDocuments::default());
    let pipeline = harness.pipeline().await;
    let (reporter, mut observer) = progress::channel();

    let result = pipeline
        .run(RunRequest::new("", Vec::<String>::new()), reporter)
        .await
        .unwrap();

    assert!(result.statuses.is_empty());
    assert_eq!(result.merged_output, None);
    let events = observer.drain();
    assert!(summary(&events).success);
    assert!(
        !statuses(&events)
            .iter()
            .any(|s| s.message.starts_with("Merging"))
    );
}

#[tokio::test]
async fn test_invalid_config_is_rejected_before_running() {
    let mut harness = Harness::new(FakeTracking::default(), FakeDocuments::default());
    harness.config.retry.max_attempts = 0;
    let services = CarrierServices {
        auth: Arc::new(FakeAuth { reject: false }),
        tracking: harness.tracking.clone(),
        documents: harness.documents.clone(),
    };

    let result = Pipeline::with_parts(harness.config.clone(), services, Arc::new(UnavailableTool)).await;
    assert!(matches!(result, Err(Error::Config { .. })));
}
