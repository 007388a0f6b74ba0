//! PDF fixtures and a scriptable mock carrier

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream, dictionary};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Page dictionary key identifying a fixture page after merging
pub const MARKER_KEY: &[u8] = b"FixtureMarker";

/// A one-page PDF whose page carries `marker`
pub fn pod_pdf(marker: &str) -> Vec<u8> {
    let mut doc = Document::with_version("1.4");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(18)]),
            Operation::new("Td", vec![Object::Integer(72), Object::Integer(700)]),
            Operation::new("Tj", vec![Object::string_literal(format!("POD {}", marker))]),
            Operation::new("ET", vec![]),
        ],
    };
    let encoded = content.encode().unwrap_or_default();
    let content_id = doc.add_object(Stream::new(Dictionary::new(), encoded));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(612),
            Object::Integer(792),
        ],
        "FixtureMarker" => Object::string_literal(marker),
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => Object::Integer(1),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).ok();
    bytes
}

/// Markers of every page of a merged document, in page order
pub fn merged_markers(path: &Path) -> Vec<String> {
    let Ok(doc) = Document::load(path) else {
        panic!("cannot load merged document {}", path.display());
    };
    doc.get_pages()
        .values()
        .filter_map(|id| doc.get_dictionary(*id).ok())
        .filter_map(|page| match page.get(MARKER_KEY) {
            Ok(Object::String(bytes, _)) => Some(String::from_utf8_lossy(bytes).into_owned()),
            _ => None,
        })
        .collect()
}

/// What the mock document endpoint does for a shipment
#[derive(Clone, Debug)]
pub enum PodBehavior {
    /// Return a one-page PDF carrying this marker
    Document(String),
    /// Return a response without documents
    Missing,
    /// Answer every document request with a server error
    Fail,
}

/// One scripted shipment
#[derive(Clone, Debug)]
pub struct Shipment {
    /// Derived status code
    pub code: String,
    /// Scan exception descriptions, oldest first
    pub exceptions: Vec<String>,
    /// Tracking requests answered with 500 before a real answer
    pub transient_failures: usize,
    /// Document endpoint behavior
    pub pod: PodBehavior,
}

impl Shipment {
    /// Delivered shipment whose POD carries the identifier as marker
    pub fn delivered(identifier: &str) -> Self {
        Self {
            code: "DL".to_string(),
            exceptions: Vec::new(),
            transient_failures: 0,
            pod: PodBehavior::Document(identifier.to_string()),
        }
    }

    /// Undelivered shipment with the given exceptions
    pub fn exception(code: &str, exceptions: &[&str]) -> Self {
        Self {
            code: code.to_string(),
            exceptions: exceptions.iter().map(|e| e.to_string()).collect(),
            transient_failures: 0,
            pod: PodBehavior::Missing,
        }
    }

    /// Fail the first `count` tracking requests
    pub fn failing_first(mut self, count: usize) -> Self {
        self.transient_failures = count;
        self
    }

    /// Override the document behavior
    pub fn with_pod(mut self, pod: PodBehavior) -> Self {
        self.pod = pod;
        self
    }
}

type ShipmentTable = Arc<HashMap<String, Shipment>>;

/// Pull the tracking number out of a tracking or document request body
fn requested_identifier(request: &Request) -> Option<String> {
    let body: Value = serde_json::from_slice(&request.body).ok()?;
    let entry = body
        .get("trackingInfo")
        .or_else(|| body.get("trackDocumentSpecification"))?
        .get(0)?;
    entry
        .pointer("/trackingNumberInfo/trackingNumber")?
        .as_str()
        .map(str::to_string)
}

struct TrackingResponder {
    shipments: ShipmentTable,
    failures_served: Mutex<HashMap<String, usize>>,
}

impl Respond for TrackingResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let Some(identifier) = requested_identifier(request) else {
            return ResponseTemplate::new(400);
        };
        let Some(shipment) = self.shipments.get(&identifier) else {
            return ResponseTemplate::new(200)
                .set_body_json(json!({ "output": { "completeTrackResults": [] } }));
        };

        if let Ok(mut served) = self.failures_served.lock() {
            let count = served.entry(identifier.clone()).or_insert(0);
            if *count < shipment.transient_failures {
                *count += 1;
                return ResponseTemplate::new(500).set_body_string("temporarily unavailable");
            }
        }

        let scan_events: Vec<Value> = shipment
            .exceptions
            .iter()
            .map(|e| json!({ "eventDescription": "Exception", "exceptionDescription": e }))
            .collect();
        ResponseTemplate::new(200).set_body_json(json!({
            "output": { "completeTrackResults": [{
                "trackingNumber": identifier,
                "trackResults": [{
                    "latestStatusDetail": { "derivedCode": shipment.code, "code": shipment.code },
                    "scanEvents": scan_events
                }]
            }]}
        }))
    }
}

struct DocumentResponder {
    shipments: ShipmentTable,
}

impl Respond for DocumentResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let pod = requested_identifier(request)
            .and_then(|id| self.shipments.get(&id))
            .map(|s| s.pod.clone())
            .unwrap_or(PodBehavior::Missing);

        match pod {
            PodBehavior::Document(marker) => ResponseTemplate::new(200).set_body_json(json!({
                "output": { "documents": [STANDARD.encode(pod_pdf(&marker))] }
            })),
            PodBehavior::Missing => {
                ResponseTemplate::new(200).set_body_json(json!({ "output": { "documents": [] } }))
            }
            PodBehavior::Fail => ResponseTemplate::new(500).set_body_string("document service down"),
        }
    }
}

/// Start a mock carrier serving token, tracking and document endpoints
pub async fn mock_carrier(shipments: HashMap<String, Shipment>) -> MockServer {
    let server = MockServer::start().await;
    let shipments: ShipmentTable = Arc::new(shipments);

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "mock-token",
            "token_type": "bearer",
            "expires_in": 3599
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/track/v1/trackingnumbers"))
        .respond_with(TrackingResponder {
            shipments: shipments.clone(),
            failures_served: Mutex::new(HashMap::new()),
        })
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/track/v1/trackingdocuments"))
        .respond_with(DocumentResponder { shipments })
        .mount(&server)
        .await;

    server
}

/// Start a mock carrier whose token endpoint rejects every request
pub async fn rejecting_carrier() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({ "errors": [{ "code": "NOT.AUTHORIZED.ERROR" }] })),
        )
        .mount(&server)
        .await;
    server
}

/// Number of requests the server received on `endpoint`
pub async fn request_count(server: &MockServer, endpoint: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == endpoint)
        .count()
}
