#![cfg(test)]

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use anyhow::anyhow;
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use mockall::mock;
use serde_json::{Value, json};
use symptom_predictor::{
    base::{
        config::{Config, ConfigInner},
        follow_up::FollowUpTable,
        greetings::{GREETINGS, GreetingSet},
        specialty::SpecialtyMap,
        types::{Classification, ComputeDevice, PredictRequest, Res},
    },
    interaction::{self, predict::handle_predict},
    runtime::Runtime,
    service::classifier::{ClassifierClient, GenericClassifierClient, run_blocking},
};
use tower::ServiceExt;

// Mocks.

// Mock classifier so the request path runs without a model.

mock! {
    pub Classifier {}

    #[async_trait]
    impl GenericClassifierClient for Classifier {
        fn device(&self) -> ComputeDevice;
        async fn classify(&self, text: &str, top_k: usize) -> Res<Vec<Classification>>;
    }
}

/// Counts forward passes so tests can see how many overlapped.
#[derive(Default)]
struct ForwardPasses {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    finished: AtomicUsize,
}

/// A classifier that holds a blocking thread for a while, like the real model.
struct SlowClassifier {
    passes: Arc<ForwardPasses>,
}

#[async_trait]
impl GenericClassifierClient for SlowClassifier {
    fn device(&self) -> ComputeDevice {
        ComputeDevice::Cpu
    }

    async fn classify(&self, _text: &str, top_k: usize) -> Res<Vec<Classification>> {
        let passes = self.passes.clone();

        run_blocking(move || {
            let now = passes.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            passes.peak.fetch_max(now, Ordering::SeqCst);

            std::thread::sleep(Duration::from_millis(400));

            passes.in_flight.fetch_sub(1, Ordering::SeqCst);
            passes.finished.fetch_add(1, Ordering::SeqCst);

            Ok(ranked_labels().into_iter().take(top_k).collect())
        })
        .await
    }
}

/// A classifier whose blocking worker dies mid-pass.
struct PanickingWorkerClassifier;

#[async_trait]
impl GenericClassifierClient for PanickingWorkerClassifier {
    fn device(&self) -> ComputeDevice {
        ComputeDevice::Cpu
    }

    async fn classify(&self, _text: &str, _top_k: usize) -> Res<Vec<Classification>> {
        run_blocking(|| panic!("tensor shape mismatch")).await
    }
}

/// A classifier that panics on the async side.
struct PanickingClassifier;

#[async_trait]
impl GenericClassifierClient for PanickingClassifier {
    fn device(&self) -> ComputeDevice {
        ComputeDevice::Cpu
    }

    async fn classify(&self, _text: &str, _top_k: usize) -> Res<Vec<Classification>> {
        panic!("classifier state corrupted")
    }
}

/// Ranked labels the mock hands out, highest score first.
fn ranked_labels() -> Vec<Classification> {
    vec![
        Classification::new(" Common Cold ", 0.72),
        Classification::new("Allergy", 0.18),
        Classification::new("Scurvy", 0.06),
        Classification::new("Pneumonia", 0.04),
    ]
}

/// A mock that behaves like a well-formed classifier.
fn get_mock_classifier() -> MockClassifier {
    let mut mock = MockClassifier::new();

    mock.expect_device().return_const(ComputeDevice::Cpu);
    mock.expect_classify().returning(|_, top_k| Ok(ranked_labels().into_iter().take(top_k).collect()));

    mock
}

fn test_config() -> Config {
    Config {
        inner: Arc::new(ConfigInner {
            max_concurrent_inferences: 2,
            max_top_k: 3,
            ..Default::default()
        }),
    }
}

fn test_specialties() -> SpecialtyMap {
    SpecialtyMap::new([("Common Cold", "General Physician"), ("Allergy", "Allergist"), ("Pneumonia", "Pulmonologist")])
}

/// Helper function to setup the test environment.
fn setup_test_environment(classifier: MockClassifier) -> Runtime {
    runtime_with_classifier(classifier, test_config())
}

fn runtime_with_classifier(classifier: impl GenericClassifierClient, config: Config) -> Runtime {
    Runtime::from_parts(
        config,
        ClassifierClient::new(Arc::new(classifier)),
        test_specialties(),
        FollowUpTable::builtin(),
        GreetingSet::builtin(),
    )
}

/// Send a request through the router and decode the JSON response.
async fn send(runtime: &Runtime, request: Request<Body>) -> (StatusCode, Value) {
    let response = interaction::router(runtime.clone()).oneshot(request).await.expect("Router failed");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("Failed to read body");
    let body = serde_json::from_slice(&bytes).expect("Response is not JSON");

    (status, body)
}

fn predict_request(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

async fn predict(runtime: &Runtime, body: Value) -> (StatusCode, Value) {
    send(runtime, predict_request(body.to_string())).await
}

// Health.

#[tokio::test]
async fn test_health_reports_ok_and_device() {
    let runtime = setup_test_environment(get_mock_classifier());
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

    let (status, body) = send(&runtime, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok", "device": "cpu" }));
}

#[tokio::test]
async fn test_health_reports_cuda_device() {
    let mut mock = MockClassifier::new();
    mock.expect_device().return_const(ComputeDevice::Cuda);

    let runtime = setup_test_environment(mock);
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

    let (status, body) = send(&runtime, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["device"], "cuda");
}

// Greetings.

#[tokio::test]
async fn test_greetings_never_reach_the_classifier() {
    let mut mock = MockClassifier::new();
    mock.expect_classify().never();

    let runtime = setup_test_environment(mock);

    for greeting in GREETINGS {
        let padded = format!("  {}  ", greeting.to_uppercase());
        let (status, body) = predict(&runtime, json!({ "symptoms": padded })).await;

        assert_eq!(status, StatusCode::OK, "`{greeting}`");
        assert_eq!(body, json!({ "message": "Please describe your symptoms so I can help you." }));
    }
}

#[tokio::test]
async fn test_hello_there_with_leading_space_is_a_greeting() {
    let mut mock = MockClassifier::new();
    mock.expect_classify().never();

    let runtime = setup_test_environment(mock);
    let (status, body) = predict(&runtime, json!({ "symptoms": " hello there" })).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.get("message").is_some());
}

// Input validation.

#[tokio::test]
async fn test_blank_or_missing_symptoms_are_rejected() {
    let mut mock = MockClassifier::new();
    mock.expect_classify().never();

    let runtime = setup_test_environment(mock);

    for body in [json!({ "symptoms": "" }), json!({ "symptoms": "   \n\t " }), json!({}), json!({ "top_k": 3 }), json!({ "symptoms": null })] {
        let (status, response) = predict(&runtime, body.clone()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(response, json!({ "error": "symptoms is required" }));
    }
}

#[tokio::test]
async fn test_malformed_body_is_treated_as_missing_symptoms() {
    let mut mock = MockClassifier::new();
    mock.expect_classify().never();

    let runtime = setup_test_environment(mock);

    for raw in ["{not json", "", "[\"fever\"]", r#"{"symptoms": 42}"#] {
        let (status, response) = send(&runtime, predict_request(raw)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "{raw}");
        assert_eq!(response["error"], "symptoms is required");
    }
}

// Classification.

#[tokio::test]
async fn test_runny_nose_round_trip() {
    let mut mock = MockClassifier::new();
    mock.expect_classify()
        .withf(|text, top_k| text.to_string() == "Symptoms: i have a runny nose and sneezing." && *top_k == 1)
        .times(1)
        .returning(|_, top_k| Ok(ranked_labels().into_iter().take(top_k).collect()));

    let runtime = setup_test_environment(mock);
    let (status, body) = predict(&runtime, json!({ "symptoms": "I have a runny nose and sneezing", "top_k": 1 })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["input"], "i have a runny nose and sneezing");

    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["disease"], "Common Cold");
    assert_eq!(results[0]["specialty"], "General Physician");
    assert_eq!(
        results[0]["follow_up"],
        json!(["Do you have a runny or blocked nose?", "Are you experiencing sneezing or sore throat?"])
    );
}

#[tokio::test]
async fn test_top_k_defaults_to_one() {
    let mut mock = MockClassifier::new();
    mock.expect_classify().withf(|_, top_k| *top_k == 1).returning(|_, top_k| Ok(ranked_labels().into_iter().take(top_k).collect()));

    let runtime = setup_test_environment(mock);
    let (status, body) = predict(&runtime, json!({ "symptoms": "sneezing" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_results_are_bounded_and_ordered() {
    let runtime = setup_test_environment(get_mock_classifier());

    for top_k in [json!(0), json!(1), json!(2), json!("3"), json!(100)] {
        let (status, body) = predict(&runtime, json!({ "symptoms": "cough and fever", "top_k": top_k })).await;
        assert_eq!(status, StatusCode::OK);

        let limit = top_k.as_u64().or_else(|| top_k.as_str().and_then(|s| s.parse().ok())).unwrap().min(3) as usize;
        let scores: Vec<f64> = body["results"].as_array().unwrap().iter().map(|r| r["score"].as_f64().unwrap()).collect();

        assert!(scores.len() <= limit, "top_k {top_k}");
        assert!(scores.windows(2).all(|w| w[0] >= w[1]), "top_k {top_k}");
    }
}

#[tokio::test]
async fn test_negative_top_k_returns_no_results() {
    let runtime = setup_test_environment(get_mock_classifier());
    let (status, body) = predict(&runtime, json!({ "symptoms": "cough", "top_k": -2 })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"], json!([]));
}

#[tokio::test]
async fn test_float_top_k_is_truncated() {
    let runtime = setup_test_environment(get_mock_classifier());
    let (status, body) = predict(&runtime, json!({ "symptoms": "fever", "top_k": 2.0 })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["input"], "fever");
    assert_eq!(body["results"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_unusable_top_k_falls_back_to_one() {
    let runtime = setup_test_environment(get_mock_classifier());
    let (status, body) = predict(&runtime, json!({ "symptoms": "fever", "top_k": "abc" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["input"], "fever");
    assert_eq!(body["results"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_specialty_and_follow_up_defaults() {
    let runtime = setup_test_environment(get_mock_classifier());
    let (status, body) = predict(&runtime, json!({ "symptoms": "bleeding gums", "top_k": 3 })).await;

    assert_eq!(status, StatusCode::OK);

    let results = body["results"].as_array().unwrap();
    let scurvy = results.iter().find(|r| r["disease"] == "Scurvy").unwrap();
    let allergy = results.iter().find(|r| r["disease"] == "Allergy").unwrap();

    assert_eq!(scurvy["specialty"], "General Physician");
    assert_eq!(scurvy["follow_up"], json!([]));
    assert_eq!(allergy["specialty"], "Allergist");
    assert_eq!(allergy["follow_up"].as_array().unwrap().len(), 2);
}

// Failures.

#[tokio::test]
async fn test_classifier_failure_is_reported() {
    let mut mock = MockClassifier::new();
    mock.expect_classify().returning(|_, _| Err(anyhow!("CUDA out of memory")));

    let runtime = setup_test_environment(mock);
    let (status, body) = predict(&runtime, json!({ "symptoms": "headache" })).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Prediction failed");
    assert_eq!(body["details"], "CUDA out of memory");
}

#[tokio::test]
async fn test_malformed_classifier_result_is_reported() {
    let mut mock = MockClassifier::new();
    mock.expect_classify().returning(|_, _| Ok(vec![Classification::new("Migraine", 1.7)]));

    let runtime = setup_test_environment(mock);
    let (status, body) = predict(&runtime, json!({ "symptoms": "headache" })).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Prediction failed");
    assert!(body["details"].as_str().unwrap().contains("malformed classifier result"));
}

#[tokio::test]
async fn test_closed_worker_pool_is_reported() {
    let mut mock = MockClassifier::new();
    mock.expect_classify().never();

    let runtime = setup_test_environment(mock);
    runtime.inference_permits.close();

    let (status, body) = predict(&runtime, json!({ "symptoms": "headache" })).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["details"].as_str().unwrap().contains("inference worker unavailable"));
}

#[tokio::test]
async fn test_panicked_worker_is_reported_as_unavailable() {
    let runtime = runtime_with_classifier(PanickingWorkerClassifier, test_config());
    let (status, body) = predict(&runtime, json!({ "symptoms": "headache" })).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Prediction failed");
    assert!(body["details"].as_str().unwrap().contains("inference worker unavailable"));

    // The slot comes back after a panic.
    assert_eq!(runtime.inference_permits.available_permits(), 2);
}

#[tokio::test]
async fn test_panicked_classifier_is_reported_as_unavailable() {
    let runtime = runtime_with_classifier(PanickingClassifier, test_config());
    let (status, body) = predict(&runtime, json!({ "symptoms": "headache" })).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["details"].as_str().unwrap().contains("inference worker unavailable"));
    assert_eq!(runtime.inference_permits.available_permits(), 2);
}

// Transport.

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let runtime = setup_test_environment(get_mock_classifier());
    let request = Request::builder().uri("/health").header(header::ORIGIN, "http://localhost:8081").body(Body::empty()).unwrap();

    let response = interaction::router(runtime).oneshot(request).await.unwrap();

    assert_eq!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
}

// Concurrency.

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_are_independent() {
    let mut mock = MockClassifier::new();
    mock.expect_classify().returning(|text, _| {
        // Echo the symptom back as the label so each response is traceable.
        let label = text.trim_start_matches("Symptoms: ").trim_end_matches('.').to_string();
        Ok(vec![Classification::new(label, 0.5)])
    });

    let runtime = setup_test_environment(mock);

    let handles: Vec<_> = (0..32)
        .map(|i| {
            let runtime = runtime.clone();
            tokio::spawn(async move { (i, predict(&runtime, json!({ "symptoms": format!("symptom {i}") })).await) })
        })
        .collect();

    for handle in handles {
        let (i, (status, body)) = handle.await.unwrap();

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["input"], format!("symptom {i}"));
        assert_eq!(body["results"][0]["disease"], format!("symptom {i}"));
        assert_eq!(body["results"][0]["specialty"], "General Physician");
    }

    // The shared tables are untouched.
    assert_eq!(*runtime.specialties, test_specialties());
    assert_eq!(*runtime.follow_ups, FollowUpTable::builtin());
    assert_eq!(*runtime.greetings, GreetingSet::builtin());
    assert_eq!(runtime.inference_permits.available_permits(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_abandoned_requests_keep_their_inference_slot() {
    let passes = Arc::new(ForwardPasses::default());
    let config = Config {
        inner: Arc::new(ConfigInner {
            max_concurrent_inferences: 1,
            max_top_k: 3,
            ..Default::default()
        }),
    };
    let runtime = runtime_with_classifier(SlowClassifier { passes: passes.clone() }, config);

    // Every caller gives up long before the forward pass ends.
    for i in 0..4 {
        let request = PredictRequest {
            symptoms: Some(format!("chest pain {i}")),
            top_k: Some(1),
        };
        let outcome = tokio::time::timeout(Duration::from_millis(20), handle_predict(&runtime, request)).await;

        assert!(outcome.is_err(), "request {i} finished early");
    }

    // The slot stays taken until the model is done.
    assert_eq!(runtime.inference_permits.available_permits(), 0);

    tokio::time::timeout(Duration::from_secs(5), async {
        while runtime.inference_permits.available_permits() < 1 || passes.in_flight.load(Ordering::SeqCst) > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("Inference slot was never released");

    assert_eq!(passes.peak.load(Ordering::SeqCst), 1);
    assert!(passes.finished.load(Ordering::SeqCst) >= 1);

    // The pool still serves new work afterwards.
    let request = PredictRequest {
        symptoms: Some("chest pain".to_string()),
        top_k: Some(1),
    };
    assert!(handle_predict(&runtime, request).await.is_ok());
    assert_eq!(passes.peak.load(Ordering::SeqCst), 1);
}
