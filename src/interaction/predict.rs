//! `POST /predict`: free-text symptoms in, ranked and enriched diseases out.

use axum::{Json, body::Bytes, extract::State};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::{
    base::{
        error::PredictError,
        greetings::normalize,
        prompts::{GREETING_REPLY, model_input},
        types::{Classification, GreetingResponse, PredictRequest, PredictResponse, Prediction},
    },
    runtime::Runtime,
};

/// The two successful shapes of a prediction response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PredictOutcome {
    Greeting(GreetingResponse),
    Predictions(PredictResponse),
}

/// Axum handler for `POST /predict`.
///
/// The body is taken as raw bytes so that malformed JSON is answered like a missing
/// `symptoms` field instead of with the extractor's rejection.
pub async fn predict(State(runtime): State<Runtime>, body: Bytes) -> Result<Json<PredictOutcome>, PredictError> {
    let request = parse_request(&body);

    handle_predict(&runtime, request).await.map(Json)
}

/// Run one prediction against the runtime.
#[instrument(skip_all)]
pub async fn handle_predict(runtime: &Runtime, request: PredictRequest) -> Result<PredictOutcome, PredictError> {
    let symptoms = normalize(request.symptoms.as_deref().unwrap_or_default());

    if runtime.greetings.is_greeting(&symptoms) {
        debug!("Greeting received, skipping classification.");

        return Ok(PredictOutcome::Greeting(GreetingResponse {
            message: GREETING_REPLY.to_string(),
        }));
    }

    if symptoms.is_empty() {
        return Err(PredictError::MissingSymptoms);
    }

    let top_k = resolve_top_k(request.top_k, runtime.config.max_top_k);
    let text = model_input(&symptoms);

    let permit = runtime.inference_permits.clone().acquire_owned().await.map_err(|e| PredictError::WorkerUnavailable(e.to_string()))?;
    let classifier = runtime.classifier.clone();

    // The task owns the permit until the model finishes, even if this request is dropped.
    let inference = tokio::spawn(async move {
        let result = classifier.classify(&text, top_k).await;
        drop(permit);
        result
    });

    let classifications = match inference.await {
        Ok(result) => result.map_err(PredictError::from_classifier)?,
        Err(e) => return Err(PredictError::WorkerUnavailable(e.to_string())),
    };

    validate_classifications(&classifications, top_k)?;

    let results: Vec<Prediction> = classifications
        .iter()
        .map(|c| {
            let disease = c.label.trim();

            Prediction {
                disease: disease.to_string(),
                score: f64::from(c.score),
                specialty: runtime.specialties.specialty_or_default(disease).to_string(),
                follow_up: runtime.follow_ups.questions(disease).to_vec(),
            }
        })
        .collect();

    info!(top_k, results = results.len(), "Prediction complete.");

    Ok(PredictOutcome::Predictions(PredictResponse { input: symptoms, results }))
}

// Helpers.

/// Parse the body leniently; anything unreadable becomes an empty request.
pub fn parse_request(body: &[u8]) -> PredictRequest {
    serde_json::from_slice(body).unwrap_or_else(|err| {
        debug!("Unreadable predict body: {}", err);
        PredictRequest::default()
    })
}

/// Turn the requested `top_k` into a result count.
///
/// Missing means one result; negative means none; anything above `max_top_k` is clamped.
pub fn resolve_top_k(requested: Option<i64>, max_top_k: usize) -> usize {
    let requested = requested.unwrap_or(1);

    usize::try_from(requested).unwrap_or(0).min(max_top_k)
}

/// Reject classifier output that cannot be a ranked probability list.
fn validate_classifications(classifications: &[Classification], top_k: usize) -> Result<(), PredictError> {
    if classifications.len() > top_k {
        return Err(PredictError::MalformedResult(format!("{} results returned for top_k {}", classifications.len(), top_k)));
    }

    for c in classifications {
        if c.label.trim().is_empty() {
            return Err(PredictError::MalformedResult("empty label".to_string()));
        }

        if !c.score.is_finite() || !(0.0..=1.0).contains(&c.score) {
            return Err(PredictError::MalformedResult(format!("score {} for `{}` is not a probability", c.score, c.label)));
        }
    }

    if classifications.windows(2).any(|pair| pair[0].score < pair[1].score) {
        return Err(PredictError::MalformedResult("results are not ordered by score".to_string()));
    }

    Ok(())
}

// Tests.
