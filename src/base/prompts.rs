//! Fixed user-facing messages and the model input template.

/// Reply for inputs that matched the greeting set.
pub const GREETING_REPLY: &str = "Please describe your symptoms so I can help you.";

/// Error for missing or blank symptom text.
pub const MISSING_SYMPTOMS: &str = "symptoms is required";

/// Error for any server-side prediction failure.
pub const PREDICTION_FAILED: &str = "Prediction failed";

/// Specialty used when the mapping has no entry for a label.
pub const DEFAULT_SPECIALTY: &str = "General Physician";

/// Build the text handed to the classifier.
///
/// The model was fine-tuned on sentences of the form `Symptoms: ... .`, so the
/// symptoms are prefixed and a trailing period is added when missing.
pub fn model_input(symptoms: &str) -> String {
    let mut text = format!("Symptoms: {symptoms}");

    if !text.ends_with('.') {
        text.push('.');
    }

    text
}
