//! Library root for `symptom-predictor`.
//!
//! Symptom-predictor is a small HTTP service that:
//! - Accepts free-text symptom descriptions
//! - Ranks likely diseases with a fine-tuned BERT text classifier
//! - Enriches each disease with a medical specialty and follow-up questions
//!
//! The classifier sits behind a trait so that the request path can be exercised
//! without a model, and all shared state is immutable after startup.

pub mod base;
pub mod interaction;
pub mod prelude;
pub mod runtime;
pub mod service;

use base::{config::Config, types::Void};
use tracing::info;

/// Public async entry for the binary crate.
///
/// Validates resources, loads the specialty mapping and the model once, and then
/// serves HTTP until a shutdown signal arrives.
pub async fn start(config: Config) -> Void {
    info!("Starting symptom-predictor ...");

    // Initialize the runtime.
    let runtime = runtime::Runtime::new(config).await?;

    // Start the runtime.
    runtime.start().await?;

    Ok(())
}
