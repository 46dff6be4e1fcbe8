//! Runtime services and shared state for the symptom predictor.

use std::sync::Arc;

use anyhow::anyhow;
use tokio::{net::TcpListener, sync::Semaphore};
use tracing::{info, instrument};

use crate::{
    base::{
        config::Config,
        follow_up::FollowUpTable,
        greetings::GreetingSet,
        specialty::SpecialtyMap,
        types::{Res, Void},
    },
    interaction,
    service::classifier::ClassifierClient,
};

/// Runtime service context that can be shared across the application.
///
/// Everything in here is read-only after construction, so request handlers share
/// it without locking. It is designed to be trivially cloneable.
#[derive(Clone)]
pub struct Runtime {
    /// The configuration for the application.
    pub config: Config,
    /// The text classifier.
    pub classifier: ClassifierClient,
    /// Disease label to specialty.
    pub specialties: Arc<SpecialtyMap>,
    /// Disease label to follow-up questions.
    pub follow_ups: Arc<FollowUpTable>,
    /// Phrases that skip classification.
    pub greetings: Arc<GreetingSet>,
    /// Bounds the number of classifications in flight.
    pub inference_permits: Arc<Semaphore>,
}

impl Runtime {
    /// Create a new runtime instance.
    ///
    /// Fails when the model directory or the specialty mapping is missing, or when
    /// either cannot be loaded. None of these are recoverable at request time.
    #[instrument(skip_all)]
    pub async fn new(config: Config) -> Res<Self> {
        validate_resources(&config)?;

        // Load the static tables.
        let specialties = SpecialtyMap::load(&config.specialty_map_path())?;
        let follow_ups = FollowUpTable::builtin();
        let greetings = GreetingSet::builtin();

        // Load the model once.
        let model_config = config.clone();
        let classifier = tokio::task::spawn_blocking(move || ClassifierClient::bert(&model_config)).await??;

        Ok(Self::from_parts(config, classifier, specialties, follow_ups, greetings))
    }

    /// Assemble a runtime from already-loaded parts.
    pub fn from_parts(config: Config, classifier: ClassifierClient, specialties: SpecialtyMap, follow_ups: FollowUpTable, greetings: GreetingSet) -> Self {
        let inference_permits = Arc::new(Semaphore::new(config.max_concurrent_inferences.max(1)));

        Self {
            config,
            classifier,
            specialties: Arc::new(specialties),
            follow_ups: Arc::new(follow_ups),
            greetings: Arc::new(greetings),
            inference_permits,
        }
    }

    /// Bind the listener and serve until Ctrl-C.
    pub async fn start(&self) -> Void {
        let address = self.config.bind_address();
        let listener = TcpListener::bind(&address).await.map_err(|e| anyhow!("Failed to bind `{address}`: {e}"))?;

        info!("Listening on `{}` ...", listener.local_addr()?);

        axum::serve(listener, interaction::router(self.clone())).with_graceful_shutdown(shutdown_signal()).await?;

        info!("Server stopped.");

        Ok(())
    }
}

// Helpers.

/// Check that the model directory and specialty mapping exist before loading anything.
fn validate_resources(config: &Config) -> Void {
    if !config.model_dir.is_dir() {
        return Err(anyhow!("Model folder not found: `{}`.", config.model_dir.display()));
    }

    let specialty_map_path = config.specialty_map_path();
    if !specialty_map_path.is_file() {
        return Err(anyhow!("Specialty mapping missing: `{}`.", specialty_map_path.display()));
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }

    info!("Shutdown signal received.");
}

// Tests.
