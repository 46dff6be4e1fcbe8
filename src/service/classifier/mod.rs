//! Text classification behind a swappable client.
//!
//! The `GenericClassifierClient` trait is the seam between the request handler and
//! the model. The default implementation runs a fine-tuned BERT sequence
//! classifier with candle; tests substitute a mock.

pub mod bert;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::base::{
    error::WorkerStopped,
    types::{Classification, ComputeDevice, Res},
};

// Traits.

/// Generic classifier trait that clients must implement.
#[async_trait]
pub trait GenericClassifierClient: Send + Sync + 'static {
    /// The device the model was bound to when it was loaded.
    fn device(&self) -> ComputeDevice;

    /// Classify `text`, returning at most `top_k` labels ordered by descending score.
    ///
    /// Scores are probabilities in `[0, 1]`.
    async fn classify(&self, text: &str, top_k: usize) -> Res<Vec<Classification>>;
}

// Structs.

/// Classifier client for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct ClassifierClient {
    inner: Arc<dyn GenericClassifierClient>,
}

impl Deref for ClassifierClient {
    type Target = dyn GenericClassifierClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl ClassifierClient {
    pub fn new(inner: Arc<dyn GenericClassifierClient>) -> Self {
        Self { inner }
    }
}

// Helpers.

/// Run compute-bound classifier work on the blocking pool.
///
/// A worker that panics or is cancelled comes back as [`WorkerStopped`].
pub async fn run_blocking<T, F>(work: F) -> Res<T>
where
    F: FnOnce() -> Res<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await.map_err(|e| WorkerStopped(e.to_string()))?
}

// Tests.
