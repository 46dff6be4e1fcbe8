//! Fine-tuned BERT sequence classifier running on candle.
//!
//! The model directory is expected to hold a Hugging Face style export:
//! `config.json` (including `id2label`), `tokenizer.json`, and `model.safetensors`.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use candle_core::{D, DType, Device, IndexOp, Tensor};
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use serde::Deserialize;
use tokenizers::{Tokenizer, TruncationParams};
use tracing::{debug, info, instrument};

use crate::base::{
    config::Config,
    types::{Classification, ComputeDevice, Res},
};

use super::{ClassifierClient, GenericClassifierClient, run_blocking};

const CONFIG_FILE: &str = "config.json";
const TOKENIZER_FILE: &str = "tokenizer.json";
const WEIGHTS_FILE: &str = "model.safetensors";

// Extra methods on `ClassifierClient` applied by the BERT implementation.

impl ClassifierClient {
    /// Load the BERT classifier from the configured model directory.
    ///
    /// This is expensive and is meant to happen once per process.
    pub fn bert(config: &Config) -> Res<Self> {
        let client = BertClassifierClient::load(&config.model_dir, config.use_gpu)?;
        Ok(Self { inner: Arc::new(client) })
    }
}

// Structs.

/// The parts of `config.json` that candle's BERT config does not surface.
#[derive(Debug, Deserialize)]
struct HeadConfig {
    hidden_size: usize,
    #[serde(default = "default_max_position_embeddings")]
    max_position_embeddings: usize,
    #[serde(default)]
    id2label: HashMap<String, String>,
}

fn default_max_position_embeddings() -> usize {
    512
}

/// Loaded model state; shared with blocking workers.
struct BertSequenceClassifier {
    model: BertModel,
    pooler: Linear,
    classifier: Linear,
    tokenizer: Tokenizer,
    labels: Vec<String>,
    device: Device,
}

/// BERT classifier client implementation.
#[derive(Clone)]
pub struct BertClassifierClient {
    inner: Arc<BertSequenceClassifier>,
    device: ComputeDevice,
}

impl BertClassifierClient {
    /// Load tokenizer, config and weights from `model_dir`.
    #[instrument(name = "BertClassifierClient::load", skip_all, fields(model_dir = %model_dir.display()))]
    pub fn load(model_dir: &Path, use_gpu: bool) -> Res<Self> {
        let device = if use_gpu { Device::cuda_if_available(0)? } else { Device::Cpu };
        let compute_device = if device.is_cuda() { ComputeDevice::Cuda } else { ComputeDevice::Cpu };

        info!("Loading classifier on {:?} ...", compute_device);

        // Configuration.

        let config_json = std::fs::read_to_string(model_file(model_dir, CONFIG_FILE)?)?;
        let bert_config: BertConfig = serde_json::from_str(&config_json).context("Invalid BERT config")?;
        let head_config: HeadConfig = serde_json::from_str(&config_json).context("Invalid classification head config")?;
        let labels = labels_from_id2label(&head_config.id2label)?;

        // Tokenizer.

        let mut tokenizer = Tokenizer::from_file(model_file(model_dir, TOKENIZER_FILE)?).map_err(|e| anyhow!("Failed to load tokenizer: {e}"))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: head_config.max_position_embeddings,
                ..Default::default()
            }))
            .map_err(|e| anyhow!("Failed to configure tokenizer truncation: {e}"))?;
        tokenizer.with_padding(None);

        // Weights.

        let tensors = candle_core::safetensors::load(model_file(model_dir, WEIGHTS_FILE)?, &device)?;
        let vb = VarBuilder::from_tensors(tensors, DType::F32, &device);

        let model = BertModel::load(vb.pp("bert"), &bert_config)?;
        let pooler = candle_nn::linear(head_config.hidden_size, head_config.hidden_size, vb.pp("bert.pooler.dense"))?;
        let classifier = candle_nn::linear(head_config.hidden_size, labels.len(), vb.pp("classifier"))?;

        info!("Classifier loaded with {} labels.", labels.len());

        Ok(Self {
            inner: Arc::new(BertSequenceClassifier {
                model,
                pooler,
                classifier,
                tokenizer,
                labels,
                device,
            }),
            device: compute_device,
        })
    }
}

impl BertSequenceClassifier {
    /// Run one forward pass and return the ranked labels.
    fn classify(&self, text: &str, top_k: usize) -> Res<Vec<Classification>> {
        let encoding = self.tokenizer.encode(text, true).map_err(|e| anyhow!("Failed to tokenize input: {e}"))?;

        let input_ids = Tensor::new(encoding.get_ids(), &self.device)?.unsqueeze(0)?;
        let token_type_ids = Tensor::new(encoding.get_type_ids(), &self.device)?.unsqueeze(0)?;
        let attention_mask = Tensor::new(encoding.get_attention_mask(), &self.device)?.unsqueeze(0)?;

        let sequence = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;

        // Pool the `[CLS]` token the same way `BertForSequenceClassification` does.
        let cls = sequence.i((.., 0))?;
        let pooled = self.pooler.forward(&cls)?.tanh()?;
        let logits = self.classifier.forward(&pooled)?;

        let probabilities = candle_nn::ops::softmax(&logits, D::Minus1)?.squeeze(0)?.to_dtype(DType::F32)?.to_vec1::<f32>()?;

        debug!("Classified {} tokens.", encoding.get_ids().len());

        rank(&self.labels, &probabilities, top_k)
    }
}

#[async_trait]
impl GenericClassifierClient for BertClassifierClient {
    fn device(&self) -> ComputeDevice {
        self.device
    }

    #[instrument(name = "BertClassifierClient::classify", skip(self, text))]
    async fn classify(&self, text: &str, top_k: usize) -> Res<Vec<Classification>> {
        let model = self.inner.clone();
        let text = text.to_string();

        // The forward pass is compute bound; keep it off the async workers.
        run_blocking(move || model.classify(&text, top_k)).await
    }
}

// Helpers.

/// Resolve a required file inside the model directory.
fn model_file(model_dir: &Path, name: &str) -> Res<PathBuf> {
    let path = model_dir.join(name);

    if !path.is_file() {
        return Err(anyhow!("Model file `{}` not found.", path.display()));
    }

    Ok(path)
}

/// Order `id2label` by index, requiring indices `0..n` with no gaps.
fn labels_from_id2label(id2label: &HashMap<String, String>) -> Res<Vec<String>> {
    if id2label.is_empty() {
        return Err(anyhow!("Model config has no `id2label` mapping."));
    }

    let mut labels = vec![None; id2label.len()];

    for (id, label) in id2label {
        let index: usize = id.parse().with_context(|| format!("Invalid label id `{id}`"))?;
        let slot = labels.get_mut(index).ok_or_else(|| anyhow!("Label id `{index}` is out of range."))?;
        *slot = Some(label.clone());
    }

    labels.into_iter().enumerate().map(|(i, l)| l.ok_or_else(|| anyhow!("Label id `{i}` is missing."))).collect()
}

/// Pair labels with probabilities and keep the `top_k` highest.
fn rank(labels: &[String], probabilities: &[f32], top_k: usize) -> Res<Vec<Classification>> {
    if labels.len() != probabilities.len() {
        return Err(anyhow!("Model produced {} scores for {} labels.", probabilities.len(), labels.len()));
    }

    let mut ranked: Vec<Classification> = labels.iter().zip(probabilities).map(|(label, score)| Classification::new(label.clone(), *score)).collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked.truncate(top_k);

    Ok(ranked)
}

// Tests.
