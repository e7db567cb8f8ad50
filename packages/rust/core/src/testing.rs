//! In-process collaborators for unit tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use docqa_providers::{
    CompletionDelta, CompletionModel, CompletionRequest, CompletionStream, Embedder, normalize,
};
use docqa_shared::{DocQaError, Result};

/// Returns the same vector for every input.
pub struct FixedEmbedder {
    vector: Vec<f32>,
    pub calls: AtomicUsize,
}

impl FixedEmbedder {
    pub fn new(vector: Vec<f32>) -> Self {
        Self {
            vector,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Embedder for FixedEmbedder {
    fn dimension(&self) -> usize {
        self.vector.len()
    }

    async fn embed(&self, inputs: &[&str], cancel: &CancellationToken) -> Result<Vec<Vec<f32>>> {
        if cancel.is_cancelled() {
            return Err(DocQaError::Cancelled);
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(inputs.iter().map(|_| self.vector.clone()).collect())
    }
}

/// One axis per keyword plus a constant background axis.
///
/// Texts sharing a keyword score close to 1; texts sharing none score near 0.
pub struct KeywordEmbedder {
    keywords: Vec<&'static str>,
    batch_size: usize,
    pub calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn new(keywords: &[&'static str], batch_size: usize) -> Self {
        Self {
            keywords: keywords.to_vec(),
            batch_size,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    fn dimension(&self) -> usize {
        self.keywords.len() + 1
    }

    fn batch_size(&self) -> usize {
        self.batch_size
    }

    async fn embed(&self, inputs: &[&str], cancel: &CancellationToken) -> Result<Vec<Vec<f32>>> {
        if cancel.is_cancelled() {
            return Err(DocQaError::Cancelled);
        }
        self.calls.fetch_add(1, Ordering::SeqCst);

        inputs
            .iter()
            .map(|text| {
                let lower = text.to_lowercase();
                let mut vector: Vec<f32> = self
                    .keywords
                    .iter()
                    .map(|k| if lower.contains(k) { 1.0 } else { 0.0 })
                    .collect();
                vector.push(0.1);
                normalize(&mut vector)?;
                Ok(vector)
            })
            .collect()
    }
}

/// Replays a fixed list of deltas, optionally ending in an error.
pub struct ScriptedModel {
    deltas: Vec<CompletionDelta>,
    failure: Option<String>,
    pub calls: AtomicUsize,
    pub last_prompt: Mutex<Option<String>>,
}

impl ScriptedModel {
    pub fn new(deltas: Vec<CompletionDelta>) -> Self {
        Self {
            deltas,
            failure: None,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn failing_after(deltas: Vec<CompletionDelta>, message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::new(deltas)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CompletionModel for ScriptedModel {
    fn stream(&self, request: CompletionRequest, cancel: CancellationToken) -> CompletionStream {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(request.prompt);

        if cancel.is_cancelled() {
            return futures_util::stream::iter(vec![Err(DocQaError::Cancelled)]).boxed();
        }

        let mut items: Vec<Result<CompletionDelta>> =
            self.deltas.iter().cloned().map(Ok).collect();
        if let Some(message) = &self.failure {
            items.push(Err(DocQaError::Completion(message.clone())));
        }
        futures_util::stream::iter(items).boxed()
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}
