//! Grounded prompt construction and answer assembly.

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use docqa_providers::{CompletionModel, CompletionRequest, CompletionStream};
use docqa_shared::{AnswerStatus, DocQaError, GenerationParams, QueryOutcome, Result, RetrievalResult};

/// Render retrieved passages as numbered, attributed excerpts.
///
/// ```text
/// Source 1 (Page 4, similarity: 0.812):
/// <content>
///
/// Source 2 (Page Unknown, similarity: 0.407):
/// <content>
/// ```
pub fn build_context(retrieved: &[RetrievalResult]) -> String {
    retrieved
        .iter()
        .enumerate()
        .map(|(i, source)| {
            format!(
                "Source {} (Page {}, similarity: {:.3}):\n{}",
                i + 1,
                source.page,
                source.similarity,
                source.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Wrap the context and the verbatim question in grounding instructions.
pub fn build_prompt(context: &str, query: &str) -> String {
    format!(
        "Based EXCLUSIVELY on the following document excerpts, answer the user's question.

DOCUMENT EXCERPTS:
{context}

USER QUESTION: {query}

INSTRUCTIONS:
1. Answer using ONLY information from the provided excerpts
2. If the answer isn't found, say \"I cannot find this information in the document\"
3. Be precise and cite which source(s) you used
4. Don't add any external knowledge
5. Keep your answer concise and directly relevant to the question

ANSWER:"
    )
}

/// Turns retrieved passages into a [`QueryOutcome`] via a completion model.
pub struct AnswerAssembler<'a> {
    model: &'a dyn CompletionModel,
    params: GenerationParams,
}

impl<'a> AnswerAssembler<'a> {
    pub fn new(model: &'a dyn CompletionModel, params: GenerationParams) -> Self {
        Self { model, params }
    }

    /// Answer `query` from `retrieved`.
    ///
    /// With nothing retrieved the model is not called and the not-found
    /// outcome is returned. A failing model yields a
    /// [`AnswerStatus::CompletionFailed`] outcome that still carries the
    /// sources and context. Only cancellation is returned as an error.
    #[instrument(skip_all, fields(sources = retrieved.len(), model = self.model.model_name()))]
    pub async fn answer(
        &self,
        query: &str,
        retrieved: Vec<RetrievalResult>,
        cancel: &CancellationToken,
    ) -> Result<QueryOutcome> {
        if retrieved.is_empty() {
            info!("no relevant context, skipping completion");
            return Ok(QueryOutcome::not_found());
        }

        let context = build_context(&retrieved);
        let request = CompletionRequest {
            prompt: build_prompt(&context, query),
            params: self.params,
        };

        let (answer, status) = match drain(self.model.stream(request, cancel.clone())).await {
            Ok(text) => {
                info!(answer_chars = text.len(), "answer generated");
                (text, AnswerStatus::Grounded)
            }
            Err(DocQaError::Cancelled) => return Err(DocQaError::Cancelled),
            Err(e) => {
                let message = match e {
                    DocQaError::Completion(message) => message,
                    other => other.to_string(),
                };
                warn!(error = %message, "completion failed, returning sources only");
                (
                    format!("Error calling API: {message}"),
                    AnswerStatus::CompletionFailed { message },
                )
            }
        };

        Ok(QueryOutcome {
            answer,
            sources: retrieved,
            context_used: context,
            status,
        })
    }
}

/// Concatenate fragments in arrival order, reasoning before content.
async fn drain(mut stream: CompletionStream) -> Result<String> {
    let mut answer = String::new();
    let mut fragments = 0usize;

    while let Some(delta) = stream.next().await {
        let delta = delta?;
        if let Some(reasoning) = delta.reasoning {
            answer.push_str(&reasoning);
        }
        if let Some(content) = delta.content {
            answer.push_str(&content);
        }
        fragments += 1;
    }

    debug!(fragments, "completion stream drained");
    Ok(answer.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedModel;
    use docqa_providers::CompletionDelta;
    use docqa_shared::{NOT_FOUND_ANSWER, PageLabel};

    fn sources() -> Vec<RetrievalResult> {
        vec![
            RetrievalResult {
                content: "The warranty lasts two years.".into(),
                similarity: 0.8123,
                page: PageLabel::Number(2),
            },
            RetrievalResult {
                content: "Claims need an order number.".into(),
                similarity: 0.4,
                page: PageLabel::Unknown,
            },
        ]
    }

    #[test]
    fn context_numbers_and_attributes_sources() {
        assert_eq!(
            build_context(&sources()),
            "Source 1 (Page 2, similarity: 0.812):\nThe warranty lasts two years.\n\n\
             Source 2 (Page Unknown, similarity: 0.400):\nClaims need an order number."
        );
        assert_eq!(build_context(&[]), "");
    }

    #[test]
    fn prompt_embeds_context_and_question_verbatim() {
        let prompt = build_prompt("Source 1 (Page 1, similarity: 0.900):\nText.", "What is  it?");
        assert!(prompt.starts_with("Based EXCLUSIVELY on the following document excerpts"));
        assert!(prompt.contains("DOCUMENT EXCERPTS:\nSource 1 (Page 1, similarity: 0.900):\nText."));
        assert!(prompt.contains("USER QUESTION: What is  it?"));
        assert!(prompt.contains("cite which source(s)"));
        assert!(prompt.ends_with("ANSWER:"));
    }

    #[tokio::test]
    async fn empty_retrieval_short_circuits() {
        let model = ScriptedModel::new(vec![CompletionDelta::content("unused")]);
        let assembler = AnswerAssembler::new(&model, GenerationParams::default());

        let outcome = assembler
            .answer("anything", Vec::new(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.answer, NOT_FOUND_ANSWER);
        assert!(outcome.sources.is_empty());
        assert!(outcome.context_used.is_empty());
        assert_eq!(outcome.status, AnswerStatus::NoRelevantContext);
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn concatenates_reasoning_before_content_and_trims() {
        let model = ScriptedModel::new(vec![
            CompletionDelta::reasoning("  Checking source 1. "),
            CompletionDelta {
                reasoning: Some("Found it. ".into()),
                content: Some("Two ".into()),
            },
            CompletionDelta::content("years (Source 1).\n"),
        ]);
        let assembler = AnswerAssembler::new(&model, GenerationParams::default());

        let outcome = assembler
            .answer("How long?", sources(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.answer, "Checking source 1. Found it. Two years (Source 1).");
        assert!(outcome.is_grounded());
        assert_eq!(outcome.sources, sources());
        assert_eq!(outcome.context_used, build_context(&sources()));
        assert_eq!(model.calls(), 1);

        let prompt = model.last_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.contains("USER QUESTION: How long?"));
        assert!(prompt.contains(&outcome.context_used));
    }

    #[tokio::test]
    async fn completion_failure_degrades_with_sources() {
        let model = ScriptedModel::failing_after(
            vec![CompletionDelta::content("partial")],
            "HTTP 401 Unauthorized: invalid key",
        );
        let assembler = AnswerAssembler::new(&model, GenerationParams::default());

        let outcome = assembler
            .answer("How long?", sources(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.answer, "Error calling API: HTTP 401 Unauthorized: invalid key");
        assert_eq!(
            outcome.status,
            AnswerStatus::CompletionFailed {
                message: "HTTP 401 Unauthorized: invalid key".into()
            }
        );
        assert_eq!(outcome.sources.len(), 2);
        assert!(!outcome.context_used.is_empty());
    }

    #[tokio::test]
    async fn cancellation_is_not_degraded() {
        let model = ScriptedModel::new(vec![CompletionDelta::content("late")]);
        let assembler = AnswerAssembler::new(&model, GenerationParams::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = assembler.answer("q", sources(), &cancel).await.unwrap_err();
        assert!(matches!(err, DocQaError::Cancelled));
    }
}
