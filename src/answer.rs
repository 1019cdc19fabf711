//! Answer synthesis: prompt assembly, completion, and citation formatting.

use crate::llm::{CompletionClient, CompletionError, CompletionRequest};
use crate::store::ScoredChunk;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

const PREVIEW_MAX_CHARS: usize = 200;

/// Condensation passes are bounded; past this the context is used as-is rather
/// than looping on a model that refuses to shrink its output.
const MAX_CONDENSE_PASSES: usize = 3;

/// Per-chunk source reference attached to a synthesized answer.
#[derive(Debug, Clone, Serialize)]
pub struct SourceRef {
    /// Identifier of the cited document.
    pub doc_id: String,
    /// 0-based page number of the cited chunk.
    pub page_no: usize,
    /// 0-based chunk order within the page.
    pub para_no: usize,
    /// Similarity score of the cited chunk.
    pub score: f32,
    /// Chunk text truncated for display.
    pub text_preview: String,
}

/// Result of answering one chat query; never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct ChatAnswer {
    /// Synthesized answer text, with citations appended when requested.
    pub response_text: String,
    /// The question as asked.
    pub query: String,
    /// Topic filter the query ran under, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic_id: Option<String>,
    /// Per-chunk source references backing the answer, in rank order.
    pub sources: Vec<SourceRef>,
    /// Number of chunks retrieved for the query.
    pub sources_count: usize,
    /// Failure detail when synthesis degraded to an apology response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Composes retrieved chunks into a prompt, invokes the chat model, and formats
/// citations. Completion failures degrade to an apology-style answer instead of
/// propagating.
pub struct AnswerSynthesizer {
    llm: Arc<dyn CompletionClient>,
    model: String,
    context_budget_chars: usize,
}

impl AnswerSynthesizer {
    /// Build a synthesizer around the shared completion client.
    pub fn new(
        llm: Arc<dyn CompletionClient>,
        model: impl Into<String>,
        context_budget_chars: usize,
    ) -> Self {
        Self {
            llm,
            model: model.into(),
            context_budget_chars: context_budget_chars.max(1),
        }
    }

    /// Synthesize an answer for `query` from the ranked `chunks`.
    pub async fn synthesize(
        &self,
        query: &str,
        topic_id: Option<&str>,
        chunks: &[ScoredChunk],
        include_sources: bool,
    ) -> ChatAnswer {
        let blocks: Vec<String> = chunks.iter().map(context_block).collect();
        let context = match self.condense(query, blocks).await {
            Ok(context) => context,
            Err(error) => return self.failure_answer(query, topic_id, &error),
        };

        let prompt = build_answer_prompt(query, &context);
        match self
            .llm
            .complete(CompletionRequest {
                model: self.model.clone(),
                prompt,
            })
            .await
        {
            Ok(mut response_text) => {
                if include_sources && !chunks.is_empty() {
                    response_text.push_str(&format_citations(chunks));
                }
                ChatAnswer {
                    response_text,
                    query: query.to_string(),
                    topic_id: topic_id.map(str::to_string),
                    sources: if include_sources {
                        chunks.iter().map(source_ref).collect()
                    } else {
                        Vec::new()
                    },
                    sources_count: chunks.len(),
                    error: None,
                }
            }
            Err(error) => self.failure_answer(query, topic_id, &error),
        }
    }

    /// Shrink oversized context with summarize-then-combine passes.
    ///
    /// Each pass buckets consecutive excerpts under the character budget and asks
    /// the model to condense every bucket against the query; the final answer call
    /// then runs over material that fits in one pass.
    async fn condense(
        &self,
        query: &str,
        mut blocks: Vec<String>,
    ) -> Result<Vec<String>, CompletionError> {
        for _pass in 0..MAX_CONDENSE_PASSES {
            let total: usize = blocks.iter().map(|block| block.chars().count()).sum();
            if total <= self.context_budget_chars || blocks.len() <= 1 {
                break;
            }

            let buckets = bucket_blocks(&blocks, self.context_budget_chars);
            let mut condensed = Vec::with_capacity(buckets.len());
            for bucket in &buckets {
                let prompt = build_condense_prompt(query, bucket);
                condensed.push(
                    self.llm
                        .complete(CompletionRequest {
                            model: self.model.clone(),
                            prompt,
                        })
                        .await?,
                );
            }
            tracing::debug!(
                from = blocks.len(),
                to = condensed.len(),
                "Condensed oversized answer context"
            );
            blocks = condensed;
        }
        Ok(blocks)
    }

    fn failure_answer(
        &self,
        query: &str,
        topic_id: Option<&str>,
        error: &CompletionError,
    ) -> ChatAnswer {
        tracing::error!(error = %error, "Answer synthesis failed");
        ChatAnswer {
            response_text: format!(
                "I apologize, but I encountered an error while processing your question: {error}"
            ),
            query: query.to_string(),
            topic_id: topic_id.map(str::to_string),
            sources: Vec::new(),
            sources_count: 0,
            error: Some(error.to_string()),
        }
    }
}

/// Render one retrieved chunk as a context excerpt for the prompt.
fn context_block(scored: &ScoredChunk) -> String {
    format!(
        "[Document: {}, Page: {}] {}",
        scored.chunk.doc_id,
        scored.chunk.page_no,
        scored.chunk.text.trim()
    )
}

/// Group consecutive excerpts so each bucket fits the character budget.
///
/// An excerpt larger than the whole budget forms a bucket of its own; the
/// condensation pass is what shrinks it.
fn bucket_blocks(blocks: &[String], budget: usize) -> Vec<Vec<String>> {
    let mut buckets = Vec::new();
    let mut current = Vec::new();
    let mut used = 0usize;

    for block in blocks {
        let length = block.chars().count();
        if !current.is_empty() && used + length > budget {
            buckets.push(std::mem::take(&mut current));
            used = 0;
        }
        used += length;
        current.push(block.clone());
    }
    if !current.is_empty() {
        buckets.push(current);
    }
    buckets
}

fn build_answer_prompt(query: &str, context: &[String]) -> String {
    let mut prompt = String::new();
    prompt.push_str(
        "System: You answer questions using only the provided document excerpts. \
         Be concise and factual. When the excerpts do not contain the answer, say so \
         plainly instead of guessing.\n\n",
    );
    if context.is_empty() {
        prompt.push_str("No relevant excerpts were found for this question.\n");
    } else {
        prompt.push_str("Excerpts:\n");
        for block in context {
            prompt.push_str("- ");
            prompt.push_str(block);
            prompt.push('\n');
        }
    }
    prompt.push_str(&format!("\nQuestion: {query}\nAnswer:"));
    prompt
}

fn build_condense_prompt(query: &str, bucket: &[String]) -> String {
    let mut prompt = String::new();
    prompt.push_str(
        "System: You condense document excerpts. Keep every fact that could help \
         answer the question, drop everything else, and preserve document and page \
         references.\n\n",
    );
    prompt.push_str(&format!("Question: {query}\n\nExcerpts:\n"));
    for block in bucket {
        prompt.push_str("- ");
        prompt.push_str(block);
        prompt.push('\n');
    }
    prompt.push_str("\nCondensed notes:");
    prompt
}

/// Format the deduplicated citation list appended to a cited answer.
///
/// One line per distinct document, numbered by the rank of its first appearance.
/// Page numbers are cited only past the first page, matching the upload format
/// where page 0 is the implicit start of the document.
fn format_citations(chunks: &[ScoredChunk]) -> String {
    let mut seen_docs = HashSet::new();
    let mut citations = Vec::new();

    for (position, scored) in chunks.iter().enumerate() {
        if !seen_docs.insert(scored.chunk.doc_id.clone()) {
            continue;
        }
        let mut line = format!("[{}] Document: {}", position + 1, scored.chunk.doc_id);
        if scored.chunk.page_no > 0 {
            line.push_str(&format!(", Page: {}", scored.chunk.page_no));
        }
        line.push_str(&format!(" (Relevance: {:.3})", scored.score));
        citations.push(line);
    }

    format!("\n\n**Sources:**\n{}", citations.join("\n"))
}

fn source_ref(scored: &ScoredChunk) -> SourceRef {
    SourceRef {
        doc_id: scored.chunk.doc_id.clone(),
        page_no: scored.chunk.page_no,
        para_no: scored.chunk.para_no,
        score: scored.score,
        text_preview: preview(&scored.chunk.text),
    }
}

fn preview(text: &str) -> String {
    if text.chars().count() <= PREVIEW_MAX_CHARS {
        return text.to_string();
    }
    let truncated: String = text.chars().take(PREVIEW_MAX_CHARS).collect();
    format!("{truncated}...")
}
