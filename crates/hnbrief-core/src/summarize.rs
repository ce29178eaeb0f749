use serde::Serialize;

use crate::models::EnrichedRecord;
use crate::prompt::PromptTemplate;
use crate::traits::Summarizer;

/// An enriched record and the result of summarizing it.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub record: EnrichedRecord,
    /// `None` when the summarizer failed for this record.
    pub summary: Option<String>,
    pub error: Option<String>,
}

/// Renders a prompt per record and asks the summarizer for a reply.
///
/// Records are summarized one after another, in order. A failure is kept on
/// the record it belongs to and never stops the remaining ones.
pub struct SummaryService<M: Summarizer> {
    summarizer: M,
    template: PromptTemplate,
}

impl<M: Summarizer> SummaryService<M> {
    pub fn new(summarizer: M, template: PromptTemplate) -> Self {
        Self {
            summarizer,
            template,
        }
    }

    pub async fn summarize_all(&self, records: Vec<EnrichedRecord>) -> Vec<Summary> {
        let mut summaries = Vec::with_capacity(records.len());

        for record in records {
            let prompt = self.template.render(&record);
            tracing::debug!(id = %record.id, prompt_chars = prompt.len(), "Summarizing");

            let summary = match self.summarizer.summarize(&prompt).await {
                Ok(text) if !text.trim().is_empty() => Summary {
                    record,
                    summary: Some(text.trim().to_string()),
                    error: None,
                },
                Ok(_) => {
                    tracing::warn!(id = %record.id, "Summarizer returned an empty reply");
                    Summary {
                        record,
                        summary: None,
                        error: Some("empty reply".into()),
                    }
                }
                Err(e) => {
                    tracing::warn!(id = %record.id, error = %e, "Summarization failed");
                    Summary {
                        record,
                        summary: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            summaries.push(summary);
        }

        summaries
    }
}
