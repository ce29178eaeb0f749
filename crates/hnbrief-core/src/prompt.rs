//! Prompt construction for the summarization step.
//!
//! Templates use `{{name}}` placeholders. Substitution is a single pass over
//! the template, so placeholder-looking text inside a value (an article that
//! quotes `{{content}}`, say) is never expanded again.

use std::path::Path;

use crate::error::AppError;
use crate::models::EnrichedRecord;

pub const DEFAULT_MAX_CONTENT_CHARS: usize = 12_000;

pub const DEFAULT_TEMPLATE: &str = "\
You are given the main text of an article linked from Hacker News.

Title: {{title}}
URL: {{url}}
Points: {{score}} | Comments: {{descendant_count}} | Posted: {{time_iso}}

Article:
{{content}}

Write exactly one concise, neutral sentence summarizing what the article is about. \
Do not start with \"This article\". Reply with the sentence only.";

const UNKNOWN: &str = "?";
const TRUNCATION_MARKER: &str = "\n[...]";

/// A prompt template rendered once per enriched record.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
    max_content_chars: usize,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
            max_content_chars: DEFAULT_MAX_CONTENT_CHARS,
        }
    }
}

impl PromptTemplate {
    /// Build a template. It must reference `{{content}}`.
    pub fn new(template: impl Into<String>) -> Result<Self, AppError> {
        let template = template.into();
        if !template.contains("{{content}}") {
            return Err(AppError::ConfigError(
                "prompt template must reference {{content}}".into(),
            ));
        }
        Ok(Self {
            template,
            max_content_chars: DEFAULT_MAX_CONTENT_CHARS,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let template = std::fs::read_to_string(path).map_err(|e| {
            AppError::ConfigError(format!(
                "failed to read prompt template {}: {e}",
                path.display()
            ))
        })?;
        Self::new(template)
    }

    pub fn with_max_content_chars(mut self, max: usize) -> Self {
        self.max_content_chars = max;
        self
    }

    pub fn render(&self, record: &EnrichedRecord) -> String {
        let mut out = String::with_capacity(self.template.len() + record.content.len());
        let mut rest = self.template.as_str();

        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find("}}") else {
                out.push_str(&rest[start..]);
                return out;
            };

            let name = after[..end].trim();
            match self.value(record, name) {
                Some(value) => out.push_str(&value),
                // Unknown placeholders are left verbatim.
                None => out.push_str(&rest[start..start + 2 + end + 2]),
            }
            rest = &after[end + 2..];
        }

        out.push_str(rest);
        out
    }

    fn value(&self, record: &EnrichedRecord, name: &str) -> Option<String> {
        let value = match name {
            "id" => record.id.to_string(),
            "title" => record.title.clone().unwrap_or_else(|| UNKNOWN.into()),
            "url" => record.url.clone(),
            "score" => optional(record.score),
            "descendant_count" | "comments" => optional(record.descendant_count),
            "author" | "by" => record.author.clone().unwrap_or_else(|| UNKNOWN.into()),
            "time_iso" => record.time_iso.clone().unwrap_or_else(|| UNKNOWN.into()),
            "content" => truncate_chars(&record.content, self.max_content_chars),
            _ => return None,
        };
        Some(value)
    }
}

fn optional(value: Option<u32>) -> String {
    value.map_or_else(|| UNKNOWN.to_string(), |v| v.to_string())
}

/// Cut `text` to at most `max` characters, on a char boundary.
fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}{TRUNCATION_MARKER}", &text[..idx]),
        None => text.to_string(),
    }
}
