use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::{Result, AppError};
use crate::feed::FeedItem;
use crate::upstream;

const SYSTEM_PROMPT: &str = "You summarize Norwegian news articles concisely.";

const ARTICLE_PROMPT: &str = "You are a helpful Norwegian news summarizer, give the summary in Norwegian. \
Given this VG.no headline and description, write a concise 1-2 sentence summary. \
Do not repeat the headline, provide additional context or background information. \
Use as few words as possible while being informative.";

/// Produces a short summary for a single feed article.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, item: &FeedItem) -> Result<String>;
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub fn build_prompt(item: &FeedItem) -> String {
    let description = item
        .description
        .as_deref()
        .unwrap_or("No description available");
    let mut result = String::with_capacity(ARTICLE_PROMPT.len() + item.title.len() + description.len() + 32);
    result.push_str(ARTICLE_PROMPT);
    result.push_str("\n\nHeadline: ");
    result.push_str(&item.title);
    result.push_str("\nDescription: ");
    result.push_str(description);
    result
}

/// Chat-completions client for the OpenAI API.
pub struct OpenAiSummarizer {
    api_key: String,
    model: String,
    endpoint: String,
}

impl OpenAiSummarizer {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, endpoint: impl Into<String>) -> Self {
        OpenAiSummarizer {
            api_key: api_key.into(),
            model: model.into(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    async fn summarize(&self, item: &FeedItem) -> Result<String> {
        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".into(),
                    content: SYSTEM_PROMPT.into(),
                },
                Message {
                    role: "user".into(),
                    content: build_prompt(item),
                },
            ],
            temperature: 0.3,
            max_tokens: 150,
        };

        let request = upstream::client()
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body);

        let response: ChatResponse = upstream::json(request, "OpenAI")
            .await
            .map_err(|e| AppError::LlmError(e.to_string()))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| AppError::LlmError("Invalid response format from LLM".to_string()))
    }
}
