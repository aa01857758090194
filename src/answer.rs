//! Answer generation: prompt assembly and the chat-completion client.
//!
//! The answerer gets a single user message containing the retrieved context
//! and the question. Replies are parsed into a [`ChatReply`] so that a
//! well-formed response without content is distinguishable from a
//! malformed one.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::AnswerConfig;
use crate::error::RagError;
use crate::http::{self, HttpFailure};

/// Outcome of a successful chat-completion call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatReply {
    Answer(String),
    /// The service answered but `choices[0].message.content` was absent or null.
    Empty,
}

impl ChatReply {
    /// The answer text; empty for [`ChatReply::Empty`].
    pub fn text(&self) -> &str {
        match self {
            ChatReply::Answer(text) => text,
            ChatReply::Empty => "",
        }
    }
}

/// A chat-completion backend that answers a single-turn prompt.
#[async_trait]
pub trait AnswerProvider: Send + Sync {
    fn model_name(&self) -> &str;

    /// Send the prompt. Errors should be [`RagError::AnswerService`].
    async fn complete(&self, prompt: &str) -> Result<ChatReply>;
}

/// Build the grounded prompt from ranked chunk texts and the question.
pub fn build_prompt<S: AsRef<str>>(context_chunks: &[S], question: &str) -> String {
    let context = context_chunks
        .iter()
        .map(|c| c.as_ref())
        .collect::<Vec<_>>()
        .join("\n\n");
    format!(
        "Answer using ONLY the context.\n\nContext:\n{}\n\nQuestion: {}\n\nAnswer:",
        context, question
    )
}

// ============ OpenAI Provider ============

/// Chat provider for `POST {url}/chat/completions`.
pub struct OpenAIChat {
    client: reqwest::Client,
    url: String,
    model: String,
    temperature: f64,
    api_key: String,
    max_retries: u32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAIChat {
    pub fn new(config: &AnswerConfig, api_key: String) -> Result<Self> {
        let client = http::build_client(config.timeout_secs).map_err(into_answer_error)?;
        Ok(Self {
            client,
            url: http::endpoint(&config.url, "chat/completions"),
            model: config.model.clone(),
            temperature: config.temperature,
            api_key,
            max_retries: config.max_retries,
        })
    }
}

fn into_answer_error(failure: HttpFailure) -> anyhow::Error {
    RagError::answer(failure.status, failure.message).into()
}

fn parse_reply(response: ChatResponse) -> ChatReply {
    match response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
    {
        Some(content) => ChatReply::Answer(content),
        None => ChatReply::Empty,
    }
}

#[async_trait]
impl AnswerProvider for OpenAIChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<ChatReply> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
        };
        let response: ChatResponse = http::post_json(
            &self.client,
            &self.url,
            &self.api_key,
            &body,
            self.max_retries,
            "Chat",
        )
        .await
        .map_err(into_answer_error)?;

        Ok(parse_reply(response))
    }
}
