use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::digest::{DigestInput, Summarizer, format_records};

/// Client for any OpenAI-compatible `/chat/completions` endpoint.
pub struct ChatCompletionsSummarizer {
    http: reqwest::blocking::Client,
    base_url: String,
    model: String,
    api_key: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

impl ChatCompletionsSummarizer {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

impl Summarizer for ChatCompletionsSummarizer {
    fn summarize(&self, input: &DigestInput<'_>) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".into(),
                    content: system_prompt(input),
                },
                ChatMessage {
                    role: "user".into(),
                    content: format_records(input.records),
                },
            ],
            stream: false,
        };

        let response: ChatResponse = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .context("summarizer request failed")?
            .error_for_status()?
            .json()
            .context("summarizer returned malformed JSON")?;

        response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| anyhow!("summarizer returned no choices"))
    }
}

pub fn system_prompt(input: &DigestInput<'_>) -> String {
    format!(
        "You are an email digest assistant. Write the mail report for {window} from the emails below.\n\
         Use exactly this format:\n\n\
         Received {received} emails and sent {sent} {period}.\n\
         Below are the {n} external emails, x of which need a reply:\n\n\
         1. [Subject]\n   - From: [sender name]\n   - Gist: [one or two sentences with the key points and any to-dos]\n\n\
         2. [Another subject]\n   - From: [sender name]\n   - Gist: [...]\n\n\
         If an email needs a reply or action, end its gist with '(reply needed)'. Keep it short and stick to the format.",
        window = input.window,
        period = input.window.period(),
        received = input.total_received,
        sent = input.total_sent,
        n = input.records.len(),
    )
}
