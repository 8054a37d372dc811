use std::time::Duration;

use anyhow::Result;
use log::{info, warn};

use crate::config::{Config, PushSinkKind};
use crate::digest::push::{DesktopPush, PushSink, StdoutPush};
use crate::digest::summarizer::ChatCompletionsSummarizer;
use crate::digest::{Summarizer, compose_digest};
use crate::domain::email::{RetrievalResult, ScanWindow};
use crate::mail::Retriever;

/// One end-to-end digest: retrieve, summarize, push.
pub struct DigestJob {
    retriever: Retriever,
    summarizer: Option<Box<dyn Summarizer>>,
    sink: Box<dyn PushSink>,
    recipient: String,
}

impl DigestJob {
    pub fn new(
        retriever: Retriever,
        summarizer: Option<Box<dyn Summarizer>>,
        sink: Box<dyn PushSink>,
        recipient: impl Into<String>,
    ) -> Self {
        Self {
            retriever,
            summarizer,
            sink,
            recipient: recipient.into(),
        }
    }

    pub fn from_config(cfg: &Config, use_summarizer: bool) -> Result<Self> {
        let retriever = cfg.retriever()?;

        let summarizer: Option<Box<dyn Summarizer>> = match (&cfg.summarizer, use_summarizer) {
            (Some(s), true) => match cfg.summarizer_api_key()? {
                Some(key) => Some(Box::new(ChatCompletionsSummarizer::new(
                    &s.base_url,
                    &s.model,
                    key,
                    Duration::from_secs(s.timeout_secs),
                )?)),
                None => {
                    warn!("summarizer configured but no API key found; listing records instead");
                    None
                }
            },
            _ => None,
        };

        let sink: Box<dyn PushSink> = match cfg.push.sink {
            PushSinkKind::Stdout => Box::new(StdoutPush),
            PushSinkKind::Desktop => Box::new(DesktopPush),
        };

        Ok(Self::new(retriever, summarizer, sink, cfg.push.recipient.clone()))
    }

    pub fn retrieve(&self, window: &ScanWindow) -> RetrievalResult {
        self.retriever.retrieve(window)
    }

    /// Run the digest for `window` and push it. Returns the pushed text.
    pub fn run(&self, window: &ScanWindow) -> Result<String> {
        let result = self.retrieve(window);
        let text = self.compose(window, &result);
        self.sink.push(&self.recipient, &text)?;
        info!("digest for {window} pushed");
        Ok(text)
    }

    pub fn compose(&self, window: &ScanWindow, result: &RetrievalResult) -> String {
        compose_digest(window, result, self.summarizer.as_deref())
    }
}
