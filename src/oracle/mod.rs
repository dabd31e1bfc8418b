//! Oracle adapter: a batch of titles goes in and parsed records come out.
//!
//! The transport sits behind [`Oracle`], so the vendor or model can be swapped
//! without touching matching or renaming.

pub mod batch;
pub mod parser;

use std::time::Duration;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use crate::config::OracleConfig;
use crate::{MetadataRecord, Result, TaggerError};
use self::batch::BatchQueryBuilder;
use self::parser::parse_response;

/// A free-text completion service.
pub trait Oracle: Send + Sync {
    fn complete(&self, prompt: &str) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// OpenAI-compatible chat completions client.
pub struct OpenAiOracle {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    temperature: f32,
    system_prompt: String,
    api_key: String,
}

impl OpenAiOracle {
    pub fn new(config: &OracleConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        log::info!("Oracle client ready (model: {}, endpoint: {})", config.model, config.endpoint);

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            system_prompt: config.system_prompt.clone(),
            api_key: api_key.into(),
        })
    }
}

impl Oracle for OpenAiOracle {
    fn complete(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: &self.system_prompt },
                ChatMessage { role: "user", content: prompt },
            ],
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(TaggerError::Oracle(format!("HTTP {}: {}", status.as_u16(), body)));
        }

        let text = response.text()?;
        extract_content(&text)
    }
}

fn extract_content(body: &str) -> Result<String> {
    let body: ChatResponse = serde_json::from_str(body)?;
    body.choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| TaggerError::Oracle("response contained no message content".into()))
}

/// Records gathered over every batch of a pass.
#[derive(Debug, Default)]
pub struct LookupSummary {
    pub records: Vec<MetadataRecord>,
    pub batches: usize,
    pub failed_batches: usize,
}

/// Turns titles into metadata records through an [`Oracle`].
pub struct MetadataSource<O: Oracle> {
    builder: BatchQueryBuilder,
    oracle: O,
    parallel_batches: usize,
}

impl<O: Oracle> MetadataSource<O> {
    pub fn new(builder: BatchQueryBuilder, oracle: O) -> Self {
        Self {
            builder,
            oracle,
            parallel_batches: 1,
        }
    }

    /// Allow up to `n` batch requests in flight. 1 keeps issuance sequential.
    pub fn with_parallel_batches(mut self, n: usize) -> Self {
        self.parallel_batches = n.max(1);
        self
    }

    pub fn lookup_batch(&self, batch: &[String]) -> Result<Vec<MetadataRecord>> {
        let prompt = self.builder.render(batch);
        log::debug!("Oracle prompt:\n{}", prompt);

        let reply = self.oracle.complete(&prompt)?;
        log::debug!("Oracle reply:\n{}", reply);

        let records = parse_response(&reply);
        log::info!("Oracle returned {} usable entries for {} titles", records.len(), batch.len());
        Ok(records)
    }

    /// Query every batch. A failed batch is logged and counted; the rest continue.
    pub fn lookup_all(&self, titles: &[String]) -> Result<LookupSummary> {
        let batches: Vec<&[String]> = self.builder.batches(titles).collect();
        let total = batches.len();

        let results: Vec<Result<Vec<MetadataRecord>>> = if self.parallel_batches > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.parallel_batches)
                .build()
                .map_err(|e| TaggerError::Config(format!("oracle thread pool: {}", e)))?;
            pool.install(|| {
                batches
                    .par_iter()
                    .map(|batch| self.lookup_batch(batch))
                    .collect()
            })
        } else {
            batches
                .iter()
                .enumerate()
                .map(|(i, batch)| {
                    log::info!("Sending batch {}/{} ({} titles)", i + 1, total, batch.len());
                    self.lookup_batch(batch)
                })
                .collect()
        };

        let mut summary = LookupSummary { batches: total, ..Default::default() };
        for (i, result) in results.into_iter().enumerate() {
            match result {
                Ok(records) => summary.records.extend(records),
                Err(e) => {
                    log::warn!("Batch {}/{} failed: {}", i + 1, total, e);
                    summary.failed_batches += 1;
                }
            }
        }
        Ok(summary)
    }
}
