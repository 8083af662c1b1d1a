//! Token-classification endpoint recognizer
//!
//! Talks to a Hugging Face style inference endpoint that runs a NER
//! pipeline with `aggregation_strategy = "simple"`.

use super::{EntityMention, EntityRecognizer};
use crate::config::SecretString;
use crate::domain::{PhiScrubError, Result};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use secrecy::ExposeSecret;
use serde::Serialize;
use std::time::Duration;

#[derive(Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: InferenceParameters,
}

#[derive(Serialize)]
struct InferenceParameters {
    aggregation_strategy: &'static str,
}

/// Recognizer backed by an HTTP inference endpoint
pub struct HttpEntityRecognizer {
    name: String,
    endpoint: String,
    api_token: Option<SecretString>,
    client: Client,
}

impl HttpEntityRecognizer {
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        api_token: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(30)))
            .build()?;

        Ok(Self {
            name: name.into(),
            endpoint: endpoint.into(),
            api_token,
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl EntityRecognizer for HttpEntityRecognizer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn recognize(&self, text: &str) -> Result<Vec<EntityMention>> {
        let body = InferenceRequest {
            inputs: text,
            parameters: InferenceParameters {
                aggregation_strategy: "simple",
            },
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await.map_err(|e| {
            PhiScrubError::Recognition(format!("request to {} failed: {e}", self.endpoint))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PhiScrubError::Recognition(format!(
                "endpoint {} returned {status}: {body}",
                self.endpoint
            )));
        }

        let mentions = response.json::<Vec<EntityMention>>().await.map_err(|e| {
            PhiScrubError::Recognition(format!("invalid response from {}: {e}", self.endpoint))
        })?;

        tracing::debug!(
            recognizer = %self.name,
            mentions = mentions.len(),
            "Entity recognition complete"
        );

        Ok(mentions)
    }
}

impl std::fmt::Debug for HttpEntityRecognizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpEntityRecognizer")
            .field("name", &self.name)
            .field("endpoint", &self.endpoint)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
