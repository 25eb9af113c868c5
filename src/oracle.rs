use crate::settings::settings;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Outcome of asking the oracle for a completion. Every transport failure
/// (connection refused, timeout, bad status, unreadable body) collapses into
/// `Unavailable`; deciding whether returned text is usable is the caller's
/// problem.
#[derive(Debug, Clone)]
pub enum OracleReply {
    Text(String),
    Unavailable,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    top_p: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Thin client for a local Ollama server. Performs no validation of the
/// generated text.
#[derive(Debug, Clone)]
pub struct OracleClient {
    base_url: String,
    model: String,
    temperature: f32,
    top_p: f32,
    probe_timeout: Duration,
    generate_timeout: Duration,
    client: reqwest::Client,
}

impl OracleClient {
    pub fn from_settings() -> Self {
        let s = settings();
        Self::new(
            &s.oracle.base_url,
            &s.oracle.model,
            s.oracle.temperature,
            s.oracle.top_p,
            Duration::from_millis(s.oracle.probe_timeout_ms),
            Duration::from_secs(s.oracle.generate_timeout_secs),
        )
    }

    pub fn new(
        base_url: &str,
        model: &str,
        temperature: f32,
        top_p: f32,
        probe_timeout: Duration,
        generate_timeout: Duration,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            temperature,
            top_p,
            probe_timeout,
            generate_timeout,
            client: reqwest::Client::new(),
        }
    }

    fn tags_url(&self) -> String {
        format!("{}/api/tags", self.base_url)
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }

    /// Liveness probe with a short timeout.
    pub async fn available(&self) -> bool {
        match self
            .client
            .get(self.tags_url())
            .timeout(self.probe_timeout)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    /// Requests a completion. Bounded by the configured generate timeout; an
    /// abandoned request has no side effects worth caring about.
    pub async fn generate(&self, prompt: &str, system_prompt: &str) -> OracleReply {
        let payload = GenerateRequest {
            model: &self.model,
            prompt,
            system: system_prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
                top_p: self.top_p,
            },
        };

        let response = match self
            .client
            .post(self.generate_url())
            .json(&payload)
            .timeout(self.generate_timeout)
            .send()
            .await
        {
            Ok(r) => r,
            Err(_) => return OracleReply::Unavailable,
        };

        if !response.status().is_success() {
            return OracleReply::Unavailable;
        }

        match response.json::<GenerateResponse>().await {
            Ok(body) => OracleReply::Text(body.response),
            Err(_) => OracleReply::Unavailable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(base: &str) -> OracleClient {
        OracleClient::new(
            base,
            "llama3.2:3b",
            0.7,
            0.9,
            Duration::from_millis(100),
            Duration::from_millis(100),
        )
    }

    #[test]
    fn test_endpoint_urls() {
        let client = test_client("http://localhost:11434/");
        assert_eq!(client.tags_url(), "http://localhost:11434/api/tags");
        assert_eq!(client.generate_url(), "http://localhost:11434/api/generate");
    }

    #[tokio::test]
    async fn test_unreachable_oracle_is_unavailable() {
        // Nothing listens on this port; both calls must degrade quietly.
        let client = test_client("http://127.0.0.1:59999");
        assert!(!client.available().await);
        assert!(matches!(
            client.generate("prompt", "system").await,
            OracleReply::Unavailable
        ));
    }
}
