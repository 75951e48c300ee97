//! External embedding provider client.
//!
//! The provider is a plain request/response endpoint: POST `{"text": ...}`,
//! get `{"embedding": [...]}` back. The `EmbeddingProvider` trait is the
//! seam tests use to substitute a deterministic in-process provider.

use std::time::Duration;

use once_cell::sync::Lazy;
use serde::Deserialize;

/// Errors from embedding generation.
///
/// `Unavailable` covers transport failures and timeouts — an outage of an
/// external dependency, which the web layer reports as 503 rather than 500.
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("embedding provider unavailable: {0}")]
    Unavailable(String),

    #[error("embedding provider returned status {0}")]
    Status(u16),

    #[error("malformed provider response: {0}")]
    InvalidResponse(String),

    #[error("embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

impl From<reqwest::Error> for EmbeddingError {
    fn from(err: reqwest::Error) -> Self {
        EmbeddingError::Unavailable(err.to_string())
    }
}

pub trait EmbeddingProvider: Send + Sync {
    /// Embed one text. Dimensionality must be consistent across calls —
    /// query and corpus vectors from different models never mix.
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

static CLIENT: Lazy<reqwest::blocking::Client> = Lazy::new(reqwest::blocking::Client::new);

/// HTTP client for the embedding endpoint.
pub struct HttpEmbeddingProvider {
    endpoint: String,
    /// Bounded per-request timeout; a slow provider is a failed call, not
    /// an indefinite block on the search request.
    timeout: Duration,
    /// Expected dimensionality, when the deployment pins one. `None`
    /// accepts whatever the provider returns.
    dimensions: Option<usize>,
}

impl HttpEmbeddingProvider {
    pub fn new(endpoint: impl Into<String>, timeout: Duration, dimensions: Option<usize>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout,
            dimensions,
        }
    }
}

impl EmbeddingProvider for HttpEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let response = CLIENT
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(&serde_json::json!({ "text": text }))
            .send()?;

        if !response.status().is_success() {
            return Err(EmbeddingError::Status(response.status().as_u16()));
        }

        let parsed: EmbedResponse = response
            .json()
            .map_err(|err| EmbeddingError::InvalidResponse(err.to_string()))?;

        if parsed.embedding.is_empty() {
            return Err(EmbeddingError::InvalidResponse(
                "provider returned an empty embedding".to_string(),
            ));
        }

        if let Some(expected) = self.dimensions {
            if parsed.embedding.len() != expected {
                return Err(EmbeddingError::DimensionMismatch {
                    expected,
                    got: parsed.embedding.len(),
                });
            }
        }

        Ok(parsed.embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embed_response_parsing() {
        let parsed: EmbedResponse =
            serde_json::from_str(r#"{"embedding": [0.1, -0.2, 0.3]}"#).unwrap();
        assert_eq!(parsed.embedding.len(), 3);

        let missing = serde_json::from_str::<EmbedResponse>(r#"{"vector": []}"#);
        assert!(missing.is_err());
    }

    #[test]
    fn test_transport_errors_map_to_unavailable() {
        // Unroutable endpoint; the blocking client fails without network I/O
        // being answerable, and the failure must surface as Unavailable.
        let provider = HttpEmbeddingProvider::new(
            "http://127.0.0.1:1/embed",
            Duration::from_millis(50),
            None,
        );
        assert!(matches!(
            provider.embed("query"),
            Err(EmbeddingError::Unavailable(_))
        ));
    }
}
