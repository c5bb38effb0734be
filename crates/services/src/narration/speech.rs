use std::env;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::FetchError;
use crate::narration::audio::{AudioClip, NarrationSynthesizer};

const DEFAULT_BASE_URL: &str = "https://api.siliconflow.cn/v1";
const DEFAULT_MODEL: &str = "FunAudioLLM/CosyVoice2-0.5B";
const DEFAULT_VOICE: &str = "FunAudioLLM/CosyVoice2-0.5B:bella";

#[derive(Clone, Debug)]
pub struct SpeechConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub voice: String,
}

impl SpeechConfig {
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("LEARN_TTS_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        let base_url = env::var("LEARN_TTS_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
        let model = env::var("LEARN_TTS_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());
        let voice = env::var("LEARN_TTS_VOICE").unwrap_or_else(|_| DEFAULT_VOICE.into());
        Some(Self {
            base_url,
            api_key,
            model,
            voice,
        })
    }

    #[must_use]
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.into(),
            voice: DEFAULT_VOICE.into(),
        }
    }
}

/// Narration synthesizer backed by an OpenAI-compatible speech endpoint.
#[derive(Clone)]
pub struct SpeechClient {
    client: Client,
    config: Option<SpeechConfig>,
}

impl SpeechClient {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(SpeechConfig::from_env())
    }

    #[must_use]
    pub fn new(config: Option<SpeechConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }
}

#[async_trait]
impl NarrationSynthesizer for SpeechClient {
    async fn synthesize(&self, text: &str) -> Result<AudioClip, FetchError> {
        if text.trim().is_empty() {
            return Err(FetchError::MissingInput);
        }
        let config = self
            .config
            .as_ref()
            .ok_or_else(|| FetchError::ServiceUnavailable("API key not configured".into()))?;

        let url = format!("{}/audio/speech", config.base_url.trim_end_matches('/'));
        let payload = SpeechRequest {
            model: &config.model,
            voice: &config.voice,
            input: text,
            response_format: "mp3",
        };
        debug!(%url, chars = text.chars().count(), "requesting speech");

        let response = self
            .client
            .post(url)
            .bearer_auth(&config.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("audio/mpeg")
            .to_string();
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(FetchError::EmptyAudio);
        }
        Ok(AudioClip::new(bytes.to_vec(), content_type))
    }
}

/// Map a failed response to a `FetchError`, keeping the service's own message when it sent one.
fn status_error(status: StatusCode, body: &str) -> FetchError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|body| body.message.or(body.error))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());

    match status {
        StatusCode::BAD_REQUEST => FetchError::MissingInput,
        s if s.is_server_error() => FetchError::ServiceUnavailable(message),
        s => FetchError::Status {
            status: s.as_u16(),
            message,
        },
    }
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    voice: &'a str,
    input: &'a str,
    response_format: &'static str,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn blank_text_is_rejected_before_any_request() {
        let client = SpeechClient::new(Some(SpeechConfig::with_api_key("k")));
        assert_eq!(client.synthesize("  ").await, Err(FetchError::MissingInput));
    }

    #[tokio::test]
    async fn missing_key_reports_service_unavailable() {
        let client = SpeechClient::new(None);
        assert!(!client.enabled());
        assert!(matches!(
            client.synthesize("hello").await,
            Err(FetchError::ServiceUnavailable(_))
        ));
    }

    #[test]
    fn structured_error_body_is_kept() {
        let err = status_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"error": "Internal server error", "message": "quota exceeded"}"#,
        );
        assert_eq!(err, FetchError::ServiceUnavailable("quota exceeded".into()));
    }

    #[test]
    fn statuses_map_to_distinct_errors() {
        assert_eq!(
            status_error(StatusCode::BAD_REQUEST, r#"{"error": "Text is required"}"#),
            FetchError::MissingInput
        );
        assert_eq!(
            status_error(StatusCode::SERVICE_UNAVAILABLE, "not json"),
            FetchError::ServiceUnavailable("Service Unavailable".into())
        );
        assert_eq!(
            status_error(StatusCode::UNAUTHORIZED, r#"{"error": "bad key"}"#),
            FetchError::Status {
                status: 401,
                message: "bad key".into()
            }
        );
    }
}
