use crate::core::{ChatClient, ConfigProvider};
use crate::domain::ports::ChatRequest;
use crate::utils::error::{HsseError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// Client for the hosted chat proxy.
#[derive(Debug, Clone)]
pub struct HttpChatClient {
    client: Client,
    endpoint: Option<String>,
}

impl HttpChatClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            endpoint: Some(endpoint.into()),
        })
    }

    /// Without an endpoint the client still builds; only `send` fails.
    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Result<Self> {
        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_seconds()))
                .build()?,
            endpoint: config.assistant_endpoint().map(str::to_string),
        })
    }
}

/// Pulls the reply text out of the proxy's response, whichever shape it used.
pub fn extract_reply(data: &Value) -> Option<String> {
    let non_empty = |v: Option<&Value>| v.and_then(Value::as_str).filter(|s| !s.is_empty()).map(str::to_string);

    non_empty(data.get("reply"))
        .or_else(|| non_empty(data.get("message").and_then(|m| m.get("content"))))
        .or_else(|| non_empty(data.get("content")))
        .or_else(|| {
            non_empty(
                data.get("messages")
                    .and_then(Value::as_array)
                    .and_then(|messages| messages.last())
                    .and_then(|m| m.get("content")),
            )
        })
}

#[async_trait]
impl ChatClient for HttpChatClient {
    async fn send(&self, request: &ChatRequest) -> Result<String> {
        let endpoint = self.endpoint.as_deref().ok_or_else(|| HsseError::MissingConfigError {
            field: "assistant.endpoint".to_string(),
        })?;
        tracing::debug!("Sending chat request to {}", endpoint);
        let response = self.client.post(endpoint).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(HsseError::AssistantError {
                message: format!("API error: {}", status.as_u16()),
            });
        }

        let data: Value = response.json().await?;
        extract_reply(&data).ok_or_else(|| HsseError::AssistantError {
            message: "No content returned from the chat endpoint".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reply_field_order() {
        assert_eq!(extract_reply(&json!({"reply": "a", "content": "b"})), Some("a".to_string()));
        assert_eq!(
            extract_reply(&json!({"reply": "", "message": {"role": "assistant", "content": "b"}})),
            Some("b".to_string())
        );
        assert_eq!(extract_reply(&json!({"content": "c"})), Some("c".to_string()));
        assert_eq!(
            extract_reply(&json!({"messages": [{"content": "first"}, {"content": "last"}]})),
            Some("last".to_string())
        );
        assert_eq!(extract_reply(&json!({"messages": []})), None);
        assert_eq!(extract_reply(&json!({"ok": true})), None);
    }
}
