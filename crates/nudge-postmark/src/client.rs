//! Postmark HTTP client implementation.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::types::{EmailRequest, TemplateEmailRequest};
use crate::{Email, PostmarkError, SendResponse, TemplateRef};

/// Postmark API base URL.
pub const DEFAULT_API_URL: &str = "https://api.postmarkapp.com";

/// Client for the Postmark email API.
pub struct PostmarkClient {
    http: Client,
    base_url: String,
    server_token: String,
    from: String,
    message_stream: Option<String>,
}

impl PostmarkClient {
    /// Create a client sending from `from` with the given server token.
    pub fn new(
        server_token: impl Into<String>,
        from: impl Into<String>,
    ) -> Result<Self, PostmarkError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            base_url: DEFAULT_API_URL.to_string(),
            server_token: server_token.into(),
            from: from.into(),
            message_stream: None,
        })
    }

    /// Point the client at a different API host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Send through a specific message stream instead of the server default.
    pub fn with_message_stream(mut self, stream: impl Into<String>) -> Self {
        self.message_stream = Some(stream.into());
        self
    }

    /// Send a single email.
    pub async fn send_email(&self, email: &Email) -> Result<SendResponse, PostmarkError> {
        let request = EmailRequest {
            from: &self.from,
            to: &email.to,
            subject: &email.subject,
            html_body: &email.html_body,
            text_body: &email.text_body,
            tag: email.tag.as_deref(),
            message_stream: self.message_stream.as_deref(),
        };

        self.post("/email", &request).await
    }

    /// Send an email rendered from a stored template.
    pub async fn send_email_with_template(
        &self,
        to: &str,
        template: &TemplateRef,
        model: &serde_json::Value,
    ) -> Result<SendResponse, PostmarkError> {
        let (template_alias, template_id) = match template {
            TemplateRef::Alias(alias) => (Some(alias.as_str()), None),
            TemplateRef::Id(id) => (None, Some(*id)),
        };

        let request = TemplateEmailRequest {
            from: &self.from,
            to,
            template_alias,
            template_id,
            template_model: model,
            message_stream: self.message_stream.as_deref(),
        };

        self.post("/email/withTemplate", &request).await
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<SendResponse, PostmarkError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .http
            .post(&url)
            .header("Accept", "application/json")
            .header("X-Postmark-Server-Token", &self.server_token)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            PostmarkError::InvalidResponse(format!(
                "request failed ({}): failed to read response: {}",
                status, e
            ))
        })?;

        // Postmark reports failures as {"ErrorCode": n, "Message": ...} on 4xx/5xx
        let parsed = serde_json::from_str::<SendResponse>(&text);

        match parsed {
            Ok(reply) if status.is_success() && reply.error_code == 0 => {
                debug!(
                    to = ?reply.to,
                    message_id = ?reply.message_id,
                    "postmark accepted message"
                );
                Ok(reply)
            }
            Ok(reply) => Err(PostmarkError::Api {
                status: status.as_u16(),
                code: reply.error_code,
                message: reply.message,
            }),
            Err(_) if !status.is_success() => Err(PostmarkError::Api {
                status: status.as_u16(),
                code: -1,
                message: text,
            }),
            Err(e) => Err(PostmarkError::Json(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> PostmarkClient {
        PostmarkClient::new("server-token", "nudge@example.com")
            .unwrap()
            .with_base_url(server.uri())
    }

    fn email() -> Email {
        Email {
            to: "a@example.com".to_string(),
            subject: "⏰ Reminder: stretch".to_string(),
            html_body: "Hey! It’s time to do: stretch".to_string(),
            text_body: "Hey! It’s time to do: stretch".to_string(),
            tag: Some("reminder".to_string()),
        }
    }

    fn accepted() -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "To": "a@example.com",
            "SubmittedAt": "2026-05-04T09:00:00.0000000-04:00",
            "MessageID": "0a129aee-e1cd-480d-b08d-4f48548ff48d",
            "ErrorCode": 0,
            "Message": "OK"
        }))
    }

    #[test]
    fn test_client_defaults() {
        let client = PostmarkClient::new("t", "nudge@example.com").unwrap();
        assert_eq!(client.base_url, DEFAULT_API_URL);
        assert_eq!(client.from, "nudge@example.com");
        assert!(client.message_stream.is_none());
    }

    #[tokio::test]
    async fn test_send_email() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/email"))
            .and(header("X-Postmark-Server-Token", "server-token"))
            .and(body_partial_json(serde_json::json!({
                "From": "nudge@example.com",
                "To": "a@example.com",
                "Subject": "⏰ Reminder: stretch",
                "Tag": "reminder",
                "MessageStream": "outbound"
            })))
            .respond_with(accepted())
            .expect(1)
            .mount(&mock_server)
            .await;

        let reply = client(&mock_server)
            .with_message_stream("outbound")
            .send_email(&email())
            .await
            .unwrap();
        assert_eq!(reply.error_code, 0);
    }

    #[tokio::test]
    async fn test_send_email_with_template_alias() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/email/withTemplate"))
            .and(body_partial_json(serde_json::json!({
                "TemplateAlias": "task-reminder",
                "TemplateModel": { "task": "stretch" }
            })))
            .respond_with(accepted())
            .expect(1)
            .mount(&mock_server)
            .await;

        client(&mock_server)
            .send_email_with_template(
                "a@example.com",
                &TemplateRef::Alias("task-reminder".to_string()),
                &serde_json::json!({ "task": "stretch" }),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_send_email_with_template_id() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/email/withTemplate"))
            .and(body_partial_json(serde_json::json!({ "TemplateId": 4242 })))
            .respond_with(accepted())
            .expect(1)
            .mount(&mock_server)
            .await;

        client(&mock_server)
            .send_email_with_template(
                "a@example.com",
                &TemplateRef::Id(4242),
                &serde_json::json!({}),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_api_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/email"))
            .respond_with(ResponseTemplate::new(422).set_body_json(serde_json::json!({
                "ErrorCode": 406,
                "Message": "You tried to send to a recipient that has been marked as inactive."
            })))
            .mount(&mock_server)
            .await;

        let err = client(&mock_server).send_email(&email()).await.unwrap_err();
        match err {
            PostmarkError::Api {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 422);
                assert_eq!(code, 406);
                assert!(message.contains("inactive"));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_json_error_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/email"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&mock_server)
            .await;

        let err = client(&mock_server).send_email(&email()).await.unwrap_err();
        assert!(matches!(err, PostmarkError::Api { status: 502, code: -1, .. }));
    }
}
