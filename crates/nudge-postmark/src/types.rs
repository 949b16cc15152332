//! Postmark request and response types.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An outgoing email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
    pub tag: Option<String>,
}

/// A stored Postmark template, referenced by alias or numeric id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateRef {
    Alias(String),
    Id(i64),
}

impl FromStr for TemplateRef {
    type Err = Infallible;

    /// Numeric input is an id, anything else an alias.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Ok(match s.parse::<i64>() {
            Ok(id) => Self::Id(id),
            Err(_) => Self::Alias(s.to_string()),
        })
    }
}

impl fmt::Display for TemplateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alias(alias) => f.write_str(alias),
            Self::Id(id) => write!(f, "{id}"),
        }
    }
}

/// Body of `POST /email`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct EmailRequest<'a> {
    pub from: &'a str,
    pub to: &'a str,
    pub subject: &'a str,
    pub html_body: &'a str,
    pub text_body: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_stream: Option<&'a str>,
}

/// Body of `POST /email/withTemplate`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct TemplateEmailRequest<'a> {
    pub from: &'a str,
    pub to: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_alias: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<i64>,
    pub template_model: &'a serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_stream: Option<&'a str>,
}

/// Postmark's reply to a send.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SendResponse {
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub submitted_at: Option<String>,
    #[serde(rename = "MessageID", default)]
    pub message_id: Option<String>,
    pub error_code: i64,
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_ref_parsing() {
        assert_eq!("12345".parse::<TemplateRef>().unwrap(), TemplateRef::Id(12345));
        assert_eq!(
            "task-reminder".parse::<TemplateRef>().unwrap(),
            TemplateRef::Alias("task-reminder".to_string())
        );
    }

    #[test]
    fn test_email_request_uses_postmark_field_names() {
        let json = serde_json::to_value(EmailRequest {
            from: "nudge@example.com",
            to: "a@example.com",
            subject: "s",
            html_body: "<p>h</p>",
            text_body: "t",
            tag: None,
            message_stream: Some("outbound"),
        })
        .unwrap();

        assert_eq!(json["From"], "nudge@example.com");
        assert_eq!(json["HtmlBody"], "<p>h</p>");
        assert_eq!(json["MessageStream"], "outbound");
        assert!(json.get("Tag").is_none());
    }

    #[test]
    fn test_send_response_parsing() {
        let response: SendResponse = serde_json::from_value(serde_json::json!({
            "To": "a@example.com",
            "SubmittedAt": "2026-05-04T09:00:00.0000000-04:00",
            "MessageID": "b7bc2f4a-e38e-4336-af7d-e6c392c2f817",
            "ErrorCode": 0,
            "Message": "OK"
        }))
        .unwrap();

        assert_eq!(response.error_code, 0);
        assert_eq!(
            response.message_id.as_deref(),
            Some("b7bc2f4a-e38e-4336-af7d-e6c392c2f817")
        );
    }
}
