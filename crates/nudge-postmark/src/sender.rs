//! [`NotificationSender`] implementation backed by Postmark.

use async_trait::async_trait;
use tracing::debug;

use nudge_scheduler::{NotificationSender, ReminderMessage, SendError};

use crate::{Email, PostmarkClient, PostmarkError, TemplateRef};

/// Tag attached to every reminder email.
const REMINDER_TAG: &str = "reminder";

/// Sends reminders as plain emails, or through a stored template when one is
/// configured. Sends are never retried.
pub struct PostmarkSender {
    client: PostmarkClient,
    template: Option<TemplateRef>,
}

impl PostmarkSender {
    pub fn new(client: PostmarkClient) -> Self {
        Self {
            client,
            template: None,
        }
    }

    /// Render reminders with a stored template. The model carries
    /// `task`, `subject` and `body`.
    pub fn with_template(mut self, template: TemplateRef) -> Self {
        self.template = Some(template);
        self
    }
}

impl From<PostmarkError> for SendError {
    fn from(e: PostmarkError) -> Self {
        match e {
            PostmarkError::Api { code, message, .. } => SendError::Rejected { code, message },
            other => SendError::Transport(other.to_string()),
        }
    }
}

#[async_trait]
impl NotificationSender for PostmarkSender {
    async fn send(&self, message: &ReminderMessage) -> Result<(), SendError> {
        let reply = match &self.template {
            Some(template) => {
                let model = serde_json::json!({
                    "task": message.description,
                    "subject": message.subject,
                    "body": message.text_body,
                });
                self.client
                    .send_email_with_template(&message.to, template, &model)
                    .await?
            }
            None => {
                let email = Email {
                    to: message.to.clone(),
                    subject: message.subject.clone(),
                    html_body: message.html_body.clone(),
                    text_body: message.text_body.clone(),
                    tag: Some(REMINDER_TAG.to_string()),
                };
                self.client.send_email(&email).await?
            }
        };

        debug!(message_id = ?reply.message_id, "reminder accepted by postmark");
        Ok(())
    }
}
