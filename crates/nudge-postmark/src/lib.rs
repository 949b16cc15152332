//! Postmark email sender for Nudge.
//!
//! Provides a small client for Postmark's `/email` and `/email/withTemplate`
//! endpoints and a [`nudge_scheduler::NotificationSender`] built on it.

mod client;
mod error;
mod sender;
mod types;

pub use client::{DEFAULT_API_URL, PostmarkClient};
pub use error::PostmarkError;
pub use sender::PostmarkSender;
pub use types::{Email, SendResponse, TemplateRef};
