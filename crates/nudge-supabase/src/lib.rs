//! Supabase task store for Nudge.
//!
//! Talks to the PostgREST API in front of the `tasks` and `users` tables and
//! implements [`nudge_scheduler::TaskStore`] on top of it.

mod client;
mod error;
mod records;
mod store;

pub use client::{DEFAULT_PAGE_SIZE, SupabaseClient};
pub use error::SupabaseError;
pub use records::*;
