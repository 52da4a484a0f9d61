//! CI assistant: turns build-failure webhooks into LLM diagnoses.
//!
//! Jenkins and GitHub Actions deliveries are normalized into a
//! [`event::CanonicalEvent`], the log is reduced to a short error snippet by
//! [`extract`], scrubbed of secrets, and sent to an OpenAI-compatible model.
//! The diagnosis is written back to Jenkins, posted to Slack, and a
//! suggested pipeline may be opened as a GitHub pull request.
//!
//! See `DESIGN.md` for the module map.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod credentials;
pub mod logging;

pub mod event;
pub mod extract;
pub mod redactor;

pub mod analysis;
pub mod manifest;
pub mod providers;

pub mod fetch;
pub mod integrations;
pub mod pipeline;
pub mod server;
