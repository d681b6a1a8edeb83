//! Text-generation backend: the action service and its typed client

pub mod client;
pub mod prompts;
pub mod service;

pub use client::{Backend, ClientError, HttpBackend, LlmClient};
pub use prompts::{Action, Prompt};
pub use service::{BackendResponse, LlmService};
