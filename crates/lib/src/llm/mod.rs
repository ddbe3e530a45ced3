//! Completion API abstraction and OpenAI client.
//!
//! One non-streaming chat completion per fallback reply, with fixed sampling.

mod openai;

pub use openai::{Completer, OpenAiClient, OpenAiError, SamplingConfig};
