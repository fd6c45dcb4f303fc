//! Wire layer for OpenAI-compatible chat completion endpoints.
//!
//! - **Client**: HTTP client with a fixed timeout and bearer authentication
//! - **Types**: lenient request/response shapes shared by every probe

pub mod client;

pub use client::{
    ChatClient, ChatMessage, ChatRequest, ChatResponse, ChatResponseChoice, Endpoint,
    ResponseMessage, Role, TimedChatResponse, Usage, REQUEST_TIMEOUT,
};
