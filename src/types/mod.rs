//! # Types Module
//!
//! Request and response shapes that cross the cache boundary.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`CacheableRequest`] | The request fields that are fingerprinted and gated on |
//! | [`Message`] | Chat message with role and content |
//! | [`ToolDefinition`] | Tool definition for model context |
//! | [`CompletionResponse`] | The cached payload, with optional [`Usage`] |
//!
//! ## Example
//!
//! ```rust
//! use ai_lib_cache::types::{CacheableRequest, Message};
//!
//! let request = CacheableRequest::new(
//!     "gpt-4o-mini",
//!     vec![Message::system("You are terse"), Message::user("2+2?")],
//! )
//! .temperature(0.0)
//! .max_tokens(16);
//! assert!(!request.stream);
//! ```

pub mod message;
pub mod request;
pub mod response;
pub mod tool;

pub use message::{Message, MessageContent, MessageRole};
pub use request::CacheableRequest;
pub use response::{CompletionResponse, Usage};
pub use tool::{FunctionDefinition, ToolDefinition};
