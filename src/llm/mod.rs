// LLM abstraction layer

pub mod openai;
pub mod provider;

pub use provider::*;

pub use crate::types::{AppError, AppResult, LLMMessage, LLMRequest, LLMResponse, TokenUsage};
