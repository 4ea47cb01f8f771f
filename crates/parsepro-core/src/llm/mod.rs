mod client;
mod prompts;

pub use client::{GeminiClient, StructuredExtractor, SummaryError, SummaryResult};
pub use prompts::EXTRACTION_PROMPT;
