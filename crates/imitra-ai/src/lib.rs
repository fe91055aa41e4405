//! Complaint classification: an LLM when one is configured, keyword scoring otherwise.

mod classifier;
pub mod keywords;
pub mod llm;
pub mod prompt;

pub use classifier::{ClassifyError, Classifier, classify_keywords, classify_with};
pub use llm::TextGenerator;
#[cfg(feature = "llm")]
pub use llm::{LlmClient, LlmConfig};
