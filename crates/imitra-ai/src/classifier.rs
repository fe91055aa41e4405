//! Routing a complaint to a category, department and priority.
//!
//! The LLM path is tried first when a generator is configured. Any failure on
//! that path (transport, malformed JSON, a value outside the vocabularies)
//! drops to keyword scoring, so classification itself never fails.

use std::sync::Arc;

use imitra_core::{Category, Classification, ClassificationMethod, Department, DomainError, Priority};
use thiserror::Error;
use tracing::{debug, warn};

use crate::keywords;
use crate::llm::TextGenerator;
use crate::prompt;

#[derive(Error, Debug)]
pub enum ClassifyError {
    #[cfg(feature = "llm")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("model endpoint returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("model returned an empty reply")]
    EmptyReply,
    #[error("reply is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("reply outside the vocabulary: {0}")]
    Vocabulary(#[from] DomainError),
    #[error("reply confidence is not a finite number")]
    BadConfidence,
}

#[derive(Clone, Default)]
pub struct Classifier {
    generator: Option<Arc<dyn TextGenerator>>,
}

impl Classifier {
    /// Keyword scoring only.
    pub fn keyword_only() -> Self {
        Self { generator: None }
    }

    pub fn with_generator(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator: Some(generator),
        }
    }

    pub fn has_generator(&self) -> bool {
        self.generator.is_some()
    }

    pub async fn classify(&self, title: &str, description: &str) -> Classification {
        if let Some(generator) = &self.generator {
            match classify_with(generator.as_ref(), title, description).await {
                Ok(c) => {
                    debug!(category = %c.category, priority = %c.priority, "classified by model");
                    return c;
                }
                Err(e) => warn!(error = %e, "model classification failed, using keywords"),
            }
        }
        classify_keywords(title, description)
    }
}

/// Ask the model and validate its answer against the vocabularies.
pub async fn classify_with(
    generator: &dyn TextGenerator,
    title: &str,
    description: &str,
) -> Result<Classification, ClassifyError> {
    let reply = generator
        .generate(prompt::SYSTEM_PROMPT, &prompt::build_user_prompt(title, description))
        .await?;
    let verdict = prompt::parse_reply(&reply)?;

    let category: Category = verdict.category.parse()?;
    let department: Department = verdict.department.parse()?;
    let priority: Priority = verdict.priority.parse()?;
    if !verdict.confidence.is_finite() {
        return Err(ClassifyError::BadConfidence);
    }
    if department != category.department() {
        debug!(%category, %department, "model department overridden by routing table");
    }

    Ok(Classification::new(
        category,
        category.department(),
        priority,
        verdict.confidence,
        ClassificationMethod::Ai,
    ))
}

pub fn classify_keywords(title: &str, description: &str) -> Classification {
    let m = keywords::score(&format!("{title}\n{description}"));
    Classification::new(
        m.category,
        m.category.department(),
        m.priority,
        m.confidence(),
        ClassificationMethod::Keyword,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Canned(Result<&'static str, ()>);

    #[async_trait]
    impl TextGenerator for Canned {
        async fn generate(&self, _system: &str, _user: &str) -> Result<String, ClassifyError> {
            match self.0 {
                Ok(s) => Ok(s.to_string()),
                Err(()) => Err(ClassifyError::Server {
                    status: 503,
                    body: "overloaded".into(),
                }),
            }
        }
    }

    fn classifier(reply: Result<&'static str, ()>) -> Classifier {
        Classifier::with_generator(Arc::new(Canned(reply)))
    }

    const TITLE: &str = "Fire near the bus depot";
    const BODY: &str = "Emergency: smoke and flames coming from the transformer yard.";

    #[tokio::test]
    async fn model_answer_is_used() {
        let c = classifier(Ok(
            r#"```json
{"category": "electricity", "department": "electricity", "priority": "high", "confidence": 0.7}
```"#,
        ))
        .classify(TITLE, BODY)
        .await;
        assert_eq!(c.method, ClassificationMethod::Ai);
        assert_eq!(c.category, Category::Electricity);
        assert_eq!(c.priority, Priority::High);
        assert!((c.confidence - 0.7).abs() < 1e-6);
    }

    #[tokio::test]
    async fn confidence_from_model_is_clamped() {
        let c = classifier(Ok(
            r#"{"category": "roads", "department": "public_works", "priority": "low", "confidence": 3.5}"#,
        ))
        .classify("Pothole", "Pothole on the main road")
        .await;
        assert_eq!(c.method, ClassificationMethod::Ai);
        assert_eq!(c.confidence, 1.0);
    }

    #[tokio::test]
    async fn unknown_vocabulary_falls_back_to_keywords() {
        let c = classifier(Ok(
            r#"{"category": "arson", "department": "police", "priority": "critical", "confidence": 0.9}"#,
        ))
        .classify(TITLE, BODY)
        .await;
        assert_eq!(c.method, ClassificationMethod::Keyword);
        assert_eq!(c.category, Category::FireSafety);
        assert_eq!(c.department, Department::FireAndEmergency);
        assert_eq!(c.priority, Priority::Critical);
    }

    #[tokio::test]
    async fn transport_failure_falls_back_to_keywords() {
        let c = classifier(Err(())).classify(TITLE, BODY).await;
        assert_eq!(c.method, ClassificationMethod::Keyword);
        assert_eq!(c.category, Category::FireSafety);
    }

    #[tokio::test]
    async fn department_follows_category_table() {
        let c = classifier(Ok(
            r#"{"category": "drainage", "department": "health", "priority": "medium", "confidence": 0.5}"#,
        ))
        .classify("Blocked drain", "Drain blocked outside house")
        .await;
        assert_eq!(c.department, Department::PublicWorks);
    }

    #[tokio::test]
    async fn without_model_keywords_decide() {
        let c = Classifier::keyword_only()
            .classify("Garbage pile", "Garbage not collected for a week")
            .await;
        assert_eq!(c.method, ClassificationMethod::Keyword);
        assert_eq!(c.category, Category::Sanitation);
        assert!((0.0..=1.0).contains(&c.confidence));
    }

    #[test]
    fn unmatched_text_is_other_with_low_confidence() {
        let c = classify_keywords("Hello", "Nothing specific here at all");
        assert_eq!(c.category, Category::Other);
        assert_eq!(c.department, Department::GeneralAdministration);
        assert_eq!(c.priority, Priority::Medium);
        assert_eq!(c.confidence, 0.2);
    }
}
