//! Prompt construction and reply parsing for LLM classification.

use serde::Deserialize;

use crate::classifier::ClassifyError;

/// System prompt listing the closed vocabularies the model must answer in.
pub const SYSTEM_PROMPT: &str = r#"You route citizen complaints for a municipal grievance desk.

Read the complaint and answer with a single JSON object, no prose:
{"category": "...", "department": "...", "priority": "...", "confidence": 0.0, "reasoning": "..."}

category is one of:
  roads, water_supply, electricity, street_lighting, sanitation, drainage,
  fire_safety, public_health, parks, other

department is one of:
  public_works, water_supply, electricity, sanitation, fire_and_emergency,
  health, horticulture, general_administration

priority is one of:
  critical  - risk to life or property right now (fire, live wires, collapse)
  high      - service outage or health hazard affecting many people
  medium    - ordinary service failure
  low       - cosmetic issues and suggestions

confidence is a number between 0 and 1.
reasoning is one short sentence."#;

pub fn build_user_prompt(title: &str, description: &str) -> String {
    format!("Title: {}\n\nDescription:\n{}", title.trim(), description.trim())
}

/// The model's answer, still as raw vocabulary strings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Verdict {
    pub category: String,
    pub department: String,
    pub priority: String,
    pub confidence: f32,
    #[serde(default)]
    pub reasoning: Option<String>,
}

/// Remove a surrounding markdown code fence (```json ... ```), if any.
pub fn strip_fences(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (`json`) up to the first newline.
    let body = rest.split_once('\n').map(|(_, b)| b).unwrap_or(rest);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

pub fn parse_reply(reply: &str) -> Result<Verdict, ClassifyError> {
    let json = strip_fences(reply);
    if json.is_empty() {
        return Err(ClassifyError::EmptyReply);
    }
    Ok(serde_json::from_str(json)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_fence() {
        let reply = "```json\n{\"category\": \"roads\"}\n```";
        assert_eq!(strip_fences(reply), "{\"category\": \"roads\"}");
        assert_eq!(strip_fences("  {\"a\": 1}  "), "{\"a\": 1}");
        assert_eq!(strip_fences("```\n{}\n```"), "{}");
    }

    #[test]
    fn parses_fenced_reply() {
        let reply = r#"```json
{"category": "drainage", "department": "public_works", "priority": "high", "confidence": 0.82, "reasoning": "blocked drain"}
```"#;
        let v = parse_reply(reply).unwrap();
        assert_eq!(v.category, "drainage");
        assert_eq!(v.priority, "high");
        assert_eq!(v.reasoning.as_deref(), Some("blocked drain"));
    }

    #[test]
    fn rejects_prose_and_empty() {
        assert!(matches!(
            parse_reply("I think this is about roads."),
            Err(ClassifyError::Json(_))
        ));
        assert!(matches!(parse_reply("``` ```"), Err(ClassifyError::EmptyReply)));
    }

    #[test]
    fn user_prompt_carries_both_fields() {
        let p = build_user_prompt(" Pothole ", "Deep pothole near school.\n");
        assert!(p.starts_with("Title: Pothole\n"));
        assert!(p.ends_with("Deep pothole near school."));
    }
}
