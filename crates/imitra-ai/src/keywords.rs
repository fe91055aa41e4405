//! Keyword tables and scoring for the offline classifier.
//!
//! Single words match whole tokens of the lower-cased text; entries containing
//! a space are phrases and match as substrings, weighing double.

use std::collections::HashSet;

use imitra_core::{Category, Priority};

/// Per-category keyword lists, in [`Category::ALL`] order.
pub const CATEGORY_KEYWORDS: &[(Category, &[&str])] = &[
    (
        Category::Roads,
        &[
            "road", "roads", "pothole", "potholes", "highway", "footpath", "pavement",
            "asphalt", "tar", "traffic", "divider", "speed breaker", "road damage",
            "broken road",
        ],
    ),
    (
        Category::WaterSupply,
        &[
            "water", "pipeline", "tap", "taps", "leak", "leakage", "tanker", "borewell",
            "contaminated", "muddy", "no water", "water supply", "low pressure",
            "pipe burst",
        ],
    ),
    (
        Category::Electricity,
        &[
            "electricity", "power", "outage", "transformer", "voltage", "wire", "wires",
            "electric", "meter", "shock", "power cut", "live wire", "no power",
        ],
    ),
    (
        Category::StreetLighting,
        &[
            "streetlight", "streetlights", "lamp", "lamps", "bulb", "dark", "darkness",
            "street light", "street lights", "lamp post",
        ],
    ),
    (
        Category::Sanitation,
        &[
            "garbage", "trash", "waste", "litter", "dump", "dustbin", "sweeping",
            "toilet", "stink", "smell", "garbage collection", "not collected",
        ],
    ),
    (
        Category::Drainage,
        &[
            "drain", "drains", "drainage", "sewage", "sewer", "manhole", "overflow",
            "overflowing", "waterlogging", "clogged", "flooding", "blocked drain",
            "open drain",
        ],
    ),
    (
        Category::FireSafety,
        &[
            "fire", "smoke", "burning", "blaze", "flames", "emergency", "extinguisher",
            "explosion", "fire hazard", "short circuit", "gas leak",
        ],
    ),
    (
        Category::PublicHealth,
        &[
            "mosquito", "mosquitoes", "dengue", "malaria", "disease", "health",
            "hospital", "clinic", "infection", "epidemic", "rats", "stray",
            "stagnant water", "food poisoning",
        ],
    ),
    (
        Category::Parks,
        &[
            "park", "parks", "garden", "tree", "trees", "playground", "grass", "bench",
            "benches", "branches", "fallen tree", "tree cutting",
        ],
    ),
];

/// Checked in this order; the first list with a hit decides.
pub const PRIORITY_KEYWORDS: &[(Priority, &[&str])] = &[
    (
        Priority::Critical,
        &[
            "fire", "emergency", "explosion", "collapse", "collapsed", "electrocution",
            "death", "dying", "danger", "live wire", "gas leak", "life threatening",
        ],
    ),
    (
        Priority::High,
        &[
            "urgent", "urgently", "accident", "injury", "injured", "hazard", "outage",
            "sewage", "overflowing", "flooding", "no water", "no power", "children",
        ],
    ),
    (
        Priority::Low,
        &[
            "minor", "suggestion", "cosmetic", "request", "small", "when possible",
            "not urgent",
        ],
    ),
];

/// Outcome of scoring a text against the keyword tables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeywordMatch {
    pub category: Category,
    pub priority: Priority,
    /// Weighted hit count of the winning category; 0 means no category matched.
    pub score: u32,
}

impl KeywordMatch {
    pub fn confidence(&self) -> f32 {
        if self.score == 0 {
            0.2
        } else {
            (0.4 + 0.1 * self.score as f32).min(0.9)
        }
    }
}

struct Text {
    lower: String,
    tokens: HashSet<String>,
}

impl Text {
    fn new(text: &str) -> Self {
        let lower = text.to_lowercase();
        let tokens = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        Self { lower, tokens }
    }

    fn hits(&self, keywords: &[&str]) -> u32 {
        keywords
            .iter()
            .map(|k| {
                if k.contains(' ') {
                    if self.lower.contains(k) { 2 } else { 0 }
                } else if self.tokens.contains(*k) {
                    1
                } else {
                    0
                }
            })
            .sum()
    }
}

/// Score `text` and pick the best category and a priority.
pub fn score(text: &str) -> KeywordMatch {
    let text = Text::new(text);

    let mut category = Category::Other;
    let mut best = 0;
    for (candidate, keywords) in CATEGORY_KEYWORDS {
        let hits = text.hits(keywords);
        if hits > best {
            best = hits;
            category = *candidate;
        }
    }

    let priority = PRIORITY_KEYWORDS
        .iter()
        .find(|(_, keywords)| text.hits(keywords) > 0)
        .map(|(p, _)| *p)
        .unwrap_or(Priority::Medium);

    KeywordMatch {
        category,
        priority,
        score: best,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_follow_category_order() {
        let order: Vec<Category> = CATEGORY_KEYWORDS.iter().map(|(c, _)| *c).collect();
        assert_eq!(order, Category::ALL[..Category::ALL.len() - 1].to_vec());
    }

    #[test]
    fn fire_emergency_is_critical_fire_safety() {
        let m = score("Fire in the market, emergency services needed");
        assert_eq!(m.category, Category::FireSafety);
        assert_eq!(m.priority, Priority::Critical);
        assert_eq!(m.score, 2);
    }

    #[test]
    fn words_match_whole_tokens_only() {
        // "tarmac" must not count as "tar", "powerful" not as "power".
        let m = score("A powerful tarmac machine was seen");
        assert_eq!(m.category, Category::Other);
        assert_eq!(m.score, 0);
        assert_eq!(m.confidence(), 0.2);
    }

    #[test]
    fn phrases_weigh_double() {
        let m = score("The street light near my house is off");
        assert_eq!(m.category, Category::StreetLighting);
        assert_eq!(m.score, 2);
    }

    #[test]
    fn ties_go_to_table_order() {
        // One hit each for roads and water supply.
        let m = score("road water");
        assert_eq!(m.category, Category::Roads);
    }

    #[test]
    fn priority_defaults_to_medium_and_low_words_lower_it() {
        assert_eq!(score("garbage on the corner").priority, Priority::Medium);
        assert_eq!(score("minor garbage on the corner").priority, Priority::Low);
        assert_eq!(score("urgent: sewage everywhere").priority, Priority::High);
    }

    #[test]
    fn confidence_is_capped() {
        let m = score("drain drainage sewage sewer manhole overflow clogged flooding");
        assert!(m.score >= 8);
        assert_eq!(m.confidence(), 0.9);
    }
}
