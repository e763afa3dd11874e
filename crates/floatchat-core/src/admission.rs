//! Admission filter: decides whether a chat message may reach the model.
//!
//! Matching is plain substring containment on the lowercased message, so a
//! blocked term embedded in a longer word also blocks (`"skill"` contains
//! `"kill"`). That over-blocking is accepted behaviour.

use serde::{Deserialize, Serialize};

use crate::{
    lexicon::Lexicon,
    similarity::{similarity, tokenize},
};

pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.8;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Unsafe,
    Relevant,
    Irrelevant,
}

/// One step of the admission pipeline. Rules run in the order they are
/// declared and the first hit decides.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AdmissionRule {
    BlockedSubstring,
    TopicSubstring,
    FuzzyTopic { threshold: f64 },
}

impl AdmissionRule {
    pub fn verdict(self) -> Classification {
        match self {
            AdmissionRule::BlockedSubstring => Classification::Unsafe,
            AdmissionRule::TopicSubstring | AdmissionRule::FuzzyTopic { .. } => {
                Classification::Relevant
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RuleMatch {
    Substring {
        term: String,
    },
    Fuzzy {
        token: String,
        topic: String,
        score: f64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdmissionDecision {
    pub classification: Classification,
    pub rule: Option<AdmissionRule>,
    pub matched: Option<RuleMatch>,
}

impl AdmissionDecision {
    fn irrelevant() -> Self {
        Self {
            classification: Classification::Irrelevant,
            rule: None,
            matched: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AdmissionFilter {
    lexicon: Lexicon,
    rules: Vec<AdmissionRule>,
}

impl Default for AdmissionFilter {
    fn default() -> Self {
        Self::new(Lexicon::default(), DEFAULT_FUZZY_THRESHOLD)
    }
}

impl AdmissionFilter {
    /// Standard pipeline: blocklist, then topic substrings, then fuzzy topic
    /// matching at `fuzzy_threshold`.
    pub fn new(lexicon: Lexicon, fuzzy_threshold: f64) -> Self {
        Self::with_rules(
            lexicon,
            vec![
                AdmissionRule::BlockedSubstring,
                AdmissionRule::TopicSubstring,
                AdmissionRule::FuzzyTopic {
                    threshold: fuzzy_threshold,
                },
            ],
        )
    }

    pub fn with_rules(lexicon: Lexicon, rules: Vec<AdmissionRule>) -> Self {
        Self { lexicon, rules }
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    pub fn rules(&self) -> &[AdmissionRule] {
        &self.rules
    }

    pub fn classify(&self, message: &str) -> Classification {
        self.evaluate(message).classification
    }

    pub fn evaluate(&self, message: &str) -> AdmissionDecision {
        let lowercase = message.to_lowercase();

        for rule in &self.rules {
            if let Some(matched) = self.apply(*rule, &lowercase) {
                return AdmissionDecision {
                    classification: rule.verdict(),
                    rule: Some(*rule),
                    matched: Some(matched),
                };
            }
        }

        AdmissionDecision::irrelevant()
    }

    fn apply(&self, rule: AdmissionRule, lowercase: &str) -> Option<RuleMatch> {
        match rule {
            AdmissionRule::BlockedSubstring => {
                find_substring(self.lexicon.unsafe_terms(), lowercase)
            }
            AdmissionRule::TopicSubstring => {
                find_substring(self.lexicon.allowed_topics(), lowercase)
            }
            AdmissionRule::FuzzyTopic { threshold } => {
                find_fuzzy(self.lexicon.allowed_topics(), lowercase, threshold)
            }
        }
    }
}

fn find_substring(terms: &[String], lowercase: &str) -> Option<RuleMatch> {
    terms
        .iter()
        .find(|term| lowercase.contains(term.as_str()))
        .map(|term| RuleMatch::Substring { term: term.clone() })
}

fn find_fuzzy(topics: &[String], lowercase: &str, threshold: f64) -> Option<RuleMatch> {
    for token in tokenize(lowercase) {
        let token_len = token.chars().count();
        for topic in topics {
            // Edit distance is at least the length difference, so pairs whose
            // lengths are too far apart cannot clear the threshold.
            if length_bound(token_len, topic.chars().count()) <= threshold {
                continue;
            }
            let score = similarity(token, topic);
            if score > threshold {
                return Some(RuleMatch::Fuzzy {
                    token: token.to_owned(),
                    topic: topic.clone(),
                    score,
                });
            }
        }
    }
    None
}

/// Upper bound on `similarity` for strings of the given char lengths.
fn length_bound(a_len: usize, b_len: usize) -> f64 {
    let longest = a_len.max(b_len).max(1);
    1.0 - a_len.abs_diff(b_len) as f64 / longest as f64
}

#[cfg(test)]
mod tests {
    use crate::lexicon::{Lexicon, UNSAFE_TERMS};

    use crate::similarity::similarity;

    use super::{AdmissionFilter, AdmissionRule, Classification, RuleMatch, length_bound};

    #[test]
    fn direct_topic_match_is_relevant() {
        let filter = AdmissionFilter::default();
        assert_eq!(
            filter.classify("Tell me about coral reefs"),
            Classification::Relevant
        );
        assert_eq!(
            filter.classify("What's the weather in Paris today"),
            Classification::Relevant
        );
    }

    #[test]
    fn blocked_term_is_unsafe() {
        let filter = AdmissionFilter::default();
        assert_eq!(filter.classify("how to make a bomb"), Classification::Unsafe);
        assert_eq!(filter.classify("HOW TO MAKE A BOMB"), Classification::Unsafe);
    }

    #[test]
    fn unrelated_message_is_irrelevant() {
        let filter = AdmissionFilter::default();
        assert_eq!(
            filter.classify("Tell me a joke about cats"),
            Classification::Irrelevant
        );
    }

    #[test]
    fn misspellings_below_threshold_stay_irrelevant() {
        // whails~whale scores 0.667 and dolfins~dolphin 0.571, both under 0.8
        let filter = AdmissionFilter::default();
        assert_eq!(
            filter.classify("I love whails and dolfins"),
            Classification::Irrelevant
        );
    }

    #[test]
    fn close_misspelling_matches_fuzzily() {
        let filter = AdmissionFilter::default();
        let decision = filter.evaluate("Let's talk about glaciars");
        assert_eq!(decision.classification, Classification::Relevant);
        let Some(RuleMatch::Fuzzy { token, topic, score }) = decision.matched.clone() else {
            panic!("expected a fuzzy match, got {:?}", decision.matched);
        };
        assert_eq!(token, "glaciars");
        assert_eq!(topic, "glaciers");
        assert!((score - 0.875).abs() < 1e-9);
    }

    #[test]
    fn threshold_is_strict() {
        // ocean vs oceon: one substitution over five chars is exactly 0.8
        let lexicon = Lexicon::new(Vec::<&str>::new(), ["ocean"]);
        let filter = AdmissionFilter::new(lexicon, 0.8);
        assert_eq!(filter.classify("oceon"), Classification::Irrelevant);

        let lexicon = Lexicon::new(Vec::<&str>::new(), ["ocean"]);
        let filter = AdmissionFilter::new(lexicon, 0.79);
        assert_eq!(filter.classify("oceon"), Classification::Relevant);
    }

    #[test]
    fn empty_message_is_irrelevant() {
        let filter = AdmissionFilter::default();
        assert_eq!(filter.classify(""), Classification::Irrelevant);
        assert_eq!(filter.classify("   "), Classification::Irrelevant);
    }

    #[test]
    fn unsafe_takes_precedence_over_topics() {
        let filter = AdmissionFilter::default();
        assert_eq!(
            filter.classify("ocean pollution and violence"),
            Classification::Unsafe
        );

        let overlapping = Lexicon::new(["reef"], ["reef"]);
        let filter = AdmissionFilter::new(overlapping, 0.8);
        assert_eq!(filter.classify("the reef"), Classification::Unsafe);
    }

    #[test]
    fn every_blocked_term_wins_over_topic_words() {
        let filter = AdmissionFilter::default();
        for term in UNSAFE_TERMS {
            let message = format!("coral reef {term} ocean");
            assert_eq!(filter.classify(&message), Classification::Unsafe, "{term}");
        }
    }

    #[test]
    fn embedded_blocked_term_over_blocks() {
        let filter = AdmissionFilter::default();
        let decision = filter.evaluate("Tell me about the skill tree");
        assert_eq!(decision.classification, Classification::Unsafe);
        assert_eq!(
            decision.matched,
            Some(RuleMatch::Substring {
                term: "kill".to_owned()
            })
        );
    }

    #[test]
    fn embedded_topic_term_also_admits() {
        // "dolphins" contains the greeting topic "hi"
        let filter = AdmissionFilter::default();
        let decision = filter.evaluate("I love dolphins");
        assert_eq!(decision.classification, Classification::Relevant);
        assert_eq!(decision.rule, Some(AdmissionRule::TopicSubstring));
    }

    #[test]
    fn classification_is_deterministic() {
        let filter = AdmissionFilter::default();
        for message in ["explain photosynthesys", "cats", "crime", ""] {
            assert_eq!(filter.classify(message), filter.classify(message));
        }
    }

    #[test]
    fn custom_rule_order_changes_precedence() {
        let lexicon = Lexicon::new(["reef"], ["reef"]);
        let filter = AdmissionFilter::with_rules(
            lexicon,
            vec![AdmissionRule::TopicSubstring, AdmissionRule::BlockedSubstring],
        );
        assert_eq!(filter.classify("the reef"), Classification::Relevant);
    }

    #[test]
    fn length_bound_never_undercuts_similarity() {
        for (a, b) in [
            ("glaciars", "glaciers"),
            ("whails", "whale"),
            ("dolfins", "dolphin"),
            ("ocean", "oceanography"),
            ("", "reef"),
        ] {
            let bound = length_bound(a.chars().count(), b.chars().count());
            assert!(bound >= similarity(a, b), "{a} vs {b}");
        }
    }

    #[test]
    fn oversized_single_token_is_irrelevant() {
        let filter = AdmissionFilter::default();
        let message = "q".repeat(200_000);
        assert_eq!(filter.classify(&message), Classification::Irrelevant);
    }
}
