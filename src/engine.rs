//! Pure rule application.
//!
//! Rules run in order and each one sees the output of the previous one.
//! Within a rule every non-overlapping occurrence of `find` is replaced,
//! scanning left to right. Nothing here touches the filesystem.

use crate::config::ReplacementRule;
use serde::Serialize;
use tracing::{debug, warn};

/// Minimum normalized Levenshtein similarity for a line to count as a near miss.
const NEAR_MISS_THRESHOLD: f64 = 0.6;

/// What a single rule did to the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RuleStatus {
    /// `find` occurred and every occurrence was replaced
    Replaced { occurrences: usize },
    /// `skip_if_applied` is set and the replacement is already present
    AlreadyApplied,
    /// `find` does not occur; the text is unchanged for this rule
    NoMatch,
}

/// The source line that most resembles an unmatched rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearMiss {
    /// 1-based line number in the text the rule was applied to
    pub line: usize,
    pub text: String,
    pub similarity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleOutcome {
    pub rule_id: String,
    #[serde(flatten)]
    pub status: RuleStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub near_miss: Option<NearMiss>,
}

impl RuleOutcome {
    pub fn occurrences(&self) -> usize {
        match self.status {
            RuleStatus::Replaced { occurrences } => occurrences,
            _ => 0,
        }
    }

    pub fn is_unmatched(&self) -> bool {
        self.status == RuleStatus::NoMatch
    }
}

/// Result of running a rule list over a text.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "Patched holds the rewritten text"]
pub struct Patched {
    pub text: String,
    pub outcomes: Vec<RuleOutcome>,
}

impl Patched {
    pub fn unmatched(&self) -> impl Iterator<Item = &RuleOutcome> {
        self.outcomes.iter().filter(|o| o.is_unmatched())
    }

    pub fn total_replacements(&self) -> usize {
        self.outcomes.iter().map(RuleOutcome::occurrences).sum()
    }
}

/// Apply `rules` to `text` sequentially.
///
/// A rule whose `find` is absent is a no-op; it is logged as a warning and
/// reported as [`RuleStatus::NoMatch`], never as an error.
pub fn apply_rules(text: &str, rules: &[ReplacementRule]) -> Patched {
    let mut current = text.to_string();
    let mut outcomes = Vec::with_capacity(rules.len());

    for rule in rules {
        let status = apply_rule(&mut current, rule);

        let near_miss = match status {
            RuleStatus::NoMatch => {
                let hint = near_miss(&current, &rule.find);
                match &hint {
                    Some(hint) => warn!(
                        rule = %rule.id,
                        line = hint.line,
                        similarity = hint.similarity,
                        "rule matched nothing; closest line differs"
                    ),
                    None => warn!(rule = %rule.id, "rule matched nothing"),
                }
                hint
            }
            RuleStatus::AlreadyApplied => {
                debug!(rule = %rule.id, "replacement already present, skipping");
                None
            }
            RuleStatus::Replaced { occurrences } => {
                debug!(rule = %rule.id, occurrences, "replaced");
                None
            }
        };

        outcomes.push(RuleOutcome {
            rule_id: rule.id.clone(),
            status,
            near_miss,
        });
    }

    Patched {
        text: current,
        outcomes,
    }
}

/// Report what `rules` would do to `text` without keeping the result.
pub fn count_matches(text: &str, rules: &[ReplacementRule]) -> Vec<RuleOutcome> {
    apply_rules(text, rules).outcomes
}

fn apply_rule(text: &mut String, rule: &ReplacementRule) -> RuleStatus {
    // An empty needle matches between every char; treat it as absent.
    if rule.find.is_empty() {
        return RuleStatus::NoMatch;
    }

    if rule.skip_if_applied && !rule.replace.is_empty() && text.contains(&rule.replace) {
        return RuleStatus::AlreadyApplied;
    }

    let occurrences = text.matches(rule.find.as_str()).count();
    if occurrences == 0 {
        return RuleStatus::NoMatch;
    }

    *text = text.replace(&rule.find, &rule.replace);
    RuleStatus::Replaced { occurrences }
}

/// Find the line of `text` closest to the first non-blank line of `find`.
fn near_miss(text: &str, find: &str) -> Option<NearMiss> {
    let needle = find.lines().map(str::trim).find(|l| !l.is_empty())?;

    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            let similarity = strsim::normalized_levenshtein(needle, line.trim());
            (idx, line, similarity)
        })
        .filter(|(_, _, similarity)| *similarity >= NEAR_MISS_THRESHOLD)
        .max_by(|a, b| a.2.total_cmp(&b.2))
        .map(|(idx, line, similarity)| NearMiss {
            line: idx + 1,
            text: line.to_string(),
            similarity,
        })
}
