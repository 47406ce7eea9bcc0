use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;

/// A named, ordered list of replacement rules.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct RuleSet {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub rules: Vec<ReplacementRule>,
}

impl RuleSet {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.rules.is_empty() {
            issues.push(ValidationIssue::EmptyRuleList);
        }

        let mut seen = HashSet::new();
        for rule in &self.rules {
            let rule_id = if rule.id.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    rule_id: None,
                    field: "id",
                });
                None
            } else {
                if !seen.insert(rule.id.as_str()) {
                    issues.push(ValidationIssue::DuplicateId {
                        rule_id: rule.id.clone(),
                    });
                }
                Some(rule.id.clone())
            };

            // Whitespace is a legitimate literal, so only the empty string is rejected.
            if rule.find.is_empty() {
                issues.push(ValidationIssue::MissingField {
                    rule_id: rule_id.clone(),
                    field: "find",
                });
            }

            if rule.skip_if_applied && rule.replace.is_empty() {
                issues.push(ValidationIssue::InvalidCombo {
                    rule_id,
                    message: "skip_if_applied requires a non-empty replace".to_string(),
                });
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    /// Display name, falling back to a placeholder for anonymous sets.
    pub fn name(&self) -> &str {
        if self.meta.name.trim().is_empty() {
            "<unnamed>"
        } else {
            &self.meta.name
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Default target file when none is given on the command line.
    #[serde(default)]
    pub target: Option<String>,
}

/// A literal `(find, replace)` pair.
///
/// `find` is matched as an exact substring; there is no regex or template
/// expansion on either side.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ReplacementRule {
    pub id: String,
    pub find: String,
    /// An empty replacement deletes every occurrence of `find`.
    #[serde(default)]
    pub replace: String,
    /// Leave the text alone when it already contains `replace`.
    ///
    /// Needed for rules whose replacement still contains the match (pure
    /// insertions), which would otherwise stack on every run.
    #[serde(default)]
    pub skip_if_applied: bool,
}

impl ReplacementRule {
    pub fn new(
        id: impl Into<String>,
        find: impl Into<String>,
        replace: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            find: find.into(),
            replace: replace.into(),
            skip_if_applied: false,
        }
    }

    pub fn skip_if_applied(mut self, skip: bool) -> Self {
        self.skip_if_applied = skip;
        self
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone)]
pub enum ValidationIssue {
    EmptyRuleList,
    MissingField {
        rule_id: Option<String>,
        field: &'static str,
    },
    DuplicateId {
        rule_id: String,
    },
    InvalidCombo {
        rule_id: Option<String>,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyRuleList => write!(f, "rule set contains no rules"),
            ValidationIssue::MissingField { rule_id, field } => match rule_id {
                Some(id) => write!(f, "rule '{id}' missing required field '{field}'"),
                None => write!(f, "rule missing required field '{field}'"),
            },
            ValidationIssue::DuplicateId { rule_id } => {
                write!(f, "rule id '{rule_id}' is used more than once")
            }
            ValidationIssue::InvalidCombo { rule_id, message } => match rule_id {
                Some(id) => write!(f, "rule '{id}' has invalid configuration: {message}"),
                None => write!(f, "invalid rule configuration: {message}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule_set(rules: Vec<ReplacementRule>) -> RuleSet {
        RuleSet {
            meta: Metadata::default(),
            rules,
        }
    }

    #[test]
    fn test_validate_ok() {
        let set = rule_set(vec![ReplacementRule::new("one", "a", "b")]);
        assert!(set.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_rule_list() {
        let err = rule_set(vec![]).validate().unwrap_err();
        assert!(matches!(
            err.issues.as_slice(),
            [ValidationIssue::EmptyRuleList]
        ));
    }

    #[test]
    fn test_validate_collects_all_issues() {
        let set = rule_set(vec![
            ReplacementRule::new("", "a", "b"),
            ReplacementRule::new("dup", "", "b"),
            ReplacementRule::new("dup", "c", "").skip_if_applied(true),
        ]);
        let err = set.validate().unwrap_err();
        assert_eq!(err.issues.len(), 4);

        let rendered = err.to_string();
        assert!(rendered.contains("rule missing required field 'id'"));
        assert!(rendered.contains("rule 'dup' missing required field 'find'"));
        assert!(rendered.contains("rule id 'dup' is used more than once"));
        assert!(rendered.contains("skip_if_applied requires a non-empty replace"));
    }

    #[test]
    fn test_whitespace_find_is_allowed() {
        let set = rule_set(vec![ReplacementRule::new("tabs", "\t", "    ")]);
        assert!(set.validate().is_ok());
    }

    #[test]
    fn test_name_fallback() {
        let mut set = rule_set(vec![]);
        assert_eq!(set.name(), "<unnamed>");
        set.meta.name = "fix".to_string();
        assert_eq!(set.name(), "fix");
    }
}
