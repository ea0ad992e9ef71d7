use crate::query::{Identifier, Rule, Traversal};
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Deserialize, Default, Clone)]
pub struct RuleSetConfig {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,
}

impl RuleSetConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.rules.is_empty() {
            issues.push(ValidationIssue::EmptyRuleList);
        }

        let mut seen = HashSet::new();
        for rule in &self.rules {
            let name = (!rule.name.trim().is_empty()).then(|| rule.name.clone());
            match &name {
                None => issues.push(ValidationIssue::MissingField {
                    rule_name: None,
                    field: "name",
                }),
                Some(name) => {
                    if !seen.insert(name.clone()) {
                        issues.push(ValidationIssue::DuplicateName { name: name.clone() });
                    }
                }
            }

            let shape = match (&rule.rule, rule.predicates.is_empty()) {
                (None, true) => Some(ValidationIssue::MissingField {
                    rule_name: name.clone(),
                    field: "rule",
                }),
                (Some(_), false) => Some(ValidationIssue::InvalidCombo {
                    rule_name: name.clone(),
                    message: "use either `rule` or `predicates`, not both".to_string(),
                }),
                _ => None,
            };
            if let Some(issue) = shape {
                issues.push(issue);
                continue;
            }

            if let Err(message) = rule.compile() {
                issues.push(ValidationIssue::InvalidRule {
                    rule_name: name,
                    message,
                });
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Also search documents embedded through frames.
    #[serde(default)]
    pub include_frames: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RuleDefinition {
    #[serde(default)]
    pub name: String,
    /// Rule text, `prop=value;prop=value`.
    #[serde(default)]
    pub rule: Option<String>,
    /// Structured alternative to `rule`, one table per predicate.
    #[serde(default)]
    pub predicates: Vec<PredicateDefinition>,
    #[serde(default)]
    pub mode: Mode,
}

impl RuleDefinition {
    /// Compile the definition into a [`Rule`].
    pub fn compile(&self) -> Result<Rule, String> {
        match &self.rule {
            Some(text) => text.parse::<Rule>().map_err(|e| e.to_string()),
            None => {
                let identifiers = self
                    .predicates
                    .iter()
                    .map(|p| Identifier::new(p.property.as_str(), p.value.as_str()))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| e.to_string())?;
                if identifiers.is_empty() {
                    return Err("rule has no predicates".to_string());
                }
                Ok(Rule::new(identifiers))
            }
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PredicateDefinition {
    pub property: String,
    pub value: String,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// Outermost match per branch.
    #[default]
    First,
    /// Every match, nested ones included.
    All,
    /// Only the reduced search roots.
    Roots,
}

impl Mode {
    pub fn traversal(self) -> Option<Traversal> {
        match self {
            Mode::First => Some(Traversal::FirstMatch),
            Mode::All => Some(Traversal::AllMatches),
            Mode::Roots => None,
        }
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
        rule_name: Option<String>,
        field: &'static str,
    },
    DuplicateName {
        name: String,
    },
    InvalidCombo {
        rule_name: Option<String>,
        message: String,
    },
    InvalidRule {
        rule_name: Option<String>,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyRuleList => write!(f, "rule set contains no rules"),
            ValidationIssue::MissingField { rule_name, field } => match rule_name {
                Some(name) => write!(f, "rule '{name}' missing required field '{field}'"),
                None => write!(f, "rule missing required field '{field}'"),
            },
            ValidationIssue::DuplicateName { name } => {
                write!(f, "rule name '{name}' is used more than once")
            }
            ValidationIssue::InvalidCombo { rule_name, message } => match rule_name {
                Some(name) => write!(f, "rule '{name}' has invalid configuration: {message}"),
                None => write!(f, "invalid rule configuration: {message}"),
            },
            ValidationIssue::InvalidRule { rule_name, message } => match rule_name {
                Some(name) => write!(f, "rule '{name}' does not compile: {message}"),
                None => write!(f, "rule does not compile: {message}"),
            },
        }
    }
}
