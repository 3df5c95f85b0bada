use crate::models::grid_position::GridPosition;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Snaps windows of matching applications to a grid position when they launch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppRule {
    pub id: Uuid,
    /// Application name or glob pattern (`*` and `?` supported)
    pub application_pattern: String,
    pub position: GridPosition,
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppRuleError {
    #[error("Application pattern cannot be empty")]
    EmptyPattern,
    #[error("Invalid application pattern '{0}': {1}")]
    InvalidPattern(String, String),
}

impl AppRule {
    pub fn new(
        application_pattern: impl Into<String>,
        position: GridPosition,
    ) -> Result<Self, AppRuleError> {
        let rule = AppRule {
            id: Uuid::new_v4(),
            application_pattern: application_pattern.into(),
            position,
            enabled: true,
            last_used: None,
        };

        rule.validate()?;
        Ok(rule)
    }

    pub fn validate(&self) -> Result<(), AppRuleError> {
        if self.application_pattern.trim().is_empty() {
            return Err(AppRuleError::EmptyPattern);
        }

        glob_regex(&self.application_pattern)
            .map(|_| ())
            .map_err(|e| AppRuleError::InvalidPattern(self.application_pattern.clone(), e.to_string()))
    }

    /// Case-insensitive match of the application name against the pattern
    pub fn matches(&self, application_name: &str) -> bool {
        if !self.application_pattern.contains(['*', '?']) {
            return self
                .application_pattern
                .eq_ignore_ascii_case(application_name);
        }

        glob_regex(&self.application_pattern)
            .map(|regex| regex.is_match(application_name))
            .unwrap_or(false)
    }

    pub fn with_last_used(self, when: DateTime<Utc>) -> Self {
        Self {
            last_used: Some(when),
            ..self
        }
    }

    pub fn with_enabled(self, enabled: bool) -> Self {
        Self { enabled, ..self }
    }

    pub fn with_position(self, position: GridPosition) -> Self {
        Self { position, ..self }
    }
}

fn glob_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let escaped = regex::escape(pattern)
        .replace("\\*", ".*")
        .replace("\\?", ".");
    Regex::new(&format!("(?i)^{escaped}$"))
}

/// Ordered collection of rules; the first enabled match wins
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleBook {
    pub rules: Vec<AppRule>,
}

impl RuleBook {
    pub fn new(rules: Vec<AppRule>) -> Self {
        Self { rules }
    }

    pub fn position_for(&self, application_name: &str) -> Option<&AppRule> {
        self.rules
            .iter()
            .find(|rule| rule.enabled && rule.matches(application_name))
    }

    pub fn upsert(&mut self, rule: AppRule) {
        match self.rules.iter_mut().find(|existing| existing.id == rule.id) {
            Some(existing) => *existing = rule,
            None => self.rules.push(rule),
        }
    }

    pub fn remove(&mut self, id: Uuid) -> bool {
        let before = self.rules.len();
        self.rules.retain(|rule| rule.id != id);
        self.rules.len() != before
    }

    /// Replace the matching rule with a copy stamped as used
    pub fn mark_used(&mut self, id: Uuid, when: DateTime<Utc>) {
        if let Some(rule) = self.rules.iter_mut().find(|rule| rule.id == id) {
            *rule = rule.clone().with_last_used(when);
        }
    }
}
