//! Extraction rules and the per-sample numeric extractor.
//!
//! A [`PlotSpec`] is produced once per session (synthesized or loaded from
//! disk) and compiled into an [`Extractor`]. Every rule must match for a
//! sample to count; anything less drops the sample.

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One named series: a pattern, the capture group holding the number,
/// and how to scale it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRule {
    /// Legend label for this series
    pub name: String,
    /// Regular expression isolating the numeric token
    #[serde(rename = "regex")]
    pub pattern: String,
    /// Capture group index holding the numeric token
    #[serde(default = "default_group")]
    pub group: usize,
    /// Optional unit label, used for the y axis when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Multiplier applied after parsing
    #[serde(default = "default_scale")]
    pub scale: f64,
}

fn default_group() -> usize {
    1
}

fn default_scale() -> f64 {
    1.0
}

fn default_legend() -> String {
    "Value".to_string()
}

impl ExtractionRule {
    pub fn new(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            group: default_group(),
            unit: None,
            scale: default_scale(),
        }
    }

    pub fn with_group(mut self, group: usize) -> Self {
        self.group = group;
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }
}

/// Session-wide plot description: title, ordered rules, and labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotSpec {
    pub title: String,
    pub extracts: Vec<ExtractionRule>,
    #[serde(default = "default_legend")]
    pub legend: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl PlotSpec {
    pub fn new(title: impl Into<String>, extracts: Vec<ExtractionRule>) -> Self {
        Self {
            title: title.into(),
            extracts,
            legend: default_legend(),
            unit: None,
        }
    }

    /// Series names in rule order.
    pub fn legends(&self) -> Vec<String> {
        self.extracts.iter().map(|rule| rule.name.clone()).collect()
    }

    /// Y axis unit: the first rule-level unit, else the plot-level unit.
    pub fn y_unit(&self) -> &str {
        self.extracts
            .iter()
            .find_map(|rule| rule.unit.as_deref())
            .or(self.unit.as_deref())
            .unwrap_or("")
    }
}

/// Why a sample did not yield a full set of values.
#[derive(Debug, Error, PartialEq)]
pub enum ExtractError {
    #[error("no rule matched the sample")]
    NoMatch,

    #[error("partial match; missing: {}", .missing.join(", "))]
    PartialMatch { missing: Vec<String> },

    #[error("rule '{rule}' captured '{text}', which is not a number")]
    InvalidNumber { rule: String, text: String },

    #[error("rule '{rule}' has no capture group {group}")]
    MissingGroup { rule: String, group: usize },

    #[error("invalid pattern for rule '{rule}': {message}")]
    InvalidPattern { rule: String, message: String },

    #[error("plot specification has no extraction rules")]
    NoRules,
}

struct CompiledRule {
    name: String,
    regex: Regex,
    group: usize,
    scale: f64,
}

/// Compiled form of a [`PlotSpec`]'s rules.
pub struct Extractor {
    rules: Vec<CompiledRule>,
}

impl Extractor {
    /// Compile every rule. Fails on the first bad pattern or on a group
    /// index the pattern does not have.
    pub fn new(spec: &PlotSpec) -> Result<Self, ExtractError> {
        if spec.extracts.is_empty() {
            return Err(ExtractError::NoRules);
        }

        let mut rules = Vec::with_capacity(spec.extracts.len());
        for rule in &spec.extracts {
            let regex = Regex::new(&rule.pattern).map_err(|e| ExtractError::InvalidPattern {
                rule: rule.name.clone(),
                message: e.to_string(),
            })?;
            if rule.group >= regex.captures_len() {
                return Err(ExtractError::MissingGroup {
                    rule: rule.name.clone(),
                    group: rule.group,
                });
            }
            rules.push(CompiledRule {
                name: rule.name.clone(),
                regex,
                group: rule.group,
                scale: rule.scale,
            });
        }

        Ok(Self { rules })
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Apply every rule to `sample`, returning one value per rule in order.
    pub fn extract(&self, sample: &str) -> Result<Vec<f64>, ExtractError> {
        let mut values = Vec::with_capacity(self.rules.len());
        let mut missing = Vec::new();

        for rule in &self.rules {
            let Some(captures) = rule.regex.captures(sample) else {
                missing.push(rule.name.clone());
                continue;
            };
            // An optional group that did not participate counts as a miss
            let Some(token) = captures.get(rule.group) else {
                missing.push(rule.name.clone());
                continue;
            };
            // Scaling can overflow even when the token itself is finite
            let value = parse_number(token.as_str())
                .map(|v| v * rule.scale)
                .filter(|v| v.is_finite())
                .ok_or_else(|| ExtractError::InvalidNumber {
                    rule: rule.name.clone(),
                    text: token.as_str().to_string(),
                })?;
            values.push(value);
        }

        if missing.len() == self.rules.len() {
            return Err(ExtractError::NoMatch);
        }
        if !missing.is_empty() {
            return Err(ExtractError::PartialMatch { missing });
        }
        Ok(values)
    }
}

fn parse_number(text: &str) -> Option<f64> {
    let value: f64 = text.trim().parse().ok()?;
    value.is_finite().then_some(value)
}
