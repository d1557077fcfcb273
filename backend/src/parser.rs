//! Validation of the vision model's raw reply into the fixed category schema.
//!
//! A reply that is not a JSON object is rejected outright. Inside a JSON
//! object, every category is recovered independently: a missing or malformed
//! entry becomes a safe default and is reported as a [`JudgmentIssue`], so the
//! resulting [`JudgmentSet`] always holds exactly one judgment per category.

use serde_json::{Map, Value};
use shared::{Category, CategoryJudgment, Rating};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Model response is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("Model response is not a JSON object")]
    NotAnObject,
}

/// One judgment per category, in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct JudgmentSet([CategoryJudgment; 8]);

impl JudgmentSet {
    #[cfg(test)]
    pub fn get(&self, category: Category) -> &CategoryJudgment {
        &self.0[category.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &CategoryJudgment> {
        self.0.iter()
    }

    pub fn into_map(self) -> BTreeMap<Category, CategoryJudgment> {
        self.0.into_iter().map(|j| (j.category, j)).collect()
    }
}

/// A per-category deviation that was repaired locally.
#[derive(Debug, Clone, PartialEq)]
pub enum JudgmentIssue {
    MissingCategory(Category),
    UnrecognizedRating { category: Category, value: String },
    MissingRating(Category),
    InvalidConfidence { category: Category, value: String },
    ConfidenceOutOfRange { category: Category, value: i64 },
    MissingExplanation(Category),
}

impl fmt::Display for JudgmentIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JudgmentIssue::MissingCategory(c) => write!(f, "{}: category missing", c),
            JudgmentIssue::UnrecognizedRating { category, value } => {
                write!(f, "{}: unrecognized rating '{}'", category, value)
            }
            JudgmentIssue::MissingRating(c) => write!(f, "{}: rating missing", c),
            JudgmentIssue::InvalidConfidence { category, value } => {
                write!(f, "{}: non-numeric confidence {}", category, value)
            }
            JudgmentIssue::ConfidenceOutOfRange { category, value } => {
                write!(f, "{}: confidence {} clamped", category, value)
            }
            JudgmentIssue::MissingExplanation(c) => write!(f, "{}: explanation missing", c),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParsedResponse {
    pub judgments: JudgmentSet,
    pub issues: Vec<JudgmentIssue>,
}

/// Raw fields of one category entry before validation.
#[derive(Default)]
struct RawJudgment<'a> {
    rating: Option<&'a Value>,
    confidence: Option<&'a Value>,
    explanation: Option<&'a Value>,
}

pub fn parse_response(raw: &str) -> Result<ParsedResponse, ParseError> {
    let payload = extract_json_payload(raw);
    let value: Value = serde_json::from_str(payload)?;
    let object = value.as_object().ok_or(ParseError::NotAnObject)?;

    let mut issues = Vec::new();
    let judgments = Category::ALL.map(|category| match locate(object, category) {
        Some(entry) => validate(category, entry, &mut issues),
        None => {
            issues.push(JudgmentIssue::MissingCategory(category));
            CategoryJudgment::unavailable(category)
        }
    });

    Ok(ParsedResponse {
        judgments: JudgmentSet(judgments),
        issues,
    })
}

/// Strips markdown fences and surrounding prose from the reply.
fn extract_json_payload(raw: &str) -> &str {
    let fenced = if let Some((_, rest)) = raw.split_once("```json") {
        rest.split("```").next().unwrap_or(rest)
    } else if let Some((_, rest)) = raw.split_once("```") {
        rest.split("```").next().unwrap_or(rest)
    } else {
        raw
    };
    let trimmed = fenced.trim();
    if trimmed.starts_with('{') {
        return trimmed;
    }
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}

fn key_form(key: &str) -> String {
    key.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn locate<'a>(object: &'a Map<String, Value>, category: Category) -> Option<RawJudgment<'a>> {
    let wanted = key_form(category.as_ref());
    let entry = object
        .iter()
        .find(|(k, v)| key_form(k) == wanted && !v.is_null())
        .map(|(_, v)| v);
    if let Some(entry) = entry {
        return Some(match entry {
            Value::Object(fields) => RawJudgment {
                rating: fields.get("rating"),
                confidence: fields.get("confidence"),
                explanation: fields.get("explanation"),
            },
            // A bare scalar stands for the rating.
            _ => RawJudgment {
                rating: Some(entry),
                ..RawJudgment::default()
            },
        });
    }

    let prefix = category.flat_rating_key();
    let present = |key: &str| object.get(key).filter(|v| !v.is_null());
    let flat = RawJudgment {
        rating: present(prefix),
        confidence: present(&format!("{}_confidence_score", prefix)),
        explanation: present(&format!("{}_explanation", prefix)),
    };
    if flat.rating.is_some() || flat.confidence.is_some() || flat.explanation.is_some() {
        Some(flat)
    } else {
        None
    }
}

fn validate(
    category: Category,
    raw: RawJudgment<'_>,
    issues: &mut Vec<JudgmentIssue>,
) -> CategoryJudgment {
    let mut flag = None;
    let rating_text = match raw.rating {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text.trim().to_string()),
        Some(other) => Some(other.to_string()),
    };
    let rating = match rating_text {
        Some(text) => match Rating::from_str(&text) {
            Ok(rating) => rating,
            Err(_) => {
                flag = Some(format!("rating '{}' not recognized; defaulted to medium", text));
                issues.push(JudgmentIssue::UnrecognizedRating {
                    category,
                    value: text,
                });
                Rating::Medium
            }
        },
        None => {
            issues.push(JudgmentIssue::MissingRating(category));
            flag = Some("rating missing; defaulted to medium".to_string());
            Rating::Medium
        }
    };

    let confidence = match raw.confidence {
        None | Some(Value::Null) => 0,
        Some(value) => match confidence_value(value) {
            Some(n) => {
                if !(0..=shared::MAX_CONFIDENCE as i64).contains(&n) {
                    issues.push(JudgmentIssue::ConfidenceOutOfRange { category, value: n });
                }
                n
            }
            None => {
                issues.push(JudgmentIssue::InvalidConfidence {
                    category,
                    value: value.to_string(),
                });
                0
            }
        },
    };

    let explanation = raw
        .explanation
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or("");
    if explanation.is_empty() {
        issues.push(JudgmentIssue::MissingExplanation(category));
    }
    let explanation = match (flag, explanation.is_empty()) {
        (Some(flag), true) => format!("[{}]", flag),
        (Some(flag), false) => format!("{} [{}]", explanation, flag),
        (None, _) => explanation.to_string(),
    };

    CategoryJudgment::new(category, rating, confidence, &explanation)
}

/// Accepts JSON numbers and numeric strings such as `"85"` or `"85%"`.
fn confidence_value(value: &Value) -> Option<i64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !number.is_finite() {
        return None;
    }
    Some(number.round().clamp(i64::MIN as f64, i64::MAX as f64) as i64)
}
