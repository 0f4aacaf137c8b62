//! Rating sets, their mean, and the entity-level aggregate.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::{DomainError, EntityKind};

pub const MIN_SCORE: i64 = 1;
pub const MAX_SCORE: i64 = 5;

/// A complete, validated set of sub-ratings for one entity kind.
///
/// Scores are held in the kind's category order, so every set of the same
/// kind has exactly the same shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatingSet {
    kind: EntityKind,
    scores: Vec<u8>,
}

impl RatingSet {
    /// Validates raw category scores against the categories of `kind`.
    ///
    /// Every category must be present with an integer in `1..=5`; unknown
    /// categories are rejected. All problems are collected into one error.
    pub fn new(kind: EntityKind, raw: &BTreeMap<String, i64>) -> Result<Self, DomainError> {
        let categories = kind.categories();
        let mut problems = BTreeMap::new();
        let mut scores = Vec::with_capacity(categories.len());

        for category in categories {
            match raw.get(*category) {
                Some(score) if (MIN_SCORE..=MAX_SCORE).contains(score) => {
                    scores.push(*score as u8);
                }
                Some(score) => {
                    problems.insert(
                        format!("ratings.{category}"),
                        format!("must be between {MIN_SCORE} and {MAX_SCORE}, got {score}"),
                    );
                }
                None => {
                    problems.insert(
                        format!("ratings.{category}"),
                        "rating is required".to_string(),
                    );
                }
            }
        }

        for name in raw.keys() {
            if !categories.contains(&name.as_str()) {
                problems.insert(
                    format!("ratings.{name}"),
                    format!("not a {} category", kind),
                );
            }
        }

        if problems.is_empty() {
            Ok(Self { kind, scores })
        } else {
            Err(DomainError::Validation(problems))
        }
    }

    /// Rebuilds a set from its stored JSON object.
    pub fn from_json(kind: EntityKind, value: &Value) -> Result<Self, DomainError> {
        let object = value.as_object().ok_or_else(|| {
            DomainError::CorruptRatings("ratings are not a JSON object".to_string())
        })?;

        let mut raw = BTreeMap::new();
        for (category, score) in object {
            let score = score.as_i64().ok_or_else(|| {
                DomainError::CorruptRatings(format!("rating '{category}' is not an integer"))
            })?;
            raw.insert(category.clone(), score);
        }

        Self::new(kind, &raw).map_err(|err| DomainError::CorruptRatings(err.to_string()))
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Category/score pairs in category order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u8)> + '_ {
        self.kind
            .categories()
            .iter()
            .copied()
            .zip(self.scores.iter().copied())
    }

    /// Unweighted arithmetic mean over exactly the kind's categories.
    pub fn average(&self) -> f64 {
        mean(&self.scores)
    }

    pub fn to_json(&self) -> Value {
        let object: Map<String, Value> = self
            .iter()
            .map(|(category, score)| (category.to_string(), Value::from(score)))
            .collect();
        Value::Object(object)
    }
}

pub fn mean(scores: &[u8]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    let total: u32 = scores.iter().map(|score| u32::from(*score)).sum();
    f64::from(total) / scores.len() as f64
}

/// Entity aggregate over the averages of its approved reviews.
///
/// Returns `(overall_rating, total_reviews)`; the rating is rounded to two
/// decimals and is `0.0` when nothing is approved.
pub fn aggregate(approved_averages: &[f64]) -> (f64, i32) {
    if approved_averages.is_empty() {
        return (0.0, 0);
    }
    let sum: f64 = approved_averages.iter().sum();
    let overall = sum / approved_averages.len() as f64;
    (round2(overall), approved_averages.len() as i32)
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
