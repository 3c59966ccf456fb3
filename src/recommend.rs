// Recommendation filter/ranker: constraint validation, affordability and
// fit filtering, and weighted top-5 ranking over the player table.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dataset::{format_currency, PlayerRecord, CM_PER_INCH};

/// How many ranked players a request returns.
pub const TOP_N: usize = 5;

// ---------------------------------------------------------------------------
// Score weights
// ---------------------------------------------------------------------------

/// Per-stat multipliers for the ranking score. The defaults are fixed
/// heuristics carried from the original product, not derived values.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoreWeights {
    pub points: f64,
    pub rebounds: f64,
    pub assists: f64,
    pub steals: f64,
    pub blocks: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        ScoreWeights {
            points: 0.5,
            rebounds: 0.25,
            assists: 0.15,
            steals: 0.05,
            blocks: 0.05,
        }
    }
}

impl ScoreWeights {
    /// The weighted score for one record.
    pub fn score(&self, p: &PlayerRecord) -> f64 {
        p.average_points * self.points
            + p.average_rebounds * self.rebounds
            + p.average_assists * self.assists
            + p.average_steals * self.steals
            + p.average_blocks * self.blocks
    }
}

// ---------------------------------------------------------------------------
// Constraints and validation
// ---------------------------------------------------------------------------

/// Validation bounds for the request fields, sourced from configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ConstraintLimits {
    pub max_budget: u64,
    pub max_height_in: u32,
    pub min_age: u32,
    pub max_age: u32,
}

impl Default for ConstraintLimits {
    fn default() -> Self {
        ConstraintLimits {
            max_budget: 1_000_000_000,
            max_height_in: 100,
            min_age: 18,
            max_age: 80,
        }
    }
}

/// Positions a request may name, as hyphen-delimited word labels.
const VALID_POSITION_QUERIES: &[&str] = &[
    "center",
    "forward",
    "guard",
    "center-forward",
    "forward-center",
    "forward-guard",
    "guard-forward",
];

/// A recommendation request as entered by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    /// Maximum affordable salary in dollars.
    pub budget: u64,
    /// Minimum height in inches.
    pub min_height_in: u32,
    /// Maximum age in years.
    pub max_age: u32,
    /// Free-text position query, hyphen-delimited, case-insensitive
    /// (e.g. "center-forward").
    pub position: String,
}

/// Per-field validation failures, keyed by field name. `BTreeMap` keeps the
/// ordering stable for display and assertions.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid recommendation request: {fields:?}")]
pub struct ValidationErrors {
    pub fields: BTreeMap<&'static str, String>,
}

impl Constraints {
    /// Validate every field against the configured limits, collecting all
    /// failures rather than stopping at the first.
    pub fn validate(&self, limits: &ConstraintLimits) -> Result<(), ValidationErrors> {
        let mut fields = BTreeMap::new();

        if self.budget < 1 || self.budget > limits.max_budget {
            fields.insert(
                "budget",
                format!("must be between 1 and {}", limits.max_budget),
            );
        }
        if self.min_height_in > limits.max_height_in {
            fields.insert(
                "height",
                format!("must be between 0 and {} inches", limits.max_height_in),
            );
        }
        if self.max_age < limits.min_age || self.max_age > limits.max_age {
            fields.insert(
                "age",
                format!("must be between {} and {}", limits.min_age, limits.max_age),
            );
        }
        if !VALID_POSITION_QUERIES.contains(&normalize_query(&self.position).as_str()) {
            fields.insert(
                "position",
                "must be one of Center, Forward, Guard, Center-Forward, Forward-Center, \
                 Forward-Guard, Guard-Forward"
                    .to_string(),
            );
        }

        if fields.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors { fields })
        }
    }

    /// The query's lowercase position tokens.
    fn position_tokens(&self) -> Vec<String> {
        normalize_query(&self.position)
            .split('-')
            .map(|t| t.to_string())
            .collect()
    }
}

fn normalize_query(position: &str) -> String {
    position.trim().to_lowercase()
}

/// A record's position matches when every one of its position words appears
/// in the query token set: the record position must be a subset of the
/// queried positions. "G-F" matches "guard-forward" and "forward-guard" but
/// not "guard" alone; "G" matches "guard-forward".
fn position_matches(record: &PlayerRecord, query_tokens: &[String]) -> bool {
    record
        .position
        .tokens()
        .iter()
        .all(|t| query_tokens.iter().any(|q| q == t))
}

// ---------------------------------------------------------------------------
// Recommendation
// ---------------------------------------------------------------------------

/// One ranked recommendation. Salary is re-formatted for display here only;
/// the underlying records keep their numeric values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub full_name: String,
    pub position: String,
    pub age: u32,
    /// Height in centimeters, as stored.
    pub height: f64,
    pub average_points: f64,
    pub average_rebounds: f64,
    pub average_assists: f64,
    pub score: f64,
    /// Display salary: "$12,345,678" or "N/A".
    pub salary: String,
}

/// Filter the dataset by the validated constraints and return the top
/// scorers in descending order. Ties keep dataset order (stable sort).
pub fn recommend(
    players: &[PlayerRecord],
    constraints: &Constraints,
    weights: &ScoreWeights,
) -> Vec<Recommendation> {
    let min_height_cm = constraints.min_height_in as f64 * CM_PER_INCH;
    let query_tokens = constraints.position_tokens();

    let mut survivors: Vec<&PlayerRecord> = players
        .iter()
        .filter(|p| {
            p.has_valid_name()
                && p.salary.is_finite()
                && p.salary <= constraints.budget as f64
                && p.height >= min_height_cm
                && p.age <= constraints.max_age
                && position_matches(p, &query_tokens)
                && p.average_points > 0.0
        })
        .collect();

    debug!(
        survivors = survivors.len(),
        budget = constraints.budget,
        "recommendation filter applied"
    );

    survivors.sort_by(|a, b| {
        weights
            .score(b)
            .partial_cmp(&weights.score(a))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    survivors
        .into_iter()
        .take(TOP_N)
        .map(|p| Recommendation {
            full_name: p.full_name.clone(),
            position: p.position.tag().to_string(),
            age: p.age,
            height: p.height,
            average_points: p.average_points,
            average_rebounds: p.average_rebounds,
            average_assists: p.average_assists,
            score: weights.score(p),
            salary: format_currency(p.salary),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
