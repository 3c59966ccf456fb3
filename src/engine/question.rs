// Split selection: choosing the yes/no question that best bisects the
// remaining candidates.
//
// Every question is carried as a structured `SplitRule` descriptor alongside
// its rendered text, so applying an answer evaluates the descriptor's
// predicate directly and never re-parses question prose.

use serde::{Deserialize, Serialize};

use crate::dataset::{PlayerRecord, Position, CM_PER_INCH};

// ---------------------------------------------------------------------------
// Stat columns
// ---------------------------------------------------------------------------

/// Numeric player attributes eligible for threshold splits, in the fixed
/// order the selector evaluates them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatColumn {
    Age,
    Height,
    Weight,
    Points,
    Assists,
    Rebounds,
    Steals,
    Blocks,
}

impl StatColumn {
    pub const ALL: [StatColumn; 8] = [
        StatColumn::Age,
        StatColumn::Height,
        StatColumn::Weight,
        StatColumn::Points,
        StatColumn::Assists,
        StatColumn::Rebounds,
        StatColumn::Steals,
        StatColumn::Blocks,
    ];

    /// The column's value for a record.
    pub fn value(&self, p: &PlayerRecord) -> f64 {
        match self {
            StatColumn::Age => p.age as f64,
            StatColumn::Height => p.height,
            StatColumn::Weight => p.weight,
            StatColumn::Points => p.average_points,
            StatColumn::Assists => p.average_assists,
            StatColumn::Rebounds => p.average_rebounds,
            StatColumn::Steals => p.average_steals,
            StatColumn::Blocks => p.average_blocks,
        }
    }

    /// The per-game stat name used in question text, if this is an averaged
    /// stat column.
    fn stat_name(&self) -> Option<&'static str> {
        match self {
            StatColumn::Points => Some("points"),
            StatColumn::Assists => Some("assists"),
            StatColumn::Rebounds => Some("rebounds"),
            StatColumn::Steals => Some("steals"),
            StatColumn::Blocks => Some("blocks"),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// SplitRule
// ---------------------------------------------------------------------------

/// Structured descriptor of a yes/no question. The "yes" predicate is
/// `matches`; the "no" branch is its complement, so the two always partition
/// a candidate list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SplitRule {
    /// Is the player on this team?
    Team(String),
    /// Is the player exactly this (possibly hybrid) position?
    Position(Position),
    /// Has the player received any awards?
    Awards,
    /// Is the column value strictly greater than the threshold?
    Numeric { column: StatColumn, threshold: f64 },
    /// Is the player's name in this list? (degenerate fallback)
    NameList(Vec<String>),
}

impl SplitRule {
    /// The "yes" predicate.
    pub fn matches(&self, p: &PlayerRecord) -> bool {
        match self {
            SplitRule::Team(team) => p.team == *team,
            SplitRule::Position(pos) => p.position == *pos,
            SplitRule::Awards => p.awards_count > 0,
            SplitRule::Numeric { column, threshold } => column.value(p) > *threshold,
            SplitRule::NameList(names) => names.iter().any(|n| n == &p.full_name),
        }
    }

    /// Render the natural-language question for this rule.
    pub fn render(&self) -> String {
        match self {
            SplitRule::Team(team) => format!("Is your player on the {team}?"),
            SplitRule::Position(Position::Guard) => {
                "Is your player strictly a Guard (G), not a Guard-Forward hybrid?".to_string()
            }
            SplitRule::Position(Position::Forward) => {
                "Is your player strictly a Forward (F), not a hybrid position?".to_string()
            }
            SplitRule::Position(Position::Center) => {
                "Is your player strictly a Center (C), not a Forward-Center hybrid?".to_string()
            }
            SplitRule::Position(Position::GuardForward) => {
                "Is your player a Guard-Forward (G-F) hybrid?".to_string()
            }
            SplitRule::Position(Position::ForwardCenter) => {
                "Is your player a Forward-Center (F-C) hybrid?".to_string()
            }
            SplitRule::Awards => "Has your player received any awards?".to_string(),
            SplitRule::Numeric { column, threshold } => match column {
                StatColumn::Age => {
                    format!("Is your player older than {} years?", threshold.floor() as i64)
                }
                StatColumn::Height => {
                    let (feet, inches) = cm_to_imperial(*threshold);
                    format!("Is your player taller than {feet}'{inches}\"?")
                }
                StatColumn::Weight => {
                    format!("Is your player heavier than {} lbs?", threshold.floor() as i64)
                }
                stat => format!(
                    "Does your player average more than {:.1} {}?",
                    threshold,
                    stat.stat_name().unwrap_or("points"),
                ),
            },
            SplitRule::NameList(names) => {
                format!("Is your player one of these: {}?", names.join(", "))
            }
        }
    }
}

/// A selected question: the structured rule plus its rendered text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub rule: SplitRule,
    pub text: String,
}

impl Question {
    pub fn new(rule: SplitRule) -> Self {
        let text = rule.render();
        Question { rule, text }
    }
}

// ---------------------------------------------------------------------------
// Applying answers
// ---------------------------------------------------------------------------

/// Keep the candidates consistent with `answer` to the given rule.
pub fn apply_answer(candidates: &[PlayerRecord], rule: &SplitRule, answer: bool) -> Vec<PlayerRecord> {
    candidates
        .iter()
        .filter(|p| rule.matches(p) == answer)
        .cloned()
        .collect()
}

/// Split the candidates into (yes, no) branches.
pub fn partition(candidates: &[PlayerRecord], rule: &SplitRule) -> (Vec<PlayerRecord>, Vec<PlayerRecord>) {
    candidates.iter().cloned().partition(|p| rule.matches(p))
}

// ---------------------------------------------------------------------------
// Split selection
// ---------------------------------------------------------------------------

/// Absolute difference between the yes-count and no-count of a prospective
/// split; lower is a better bisection.
fn balance(yes: usize, total: usize) -> usize {
    yes.abs_diff(total - yes)
}

/// Choose the question whose yes/no split is most balanced.
///
/// Splits are evaluated in a fixed priority order (team membership, exact
/// position, awards, numeric thresholds) with strict less-than comparison, so
/// the first split to reach the best balance wins ties. The order is part of
/// the engine's observable behavior; reordering changes which questions ties
/// produce.
///
/// Falls back to enumerating the first half of the candidates by name when no
/// split improves on the initial sentinel.
pub fn choose_split(candidates: &[PlayerRecord]) -> SplitRule {
    let total = candidates.len();
    let mut best: Option<(SplitRule, usize)> = None;

    let mut consider = |rule: SplitRule, bal: usize, best: &mut Option<(SplitRule, usize)>| {
        if best.as_ref().map_or(true, |(_, b)| bal < *b) {
            *best = Some((rule, bal));
        }
    };

    // Team membership, only when more than one team is present. Distinct
    // teams keep first-appearance order so equal-balance ties resolve the
    // same way on every run.
    let mut teams: Vec<&str> = Vec::new();
    for p in candidates {
        if !teams.contains(&p.team.as_str()) {
            teams.push(&p.team);
        }
    }
    if teams.len() > 1 {
        for team in &teams {
            let yes = candidates.iter().filter(|p| p.team == *team).count();
            consider(SplitRule::Team(team.to_string()), balance(yes, total), &mut best);
        }
    }

    // Exact position membership, only for groups with at least one member.
    for pos in Position::ALL {
        let yes = candidates.iter().filter(|p| p.position == pos).count();
        if yes > 0 {
            consider(SplitRule::Position(pos), balance(yes, total), &mut best);
        }
    }

    // Awards, always evaluated.
    let yes = candidates.iter().filter(|p| p.awards_count > 0).count();
    consider(SplitRule::Awards, balance(yes, total), &mut best);

    // Numeric columns: every midpoint between adjacent distinct values.
    for column in StatColumn::ALL {
        let mut values: Vec<f64> = candidates.iter().map(|p| column.value(p)).collect();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        values.dedup();
        for pair in values.windows(2) {
            let threshold = (pair[0] + pair[1]) / 2.0;
            let yes = candidates
                .iter()
                .filter(|p| column.value(p) > threshold)
                .count();
            consider(
                SplitRule::Numeric { column, threshold },
                balance(yes, total),
                &mut best,
            );
        }
    }

    match best {
        Some((rule, _)) => rule,
        None => {
            let names: Vec<String> = candidates
                .iter()
                .take(std::cmp::max(1, total / 2))
                .map(|p| p.full_name.clone())
                .collect();
            SplitRule::NameList(names)
        }
    }
}

// ---------------------------------------------------------------------------
// Unit conversion
// ---------------------------------------------------------------------------

/// Convert centimeters to (feet, inches) for question rendering.
pub fn cm_to_imperial(cm: f64) -> (i64, i64) {
    let inches = cm / CM_PER_INCH;
    let feet = (inches / 12.0).floor() as i64;
    let remainder = (inches % 12.0).round() as i64;
    (feet, remainder)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Conference;

    fn mk(name: &str, team: &str, pos: Position) -> PlayerRecord {
        PlayerRecord {
            id: name.to_string(),
            full_name: name.to_string(),
            team: team.to_string(),
            conference: Conference::for_team(team),
            position: pos,
            height: 200.0,
            weight: 220.0,
            age: 25,
            average_points: 10.0,
            average_assists: 3.0,
            average_rebounds: 4.0,
            average_steals: 1.0,
            average_blocks: 1.0,
            awards_count: 0,
            salary: 1_000_000.0,
        }
    }

    // -- Selection priority and balance --

    #[test]
    fn team_split_wins_ties_over_position() {
        // Teams and positions both give a perfect 2/2 split; team is
        // evaluated first and strict less-than retains it.
        let cands = vec![
            mk("A", "Lakers", Position::Guard),
            mk("B", "Lakers", Position::Guard),
            mk("C", "Celtics", Position::Forward),
            mk("D", "Celtics", Position::Forward),
        ];
        let rule = choose_split(&cands);
        assert_eq!(rule, SplitRule::Team("Lakers".to_string()));
    }

    #[test]
    fn single_team_skips_team_splits() {
        let mut cands = vec![
            mk("A", "Lakers", Position::Guard),
            mk("B", "Lakers", Position::Guard),
            mk("C", "Lakers", Position::Forward),
            mk("D", "Lakers", Position::Forward),
        ];
        cands[0].awards_count = 3;
        cands[1].awards_count = 1;
        let rule = choose_split(&cands);
        // Positions split 2/2 and are evaluated before the (equally
        // balanced) awards split.
        assert_eq!(rule, SplitRule::Position(Position::Guard));
    }

    #[test]
    fn numeric_midpoint_beats_lopsided_categorical() {
        // Same team, same position, no awards: only the age column can
        // produce a balanced split.
        let mut cands = vec![
            mk("A", "Lakers", Position::Forward),
            mk("B", "Lakers", Position::Forward),
            mk("C", "Lakers", Position::Forward),
            mk("D", "Lakers", Position::Forward),
        ];
        cands[0].age = 20;
        cands[1].age = 20;
        cands[2].age = 30;
        cands[3].age = 30;
        let rule = choose_split(&cands);
        assert_eq!(
            rule,
            SplitRule::Numeric {
                column: StatColumn::Age,
                threshold: 25.0,
            }
        );
    }

    #[test]
    fn chosen_balance_never_worse_than_alternatives() {
        let mut cands = vec![
            mk("A", "Lakers", Position::Guard),
            mk("B", "Celtics", Position::Forward),
            mk("C", "Celtics", Position::Center),
            mk("D", "Suns", Position::Guard),
            mk("E", "Suns", Position::Forward),
            mk("F", "Heat", Position::Guard),
        ];
        cands[0].awards_count = 4;
        cands[3].awards_count = 1;
        cands[1].age = 31;
        cands[4].average_points = 24.5;

        let chosen = choose_split(&cands);
        let (yes, no) = partition(&cands, &chosen);
        let chosen_balance = yes.len().abs_diff(no.len());

        // Every alternative split the selector considers must be at least as
        // imbalanced as the winner.
        for team in ["Lakers", "Celtics", "Suns", "Heat"] {
            let rule = SplitRule::Team(team.to_string());
            let (y, n) = partition(&cands, &rule);
            assert!(chosen_balance <= y.len().abs_diff(n.len()));
        }
        for pos in Position::ALL {
            if cands.iter().any(|p| p.position == pos) {
                let rule = SplitRule::Position(pos);
                let (y, n) = partition(&cands, &rule);
                assert!(chosen_balance <= y.len().abs_diff(n.len()));
            }
        }
        let (y, n) = partition(&cands, &SplitRule::Awards);
        assert!(chosen_balance <= y.len().abs_diff(n.len()));
    }

    // -- Partition property --

    #[test]
    fn partition_is_disjoint_and_lossless() {
        let mut cands = vec![
            mk("A", "Lakers", Position::Guard),
            mk("B", "Celtics", Position::Forward),
            mk("C", "Suns", Position::Center),
            mk("D", "Heat", Position::GuardForward),
        ];
        cands[1].awards_count = 2;
        cands[2].average_points = 22.0;

        let rules = vec![
            SplitRule::Team("Lakers".to_string()),
            SplitRule::Position(Position::Center),
            SplitRule::Awards,
            SplitRule::Numeric {
                column: StatColumn::Points,
                threshold: 15.0,
            },
            SplitRule::NameList(vec!["A".to_string(), "C".to_string()]),
        ];

        for rule in rules {
            let (yes, no) = partition(&cands, &rule);
            assert_eq!(yes.len() + no.len(), cands.len(), "rule {rule:?}");
            for p in &yes {
                assert!(rule.matches(p));
                assert!(!no.contains(p));
            }
            for p in &no {
                assert!(!rule.matches(p));
            }
        }
    }

    #[test]
    fn apply_answer_matches_partition_branches() {
        let cands = vec![
            mk("A", "Lakers", Position::Guard),
            mk("B", "Celtics", Position::Forward),
        ];
        let rule = SplitRule::Team("Lakers".to_string());
        let (yes, no) = partition(&cands, &rule);
        assert_eq!(apply_answer(&cands, &rule, true), yes);
        assert_eq!(apply_answer(&cands, &rule, false), no);
    }

    // -- Numeric predicate uses the exact threshold --

    #[test]
    fn numeric_predicate_is_strictly_greater() {
        let mut p = mk("A", "Lakers", Position::Guard);
        p.age = 25;
        let rule = SplitRule::Numeric {
            column: StatColumn::Age,
            threshold: 25.0,
        };
        assert!(!rule.matches(&p));
        p.age = 26;
        assert!(rule.matches(&p));
    }

    // -- Rendering --

    #[test]
    fn question_phrasings() {
        assert_eq!(
            SplitRule::Team("Bulls".to_string()).render(),
            "Is your player on the Bulls?"
        );
        assert_eq!(
            SplitRule::Position(Position::Guard).render(),
            "Is your player strictly a Guard (G), not a Guard-Forward hybrid?"
        );
        assert_eq!(
            SplitRule::Position(Position::ForwardCenter).render(),
            "Is your player a Forward-Center (F-C) hybrid?"
        );
        assert_eq!(SplitRule::Awards.render(), "Has your player received any awards?");
        assert_eq!(
            SplitRule::Numeric {
                column: StatColumn::Age,
                threshold: 27.5,
            }
            .render(),
            "Is your player older than 27 years?"
        );
        assert_eq!(
            SplitRule::Numeric {
                column: StatColumn::Weight,
                threshold: 230.5,
            }
            .render(),
            "Is your player heavier than 230 lbs?"
        );
        assert_eq!(
            SplitRule::Numeric {
                column: StatColumn::Points,
                threshold: 18.25,
            }
            .render(),
            "Does your player average more than 18.2 points?"
        );
        assert_eq!(
            SplitRule::NameList(vec!["A B".to_string(), "C D".to_string()]).render(),
            "Is your player one of these: A B, C D?"
        );
    }

    #[test]
    fn height_question_renders_imperial() {
        let rule = SplitRule::Numeric {
            column: StatColumn::Height,
            threshold: 190.5,
        };
        // 190.5 cm is exactly 75 inches: 6'3".
        assert_eq!(rule.render(), "Is your player taller than 6'3\"?");
    }

    #[test]
    fn cm_to_imperial_conversion() {
        assert_eq!(cm_to_imperial(190.5), (6, 3));
        assert_eq!(cm_to_imperial(182.88), (6, 0));
    }
}
