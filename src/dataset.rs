// Player dataset loading and normalization.
//
// Reads the merged player CSV (one row per player, header-addressed columns)
// or a JSON mapping of player-id -> attribute object. All numeric fields are
// string-typed at the source and coerced here; malformed values default to
// zero rather than failing the row.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Centimeters per inch, used for height conversions in both subsystems.
pub const CM_PER_INCH: f64 = 2.54;

// ---------------------------------------------------------------------------
// Conference
// ---------------------------------------------------------------------------

/// NBA conference, derived from the team nickname.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Conference {
    East,
    West,
}

const EAST_TEAMS: &[&str] = &[
    "Celtics", "Knicks", "Nets", "76ers", "Raptors", "Bucks", "Bulls", "Cavaliers", "Pistons",
    "Pacers", "Hawks", "Heat", "Hornets", "Magic", "Wizards",
];

const WEST_TEAMS: &[&str] = &[
    "Lakers", "Clippers", "Warriors", "Kings", "Suns", "Mavericks", "Spurs", "Rockets",
    "Grizzlies", "Pelicans", "Thunder", "Trail Blazers", "Timberwolves", "Nuggets", "Jazz",
];

impl Conference {
    /// Map a team nickname to its conference. Unknown or empty teams (free
    /// agents, historical franchises) land in the East.
    pub fn for_team(team: &str) -> Self {
        if WEST_TEAMS.contains(&team) {
            Conference::West
        } else {
            if !EAST_TEAMS.contains(&team) {
                warn!("unknown team '{}', assigning East", team);
            }
            Conference::East
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Conference::East => "East",
            Conference::West => "West",
        }
    }
}

impl std::str::FromStr for Conference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "east" | "eastern" => Ok(Conference::East),
            "west" | "western" => Ok(Conference::West),
            other => Err(format!("unknown conference '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// Canonical player position after normalization. Hybrid positions are
/// distinct variants, not sets; matching semantics live with the callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    Guard,
    Forward,
    Center,
    GuardForward,
    ForwardCenter,
}

impl Position {
    /// All canonical positions, in the order the elimination engine
    /// evaluates them.
    pub const ALL: [Position; 5] = [
        Position::Guard,
        Position::Forward,
        Position::Center,
        Position::GuardForward,
        Position::ForwardCenter,
    ];

    /// The canonical short tag ("G", "F", "C", "G-F", "F-C").
    pub fn tag(&self) -> &'static str {
        match self {
            Position::Guard => "G",
            Position::Forward => "F",
            Position::Center => "C",
            Position::GuardForward => "G-F",
            Position::ForwardCenter => "F-C",
        }
    }

    /// Lowercase word tokens making up this position ("G-F" -> guard,
    /// forward). Used for subset matching in the recommender.
    pub fn tokens(&self) -> &'static [&'static str] {
        match self {
            Position::Guard => &["guard"],
            Position::Forward => &["forward"],
            Position::Center => &["center"],
            Position::GuardForward => &["guard", "forward"],
            Position::ForwardCenter => &["forward", "center"],
        }
    }

    /// Normalize a free-form position label. Accepts the canonical tags,
    /// full words ("Forward-Center"), and anything containing recognizable
    /// position words. Unrecognized values default to Forward.
    pub fn normalize(raw: &str) -> Self {
        let p = raw.trim().to_lowercase();
        match p.as_str() {
            "g" => return Position::Guard,
            "f" => return Position::Forward,
            "c" => return Position::Center,
            "g-f" => return Position::GuardForward,
            "f-c" => return Position::ForwardCenter,
            _ => {}
        }
        let guard = p.contains("guard");
        let forward = p.contains("forward");
        let center = p.contains("center");
        if guard && forward {
            Position::GuardForward
        } else if forward && center {
            Position::ForwardCenter
        } else if forward {
            Position::Forward
        } else if center {
            Position::Center
        } else if guard {
            Position::Guard
        } else {
            Position::Forward
        }
    }
}

// ---------------------------------------------------------------------------
// PlayerRecord
// ---------------------------------------------------------------------------

/// One fully-coerced player row. Records are never mutated after load; the
/// engine and recommender both work on filtered copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    /// Candidate identifier; falls back to `full_name` when the source has
    /// no id column.
    pub id: String,
    pub full_name: String,
    pub team: String,
    pub conference: Conference,
    pub position: Position,
    /// Height in centimeters.
    pub height: f64,
    /// Weight in pounds.
    pub weight: f64,
    pub age: u32,
    pub average_points: f64,
    pub average_assists: f64,
    pub average_rebounds: f64,
    pub average_steals: f64,
    pub average_blocks: f64,
    pub awards_count: u32,
    /// Salary in dollars; `f64::INFINITY` when the source value is "N/A" or
    /// unparsable, so any finite budget filter excludes it.
    pub salary: f64,
}

impl PlayerRecord {
    /// Whether the record can participate as a guessing candidate.
    pub fn has_valid_name(&self) -> bool {
        !self.full_name.trim().is_empty()
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Coercion helpers
// ---------------------------------------------------------------------------

/// Parse a numeric field, defaulting to 0.0 on any failure.
fn coerce_f64(raw: &str) -> f64 {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Parse an integer field, accepting float-formatted values ("3.0"),
/// defaulting to 0 on any failure.
fn coerce_u32(raw: &str) -> u32 {
    let v = coerce_f64(raw);
    if v <= 0.0 {
        0
    } else {
        v.round() as u32
    }
}

/// Parse a currency-formatted salary string. "N/A", empty, and garbage all
/// map to infinity so the value never survives a finite budget filter.
pub fn parse_currency(raw: &str) -> f64 {
    let clean: String = raw.split_whitespace().collect();
    if clean.is_empty() || clean.eq_ignore_ascii_case("n/a") {
        return f64::INFINITY;
    }
    let numeric: String = clean
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    numeric
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(f64::INFINITY)
}

/// Format a salary for display: "$12,345,678", or "N/A" for the infinity
/// sentinel.
pub fn format_currency(amount: f64) -> String {
    if !amount.is_finite() {
        return "N/A".to_string();
    }
    let whole = amount.round().max(0.0) as u64;
    let digits = whole.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    out.push('$');
    let offset = digits.len() % 3;
    for (i, c) in digits.chars().enumerate() {
        if i != 0 && (i + 3 - offset) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

// ---------------------------------------------------------------------------
// Raw CSV serde struct (private)
// ---------------------------------------------------------------------------

/// Raw row as it appears in the merged CSV. Every field is a string because
/// the upstream export writes stats and salary as text; coercion happens in
/// `into_record`. Extra columns are absorbed via `#[serde(flatten)]`.
#[derive(Debug, Deserialize)]
struct RawPlayerRow {
    #[serde(default)]
    id: String,
    #[serde(default)]
    full_name: String,
    #[serde(default)]
    team: String,
    #[serde(default)]
    position: String,
    #[serde(default)]
    height: String,
    #[serde(default)]
    weight: String,
    #[serde(default)]
    age: String,
    #[serde(default)]
    average_points: String,
    #[serde(default)]
    average_assists: String,
    #[serde(default)]
    average_rebounds: String,
    #[serde(default)]
    average_steals: String,
    #[serde(default)]
    average_blocks: String,
    #[serde(default)]
    awards_count: String,
    #[serde(default)]
    salary: String,
    /// Absorb any extra columns the upstream export includes.
    #[serde(flatten)]
    _extra: HashMap<String, serde_json::Value>,
}

impl RawPlayerRow {
    fn into_record(self, row_index: usize) -> PlayerRecord {
        let full_name = self.full_name.trim().to_string();
        let team = self.team.trim().to_string();
        let id = if self.id.trim().is_empty() {
            if full_name.is_empty() {
                row_index.to_string()
            } else {
                full_name.clone()
            }
        } else {
            self.id.trim().to_string()
        };
        PlayerRecord {
            id,
            conference: Conference::for_team(&team),
            position: Position::normalize(&self.position),
            full_name,
            team,
            height: coerce_f64(&self.height),
            weight: coerce_f64(&self.weight),
            age: coerce_u32(&self.age),
            average_points: coerce_f64(&self.average_points),
            average_assists: coerce_f64(&self.average_assists),
            average_rebounds: coerce_f64(&self.average_rebounds),
            average_steals: coerce_f64(&self.average_steals),
            average_blocks: coerce_f64(&self.average_blocks),
            awards_count: coerce_u32(&self.awards_count),
            salary: parse_currency(&self.salary),
        }
    }
}

// ---------------------------------------------------------------------------
// CSV loaders
// ---------------------------------------------------------------------------

fn load_from_reader<R: Read>(rdr: R) -> Result<Vec<PlayerRecord>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut players = Vec::new();
    for (idx, result) in reader.deserialize::<RawPlayerRow>().enumerate() {
        match result {
            Ok(raw) => players.push(raw.into_record(idx)),
            Err(e) => {
                warn!("skipping malformed player row {}: {}", idx, e);
            }
        }
    }
    Ok(players)
}

/// Load the player dataset from a file, CSV or JSON by extension.
pub fn load_players(path: &Path) -> Result<Vec<PlayerRecord>, DatasetError> {
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let players = if is_json {
        let text = std::fs::read_to_string(path).map_err(|e| DatasetError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        load_players_from_json(&text)?
    } else {
        let file = std::fs::File::open(path).map_err(|e| DatasetError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        load_from_reader(file).map_err(|e| DatasetError::Csv {
            path: path.display().to_string(),
            source: e,
        })?
    };

    if players.is_empty() {
        return Err(DatasetError::Validation(format!(
            "player table {} produced zero rows",
            path.display()
        )));
    }
    Ok(players)
}

/// Load the player dataset from CSV text. Exposed for testing and for
/// callers that fetch the resource themselves.
pub fn load_players_from_csv(text: &str) -> Result<Vec<PlayerRecord>, DatasetError> {
    load_from_reader(text.as_bytes()).map_err(|e| DatasetError::Csv {
        path: "<inline>".to_string(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// JSON map loader
// ---------------------------------------------------------------------------

fn json_str(obj: &serde_json::Map<String, Value>, key: &str) -> String {
    match obj.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Load players from a JSON mapping of player-id -> attribute object, the
/// shape returned by the upstream data-fetch collaborator. Field values may
/// be strings or numbers; non-object entries are skipped.
pub fn load_players_from_json(text: &str) -> Result<Vec<PlayerRecord>, DatasetError> {
    let root: Value = serde_json::from_str(text)?;
    let Some(map) = root.as_object() else {
        return Err(DatasetError::Validation(
            "expected a JSON object of player-id -> record".into(),
        ));
    };

    let mut players = Vec::new();
    for (idx, (key, entry)) in map.iter().enumerate() {
        let Some(obj) = entry.as_object() else {
            warn!("skipping non-object entry '{}' in player JSON", key);
            continue;
        };
        let raw = RawPlayerRow {
            id: {
                let explicit = json_str(obj, "id");
                if explicit.is_empty() {
                    key.clone()
                } else {
                    explicit
                }
            },
            full_name: json_str(obj, "full_name"),
            team: json_str(obj, "team"),
            position: json_str(obj, "position"),
            height: json_str(obj, "height"),
            weight: json_str(obj, "weight"),
            age: json_str(obj, "age"),
            average_points: json_str(obj, "average_points"),
            average_assists: json_str(obj, "average_assists"),
            average_rebounds: json_str(obj, "average_rebounds"),
            average_steals: json_str(obj, "average_steals"),
            average_blocks: json_str(obj, "average_blocks"),
            awards_count: json_str(obj, "awards_count"),
            salary: json_str(obj, "salary"),
            _extra: HashMap::new(),
        };
        players.push(raw.into_record(idx));
    }
    Ok(players)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
