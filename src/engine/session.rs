// Guessing-game session: the state machine that narrows candidates from
// yes/no answers until one player remains.
//
// A session owns its own candidate copies and question/answer log; nothing
// here touches shared state, so concurrent sessions are unrelated by
// construction. Exhaustion never panics: every dead end resolves to a
// terminal `GameResult`.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dataset::{Conference, PlayerRecord};
use crate::engine::question::{apply_answer, choose_split, Question};

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// No conference chosen yet.
    Intro,
    /// Iterative narrowing in progress.
    Playing,
    /// Terminal: a guess was made or the session gave up.
    Result,
}

/// One answered question, in the order it was asked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskedQuestion {
    pub text: String,
    pub answer: bool,
}

/// Terminal outcome of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameResult {
    /// The engine committed to a single player.
    Identified { full_name: String },
    /// The engine could not determine the player.
    Unresolved { reason: String },
}

/// Final-round state: direct name confirmations over the last few
/// candidates, in their original order.
#[derive(Debug, Clone)]
struct FinalRound {
    candidates: Vec<PlayerRecord>,
    index: usize,
}

// ---------------------------------------------------------------------------
// GameSession
// ---------------------------------------------------------------------------

/// A single game: candidates still consistent with the answers so far, the
/// pending question, and the running log.
#[derive(Debug)]
pub struct GameSession {
    conference: Conference,
    /// Candidates entering the final round at or below this count.
    final_round_threshold: usize,
    phase: Phase,
    candidates: Vec<PlayerRecord>,
    current_split: Option<Question>,
    final_round: Option<FinalRound>,
    asked: Vec<AskedQuestion>,
    questions_asked: usize,
    result: Option<GameResult>,
    log: Vec<String>,
}

impl GameSession {
    /// Start a game over all players in the chosen conference and compute
    /// the first question.
    pub fn start(players: &[PlayerRecord], conference: Conference, final_round_threshold: usize) -> Self {
        let candidates: Vec<PlayerRecord> = players
            .iter()
            .filter(|p| p.conference == conference)
            .cloned()
            .collect();
        info!(
            conference = conference.as_str(),
            candidates = candidates.len(),
            "starting session"
        );

        let mut session = GameSession {
            conference,
            final_round_threshold,
            phase: Phase::Playing,
            candidates,
            current_split: None,
            final_round: None,
            asked: Vec::new(),
            questions_asked: 0,
            result: None,
            log: Vec::new(),
        };
        session.note(format!(
            "Think of an active NBA player from the {}ern Conference...",
            session.conference.as_str()
        ));
        session.advance();
        session
    }

    // -- Accessors --

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn conference(&self) -> Conference {
        self.conference
    }

    pub fn candidates(&self) -> &[PlayerRecord] {
        &self.candidates
    }

    /// Whether the session is asking direct name confirmations.
    pub fn in_final_round(&self) -> bool {
        self.final_round.is_some()
    }

    /// Candidates still in play, from the user's point of view.
    pub fn remaining(&self) -> usize {
        match &self.final_round {
            Some(fr) => fr.candidates.len().saturating_sub(fr.index),
            None => self.candidates.len(),
        }
    }

    /// The question awaiting an answer, if the session is still playing.
    pub fn current_question(&self) -> Option<String> {
        if self.phase != Phase::Playing {
            return None;
        }
        if let Some(fr) = &self.final_round {
            return fr
                .candidates
                .get(fr.index)
                .map(|p| format!("Is your player {}?", p.full_name));
        }
        self.current_split.as_ref().map(|q| q.text.clone())
    }

    pub fn asked(&self) -> &[AskedQuestion] {
        &self.asked
    }

    pub fn questions_asked(&self) -> usize {
        self.questions_asked
    }

    pub fn result(&self) -> Option<&GameResult> {
        self.result.as_ref()
    }

    pub fn log(&self) -> &[String] {
        &self.log
    }

    // -- Transitions --

    /// Record the user's answer to the pending question and move the session
    /// forward. A no-op once the session has a result.
    pub fn answer(&mut self, answer: bool) {
        if self.phase != Phase::Playing {
            debug!("answer ignored: session not in playing phase");
            return;
        }
        let Some(text) = self.current_question() else {
            debug!("answer ignored: no pending question");
            return;
        };
        self.record_asked(&text, answer);

        if self.final_round.is_some() {
            self.answer_final_round(answer);
            return;
        }

        let Some(question) = self.current_split.take() else {
            return;
        };
        self.candidates = apply_answer(&self.candidates, &question.rule, answer);

        if self.candidates.len() == 1 {
            let name = self.candidates[0].full_name.clone();
            self.identify(name);
        } else {
            self.advance();
        }
    }

    /// Append an externally-asked question (remote scoring mode) to the log
    /// and counters without touching the local candidate set.
    pub fn record_remote_turn(&mut self, text: &str, answer: bool) {
        self.record_asked(text, answer);
    }

    /// Force a terminal result, used when the remote scorer commits to a
    /// guess on the session's behalf.
    pub fn resolve(&mut self, result: GameResult) {
        match &result {
            GameResult::Identified { full_name } => {
                self.note(format!("My guess is... **{full_name}**!"));
            }
            GameResult::Unresolved { reason } => {
                self.note(reason.clone());
            }
        }
        self.result = Some(result);
        self.phase = Phase::Result;
        self.current_split = None;
        self.final_round = None;
    }

    // -- Internals --

    fn record_asked(&mut self, text: &str, answer: bool) {
        self.questions_asked += 1;
        self.note(format!(
            "Q{}: {} {}",
            self.questions_asked,
            text,
            if answer { "Yes" } else { "No" }
        ));
        self.asked.push(AskedQuestion {
            text: text.to_string(),
            answer,
        });
    }

    fn note(&mut self, message: String) {
        self.log.push(message);
    }

    fn identify(&mut self, full_name: String) {
        self.resolve(GameResult::Identified { full_name });
    }

    fn fail(&mut self, reason: &str, log_line: &str) {
        self.note(log_line.to_string());
        self.result = Some(GameResult::Unresolved {
            reason: reason.to_string(),
        });
        self.phase = Phase::Result;
        self.current_split = None;
        self.final_round = None;
    }

    /// Select the next question for the current candidate set, entering the
    /// final round or a terminal state when appropriate.
    fn advance(&mut self) {
        if self.candidates.is_empty() {
            self.fail(
                "Unable to determine - no matching players",
                "No players match these criteria.",
            );
            return;
        }

        if self.candidates.len() <= self.final_round_threshold {
            let valid: Vec<PlayerRecord> = self
                .candidates
                .iter()
                .filter(|p| p.has_valid_name())
                .cloned()
                .collect();
            if valid.is_empty() {
                self.fail(
                    "Unable to determine - no valid candidate names",
                    "No valid candidate names to confirm.",
                );
                return;
            }
            debug!(candidates = valid.len(), "entering final round");
            self.final_round = Some(FinalRound {
                candidates: valid,
                index: 0,
            });
            self.current_split = None;
            return;
        }

        if self.candidates.len() == 1 {
            let name = self.candidates[0].full_name.clone();
            self.identify(name);
            return;
        }

        let rule = choose_split(&self.candidates);
        self.current_split = Some(Question::new(rule));
    }

    fn answer_final_round(&mut self, answer: bool) {
        let Some(fr) = self.final_round.as_mut() else {
            return;
        };
        if answer {
            let name = fr.candidates[fr.index].full_name.clone();
            self.identify(name);
            return;
        }

        // Advance to the next candidate with a valid name.
        let mut next = fr.index + 1;
        while next < fr.candidates.len() && !fr.candidates[next].has_valid_name() {
            next += 1;
        }
        if next < fr.candidates.len() {
            fr.index = next;
        } else {
            self.fail(
                "Unable to determine - no match in final list",
                "Reached end of candidate list without confirmation.",
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
