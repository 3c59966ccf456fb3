// Application state and orchestration logic.
//
// Owns the loaded player table, the remote scoring client, and the current
// game session. The front end talks to `App` only; remote-versus-local
// question selection is decided here so the engine stays transport-free.

use tracing::{info, warn};

use crate::config::Config;
use crate::dataset::{Conference, PlayerRecord};
use crate::engine::session::{GameResult, GameSession, Phase};
use crate::recommend::{recommend, Constraints, Recommendation, ValidationErrors};
use crate::remote::{QaPair, RemoteScorer};

// ---------------------------------------------------------------------------
// GameState
// ---------------------------------------------------------------------------

/// A session plus the remote-mode bookkeeping layered on top of it.
pub struct GameState {
    pub session: GameSession,
    /// Question handed down by the remote scorer, when it is driving.
    remote_question: Option<String>,
    /// Remaining-candidate count last reported by the remote scorer.
    remote_remaining: usize,
    /// Ids of the conference candidates, sent with every remote request.
    candidate_ids: Vec<String>,
}

impl GameState {
    fn local(session: GameSession) -> Self {
        let candidate_ids = session.candidates().iter().map(|p| p.id.clone()).collect();
        GameState {
            session,
            remote_question: None,
            remote_remaining: 0,
            candidate_ids,
        }
    }

    fn wire_history(&self) -> Vec<QaPair> {
        self.session
            .asked()
            .iter()
            .map(|qa| QaPair {
                question: qa.text.clone(),
                answer: qa.answer,
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

/// The complete application state.
pub struct App {
    pub config: Config,
    pub players: Vec<PlayerRecord>,
    pub remote: RemoteScorer,
    pub game: Option<GameState>,
}

impl App {
    pub fn new(config: Config, players: Vec<PlayerRecord>, remote: RemoteScorer) -> Self {
        App {
            config,
            players,
            remote,
            game: None,
        }
    }

    /// Start a new game for the chosen conference. When a remote scorer is
    /// configured it picks the questions; any failure downgrades to local
    /// selection for the rest of the process lifetime.
    pub async fn start_game(&mut self, conference: Conference) {
        let session = GameSession::start(
            &self.players,
            conference,
            self.config.game.final_round_threshold,
        );
        let mut state = GameState::local(session);

        if state.session.phase() == Phase::Playing && self.remote.is_active() {
            match self.remote.next_question(&[], &state.candidate_ids).await {
                Ok(reply) => {
                    info!(remaining = reply.remaining, "remote scorer driving session");
                    state.remote_remaining = reply.remaining;
                    state.remote_question = Some(reply.question);
                }
                Err(e) => {
                    warn!("remote scorer unavailable, using local questions: {e}");
                    self.remote = RemoteScorer::Disabled;
                }
            }
        }

        self.game = Some(state);
    }

    /// The question awaiting an answer, if a game is in progress.
    pub fn current_question(&self) -> Option<String> {
        let state = self.game.as_ref()?;
        state
            .remote_question
            .clone()
            .or_else(|| state.session.current_question())
    }

    /// Record the user's answer and advance the game.
    pub async fn answer(&mut self, answer: bool) {
        let Some(state) = self.game.as_mut() else {
            return;
        };

        let Some(text) = state.remote_question.take() else {
            state.session.answer(answer);
            return;
        };

        // Remote-driven turn: log it, then ask the service what comes next.
        state.session.record_remote_turn(&text, answer);
        let history = state.wire_history();

        if state.remote_remaining <= 1 {
            match self.remote.guess(&history, &state.candidate_ids).await {
                Ok(reply) => {
                    state.session.resolve(GameResult::Identified {
                        full_name: reply.full_name,
                    });
                }
                Err(e) => {
                    warn!("remote guess failed, finishing locally: {e}");
                    self.remote = RemoteScorer::Disabled;
                }
            }
            return;
        }

        match self.remote.next_question(&history, &state.candidate_ids).await {
            Ok(reply) if reply.remaining <= 1 => {
                match self.remote.guess(&history, &state.candidate_ids).await {
                    Ok(guess) => {
                        state.session.resolve(GameResult::Identified {
                            full_name: guess.full_name,
                        });
                    }
                    Err(e) => {
                        warn!("remote guess failed, finishing locally: {e}");
                        self.remote = RemoteScorer::Disabled;
                    }
                }
            }
            Ok(reply) => {
                state.remote_remaining = reply.remaining;
                state.remote_question = Some(reply.question);
            }
            Err(e) => {
                // Local candidates were never narrowed by the remote turns,
                // so the session resumes from its own pending question.
                warn!("remote scorer failed mid-game, using local questions: {e}");
                self.remote = RemoteScorer::Disabled;
            }
        }
    }

    /// Drop the current game, keeping the loaded player table.
    pub fn reset(&mut self) {
        self.game = None;
    }

    pub fn phase(&self) -> Phase {
        self.game
            .as_ref()
            .map(|g| g.session.phase())
            .unwrap_or(Phase::Intro)
    }

    pub fn result(&self) -> Option<&GameResult> {
        self.game.as_ref().and_then(|g| g.session.result())
    }

    pub fn game_log(&self) -> &[String] {
        self.game.as_ref().map(|g| g.session.log()).unwrap_or(&[])
    }

    /// Validate a recommendation request and rank the matching players.
    pub fn recommend(
        &self,
        constraints: &Constraints,
    ) -> Result<Vec<Recommendation>, ValidationErrors> {
        constraints.validate(&self.config.limits)?;
        Ok(recommend(&self.players, constraints, &self.config.weights))
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BackendConfig, DataPaths, GameConfig};
    use crate::dataset::Position;
    use crate::recommend::{ConstraintLimits, ScoreWeights};

    fn make_config() -> Config {
        Config {
            game: GameConfig {
                final_round_threshold: 5,
            },
            backend: BackendConfig {
                base_url: String::new(),
            },
            weights: ScoreWeights::default(),
            limits: ConstraintLimits::default(),
            data_paths: DataPaths {
                players: "data/players.csv".to_string(),
            },
        }
    }

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
            average_points: 15.0,
            average_assists: 4.0,
            average_rebounds: 6.0,
            average_steals: 1.0,
            average_blocks: 1.0,
            awards_count: 0,
            salary: 1_000_000.0,
        }
    }

    fn roster() -> Vec<PlayerRecord> {
        vec![
            mk("A", "Celtics", Position::Guard),
            mk("B", "Knicks", Position::Forward),
            mk("C", "Bucks", Position::Center),
            mk("D", "Lakers", Position::Guard),
        ]
    }

    #[tokio::test]
    async fn local_game_plays_to_a_result() {
        let mut app = App::new(make_config(), roster(), RemoteScorer::Disabled);
        assert_eq!(app.phase(), Phase::Intro);

        app.start_game(Conference::East).await;
        assert_eq!(app.phase(), Phase::Playing);
        // Three east candidates, threshold five: straight to confirmations.
        assert_eq!(app.current_question().as_deref(), Some("Is your player A?"));

        app.answer(false).await;
        app.answer(true).await;
        assert_eq!(app.phase(), Phase::Result);
        assert_eq!(
            app.result(),
            Some(&GameResult::Identified {
                full_name: "B".to_string()
            })
        );
    }

    #[tokio::test]
    async fn unreachable_remote_falls_back_to_local() {
        use tokio::net::TcpListener;

        // Reserve a port, then drop the listener so connections are refused.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut config = make_config();
        config.backend.base_url = format!("http://{addr}");
        let remote = RemoteScorer::from_config(&config);
        assert!(remote.is_active());

        let mut app = App::new(config, roster(), remote);
        app.start_game(Conference::East).await;

        // Remote mode downgraded permanently; local question available.
        assert!(!app.remote.is_active());
        assert!(app.current_question().is_some());
        assert_eq!(app.phase(), Phase::Playing);
    }

    #[tokio::test]
    async fn reset_clears_the_game_only() {
        let mut app = App::new(make_config(), roster(), RemoteScorer::Disabled);
        app.start_game(Conference::East).await;
        assert!(app.game.is_some());

        app.reset();
        assert!(app.game.is_none());
        assert_eq!(app.phase(), Phase::Intro);
        assert_eq!(app.players.len(), 4);
    }

    #[tokio::test]
    async fn answers_without_a_game_are_ignored() {
        let mut app = App::new(make_config(), roster(), RemoteScorer::Disabled);
        app.answer(true).await;
        assert_eq!(app.phase(), Phase::Intro);
        assert!(app.result().is_none());
    }

    #[test]
    fn recommend_rejects_invalid_constraints() {
        let app = App::new(make_config(), roster(), RemoteScorer::Disabled);
        let bad = Constraints {
            budget: 0,
            min_height_in: 70,
            max_age: 40,
            position: "guard".to_string(),
        };
        let err = app.recommend(&bad).unwrap_err();
        assert!(err.fields.contains_key("budget"));
    }

    #[test]
    fn recommend_ranks_matching_players() {
        let app = App::new(make_config(), roster(), RemoteScorer::Disabled);
        let request = Constraints {
            budget: 50_000_000,
            min_height_in: 70,
            max_age: 40,
            position: "guard".to_string(),
        };
        let out = app.recommend(&request).unwrap();
        assert_eq!(out.len(), 2); // the two guards
        assert!(out.iter().all(|r| r.position == "G"));
    }
}
