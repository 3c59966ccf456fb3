// Hoop scout entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config
// 3. Load the player table
// 4. Build the remote scoring client and probe it
// 5. Run the interactive menu loop until the user quits

use std::io::Write as _;

use anyhow::Context;
use tracing::{info, warn};

use hoops_scout::app::App;
use hoops_scout::config;
use hoops_scout::dataset::{self, Conference};
use hoops_scout::engine::session::{GameResult, Phase};
use hoops_scout::recommend::Constraints;
use hoops_scout::remote::RemoteScorer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing (log to file, not terminal)
    init_tracing()?;
    info!("Hoop scout starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: final round at {} candidates, players from {}",
        config.game.final_round_threshold, config.data_paths.players
    );

    // 3. Load the player table
    let players = dataset::load_players(std::path::Path::new(&config.data_paths.players))
        .context("failed to load player table")?;
    info!("Loaded {} players", players.len());

    // 4. Build the remote scoring client and probe it
    let remote = RemoteScorer::from_config(&config);
    let remote = if remote.is_active() {
        if remote.health().await {
            info!("Remote scoring service healthy at {}", config.backend.base_url);
            remote
        } else {
            warn!("Remote scoring service unreachable, running locally");
            RemoteScorer::Disabled
        }
    } else {
        info!("Remote scoring disabled (no base URL)");
        remote
    };

    let mut app = App::new(config, players, remote);

    // 5. Interactive menu loop
    println!("Hoop Scout");
    loop {
        println!();
        println!("  1) Guess my player");
        println!("  2) Recommend players");
        println!("  q) Quit");
        match prompt("> ")?.as_str() {
            "1" => play_game(&mut app).await?,
            "2" => run_recommendation(&app)?,
            "q" | "Q" => break,
            other => println!("Unrecognized choice: {other}"),
        }
    }

    info!("Hoop scout shut down cleanly");
    Ok(())
}

// ---------------------------------------------------------------------------
// Guessing game front end
// ---------------------------------------------------------------------------

async fn play_game(app: &mut App) -> anyhow::Result<()> {
    let conference = loop {
        let reply = prompt("East or West conference? [e/w] ")?.to_lowercase();
        match reply.as_str() {
            "e" | "east" => break Conference::East,
            "w" | "west" => break Conference::West,
            _ => println!("Please answer e or w."),
        }
    };

    app.start_game(conference).await;
    println!(
        "Think of an active NBA player from the {}ern Conference...",
        conference.as_str()
    );

    while app.phase() == Phase::Playing {
        let Some(question) = app.current_question() else {
            break;
        };
        let answer = loop {
            let reply = prompt(&format!("{question} [y/n] "))?.to_lowercase();
            match reply.as_str() {
                "y" | "yes" => break true,
                "n" | "no" => break false,
                _ => println!("Please answer y or n."),
            }
        };
        app.answer(answer).await;
    }

    match app.result() {
        Some(GameResult::Identified { full_name }) => {
            println!("My guess is... **{full_name}**!");
        }
        Some(GameResult::Unresolved { reason }) => {
            println!("{reason}");
        }
        None => println!("Game abandoned."),
    }
    app.reset();
    Ok(())
}

// ---------------------------------------------------------------------------
// Recommendation front end
// ---------------------------------------------------------------------------

fn run_recommendation(app: &App) -> anyhow::Result<()> {
    let budget: u64 = prompt("Budget in dollars: ")?
        .replace([',', '$'], "")
        .parse()
        .unwrap_or(0);
    let min_height_in: u32 = prompt("Minimum height in inches: ")?.parse().unwrap_or(0);
    let max_age: u32 = prompt("Maximum age: ")?.parse().unwrap_or(0);
    let position = prompt("Position (e.g. guard, forward-center): ")?;

    let request = Constraints {
        budget,
        min_height_in,
        max_age,
        position,
    };

    match app.recommend(&request) {
        Err(errors) => {
            println!("Please fix the following:");
            for (field, message) in &errors.fields {
                println!("  {field}: {message}");
            }
        }
        Ok(recs) if recs.is_empty() => {
            println!("No players match those constraints.");
        }
        Ok(recs) => {
            println!(
                "{:<28} {:<4} {:>3} {:>6} {:>6} {:>6} {:>6} {:>7} {:>14}",
                "Player", "Pos", "Age", "Ht(cm)", "PTS", "REB", "AST", "Score", "Salary"
            );
            for r in recs {
                println!(
                    "{:<28} {:<4} {:>3} {:>6.0} {:>6.1} {:>6.1} {:>6.1} {:>7.2} {:>14}",
                    r.full_name,
                    r.position,
                    r.age,
                    r.height,
                    r.average_points,
                    r.average_rebounds,
                    r.average_assists,
                    r.score,
                    r.salary
                );
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn prompt(message: &str) -> anyhow::Result<String> {
    print!("{message}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("failed to read stdin")?;
    Ok(line.trim().to_string())
}

/// Initialize tracing to log to a file (not the terminal, which carries the
/// interactive prompts).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("hoopscout.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("hoops_scout=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
