use clap::{Parser, Subcommand};
use color_eyre::eyre::eyre;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use snake_server::cli::output::{self, OutputFormat};
use snake_server::config::AppConfig;
use snake_server::engine::Direction;
use snake_server::game_service::StartGame;
use snake_server::state::{AppState, setup_db_pool};

#[derive(Parser)]
#[command(name = "snake-server")]
#[command(about = "Server-authoritative snake games backed by Postgres", long_about = None)]
struct Cli {
    /// Path to a config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Postgres connection string, overrides config and DATABASE_URL
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Output format: json or human (auto-detected when omitted)
    #[arg(long, global = true)]
    format: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Game(GameCommand),
    /// Run database migrations and exit
    Migrate,
}

#[derive(Subcommand)]
enum GameCommand {
    /// Start a new game
    Start {
        /// Reuse an existing session id
        #[arg(long)]
        session_id: Option<String>,
        #[arg(short, long)]
        player: Option<String>,
        #[arg(long)]
        width: Option<i32>,
        #[arg(long)]
        height: Option<i32>,
        /// Number of obstacles to place
        #[arg(long)]
        obstacles: Option<usize>,
    },
    /// Advance a game by one step
    Move {
        session_id: String,
        /// Turn before moving (up, down, left, right)
        #[arg(short, long)]
        direction: Option<Direction>,
    },
    /// Show the current state of a game
    State { session_id: String },
    /// Start over, keeping the player name and high score
    Reset { session_id: String },
    /// Pause or resume a game
    Pause { session_id: String },
    /// List the leaderboard
    Scores {
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Record a finished game on the leaderboard
    SubmitScore {
        #[arg(short, long)]
        player: String,
        #[arg(long)]
        score: u32,
        #[arg(long, default_value_t = 1)]
        level: u32,
        /// Game length in seconds
        #[arg(long, default_value_t = 0)]
        duration: u32,
    },
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "snake_server=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let format = OutputFormat::from_flag(cli.format.as_deref()).map_err(|e| eyre!(e))?;

    let result = run(cli, format).await;
    if let Err(e) = &result {
        if format == OutputFormat::Json {
            output::print_json_error(&e.to_string());
        }
    }
    result
}

async fn run(cli: Cli, format: OutputFormat) -> color_eyre::Result<()> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_env()?;
    if let Some(url) = cli.database_url {
        config.database_url = Some(url);
    }

    match cli.command {
        Commands::Migrate => {
            let database_url = config
                .database_url
                .ok_or_else(|| eyre!("DATABASE_URL must be set"))?;
            setup_db_pool(&database_url).await?;
            match format {
                OutputFormat::Json => output::print_json(&serde_json::json!({ "migrated": true }))?,
                OutputFormat::Human => output::print_success("Migrations are up to date"),
            }
            Ok(())
        }
        Commands::Game(command) => run_game_command(command, config, format).await,
    }
}

async fn run_game_command(
    command: GameCommand,
    config: AppConfig,
    format: OutputFormat,
) -> color_eyre::Result<()> {
    let app_state = AppState::from_config(config).await?;
    let service = app_state.game_service()?;

    match command {
        GameCommand::Start {
            session_id,
            player,
            width,
            height,
            obstacles,
        } => {
            let session = service
                .start_game(StartGame {
                    session_id,
                    player_name: player,
                    width,
                    height,
                    obstacles,
                })
                .await?;
            match format {
                OutputFormat::Json => output::print_json(&session)?,
                OutputFormat::Human => output::print_session(&session),
            }
        }
        GameCommand::Move {
            session_id,
            direction,
        } => {
            let response = service.make_move(&session_id, direction).await?;
            match format {
                OutputFormat::Json => output::print_json(&response)?,
                OutputFormat::Human => output::print_move(&response),
            }
        }
        GameCommand::State { session_id } => {
            let session = service.get_state(&session_id).await?;
            match format {
                OutputFormat::Json => output::print_json(&session)?,
                OutputFormat::Human => output::print_session(&session),
            }
        }
        GameCommand::Reset { session_id } => {
            let session = service.reset_game(&session_id).await?;
            match format {
                OutputFormat::Json => output::print_json(&session)?,
                OutputFormat::Human => output::print_session(&session),
            }
        }
        GameCommand::Pause { session_id } => {
            let session = service.toggle_pause(&session_id).await?;
            match format {
                OutputFormat::Json => output::print_json(&session)?,
                OutputFormat::Human => output::print_session(&session),
            }
        }
        GameCommand::Scores { limit } => {
            let scores = service.high_scores(limit).await?;
            match format {
                OutputFormat::Json => output::print_json(&scores)?,
                OutputFormat::Human => output::print_scores(&scores),
            }
        }
        GameCommand::SubmitScore {
            player,
            score,
            level,
            duration,
        } => {
            let entry = service.submit_score(&player, score, level, duration).await?;
            match format {
                OutputFormat::Json => output::print_json(&entry)?,
                OutputFormat::Human => output::print_success(&format!(
                    "Recorded {} points for {} (entry #{})",
                    entry.score, entry.player_name, entry.id
                )),
            }
        }
    }

    Ok(())
}
