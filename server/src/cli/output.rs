//! CLI output formatting utilities for human-readable and JSON output modes.

use chrono::{DateTime, Utc};
use chrono_humanize::HumanTime;
use colored::Colorize;
use is_terminal::IsTerminal;
use serde::Serialize;
use std::io;
use tabled::{builder::Builder, settings::Style};

use crate::engine::{DeathCause, MoveOutcome};
use crate::game_service::MoveResponse;
use crate::models::{ScoreEntry, SessionRecord};

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output with tables, colors, and formatting.
    Human,
    /// Machine-readable JSON output.
    Json,
}

impl OutputFormat {
    /// Determine the output format based on CLI flag and TTY detection.
    ///
    /// - If `format` is Some("json"), return Json
    /// - If `format` is Some("human"), return Human
    /// - If `format` is None, auto-detect based on stdout being a TTY
    pub fn from_flag(format: Option<&str>) -> Result<Self, String> {
        match format {
            Some("json") => Ok(OutputFormat::Json),
            Some("human") => Ok(OutputFormat::Human),
            Some(other) => Err(format!(
                "Invalid format '{}'. Use 'json' or 'human'.",
                other
            )),
            None => {
                if io::stdout().is_terminal() {
                    Ok(OutputFormat::Human)
                } else {
                    Ok(OutputFormat::Json)
                }
            }
        }
    }
}

/// Format a timestamp for human-readable output.
pub fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Format a timestamp as relative time (e.g., "2 minutes ago").
pub fn format_relative_time(dt: DateTime<Utc>) -> String {
    HumanTime::from(dt).to_string()
}

/// Session status label: "game over", "paused" or "playing".
pub fn session_status(session: &SessionRecord) -> &'static str {
    if session.state.game_over.unwrap_or(false) {
        "game over"
    } else if session.state.paused.unwrap_or(false) {
        "paused"
    } else {
        "playing"
    }
}

/// Apply color to a status string based on its value.
pub fn status_colored(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "playing" | "ate food" => status.green().to_string(),
        "paused" | "ignored" => status.yellow().to_string(),
        "moved" => status.dimmed().to_string(),
        "game over" | "wall collision" | "self collision" | "obstacle collision" => {
            status.red().to_string()
        }
        _ => status.to_string(),
    }
}

pub fn outcome_label(outcome: &MoveOutcome) -> &'static str {
    match outcome {
        MoveOutcome::Ignored => "ignored",
        MoveOutcome::Moved => "moved",
        MoveOutcome::AteFood { .. } => "ate food",
        MoveOutcome::Collided { cause } => match cause {
            DeathCause::WallCollision => "wall collision",
            DeathCause::SelfCollision => "self collision",
            DeathCause::ObstacleCollision => "obstacle collision",
        },
    }
}

/// Build and print a table from headers and rows.
pub fn print_table(headers: Vec<&str>, rows: Vec<Vec<String>>) {
    let mut builder = Builder::default();
    builder.push_record(headers);
    for row in rows {
        builder.push_record(row);
    }
    let mut table = builder.build();
    table.with(Style::rounded());
    println!("{table}");
}

/// Print a key-value pair with proper formatting.
pub fn print_field(label: &str, value: &str) {
    println!("{}: {}", label.bold(), value);
}

/// Print a success message.
pub fn print_success(message: &str) {
    println!("{}", message.green());
}

pub fn print_json<T: Serialize>(value: &T) -> color_eyre::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print an error as JSON to stderr for machine consumption.
pub fn print_json_error(message: &str) {
    eprintln!(
        "{}",
        serde_json::json!({
            "error": message
        })
    );
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

/// Labelled fields shown for a session in human output.
pub fn session_fields(session: &SessionRecord) -> Vec<(&'static str, String)> {
    let state = &session.state;
    vec![
        ("Session", opt(state.id.as_deref())),
        ("Player", opt(session.player_name.as_deref())),
        ("Status", status_colored(session_status(session))),
        ("Score", opt(state.score)),
        ("Level", opt(state.level)),
        ("Speed", format!("{} ms", opt(state.speed))),
        ("High score", opt(state.high_score)),
        ("Moves", opt(state.moves_count)),
        ("Direction", opt(state.direction.as_deref())),
        ("Started", format_timestamp(session.created_at)),
        ("Updated", format_relative_time(session.updated_at)),
    ]
}

pub fn print_session(session: &SessionRecord) {
    for (label, value) in session_fields(session) {
        print_field(label, &value);
    }
}

pub fn print_move(response: &MoveResponse) {
    print_field(
        "Outcome",
        &status_colored(outcome_label(&response.outcome)),
    );
    if let MoveOutcome::AteFood { levels_gained } = response.outcome {
        if levels_gained > 0 {
            print_success(&format!("Level up! (+{levels_gained})"));
        }
    }
    print_session(&response.session);
}

pub fn print_scores(entries: &[ScoreEntry]) {
    if entries.is_empty() {
        println!("No high scores yet.");
        return;
    }

    let rows = entries
        .iter()
        .enumerate()
        .map(|(rank, entry)| {
            vec![
                (rank + 1).to_string(),
                entry.player_name.clone(),
                entry.score.to_string(),
                entry.level.to_string(),
                format!("{}s", entry.game_duration),
                format_relative_time(entry.created_at),
            ]
        })
        .collect();

    print_table(
        vec!["#", "Player", "Score", "Level", "Duration", "When"],
        rows,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::StateRecord;

    fn session() -> SessionRecord {
        SessionRecord::new(
            StateRecord {
                id: Some("session_cli".to_string()),
                width: Some(4),
                height: Some(3),
                snake: Some(vec![[2, 1], [1, 1]]),
                direction: Some("RIGHT".to_string()),
                food: Some([3, 2]),
                obstacles: Some(vec![[0, 0]]),
                game_over: Some(false),
                ..StateRecord::default()
            },
            None,
        )
    }

    #[test]
    fn test_format_from_flag_json() {
        assert_eq!(
            OutputFormat::from_flag(Some("json")).unwrap(),
            OutputFormat::Json
        );
    }

    #[test]
    fn test_format_from_flag_human() {
        assert_eq!(
            OutputFormat::from_flag(Some("human")).unwrap(),
            OutputFormat::Human
        );
    }

    #[test]
    fn test_format_from_flag_invalid() {
        assert!(OutputFormat::from_flag(Some("xml")).is_err());
    }

    #[test]
    fn test_status_colored_game_over() {
        // Just verify it doesn't panic - actual color depends on terminal
        let result = status_colored("game over");
        assert!(!result.is_empty());
    }

    #[test]
    fn test_format_timestamp() {
        use chrono::TimeZone;
        let dt = Utc.with_ymd_and_hms(2026, 1, 27, 12, 0, 0).unwrap();
        assert_eq!(format_timestamp(dt), "2026-01-27 12:00:00 UTC");
    }

    #[test]
    fn test_session_fields_show_start_time() {
        use chrono::TimeZone;
        let mut session = session();
        session.created_at = Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 0).unwrap();

        let fields = session_fields(&session);
        let started = fields.iter().find(|(label, _)| *label == "Started").unwrap();
        assert_eq!(started.1, "2026-10-19 08:30:00 UTC");

        let moves = fields.iter().find(|(label, _)| *label == "Moves").unwrap();
        assert_eq!(moves.1, "-");
    }

    #[test]
    fn test_session_status() {
        let mut session = session();
        assert_eq!(session_status(&session), "playing");

        session.state.paused = Some(true);
        assert_eq!(session_status(&session), "paused");

        session.state.game_over = Some(true);
        assert_eq!(session_status(&session), "game over");
    }

    #[test]
    fn test_outcome_label() {
        assert_eq!(
            outcome_label(&MoveOutcome::Collided {
                cause: DeathCause::SelfCollision
            }),
            "self collision"
        );
        assert_eq!(
            outcome_label(&MoveOutcome::AteFood { levels_gained: 0 }),
            "ate food"
        );
    }
}
