use chrono::{SecondsFormat, Utc};
use clap::Parser;
use pacman_level_engine::config::LevelOptions;
use pacman_level_engine::constants::TICK_MS;
use pacman_level_engine::entity::Entity;
use pacman_level_engine::error::LevelError;
use pacman_level_engine::level::Level;
use pacman_level_engine::map::{parse_map, LevelLayout};
use pacman_level_engine::rng::Rng;
use pacman_level_engine::types::{
    CellId, Direction, EntityId, LevelEvent, LevelOutcome, LevelState,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::error::Error;
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const TURN_PROBABILITY: f32 = 0.3;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[arg(long)]
    map: PathBuf,
    #[arg(long = "chunk")]
    chunks: Vec<PathBuf>,
    #[arg(long)]
    growable: bool,
    #[arg(long, default_value_t = 120)]
    seconds: u64,
    #[arg(long)]
    seed: Option<u32>,
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
struct EventCounts {
    #[serde(rename = "pelletsEaten")]
    pellets_eaten: usize,
    #[serde(rename = "ghostsEaten")]
    ghosts_eaten: usize,
    #[serde(rename = "ghostsExploded")]
    ghosts_exploded: usize,
    #[serde(rename = "ghostsSpawned")]
    ghosts_spawned: usize,
    #[serde(rename = "fruitsEaten")]
    fruits_eaten: usize,
    #[serde(rename = "hunterModes")]
    hunter_modes: usize,
    #[serde(rename = "bulletsFired")]
    bullets_fired: usize,
    #[serde(rename = "boardExtensions")]
    board_extensions: usize,
    teleports: usize,
    traps: usize,
}

impl EventCounts {
    fn record(&mut self, event: &LevelEvent) {
        match event {
            LevelEvent::PelletEaten { .. } => self.pellets_eaten += 1,
            LevelEvent::GhostEaten { .. } => self.ghosts_eaten += 1,
            LevelEvent::GhostExploded { .. } => self.ghosts_exploded += 1,
            LevelEvent::GhostSpawned { .. } => self.ghosts_spawned += 1,
            LevelEvent::FruitEaten { .. } => self.fruits_eaten += 1,
            LevelEvent::HunterModeStarted { .. } => self.hunter_modes += 1,
            LevelEvent::BulletFired { .. } => self.bullets_fired += 1,
            LevelEvent::BoardExtended { .. } => self.board_extensions += 1,
            LevelEvent::Teleported { .. } => self.teleports += 1,
            LevelEvent::Trapped { .. } => self.traps += 1,
            _ => {}
        }
    }
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    #[serde(rename = "runId")]
    run_id: String,
    #[serde(rename = "startedAt")]
    started_at: String,
    #[serde(rename = "finishedAt")]
    finished_at: String,
    seed: u32,
    growable: bool,
    state: LevelState,
    outcome: Option<LevelOutcome>,
    score: i32,
    #[serde(rename = "durationMs")]
    duration_ms: u64,
    #[serde(rename = "pelletsLeft")]
    pellets_left: usize,
    width: i32,
    height: i32,
    counts: EventCounts,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct StructuredLogLine {
    timestamp: String,
    level: String,
    event: String,
    #[serde(rename = "runId")]
    run_id: String,
    #[serde(rename = "nowMs", skip_serializing_if = "Option::is_none")]
    now_ms: Option<u64>,
    details: Value,
}

#[derive(Clone, Debug)]
struct RunResult {
    state: LevelState,
    outcome: Option<LevelOutcome>,
    score: i32,
    duration_ms: u64,
    pellets_left: usize,
    width: i32,
    height: i32,
    counts: EventCounts,
    anomalies: Vec<String>,
}

struct Autopilot {
    rng: Rng,
    last_cell: Option<CellId>,
}

impl Autopilot {
    fn new(seed: u32) -> Self {
        Self {
            rng: Rng::new(seed ^ 0x9e37_79b9),
            last_cell: None,
        }
    }

    fn drive(&mut self, level: &mut Level, player: EntityId) -> Result<(), LevelError> {
        let Some(entity) = level.entity(player) else {
            return Ok(());
        };
        let Some(cell) = entity.cell() else {
            return Ok(());
        };
        let facing = entity.facing;
        let shooting = entity
            .player()
            .is_some_and(|state| state.alive && state.shooting.is_active());

        if self.last_cell != Some(cell) {
            self.last_cell = Some(cell);
            if let Some(direction) = self.choose(level, cell, facing) {
                level.steer(player, direction)?;
            }
        }
        if shooting {
            level.fire(player);
        }
        Ok(())
    }

    fn choose(&mut self, level: &Level, cell: CellId, facing: Direction) -> Option<Direction> {
        let board = level.board();
        let open: Vec<Direction> = Direction::ALL
            .into_iter()
            .filter(|direction| board.is_accessible(board.neighbor(cell, *direction)))
            .collect();
        let turns: Vec<Direction> = open
            .iter()
            .copied()
            .filter(|direction| *direction != facing && *direction != facing.opposite())
            .collect();
        if !open.contains(&facing) {
            return self.rng.pick(&turns).or_else(|| self.rng.pick(&open));
        }
        if !turns.is_empty() && self.rng.bool(TURN_PROBABILITY) {
            return self.rng.pick(&turns);
        }
        None
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let started_at = timestamp();
    let mut options = match cli.config.as_ref() {
        Some(path) => LevelOptions::from_json(&std::fs::read_to_string(path)?)?,
        None => LevelOptions::default(),
    };
    let seed = cli
        .seed
        .or(options.seed)
        .unwrap_or_else(rand::random::<u32>);
    options.seed = Some(seed);
    options.growable |= cli.growable;
    let run_id = default_run_id(seed, &started_at);

    let layout = load_layout(&cli.map)?;
    let chunks = cli
        .chunks
        .iter()
        .map(|path| load_layout(path))
        .collect::<Result<Vec<_>, _>>()?;
    let level = if options.growable {
        let chunks = if chunks.is_empty() {
            vec![layout.clone()]
        } else {
            chunks
        };
        Level::growable(layout, chunks, options.clone())?
    } else {
        Level::new(layout, options.clone())?
    };

    emit_log(
        "info",
        "run_started",
        &run_id,
        None,
        json!({
            "map": cli.map.to_string_lossy(),
            "chunks": cli.chunks.len(),
            "growable": options.growable,
            "seconds": cli.seconds,
            "seed": seed,
        }),
    );

    let result = run_level(level, seed, cli.seconds * 1_000, &run_id)?;
    for anomaly in &result.anomalies {
        emit_log(
            "warn",
            "anomaly_detected",
            &run_id,
            None,
            json!({ "message": anomaly }),
        );
    }

    let summary = build_run_summary(run_id.clone(), started_at, timestamp(), seed, options.growable, result);
    println!("{}", serde_json::to_string(&summary)?);

    let mut summary_out_written: Option<String> = None;
    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(error) = write_summary(path, &summary) {
            emit_log(
                "error",
                "summary_write_failed",
                &run_id,
                None,
                json!({
                    "path": path.to_string_lossy(),
                    "error": error.to_string(),
                }),
            );
            return Err(error.into());
        }
        summary_out_written = Some(path.to_string_lossy().to_string());
    }

    emit_log(
        "info",
        "run_finished",
        &run_id,
        Some(summary.duration_ms),
        json!({
            "outcome": summary.outcome,
            "score": summary.score,
            "anomalyCount": summary.anomalies.len(),
            "summaryOut": summary_out_written,
        }),
    );
    Ok(())
}

fn load_layout(path: &Path) -> Result<LevelLayout, Box<dyn Error>> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse_map(&text)?)
}

fn run_level(
    mut level: Level,
    seed: u32,
    limit_ms: u64,
    run_id: &str,
) -> Result<RunResult, LevelError> {
    let player = level.register_player()?;
    let mut autopilot = Autopilot::new(seed);
    let mut counts = EventCounts::default();
    let mut anomalies: Vec<String> = Vec::new();
    let mut now_ms = 0u64;

    level.start(now_ms);
    while level.is_in_progress() && now_ms < limit_ms {
        now_ms += TICK_MS;
        level.advance(now_ms);
        autopilot.drive(&mut level, player)?;

        for event in level.drain_events() {
            counts.record(&event);
            if !matches!(event, LevelEvent::PelletEaten { .. }) {
                emit_log(
                    "info",
                    "level_event",
                    run_id,
                    Some(now_ms),
                    serde_json::to_value(&event).unwrap_or(Value::Null),
                );
            }
        }
        if let Err(error) = level.board().check_invariant() {
            push_anomaly(&mut anomalies, error.to_string());
        }
    }
    for event in level.drain_events() {
        counts.record(&event);
    }
    level.stop();

    let score = level.score(player).unwrap_or(0);
    if score < 0 {
        push_anomaly(&mut anomalies, format!("negative score: {score}"));
    }
    let alive = level
        .entity(player)
        .and_then(Entity::player)
        .is_some_and(|state| state.alive);
    if level.outcome() == Some(LevelOutcome::Lost) && alive {
        push_anomaly(&mut anomalies, "level lost with a living player".to_string());
    }

    Ok(RunResult {
        state: level.state(),
        outcome: level.outcome(),
        score,
        duration_ms: level.now_ms(),
        pellets_left: level.remaining_pellets(),
        width: level.board().width(),
        height: level.board().height(),
        counts,
        anomalies,
    })
}

fn push_anomaly(anomalies: &mut Vec<String>, message: String) {
    if !anomalies.contains(&message) {
        anomalies.push(message);
    }
}

fn default_run_id(seed: u32, started_at: &str) -> String {
    format!("sim-{seed}-{started_at}")
}

fn build_run_summary(
    run_id: String,
    started_at: String,
    finished_at: String,
    seed: u32,
    growable: bool,
    result: RunResult,
) -> RunSummary {
    RunSummary {
        run_id,
        started_at,
        finished_at,
        seed,
        growable,
        state: result.state,
        outcome: result.outcome,
        score: result.score,
        duration_ms: result.duration_ms,
        pellets_left: result.pellets_left,
        width: result.width,
        height: result.height,
        counts: result.counts,
        anomalies: result.anomalies,
    }
}

fn emit_log(level: &str, event: &str, run_id: &str, now_ms: Option<u64>, details: Value) {
    let log_line = StructuredLogLine {
        timestamp: timestamp(),
        level: level.to_string(),
        event: event.to_string(),
        run_id: run_id.to_string(),
        now_ms,
        details,
    };
    match serde_json::to_string(&log_line) {
        Ok(text) => eprintln!("{text}"),
        Err(error) => tracing::warn!(%error, event, "structured log line dropped"),
    }
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn write_summary(path: &Path, summary: &RunSummary) -> io::Result<()> {
    let summary_text = serde_json::to_string_pretty(summary).map_err(io::Error::other)?;
    std::fs::write(path, summary_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(rows: &[&str]) -> LevelLayout {
        parse_map(&rows.join("\n")).expect("map")
    }

    fn options(seed: u32) -> LevelOptions {
        LevelOptions {
            seed: Some(seed),
            ..LevelOptions::default()
        }
    }

    fn make_result(outcome: Option<LevelOutcome>) -> RunResult {
        RunResult {
            state: LevelState::Stopped,
            outcome,
            score: 120,
            duration_ms: 4_000,
            pellets_left: 0,
            width: 5,
            height: 3,
            counts: EventCounts::default(),
            anomalies: Vec::new(),
        }
    }

    #[test]
    fn default_run_id_contains_seed_and_timestamp() {
        assert_eq!(
            default_run_id(42, "2026-01-01T00:00:00.000Z"),
            "sim-42-2026-01-01T00:00:00.000Z"
        );
    }

    #[test]
    fn autopilot_clears_a_corridor() {
        let level = Level::new(layout(&["######", "#P...#", "######"]), options(5)).expect("level");
        let result = run_level(level, 5, 10_000, "test").expect("run");
        assert_eq!(result.outcome, Some(LevelOutcome::Won));
        assert_eq!(result.score, 30);
        assert_eq!(result.counts.pellets_eaten, 3);
        assert!(result.anomalies.is_empty());
    }

    #[test]
    fn autopilot_turns_at_dead_ends() {
        let level = Level::new(
            layout(&["######", "#P  .#", "#.####", "######"]),
            options(11),
        )
        .expect("level");
        let result = run_level(level, 11, 30_000, "test").expect("run");
        assert_eq!(result.outcome, Some(LevelOutcome::Won));
        assert_eq!(result.pellets_left, 0);
    }

    #[test]
    fn run_stops_at_the_time_limit() {
        let level = Level::new(layout(&["#######", "#P  #.#", "#######"]), options(1)).expect("level");
        let result = run_level(level, 1, 1_000, "test").expect("run");
        assert_eq!(result.outcome, None);
        assert_eq!(result.state, LevelState::Stopped);
        assert_eq!(result.duration_ms, 1_000);
    }

    #[test]
    fn event_counts_follow_events() {
        let mut counts = EventCounts::default();
        counts.record(&LevelEvent::LevelStarted);
        counts.record(&LevelEvent::HunterModeStarted {
            duration_ms: 5_000,
            warning_ms: 3_000,
        });
        counts.record(&LevelEvent::BoardExtended {
            direction: Direction::East,
            width: 10,
            height: 5,
        });
        assert_eq!(counts.hunter_modes, 1);
        assert_eq!(counts.board_extensions, 1);
        assert_eq!(counts.pellets_eaten, 0);
    }

    #[test]
    fn summary_serializes_with_camel_case_fields() {
        let summary = build_run_summary(
            "sim-1-x".to_string(),
            "a".to_string(),
            "b".to_string(),
            1,
            false,
            make_result(Some(LevelOutcome::Won)),
        );
        let value = serde_json::to_value(&summary).expect("serialize");
        assert_eq!(value["durationMs"], 4_000);
        assert_eq!(value["outcome"], "won");
        assert_eq!(value["counts"]["pelletsEaten"], 0);
    }

    #[test]
    fn write_summary_returns_error_when_parent_does_not_exist() {
        let target = std::env::temp_dir()
            .join(format!("pacman-level-missing-{}", timestamp().replace(':', "-")))
            .join("summary.json");
        let summary = build_run_summary(
            "sim-1-1".to_string(),
            "a".to_string(),
            "b".to_string(),
            1,
            false,
            make_result(None),
        );
        assert!(write_summary(&target, &summary).is_err());
    }

    #[test]
    fn push_anomaly_deduplicates_messages() {
        let mut anomalies = Vec::new();
        push_anomaly(&mut anomalies, "same anomaly".to_string());
        push_anomaly(&mut anomalies, "same anomaly".to_string());
        push_anomaly(&mut anomalies, "other".to_string());
        assert_eq!(anomalies.len(), 2);
    }
}
