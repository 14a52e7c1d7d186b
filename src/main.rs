//! Balloon Popper headless driver
//!
//! Runs a seeded session natively with an auto-player tapping balloons and
//! logs what happens. Set `RUST_LOG=info` (or `debug`) to see the game flow.
//!
//! High scores persist between runs with `--scores <file>`.

use std::collections::HashSet;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use balloon_popper::consts::*;
use balloon_popper::sim::balloon::Interactable;
use balloon_popper::sim::{EntityId, GameSession, RenderCommand, Screen, SoundEffect};
use balloon_popper::{GameError, HighScores, Settings, SpawnMode};

/// Frame length of the simulated host (50 fps, not a multiple of the tick)
const FRAME_DT: f32 = 1.0 / 50.0;
/// Seconds the auto-player lingers on result screens before confirming
const RESULT_PAUSE: f32 = 1.0;

/// Taps each balloon once with a fixed chance of hitting it
struct AutoPlayer {
    rng: Pcg32,
    hit_chance: f64,
    tried: HashSet<EntityId>,
    started: bool,
}

impl AutoPlayer {
    fn new(seed: u64, hit_chance: f64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed ^ 0x5eed),
            hit_chance,
            tried: HashSet::new(),
            started: false,
        }
    }

    /// Act on the current screen. Returns false once a full game is over.
    fn act(&mut self, session: &mut GameSession) -> bool {
        let on_screen = session.flow().elapsed();
        match session.screen() {
            Screen::Title => {
                if self.started {
                    return false;
                }
                self.started = true;
                session.request_screen(Screen::PlayLevel);
            }
            Screen::PlayLevel => {
                let targets: Vec<EntityId> = session
                    .scene()
                    .map(|scene| {
                        scene
                            .balloons()
                            .iter()
                            .filter(|b| b.accepts_interaction() && !self.tried.contains(&b.id()))
                            .map(|b| b.id())
                            .collect()
                    })
                    .unwrap_or_default();
                for id in targets {
                    self.tried.insert(id);
                    if self.rng.random_bool(self.hit_chance) {
                        session.on_primary_interaction(id);
                    }
                }
            }
            Screen::PlayLevelWin
            | Screen::PlayLevelLose
            | Screen::GameWin
            | Screen::GameLose
            | Screen::Credits => {
                if on_screen >= RESULT_PAUSE {
                    session.confirm();
                }
            }
            Screen::SplashA | Screen::SplashB | Screen::Options => {}
        }
        true
    }
}

#[derive(Debug, Default)]
struct Tally {
    spawned: usize,
    pops: usize,
    announcements: usize,
}

impl Tally {
    fn record(&mut self, commands: &[RenderCommand]) {
        for command in commands {
            match command {
                RenderCommand::SpawnEntity { .. } => self.spawned += 1,
                RenderCommand::PlayEffect(SoundEffect::BalloonPop) => self.pops += 1,
                RenderCommand::Announce(a) => {
                    self.announcements += 1;
                    log::debug!("Announce {:?}", a);
                }
                RenderCommand::UpdateReadout(r) => log::trace!("HUD {:?}", r),
                _ => {}
            }
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "balloon-popper")]
#[command(about = "Run a seeded Balloon Popper session with an auto-player")]
struct Args {
    /// Settings JSON file (defaults are used if it is missing or invalid)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Override the settings seed
    #[arg(long)]
    seed: Option<u64>,

    /// Simulated seconds to run before stopping
    #[arg(long, default_value_t = 1800.0, value_parser = parse_seconds)]
    seconds: f32,

    /// Chance the auto-player hits each balloon it aims at (0 to 1)
    #[arg(long, default_value_t = 0.9, value_parser = parse_probability)]
    hit_chance: f64,

    /// Override the launch roll mode (per-tick or time-based)
    #[arg(long)]
    spawn_mode: Option<SpawnMode>,

    /// High-score file, loaded at startup and saved when a game ends
    #[arg(long)]
    scores: Option<PathBuf>,

    /// Write the effective settings to this file before running
    #[arg(long)]
    save_settings: Option<PathBuf>,
}

fn parse_seconds(s: &str) -> Result<f32, String> {
    let value: f32 = s.parse().map_err(|e| format!("{e}"))?;
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(format!("{value} is not a positive number of seconds"))
    }
}

fn parse_probability(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|e| format!("{e}"))?;
    // Also rejects NaN
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{value} is not in 0..=1"))
    }
}

/// Where a run ended up
struct Summary {
    session: GameSession,
    tally: Tally,
}

fn run(args: &Args) -> Result<Summary, GameError> {
    let mut settings = match &args.settings {
        Some(path) => Settings::load_or_default(path),
        None => Settings::default(),
    };
    if let Some(seed) = args.seed {
        settings.seed = seed;
    }
    if let Some(mode) = args.spawn_mode {
        settings.spawn_mode = mode;
    }
    if let Some(path) = &args.save_settings {
        settings.save(path)?;
    }
    let seed = settings.seed;

    let highscores = match &args.scores {
        Some(path) => HighScores::load_or_default(path),
        None => HighScores::new(),
    };
    let mut session = GameSession::new(settings)?.with_highscores(highscores);
    log::info!("Balloon Popper (headless) starting, seed {}", seed);

    let mut player = AutoPlayer::new(seed, args.hit_chance);
    let mut tally = Tally::default();
    let mut accumulator = 0.0;
    let mut clock = 0.0;
    let mut screen = session.screen();

    while clock < args.seconds {
        clock += FRAME_DT;
        accumulator += FRAME_DT;

        if !player.act(&mut session) {
            break;
        }

        let mut substeps = 0;
        while accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            session.advance(SIM_DT);
            accumulator -= SIM_DT;
            substeps += 1;
        }

        tally.record(&session.drain_commands());

        // Games end on a confirm or a tick, so watch for the change either way
        let now = session.screen();
        if now != screen && matches!(now, Screen::GameWin | Screen::GameLose) {
            if let Some(path) = &args.scores {
                session.highscores().save(path)?;
            }
        }
        screen = now;
    }

    Ok(Summary { session, tally })
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let Summary { session, tally } = match run(&args) {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("balloon-popper: {e}");
            return ExitCode::FAILURE;
        }
    };

    let tracker = session.tracker();
    println!(
        "Finished on {:?} after {:.1}s: level {}, score {}, lives {}, continues {}",
        session.screen(),
        session.time(),
        tracker.current_level(),
        tracker.current_score(),
        tracker.lives(),
        tracker.continues()
    );
    println!(
        "{} parts spawned, {} balloons popped, {} announcements",
        tally.spawned, tally.pops, tally.announcements
    );
    if let Some(best) = session.highscores().entries.first() {
        println!(
            "Best: {} (level {}, {})",
            best.score,
            best.level,
            if best.won { "won" } else { "lost" }
        );
    }
    ExitCode::SUCCESS
}
