//! Top-level game session
//!
//! Owns the screen flow, the progression tracker, the current play scene,
//! the RNG and the command outbox. The host feeds it elapsed time and taps
//! and drains render commands once per frame.

use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::command::{CommandQueue, EntityId, IdAllocator, RenderCommand};
use super::flow::{GameFlow, Screen};
use super::progression::{LossCharge, ProgressionTracker};
use super::scene::{LevelEntry, LevelOutcome, PlayScene};
use crate::error::GameError;
use crate::fsm::State;
use crate::highscores::HighScores;
use crate::settings::Settings;

pub struct GameSession {
    settings: Settings,
    flow: GameFlow,
    tracker: ProgressionTracker,
    scene: Option<PlayScene>,
    rng: Pcg32,
    ids: IdAllocator,
    commands: CommandQueue,
    highscores: HighScores,
    last_outcome: Option<LevelOutcome>,
    last_charge: Option<LossCharge>,
    /// Total simulated seconds
    time: f64,
}

impl GameSession {
    /// Start a session on the first splash screen
    pub fn new(settings: Settings) -> Result<Self, GameError> {
        settings.validate()?;

        let mut session = Self {
            flow: GameFlow::from_settings(&settings),
            tracker: ProgressionTracker::from_settings(&settings),
            scene: None,
            rng: Pcg32::seed_from_u64(settings.seed),
            ids: IdAllocator::new(),
            commands: CommandQueue::new(),
            highscores: HighScores::new(),
            last_outcome: None,
            last_charge: None,
            time: 0.0,
            settings,
        };
        session.flow.start(&mut session.commands);
        log::info!("Session started (seed {})", session.settings.seed);
        Ok(session)
    }

    /// Default settings with a specific seed
    pub fn with_seed(seed: u64) -> Result<Self, GameError> {
        Self::new(Settings {
            seed,
            ..Default::default()
        })
    }

    /// Carry an existing leaderboard into this session
    pub fn with_highscores(mut self, highscores: HighScores) -> Self {
        self.highscores = highscores;
        self
    }

    pub fn screen(&self) -> Screen {
        self.flow.current()
    }

    pub fn flow(&self) -> &GameFlow {
        &self.flow
    }

    pub fn tracker(&self) -> &ProgressionTracker {
        &self.tracker
    }

    pub fn scene(&self) -> Option<&PlayScene> {
        self.scene.as_ref()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn highscores(&self) -> &HighScores {
        &self.highscores
    }

    pub fn last_outcome(&self) -> Option<LevelOutcome> {
        self.last_outcome
    }

    /// What the most recent lost level cost
    pub fn last_charge(&self) -> Option<LossCharge> {
        self.last_charge
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    /// Commands queued since the last drain
    pub fn pending_commands(&self) -> &CommandQueue {
        &self.commands
    }

    pub fn drain_commands(&mut self) -> Vec<RenderCommand> {
        self.commands.drain()
    }

    /// Advance by `dt` seconds: flow first, then the scene and its balloons
    pub fn advance(&mut self, dt: f32) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }
        self.time += dt as f64;

        if let Some(screen) = self.flow.update(dt, &mut self.commands) {
            self.on_screen_entered(screen);
        }

        if !self.flow.machine().is_in(Screen::PlayLevel) {
            return;
        }
        let Some(scene) = self.scene.as_mut() else {
            return;
        };
        let result = scene.update(
            dt,
            &mut self.tracker,
            &mut self.rng,
            &mut self.ids,
            &mut self.commands,
        );
        match result {
            Ok(Some(outcome)) => self.finish_level(outcome),
            Ok(None) => {}
            Err(e) => self.abort_level(e),
        }
    }

    /// Route a tap on an entity. Ignored unless a level is being played.
    pub fn on_primary_interaction(&mut self, id: EntityId) -> bool {
        if !self.flow.machine().is_in(Screen::PlayLevel) {
            return false;
        }
        match self.scene.as_mut() {
            Some(scene) => {
                scene.on_primary_interaction(id, &mut self.tracker, &mut self.commands)
            }
            None => false,
        }
    }

    /// Menu navigation. Result screens are reached by playing, not by request.
    pub fn request_screen(&mut self, screen: Screen) -> bool {
        let allowed = matches!(
            (self.flow.current(), screen),
            (Screen::Title, Screen::Options | Screen::Credits | Screen::PlayLevel)
                | (Screen::Options | Screen::Credits | Screen::PlayLevel, Screen::Title)
                | (Screen::PlayLevelLose, Screen::GameLose)
        );
        if !allowed {
            log::debug!(
                "Refused navigation from {} to {}",
                self.flow.current().name(),
                screen.name()
            );
            return false;
        }
        self.go_to(screen)
    }

    /// Tap to continue on splash, credits and result screens
    pub fn confirm(&mut self) -> bool {
        let target = match self.flow.current() {
            Screen::PlayLevelWin => {
                if self.tracker.has_next_level() {
                    Screen::PlayLevel
                } else {
                    Screen::GameWin
                }
            }
            Screen::PlayLevelLose => {
                if self.last_charge.is_some_and(|c| c.can_retry()) {
                    Screen::PlayLevel
                } else {
                    Screen::GameLose
                }
            }
            other => match other.confirm_target() {
                Some(target) => target,
                None => return false,
            },
        };
        self.go_to(target)
    }

    /// Give up on the lost level instead of retrying it.
    ///
    /// Only valid on PlayLevelLose. Any lives or continues left are forfeited
    /// and the score goes to the high-score board.
    pub fn decline(&mut self) -> bool {
        if !self.flow.machine().is_in(Screen::PlayLevelLose) {
            log::debug!("Nothing to decline on {}", self.flow.current().name());
            return false;
        }
        self.go_to(Screen::GameLose)
    }

    fn go_to(&mut self, screen: Screen) -> bool {
        if !self.flow.enter(screen, &mut self.commands) {
            return false;
        }
        self.on_screen_entered(screen);
        true
    }

    fn on_screen_entered(&mut self, screen: Screen) {
        match screen {
            Screen::Title => self.close_scene(),
            Screen::PlayLevel => {
                let entry = match self.flow.previous() {
                    Some(Screen::PlayLevelLose) => LevelEntry::Retry,
                    Some(Screen::Title) => {
                        self.start_new_game();
                        LevelEntry::Next
                    }
                    _ => LevelEntry::Next,
                };
                self.scene = Some(PlayScene::new(entry, &self.settings, &mut self.commands));
            }
            Screen::PlayLevelLose => {
                self.last_charge = Some(self.tracker.charge_level_loss());
            }
            Screen::GameWin | Screen::GameLose => {
                self.close_scene();
                self.record_highscore();
            }
            _ => {}
        }
    }

    fn start_new_game(&mut self) {
        self.tracker = ProgressionTracker::from_settings(&self.settings);
        self.last_outcome = None;
        self.last_charge = None;
    }

    fn close_scene(&mut self) {
        if let Some(mut scene) = self.scene.take() {
            scene.clear(&mut self.tracker, &mut self.commands);
        }
    }

    fn finish_level(&mut self, outcome: LevelOutcome) {
        self.last_outcome = Some(outcome);
        self.close_scene();
        let screen = match outcome {
            LevelOutcome::Won => Screen::PlayLevelWin,
            LevelOutcome::Lost => Screen::PlayLevelLose,
        };
        self.go_to(screen);
    }

    /// A level could not be set up
    fn abort_level(&mut self, error: GameError) {
        self.close_scene();
        match error {
            GameError::UnknownLevel { .. } => {
                // Ran off the end of the difficulty table: the game is won
                log::warn!("{}; ending the game", error);
                self.last_outcome = Some(LevelOutcome::Won);
                self.go_to(Screen::PlayLevelWin);
                self.go_to(Screen::GameWin);
            }
            other => {
                log::error!("Level aborted: {}", other);
                self.go_to(Screen::Title);
            }
        }
    }

    fn record_highscore(&mut self) {
        let score = self.tracker.current_score();
        let level = self.tracker.current_level();
        let won = self.flow.machine().is_in(Screen::GameWin);
        if let Some(rank) = self.highscores.add_score(score, level, won) {
            log::info!("High score #{}: {} (level {})", rank, score, level);
        }
    }
}
